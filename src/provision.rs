//! Hand-off of a [`ResourceGraph`] to a provisioning engine.
//!
//! The engine itself is external. [`apply`] only walks the graph in
//! dependency order, fills in references from attributes reported by earlier
//! creates, and stops at the first failure. Cleanup of partial state belongs
//! to the engine.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde_json::Value as Json;

use crate::descriptor::{
    graph::{attr, Reference},
    CallerContext, DescriptorError, ResourceGraph, ResourceKind, ResourceNode, Value,
};

pub type Attributes = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionError {
    Graph(DescriptorError),
    Create { node: String, message: String },
    MissingAttribute { node: String, attribute: String },
}

impl fmt::Display for ProvisionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProvisionError::Graph(e) => write!(f, "invalid resource graph: {e}"),
            ProvisionError::Create { node, message } => {
                write!(f, "failed to create '{node}': {message}")
            }
            ProvisionError::MissingAttribute { node, attribute } => {
                write!(f, "resource '{node}' did not report attribute '{attribute}'")
            }
        }
    }
}

impl std::error::Error for ProvisionError {}

impl From<DescriptorError> for ProvisionError {
    fn from(e: DescriptorError) -> Self {
        ProvisionError::Graph(e)
    }
}

/// Creates one resource from fully resolved properties and reports the
/// attributes other resources may reference.
#[async_trait]
pub trait Provisioner: Send + Sync {
    async fn create(
        &self,
        node: &ResourceNode,
        properties: &BTreeMap<String, Json>,
    ) -> Result<Attributes, ProvisionError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppliedStack {
    pub resources: BTreeMap<String, Attributes>,
    pub outputs: BTreeMap<String, String>,
}

pub async fn apply(
    graph: &ResourceGraph,
    provisioner: &dyn Provisioner,
) -> Result<AppliedStack, ProvisionError> {
    let mut applied = AppliedStack::default();

    for node in graph.topological_order()? {
        let properties = node
            .properties
            .iter()
            .map(|(key, value)| Ok((key.clone(), resolve(value, &applied.resources)?)))
            .collect::<Result<BTreeMap<_, _>, ProvisionError>>()?;

        let attributes = match provisioner.create(node, &properties).await {
            Ok(attributes) => attributes,
            Err(error) => {
                tracing::error!(resource = %node.name, kind = %node.kind, error = %error, "Apply aborted");
                return Err(error);
            }
        };
        tracing::info!(resource = %node.name, kind = %node.kind, "Created resource");

        applied.resources.insert(node.name.clone(), attributes);
    }

    for (name, value) in graph.outputs() {
        let resolved = match resolve(value, &applied.resources)? {
            Json::String(text) => text,
            other => other.to_string(),
        };
        applied.outputs.insert(name.clone(), resolved);
    }

    Ok(applied)
}

fn lookup(
    reference: &Reference,
    resources: &BTreeMap<String, Attributes>,
) -> Result<String, ProvisionError> {
    resources
        .get(&reference.node)
        .and_then(|attributes| attributes.get(&reference.attribute))
        .cloned()
        .ok_or_else(|| ProvisionError::MissingAttribute {
            node: reference.node.clone(),
            attribute: reference.attribute.clone(),
        })
}

fn resolve(value: &Value, resources: &BTreeMap<String, Attributes>) -> Result<Json, ProvisionError> {
    match value {
        Value::Text(text) => Ok(Json::String(text.clone())),
        Value::Document(document) => Ok(document.clone()),
        Value::Ref(reference) => lookup(reference, resources).map(Json::String),
        Value::Join(join) => {
            let mut joined = String::new();
            for part in &join.join {
                match resolve(part, resources)? {
                    Json::String(text) => joined.push_str(&text),
                    other => joined.push_str(&other.to_string()),
                }
            }
            Ok(Json::String(joined))
        }
    }
}

/// Pretends every create succeeds and reports deterministic attributes, so a
/// graph can be previewed without a cloud account.
pub struct DryRunProvisioner {
    caller: CallerContext,
}

impl DryRunProvisioner {
    pub fn new(caller: CallerContext) -> Self {
        Self { caller }
    }

    /// Permissions are statements on the function's policy and have no ARN.
    fn arn(&self, node: &ResourceNode) -> Option<String> {
        let CallerContext { account_id, region } = &self.caller;
        match node.kind {
            ResourceKind::Role | ResourceKind::Policy => Some(format!(
                "arn:aws:iam::{account_id}:{}/{}",
                node.kind, node.name
            )),
            ResourceKind::Function => Some(format!(
                "arn:aws:lambda:{region}:{account_id}:function:{}",
                node.name
            )),
            ResourceKind::Permission => None,
            _ => Some(format!(
                "arn:aws:apigateway:{region}::/{}/{}",
                node.kind, node.name
            )),
        }
    }
}

#[async_trait]
impl Provisioner for DryRunProvisioner {
    async fn create(
        &self,
        node: &ResourceNode,
        _properties: &BTreeMap<String, Json>,
    ) -> Result<Attributes, ProvisionError> {
        let arn = self.arn(node);
        let mut attributes = Attributes::new();
        attributes.insert(attr::ID.to_string(), node.name.clone());
        attributes.insert(attr::NAME.to_string(), node.name.clone());

        match (node.kind, &arn) {
            (ResourceKind::Function, Some(arn)) => {
                attributes.insert(
                    attr::INVOKE_ARN.to_string(),
                    format!(
                        "arn:aws:apigateway:{}:lambda:path/2015-03-31/functions/{arn}/invocations",
                        self.caller.region
                    ),
                );
            }
            (ResourceKind::Api, _) => {
                attributes.insert(
                    attr::ROOT_RESOURCE_ID.to_string(),
                    format!("{}-root", node.name),
                );
            }
            (ResourceKind::Permission, _) => {
                attributes.insert(attr::STATEMENT_ID.to_string(), node.name.clone());
            }
            _ => {}
        }
        if let Some(arn) = arn {
            attributes.insert(attr::ARN.to_string(), arn);
        }

        Ok(attributes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller() -> CallerContext {
        CallerContext {
            account_id: "123456789012".to_string(),
            region: "us-east-1".to_string(),
        }
    }

    fn two_node_graph() -> ResourceGraph {
        let mut graph = ResourceGraph::new();
        let role = graph.add(ResourceKind::Role, "role", [], &[]).unwrap();
        let function = graph
            .add(
                ResourceKind::Function,
                "fn",
                [(
                    "role",
                    Value::join([Value::text("role:"), role.attr(attr::ARN)]),
                )],
                &[],
            )
            .unwrap();
        graph.output("name", function.attr(attr::NAME)).unwrap();
        graph
    }

    #[tokio::test]
    async fn test_apply_resolves_references_and_outputs() {
        let graph = two_node_graph();
        let applied = apply(&graph, &DryRunProvisioner::new(caller()))
            .await
            .unwrap();

        assert_eq!(applied.resources.len(), 2);
        assert_eq!(applied.outputs.get("name").map(String::as_str), Some("fn"));
        assert_eq!(
            applied.resources["fn"][attr::ARN],
            "arn:aws:lambda:us-east-1:123456789012:function:fn"
        );
    }

    #[tokio::test]
    async fn test_apply_reports_missing_attribute() {
        let mut graph = ResourceGraph::new();
        let role = graph.add(ResourceKind::Role, "role", [], &[]).unwrap();
        graph
            .add(
                ResourceKind::Function,
                "fn",
                [("uri", role.attr(attr::INVOKE_ARN))],
                &[],
            )
            .unwrap();

        let err = apply(&graph, &DryRunProvisioner::new(caller()))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ProvisionError::MissingAttribute {
                node: "role".to_string(),
                attribute: attr::INVOKE_ARN.to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_permission_reports_statement_id_instead_of_arn() {
        let mut graph = ResourceGraph::new();
        let function = graph.add(ResourceKind::Function, "fn", [], &[]).unwrap();
        graph
            .add(
                ResourceKind::Permission,
                "allow-gateway",
                [("function", function.attr(attr::NAME))],
                &[],
            )
            .unwrap();

        let applied = apply(&graph, &DryRunProvisioner::new(caller()))
            .await
            .unwrap();

        let permission = &applied.resources["allow-gateway"];
        assert_eq!(permission[attr::STATEMENT_ID], "allow-gateway");
        assert!(!permission.contains_key(attr::ARN));
        assert!(applied.resources["fn"].contains_key(attr::ARN));
    }
}
