use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Role,
    Policy,
    Function,
    Api,
    Resource,
    Method,
    Integration,
    Permission,
    Deployment,
    Stage,
}

impl ResourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Role => "role",
            ResourceKind::Policy => "policy",
            ResourceKind::Function => "function",
            ResourceKind::Api => "api",
            ResourceKind::Resource => "resource",
            ResourceKind::Method => "method",
            ResourceKind::Integration => "integration",
            ResourceKind::Permission => "permission",
            ResourceKind::Deployment => "deployment",
            ResourceKind::Stage => "stage",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attributes the provisioning engine assigns once a resource exists.
pub mod attr {
    pub const ID: &str = "id";
    pub const NAME: &str = "name";
    pub const ARN: &str = "arn";
    pub const INVOKE_ARN: &str = "invoke_arn";
    pub const ROOT_RESOURCE_ID: &str = "root_resource_id";
    pub const STATEMENT_ID: &str = "statement_id";
}

/// A generated attribute of another node, resolved at apply time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reference {
    #[serde(rename = "ref")]
    pub node: String,
    pub attribute: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Join {
    pub join: Vec<Value>,
}

/// A property value. Literals are known at build time; references and joins
/// are filled in by the provisioning engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Document(serde_json::Value),
    Ref(Reference),
    Join(Join),
}

impl Value {
    pub fn text(value: impl Into<String>) -> Self {
        Value::Text(value.into())
    }

    pub fn join(parts: impl IntoIterator<Item = Value>) -> Self {
        Value::Join(Join {
            join: parts.into_iter().collect(),
        })
    }

    /// Names of every node this value refers to.
    pub fn references(&self) -> Vec<&str> {
        match self {
            Value::Text(_) | Value::Document(_) => Vec::new(),
            Value::Ref(reference) => vec![reference.node.as_str()],
            Value::Join(join) => join.join.iter().flat_map(Value::references).collect(),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

/// Returned by [`ResourceGraph::add`]; the only way to point at a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handle {
    name: String,
}

impl Handle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attr(&self, attribute: &str) -> Value {
        Value::Ref(Reference {
            node: self.name.clone(),
            attribute: attribute.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceNode {
    pub kind: ResourceKind,
    pub name: String,
    pub properties: BTreeMap<String, Value>,
    pub depends_on: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    DuplicateName(String),
    UnknownDependency { node: String, dependency: String },
    Cycle(Vec<String>),
    Lookup(String),
    Config(String),
}

impl fmt::Display for DescriptorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DescriptorError::DuplicateName(name) => {
                write!(f, "resource '{name}' is declared twice")
            }
            DescriptorError::UnknownDependency { node, dependency } => write!(
                f,
                "resource '{node}' depends on '{dependency}', which is not declared before it"
            ),
            DescriptorError::Cycle(nodes) => {
                write!(f, "dependency cycle between: {}", nodes.join(", "))
            }
            DescriptorError::Lookup(msg) => write!(f, "caller lookup failed: {msg}"),
            DescriptorError::Config(msg) => write!(f, "invalid stack configuration: {msg}"),
        }
    }
}

impl std::error::Error for DescriptorError {}

/// Resources plus the outputs exported after apply.
///
/// Every edge is stated: explicit `depends_on` entries and references inside
/// properties. A node may only point at nodes declared before it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResourceGraph {
    nodes: Vec<ResourceNode>,
    outputs: BTreeMap<String, Value>,
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &mut self,
        kind: ResourceKind,
        name: impl Into<String>,
        properties: impl IntoIterator<Item = (&'static str, Value)>,
        depends_on: &[&Handle],
    ) -> Result<Handle, DescriptorError> {
        let name = name.into();
        if self.get(&name).is_some() {
            return Err(DescriptorError::DuplicateName(name));
        }

        let properties: BTreeMap<String, Value> = properties
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect();

        let mut edges = BTreeSet::new();
        let referenced = properties.values().flat_map(Value::references);
        let explicit = depends_on.iter().map(|handle| handle.name());
        for dependency in referenced.chain(explicit) {
            if self.get(dependency).is_none() {
                return Err(DescriptorError::UnknownDependency {
                    node: name,
                    dependency: dependency.to_string(),
                });
            }
            edges.insert(dependency.to_string());
        }

        self.nodes.push(ResourceNode {
            kind,
            name: name.clone(),
            properties,
            depends_on: edges,
        });

        Ok(Handle { name })
    }

    pub fn output(&mut self, name: impl Into<String>, value: Value) -> Result<(), DescriptorError> {
        let name = name.into();
        if self.outputs.contains_key(&name) {
            return Err(DescriptorError::DuplicateName(name));
        }
        for dependency in value.references() {
            if self.get(dependency).is_none() {
                return Err(DescriptorError::UnknownDependency {
                    node: name,
                    dependency: dependency.to_string(),
                });
            }
        }
        self.outputs.insert(name, value);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ResourceNode> {
        self.nodes.iter().find(|node| node.name == name)
    }

    pub fn nodes(&self) -> &[ResourceNode] {
        &self.nodes
    }

    pub fn outputs(&self) -> &BTreeMap<String, Value> {
        &self.outputs
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Kahn's algorithm; ties are broken by declaration order so the result is
    /// deterministic.
    pub fn topological_order(&self) -> Result<Vec<&ResourceNode>, DescriptorError> {
        let mut remaining: BTreeMap<&str, usize> = self
            .nodes
            .iter()
            .map(|node| (node.name.as_str(), node.depends_on.len()))
            .collect();
        let mut ordered = Vec::with_capacity(self.nodes.len());
        let mut done: BTreeSet<&str> = BTreeSet::new();

        while ordered.len() < self.nodes.len() {
            let next = self.nodes.iter().find(|node| {
                !done.contains(node.name.as_str()) && remaining[node.name.as_str()] == 0
            });

            let Some(node) = next else {
                let stuck = self
                    .nodes
                    .iter()
                    .filter(|node| !done.contains(node.name.as_str()))
                    .map(|node| node.name.clone())
                    .collect();
                return Err(DescriptorError::Cycle(stuck));
            };

            done.insert(node.name.as_str());
            for dependent in &self.nodes {
                if dependent.depends_on.contains(&node.name) {
                    if let Some(count) = remaining.get_mut(dependent.name.as_str()) {
                        *count -= 1;
                    }
                }
            }
            ordered.push(node);
        }

        Ok(ordered)
    }
}
