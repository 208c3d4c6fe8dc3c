//! IAM documents attached to the role, the log policy and the front door.

use serde::{ser::SerializeMap, Serialize, Serializer};

use super::graph::{DescriptorError, Value};

pub const POLICY_VERSION: &str = "2012-10-17";
pub const LAMBDA_SERVICE: &str = "lambda.amazonaws.com";
pub const APIGATEWAY_SERVICE: &str = "apigateway.amazonaws.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    Any,
    Service(String),
}

impl Serialize for Principal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Principal::Any => serializer.serialize_str("*"),
            Principal::Service(service) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Service", service)?;
                map.end()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Action {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Effect {
    Allow,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    pub effect: Effect,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal: Option<Principal>,
    pub action: Action,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<Statement>,
}

impl PolicyDocument {
    pub fn new(statement: Vec<Statement>) -> Self {
        Self {
            version: POLICY_VERSION.to_string(),
            statement,
        }
    }

    pub fn to_value(&self) -> Result<Value, DescriptorError> {
        serde_json::to_value(self)
            .map(Value::Document)
            .map_err(|e| DescriptorError::Config(format!("policy document: {e}")))
    }
}

fn assume_role_by_lambda() -> Statement {
    Statement {
        sid: Some(String::new()),
        effect: Effect::Allow,
        principal: Some(Principal::Service(LAMBDA_SERVICE.to_string())),
        action: Action::One("sts:AssumeRole".to_string()),
        resource: None,
    }
}

/// Lets the compute platform assume the execution role.
pub fn trust_policy() -> PolicyDocument {
    PolicyDocument::new(vec![assume_role_by_lambda()])
}

/// Minimal log permissions; the only wildcard is over log resources.
pub fn log_policy() -> PolicyDocument {
    PolicyDocument::new(vec![Statement {
        sid: None,
        effect: Effect::Allow,
        principal: None,
        action: Action::Many(vec![
            "logs:CreateLogGroup".to_string(),
            "logs:CreateLogStream".to_string(),
            "logs:PutLogEvents".to_string(),
        ]),
        resource: Some("arn:aws:logs:*:*:*".to_string()),
    }])
}

/// Resource policy on the front door.
///
/// NOTE: grants `execute-api:Invoke` to any principal on any resource. This is
/// kept as deployed and tracked as a security review item.
pub fn gateway_policy() -> PolicyDocument {
    PolicyDocument::new(vec![
        assume_role_by_lambda(),
        Statement {
            sid: Some(String::new()),
            effect: Effect::Allow,
            principal: Some(Principal::Any),
            action: Action::One("execute-api:Invoke".to_string()),
            resource: Some("*".to_string()),
        },
    ])
}
