use crate::config::StackConfig;

use super::graph::{attr, DescriptorError, ResourceGraph, ResourceKind, Value};
use super::identity::{CallerContext, IdentityLookup};
use super::policy::{gateway_policy, log_policy, trust_policy, APIGATEWAY_SERVICE};

pub const FUNCTION_NAME_OUTPUT: &str = "Lambda Name";
pub const INVOCATION_URL_OUTPUT: &str = "invocation URL";

pub const PROXY_PATH_PART: &str = "{proxy+}";
pub const URL_PLACEHOLDER: &str = "{message}";

/// Resolves the caller context, then builds the graph.
pub async fn describe(
    config: &StackConfig,
    lookup: &dyn IdentityLookup,
) -> Result<ResourceGraph, DescriptorError> {
    let caller = lookup.resolve().await?;
    build(config, &caller)
}

/// Emits the execution role, function and front door wiring for one stack.
///
/// The first failing step aborts the build. No randomness is involved, so the
/// same inputs always give the same graph.
pub fn build(config: &StackConfig, caller: &CallerContext) -> Result<ResourceGraph, DescriptorError> {
    config
        .validate()
        .map_err(|e| DescriptorError::Config(e.to_string()))?;

    let prefix = config.prefix();
    let mut graph = ResourceGraph::new();

    let role = graph.add(
        ResourceKind::Role,
        config.resource_name("task-exec-role"),
        [("assume_role_policy", trust_policy().to_value()?)],
        &[],
    )?;

    let log_permission = graph.add(
        ResourceKind::Policy,
        config.resource_name("lambda-log-policy"),
        [
            ("role", role.attr(attr::NAME)),
            ("policy", log_policy().to_value()?),
        ],
        &[],
    )?;

    // The function must not run before it can write logs.
    let function = graph.add(
        ResourceKind::Function,
        config.resource_name("function"),
        [
            ("handler", Value::text(&config.entrypoint)),
            ("role", role.attr(attr::ARN)),
            ("runtime", Value::text(&config.runtime)),
            ("code", Value::text(config.artifact.to_string_lossy())),
        ],
        &[&log_permission],
    )?;

    let api = graph.add(
        ResourceKind::Api,
        config.resource_name("api"),
        [
            ("name", Value::text(config.resource_name("api"))),
            (
                "description",
                Value::text(format!("An API Gateway for the {prefix} function")),
            ),
            ("policy", gateway_policy().to_value()?),
        ],
        &[],
    )?;

    let proxy = graph.add(
        ResourceKind::Resource,
        config.resource_name("gateway-resource"),
        [
            ("rest_api", api.attr(attr::ID)),
            ("path_part", Value::text(PROXY_PATH_PART)),
            ("parent_id", api.attr(attr::ROOT_RESOURCE_ID)),
        ],
        &[],
    )?;

    let method = graph.add(
        ResourceKind::Method,
        config.resource_name("any-method"),
        [
            ("http_method", Value::text("ANY")),
            ("authorization", Value::text("NONE")),
            ("rest_api", api.attr(attr::ID)),
            ("resource_id", proxy.attr(attr::ID)),
        ],
        &[],
    )?;

    let integration = graph.add(
        ResourceKind::Integration,
        config.resource_name("lambda-integration"),
        [
            ("http_method", Value::text("ANY")),
            ("integration_http_method", Value::text("POST")),
            ("resource_id", proxy.attr(attr::ID)),
            ("rest_api", api.attr(attr::ID)),
            ("type", Value::text("AWS_PROXY")),
            ("uri", function.attr(attr::INVOKE_ARN)),
        ],
        &[&method],
    )?;

    let source_arn = Value::join([
        Value::text(format!(
            "arn:aws:execute-api:{}:{}:",
            caller.region, caller.account_id
        )),
        api.attr(attr::ID),
        Value::text("/*/*/*"),
    ]);
    let permission = graph.add(
        ResourceKind::Permission,
        config.resource_name("api-permission"),
        [
            ("action", Value::text("lambda:InvokeFunction")),
            ("function", function.attr(attr::NAME)),
            ("principal", Value::text(APIGATEWAY_SERVICE)),
            ("source_arn", source_arn),
        ],
        &[&proxy],
    )?;

    let deployment = graph.add(
        ResourceKind::Deployment,
        config.resource_name("deployment"),
        [
            ("description", Value::text("UpperCase API deployment")),
            ("rest_api", api.attr(attr::ID)),
        ],
        &[&proxy, &method, &integration, &function, &permission],
    )?;

    graph.add(
        ResourceKind::Stage,
        config.resource_name("stage"),
        [
            ("rest_api", api.attr(attr::ID)),
            ("stage_name", Value::text(&config.stack)),
            ("deployment", deployment.attr(attr::ID)),
        ],
        &[],
    )?;

    graph.output(FUNCTION_NAME_OUTPUT, function.attr(attr::NAME))?;
    graph.output(
        INVOCATION_URL_OUTPUT,
        Value::join([
            Value::text("https://"),
            api.attr(attr::ID),
            Value::text(format!(
                ".execute-api.{}.amazonaws.com/{}/{URL_PLACEHOLDER}",
                caller.region, config.stack
            )),
        ]),
    )?;

    tracing::debug!(stack = %prefix, resources = graph.len(), "Built resource graph");

    Ok(graph)
}
