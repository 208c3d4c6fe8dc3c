use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::{
    config::{HandlerConfig, ResponseFormat},
    error::HandlerError,
    observe::{observe, RequestSink, TracingSink},
};

pub const PATH_SEPARATOR: char = '/';

/// One inbound invocation. Only `path` drives the response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InboundRequest {
    pub path: String,
    pub method: String,
    pub headers: BTreeMap<String, String>,
    pub query: BTreeMap<String, Vec<String>>,
}

impl InboundRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: method.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundResponse {
    pub status_code: u16,
    pub body: String,
}

#[derive(Serialize)]
struct UppercaseBody<'a> {
    result: &'a str,
}

/// Strips one leading separator and uppercases the rest.
///
/// A path without a leading separator is used whole.
pub fn transform_path(path: &str) -> String {
    let message = path.strip_prefix(PATH_SEPARATOR).unwrap_or(path);
    message.to_uppercase()
}

/// Pretty-prints `value` with two-space indentation.
pub fn render_json<T: Serialize + ?Sized>(value: &T) -> Result<String, HandlerError> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Encodes the uppercased message for the json response format.
pub trait BodyRenderer: Send + Sync {
    fn render(&self, result: &str) -> Result<String, HandlerError>;
}

/// `{"result": "<message>"}`, pretty-printed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultDocument;

impl BodyRenderer for ResultDocument {
    fn render(&self, result: &str) -> Result<String, HandlerError> {
        render_json(&UppercaseBody { result })
    }
}

#[derive(Clone)]
pub struct Handler {
    format: ResponseFormat,
    sink: Arc<dyn RequestSink>,
    renderer: Arc<dyn BodyRenderer>,
}

impl Handler {
    pub fn new(config: &HandlerConfig) -> Self {
        Self::with_sink(config, Arc::new(TracingSink))
    }

    pub fn with_sink(config: &HandlerConfig, sink: Arc<dyn RequestSink>) -> Self {
        Self {
            format: config.response_format,
            sink,
            renderer: Arc::new(ResultDocument),
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn BodyRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn format(&self) -> ResponseFormat {
        self.format
    }

    pub fn handle(&self, request: &InboundRequest) -> Result<OutboundResponse, HandlerError> {
        observe(self.sink.as_ref(), request);

        let message = transform_path(&request.path);
        let body = match self.format {
            ResponseFormat::Raw => message,
            ResponseFormat::Json => self.renderer.render(&message)?,
        };

        Ok(OutboundResponse {
            status_code: 200,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde::Serializer;

    use super::*;
    use crate::observe::tests::CapturingSink;

    fn handler(format: ResponseFormat) -> Handler {
        Handler::new(&HandlerConfig {
            response_format: format,
        })
    }

    fn get(path: &str) -> InboundRequest {
        InboundRequest::new("GET", path)
    }

    #[test]
    fn test_raw_uppercases_path() {
        let response = handler(ResponseFormat::Raw).handle(&get("/hello")).unwrap();
        assert_eq!(response.status_code, 200);
        assert_eq!(response.body, "HELLO");
    }

    #[test]
    fn test_json_wraps_result_with_two_space_indent() {
        let response = handler(ResponseFormat::Json).handle(&get("/hello")).unwrap();
        assert_eq!(response.status_code, 200);
        assert_eq!(response.body, "{\n  \"result\": \"HELLO\"\n}");
    }

    #[test]
    fn test_root_path_yields_empty_payload() {
        let raw = handler(ResponseFormat::Raw).handle(&get("/")).unwrap();
        assert_eq!(raw.status_code, 200);
        assert_eq!(raw.body, "");

        let json = handler(ResponseFormat::Json).handle(&get("/")).unwrap();
        assert_eq!(json.status_code, 200);
        assert_eq!(json.body, "{\n  \"result\": \"\"\n}");
    }

    #[test]
    fn test_strips_exactly_one_separator() {
        assert_eq!(transform_path("//a/b"), "/A/B");
        assert_eq!(transform_path("/proxy/sub/path"), "PROXY/SUB/PATH");
    }

    #[test]
    fn test_path_without_separator_is_used_whole() {
        assert_eq!(transform_path("abc"), "ABC");
        assert_eq!(transform_path(""), "");
    }

    #[test]
    fn test_multibyte_characters_survive() {
        assert_eq!(transform_path("/straße"), "STRASSE");
        assert_eq!(transform_path("/ñandú-日本"), "ÑANDÚ-日本");
        assert_eq!(transform_path("/émoji🙂"), "ÉMOJI🙂");
    }

    #[test]
    fn test_uppercase_is_idempotent() {
        for sample in ["hello", "MiXeD 123", "straße", "ǆ", "ﬁ", "ω", ""] {
            let once = transform_path(&format!("/{sample}"));
            let twice = transform_path(&format!("/{once}"));
            assert_eq!(once, twice, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn test_json_result_field_matches_raw_transform() {
        for sample in ["a", "hello world", "ünïcödé", "x/y/z"] {
            let path = format!("/{sample}");
            let raw = handler(ResponseFormat::Raw).handle(&get(&path)).unwrap();
            let json = handler(ResponseFormat::Json).handle(&get(&path)).unwrap();

            let parsed: serde_json::Value = serde_json::from_str(&json.body).unwrap();
            assert_eq!(parsed["result"], raw.body.as_str());
            assert_eq!(raw.body, sample.to_uppercase());
        }
    }

    #[test]
    fn test_every_invocation_reaches_the_sink() {
        let sink = Arc::new(CapturingSink::default());
        let handler = Handler::with_sink(&HandlerConfig::default(), sink.clone());

        handler.handle(&get("/one")).unwrap();
        handler.handle(&get("/two")).unwrap();

        let records = sink.records.lock().unwrap();
        let paths: Vec<&str> = records.iter().map(|(path, _)| path.as_str()).collect();
        assert_eq!(paths, vec!["/one", "/two"]);
        assert!(records.iter().all(|(_, serialized)| serialized.is_some()));
    }

    struct Unencodable;

    impl Serialize for Unencodable {
        fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("invalid byte sequence"))
        }
    }

    #[test]
    fn test_render_failure_maps_to_internal_server_error() {
        let error = render_json(&Unencodable).expect_err("encoding should fail");
        let response = error.response();

        assert_eq!(response.status_code, 500);
        assert_eq!(response.body, "Internal Server Error");
        assert!(error.to_string().contains("invalid byte sequence"));
    }

    struct FailingRenderer;

    impl BodyRenderer for FailingRenderer {
        fn render(&self, _result: &str) -> Result<String, HandlerError> {
            render_json(&Unencodable)
        }
    }

    #[test]
    fn test_json_handler_surfaces_render_failure() {
        let handler = handler(ResponseFormat::Json).with_renderer(Arc::new(FailingRenderer));

        let error = handler
            .handle(&get("/hello"))
            .expect_err("render failure should propagate");
        assert!(matches!(error, HandlerError::Serialization(_)));
        assert_eq!(error.response().status_code, 500);
    }

    #[test]
    fn test_raw_handler_never_calls_renderer() {
        let handler = handler(ResponseFormat::Raw).with_renderer(Arc::new(FailingRenderer));

        let response = handler.handle(&get("/hello")).unwrap();
        assert_eq!(response.body, "HELLO");
    }
}
