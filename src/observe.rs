use crate::handler::InboundRequest;

/// Receives every inbound request before a response is built.
///
/// `record` returns nothing, so a sink has no way to change or block the
/// response path.
pub trait RequestSink: Send + Sync {
    fn record(&self, request: &InboundRequest, serialized: Option<&str>);
}

/// Default sink: one structured `tracing` event per request.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl RequestSink for TracingSink {
    fn record(&self, request: &InboundRequest, serialized: Option<&str>) {
        tracing::info!(
            method = %request.method,
            path = %request.path,
            headers = request.headers.len(),
            query = request.query.len(),
            "Request"
        );

        match serialized {
            Some(serialized) => tracing::info!(request = %serialized, "Request String"),
            None => tracing::warn!(path = %request.path, "Request could not be serialized"),
        }
    }
}

/// Serializes the request for the sink. Failures are swallowed.
pub(crate) fn observe(sink: &dyn RequestSink, request: &InboundRequest) {
    let serialized = match serde_json::to_string(request) {
        Ok(serialized) => Some(serialized),
        Err(error) => {
            tracing::warn!(error = %error, "Failed to serialize inbound request");
            None
        }
    };

    sink.record(request, serialized.as_deref());
}
