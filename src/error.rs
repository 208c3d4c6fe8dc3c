use std::fmt;

use crate::handler::OutboundResponse;

pub const INTERNAL_SERVER_ERROR_BODY: &str = "Internal Server Error";

/// Errors the request handler can surface.
///
/// Uppercasing never fails, so the only recoverable failure is encoding the
/// response body. Each variant still maps to a response the gateway can return.
#[derive(Debug)]
pub enum HandlerError {
    Serialization(serde_json::Error),
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerError::Serialization(e) => write!(f, "failed to serialize response: {e}"),
        }
    }
}

impl std::error::Error for HandlerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HandlerError::Serialization(e) => Some(e),
        }
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(e: serde_json::Error) -> Self {
        HandlerError::Serialization(e)
    }
}

impl HandlerError {
    pub fn status_code(&self) -> u16 {
        match self {
            HandlerError::Serialization(_) => 500,
        }
    }

    /// The fixed response returned to the client in place of the failed one.
    pub fn response(&self) -> OutboundResponse {
        OutboundResponse {
            status_code: self.status_code(),
            body: INTERNAL_SERVER_ERROR_BODY.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::ser::Error as _;

    use super::*;

    #[test]
    fn test_serialization_error_maps_to_fixed_500() {
        let error = HandlerError::from(serde_json::Error::custom("bad bytes"));
        let response = error.response();

        assert_eq!(response.status_code, 500);
        assert_eq!(response.body, "Internal Server Error");
        assert!(error.to_string().contains("bad bytes"));
        assert!(std::error::Error::source(&error).is_some());
    }
}
