//! Glue between the Lambda HTTP runtime and [`Handler`].

use std::collections::BTreeMap;

use lambda_http::{
    http::{header::CONTENT_TYPE, StatusCode},
    Body, Error, Request, RequestExt, Response,
};

use crate::handler::{Handler, InboundRequest, OutboundResponse};

impl From<&Request> for InboundRequest {
    fn from(event: &Request) -> Self {
        let raw_path = event.uri().path();
        let path = urlencoding::decode(raw_path)
            .map(|decoded| decoded.into_owned())
            .unwrap_or_else(|_| raw_path.to_string());

        let headers = event
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();

        // Repeated keys keep every value, in arrival order.
        let mut query: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (key, value) in event.query_string_parameters().iter() {
            query
                .entry(key.to_string())
                .or_default()
                .push(value.to_string());
        }

        Self {
            path,
            method: event.method().as_str().to_string(),
            headers,
            query,
        }
    }
}

pub async fn function_handler(handler: &Handler, event: Request) -> Result<Response<Body>, Error> {
    let request = InboundRequest::from(&event);

    let response = match handler.handle(&request) {
        Ok(response) => response,
        Err(error) => {
            tracing::error!(error = %error, path = %request.path, "Failed to build response");
            error.response()
        }
    };

    into_http_response(handler, response)
}

fn into_http_response(
    handler: &Handler,
    response: OutboundResponse,
) -> Result<Response<Body>, Error> {
    let status = StatusCode::from_u16(response.status_code)?;
    let content_type = if status.is_success() {
        handler.format().content_type()
    } else {
        "text/plain; charset=utf-8"
    };

    Ok(Response::builder()
        .status(status)
        .header(CONTENT_TYPE, content_type)
        .body(Body::Text(response.body))?)
}
