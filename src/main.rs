use std::env::set_var;

use lambda_http::{run, service_fn, tracing, Error, Request};
use uppercase_api::{lambda::function_handler, Handler, HandlerConfig};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing::init_default_subscriber();

    set_var("AWS_LAMBDA_HTTP_IGNORE_STAGE_IN_PATH", "true");

    let config = HandlerConfig::from_env()?;
    tracing::info!(format = ?config.response_format, "Starting uppercase handler");

    let handler = Handler::new(&config);
    let handler = &handler;

    run(service_fn(move |event: Request| async move {
        function_handler(handler, event).await
    }))
    .await
}
