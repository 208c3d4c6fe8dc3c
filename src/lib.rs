pub mod config;
pub mod descriptor;
pub mod error;
pub mod handler;
pub mod lambda;
pub mod observe;
pub mod provision;

pub use config::{HandlerConfig, ResponseFormat, StackConfig};
pub use error::HandlerError;
pub use handler::{Handler, InboundRequest, OutboundResponse};
