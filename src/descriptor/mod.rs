//! Declarative resource graph for the uppercase endpoint.
//!
//! The graph only states what must exist and which edges order it. Applying
//! it is left to a provisioning engine (see [`crate::provision`]).

pub mod graph;
pub mod identity;
pub mod policy;
pub mod stack;

pub use graph::{DescriptorError, ResourceGraph, ResourceKind, ResourceNode, Value};
pub use identity::{CallerContext, CallerOverrides, IdentityLookup, StaticIdentity, StsIdentity};
pub use stack::{build, describe};
