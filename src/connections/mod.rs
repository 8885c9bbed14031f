//! Provider connections for a location.

pub mod model;
pub mod registry;

pub use model::{ConnectionSet, ConnectionStatus, OAuthGrant, Provider};
pub use registry::ConnectionRegistry;
