//! composite-core - Core traits and types for the composite tool gateway
//!
//! This crate provides the abstractions shared by the gateway, the MCP
//! connector and the HTTP surface: backend descriptors and configuration
//! loading, the [`BackendSession`]/[`Connector`] seam that hides the wire
//! protocol, the error taxonomy and the prefix routing helpers.

pub mod config;
pub mod error;
pub mod models;
pub mod routing;
pub mod session;

pub use config::{
    BackendDescriptor, CompositeConfig, ConfigFile, DescriptorSource, ServerSettings,
    SupervisorSettings,
};
pub use error::{CompositeError, CompositeResult, ConfigError, SessionError, SessionResult};
pub use models::*;
pub use session::{BackendSession, Connector};
