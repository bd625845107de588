//! composite-gateway - Aggregation of tool-serving backends
//!
//! This crate owns the connections to every configured backend and presents
//! their tools and prompts as one namespaced catalog.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        CompositeRouter                           │
//! │  - Lists `{prefix}_{name}` across backends                       │
//! │  - Dispatches qualified calls to the owning supervisor           │
//! └───────────────────────────────┬──────────────────────────────────┘
//!                                 │
//! ┌───────────────────────────────▼──────────────────────────────────┐
//! │                            Registry                              │
//! │  - Builds one supervisor per enabled backend, once, on demand    │
//! └───────────────┬───────────────────────────────┬──────────────────┘
//!                 │                               │
//!                 ▼                               ▼
//!  ┌──────────────────────────┐    ┌──────────────────────────┐
//!  │ Supervisor (docs)        │    │ Supervisor (calc)        │
//!  │ queue ──▶ worker task ──▶│    │ queue ──▶ worker task ──▶│
//!  │          BackendSession  │    │          BackendSession  │
//!  └──────────────────────────┘    └──────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use composite_gateway::{CompositeRouter, Registry};
//!
//! let registry = Arc::new(Registry::new(config, connector, settings));
//! let router = CompositeRouter::new(registry.clone());
//!
//! // First use connects every enabled backend
//! println!("{}", router.list_tools().await);
//! // doc_read: Read a document
//!
//! let text = router.call_tool("doc_read", args).await;
//!
//! registry.shutdown().await;
//! ```

pub mod mock;
mod registry;
mod router;
mod supervisor;

pub use registry::Registry;
pub use router::{CatalogLine, CompositeRouter};
pub use supervisor::{BackendCall, BackendReply, Supervisor};

// Re-export core types for convenience
pub use composite_core::{
    BackendDescriptor, BackendStatus, CompositeError, CompositeResult, SupervisorState,
};
