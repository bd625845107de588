//! composite-mcp - MCP backend connector
//!
//! Implements the [`Connector`](composite_core::Connector) seam with an
//! `rmcp` client over the SSE transport. Protocol types are converted to the
//! gateway's own models at this boundary so nothing upstream depends on
//! `rmcp`.

mod connector;
mod convert;

pub use connector::{McpConnector, McpSession};
