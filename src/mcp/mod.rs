//! MCP (Model Context Protocol) server for mars-rs.
//!
//! Exposes the research workflow as MCP tools over stdio or streamable
//! HTTP. The HTTP server also answers plain REST requests, streaming
//! progress as server-sent events on request, and hosts a research-only
//! chat assistant with per-session history.
//!
//! # Feature Gate
//!
//! This module requires the `mcp` feature flag (on by default):
//! ```toml
//! [dependencies]
//! mars-rs = { version = "...", features = ["mcp"] }
//! ```
//!
//! # Architecture
//!
//! ```text
//! MCP client ── research(topic) ──┐
//! POST /research {topic, stream} ─┤
//!                                 ↓
//!                          Arc<Workflow>  (plan → research → write → critique)
//!                                 ↓
//!            WorkflowResult JSON, or SSE progress/error/result events
//!
//! POST /chat {session_id, message} → SessionStore history
//!   ├── research intent → Arc<Workflow> (as above)
//!   └── otherwise       → direct reply under the research-only prompt
//!
//! model_status / reset_models / GET /status → Arc<FallbackClient>
//! ```

pub mod params;
pub mod server;
pub mod transport;

pub use params::{ChatBody, ResearchParams, ResearchRequest};
pub use server::MarsMcpServer;
pub use transport::{rest_router, serve_http, serve_stdio};
