//! # wayfarer - grounded travel planning over MCP tools
//!
//! Turns a natural-language travel request into calls against a remote MCP
//! tool provider and a synthesized answer that only repeats what the tools
//! returned.
//!
//! ## Architecture
//!
//! 1. **Providers** act as factories to create Clients.
//! 2. **Clients** send a conversation plus a tool catalog to an LLM and return
//!    one assistant message.
//! 3. **Connectors** open an MCP session per turn; the session's tools are
//!    discovered and wrapped as typed **ToolHandles**.
//! 4. The **Agent** runs the turn: plan, execute the requested tools in order,
//!    synthesize. There is exactly one round of tool calls.
//!
//! ## Example
//! ```no_run
//! use wayfarer::mcp::HttpConnector;
//! use wayfarer::model::ChatHistory;
//! use wayfarer::providers::{Groq, Provider};
//! use wayfarer::Agent;
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = Groq::create("your-api-key".to_string(), Groq::DEFAULT_MODEL.to_string());
//!     let agent = Agent::new(client, HttpConnector::new("http://localhost:8000/mcp"));
//!
//!     let mut history = ChatHistory::new();
//!     if let Some(answer) = agent.respond(&mut history, "3 days in Rome from Madrid").await {
//!         println!("{}", answer);
//!     }
//! }
//! ```

pub mod agent;
pub mod api;
pub mod client;
pub mod config;
pub mod http;
pub mod mcp;
pub mod model;
pub mod options;
pub mod policy;
pub mod providers;
pub mod schema;
pub mod status;
pub mod tools;

pub use agent::{Agent, AgentOptions, Turn, TurnError, TurnState};
pub use client::{Client, ClientError};
pub use mcp::{Connector, HttpConnector, ToolSession};
pub use model::{ChatHistory, Conversation, Message, Response, ToolCallRequest};
pub use policy::GroundingPolicy;
pub use schema::{ArgumentShape, Field, FieldKind};
pub use tools::{ResultFlag, ResultRule, ToolError, ToolRegistry, ToolService};

// Re-export rmcp for convenience
pub use rmcp;
