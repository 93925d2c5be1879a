// Model Context Protocol surface
// JSON-RPC dispatch, tool registry and the stdio transport

pub mod protocol;
mod server;
pub mod stdio;
pub mod tools;

pub use server::McpServer;
