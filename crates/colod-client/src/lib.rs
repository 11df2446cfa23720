//! The management socket adapter: translates newline-delimited `exec-colod` JSON
//! requests into [`colod_core::OrchestratorHandle`] calls and serialises their results
//! back in the hypervisor's own reply shape.
mod protocol;
mod server;

pub use protocol::handle_request;
pub use server::{run_server, ServerConfig};

#[cfg(test)]
mod tests;
