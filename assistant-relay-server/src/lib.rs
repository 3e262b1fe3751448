//! Session proxy and HTTP surface for the assistant relay

pub mod error;
pub mod handlers;
pub mod proxy;
pub mod reply;
pub mod server;
pub mod state;

#[cfg(test)]
mod testing;

pub use error::ApiError;
pub use proxy::{ChatReply, ProxyConfig, ProxyError, SessionError, SessionProxy};
pub use server::{build_router, run_server};
pub use state::AppState;
