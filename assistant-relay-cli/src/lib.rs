//! Terminal chat client for assistant-relay

pub mod client;
