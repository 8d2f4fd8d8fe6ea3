//! Companion agent that pushes daily AI coding tool usage to a hosted profile.
//!
//! The binary in `main.rs` wires real collaborators into
//! [`commands::Context`]; everything else is testable in isolation.

pub mod api_client;
pub mod cli;
pub mod commands;
pub mod config;
pub mod device_auth;
pub mod logging;
pub mod merge;
pub mod paths;
pub mod session_store;
pub mod sync_plan;
pub mod token;
pub mod usage;

#[cfg(test)]
mod test_support;
