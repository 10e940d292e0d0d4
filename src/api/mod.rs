//! Inbound HTTP surface: liveness and Slack slash commands.

pub mod handler;
pub mod helpers;
pub mod signature;
pub mod slash_handler;

pub use handler::{AppState, create_router};
