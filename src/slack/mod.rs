//! All Slack-specific functionality

pub mod blocks;
pub mod client;
pub mod command_parser;
pub mod platform;

pub use client::SlackClient;
pub use platform::SlackPlatform;
