// Library exports for livewatch crate
// This allows tests and other crates to use the modules

pub mod config;
pub mod email;
pub mod error;
pub mod gmail_client;
pub mod poller;
pub mod sink;
pub mod slack_notifier;

// Live stream notification discovery
pub mod live;
