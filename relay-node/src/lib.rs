//! Relay Node Library
//!
//! This library provides the host integration around the arbitration
//! protocol: configuration, the platform HTTP channel, webhook event
//! intake, link dispatch, debounce and reply delivery.

pub mod channel;
pub mod config;
pub mod debounce;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod sender;

// Re-export commonly used types
pub use channel::ApiChannel;
pub use config::RelayConfig;
pub use debounce::Debouncer;
pub use dispatch::{Dispatcher, LinkHit};
pub use error::{RelayError, Result};
pub use event::EventEnvelope;
pub use sender::Sender;
