//! Backchannel Server — the AATH `/agent/command/*` HTTP surface over the
//! embedded AnonCreds test agent.

pub mod api;
pub mod bridge;
pub mod config;
pub mod state;

pub use bridge::{BridgeError, StateWaitBridge};
pub use config::BackchannelConfig;
pub use state::BackchannelState;
