//! Shared backchannel state passed to HTTP handlers.

use std::time::{Duration, Instant};

use backchannel_agent::{Agent, AgentConfig};

use crate::bridge::StateWaitBridge;
use crate::config::BackchannelConfig;

/// Everything a request handler needs: the embedded agent, the state-wait
/// bridge, and the harness timing policy.
pub struct BackchannelState {
    /// The embedded agent the backchannel delegates to.
    pub agent: Agent,
    /// Bridge from the agent's event stream to waiting handlers.
    pub bridge: StateWaitBridge,
    /// How long a state wait may block before failing.
    pub wait_timeout: Duration,
    /// When the backchannel started.
    pub start_time: Instant,
}

impl BackchannelState {
    /// Build the state from config. Call [`BackchannelState::start`] before
    /// serving requests.
    pub fn new(config: &BackchannelConfig) -> Self {
        let agent = Agent::new(AgentConfig {
            namespace: config.agent.namespace.clone(),
            has_public_did: config.agent.public_did,
            ..Default::default()
        });
        let bridge = StateWaitBridge::new(config.harness.event_buffer_capacity);
        Self {
            agent,
            bridge,
            wait_timeout: Duration::from_millis(config.harness.wait_timeout_ms),
            start_time: Instant::now(),
        }
    }

    /// Begin buffering agent events. Must run before the first request so no
    /// state transition is missed.
    pub fn start(&self) {
        self.bridge.start(self.agent.events());
        tracing::info!("state-wait bridge buffering agent events");
    }
}
