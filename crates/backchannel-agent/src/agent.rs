//! The embedded agent facade: one public identity, one registry, one
//! proof-exchange table.

use rand::RngCore;
use tokio::sync::broadcast;

use backchannel_core::{UnqualifiedDid, DEFAULT_NAMESPACE};

use crate::error::AgentError;
use crate::proofs::{ProofExchanges, ProofStateChangedEvent};
use crate::registry::AnonCredsRegistry;

/// Configuration for the embedded agent.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// did:indy namespace ledger objects are registered under.
    pub namespace: String,
    /// Capacity of the proof state-change broadcast channel.
    pub event_channel_capacity: usize,
    /// Whether the agent holds a public DID. Issuer operations require one.
    pub has_public_did: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.into(),
            event_channel_capacity: 256,
            has_public_did: true,
        }
    }
}

/// The embedded AnonCreds test agent.
pub struct Agent {
    public_did: Option<UnqualifiedDid>,
    registry: AnonCredsRegistry,
    proofs: ProofExchanges,
}

impl Agent {
    /// Create an agent, generating a fresh public DID when configured with one.
    pub fn new(config: AgentConfig) -> Self {
        let public_did = config.has_public_did.then(generate_did);
        if let Some(ref did) = public_did {
            tracing::info!(%did, namespace = %config.namespace, "agent created");
        } else {
            tracing::info!(namespace = %config.namespace, "agent created without public DID");
        }
        Self {
            public_did,
            registry: AnonCredsRegistry::new(config.namespace),
            proofs: ProofExchanges::new(config.event_channel_capacity),
        }
    }

    /// The agent's public DID, required for registering ledger objects.
    pub fn public_did(&self) -> Result<&UnqualifiedDid, AgentError> {
        self.public_did.as_ref().ok_or(AgentError::NoPublicDid)
    }

    /// The AnonCreds object registry.
    pub fn registry(&self) -> &AnonCredsRegistry {
        &self.registry
    }

    /// The proof-exchange table.
    pub fn proofs(&self) -> &ProofExchanges {
        &self.proofs
    }

    /// Subscribe to proof state-change events.
    pub fn events(&self) -> broadcast::Receiver<ProofStateChangedEvent> {
        self.proofs.subscribe()
    }
}

/// Generate an unqualified Indy-style DID: base58 of 16 random bytes.
fn generate_did() -> UnqualifiedDid {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    let encoded = bs58::encode(bytes).into_string();
    // Base58 of 16 bytes never contains ':' or '/', so this cannot fail.
    UnqualifiedDid::new(encoded).expect("base58 DID is always valid")
}
