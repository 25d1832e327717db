//! Backchannel Agent — the embedded AnonCreds test agent the backchannel
//! delegates to.
//!
//! Provides ledger-like registries for schemas and credential definitions,
//! a present-proof exchange engine with loopback message delivery, and a
//! broadcast stream of proof state-change events.

pub mod agent;
pub mod error;
pub mod identifiers;
pub mod proofs;
pub mod registry;

pub use agent::{Agent, AgentConfig};
pub use error::AgentError;
pub use proofs::{ProofExchangeRecord, ProofExchanges, ProofRequest, ProofStateChangedEvent};
pub use registry::{AnonCredsCredentialDefinition, AnonCredsRegistry, AnonCredsSchema};
