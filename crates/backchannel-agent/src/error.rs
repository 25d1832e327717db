use backchannel_core::ProofState;

/// Errors from the embedded test agent.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("agent does not have a public DID")]
    NoPublicDid,

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("invalid transition for thread {thread_id}: {from} -> {to}")]
    InvalidTransition {
        thread_id: String,
        from: ProofState,
        to: ProofState,
    },

    #[error("registration failed: {0}")]
    RegistrationFailed(String),
}
