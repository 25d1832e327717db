/// Core backchannel errors.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid DID: {0}")]
    InvalidDid(String),

    #[error("unknown proof state: {0}")]
    UnknownProofState(String),
}
