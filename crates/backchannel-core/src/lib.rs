//! Backchannel Core — shared types and errors for the AnonCreds
//! test-harness backchannel.

pub mod error;
pub mod proof_state;
pub mod types;

pub use error::CoreError;
pub use proof_state::ProofState;
pub use types::{UnqualifiedDid, DEFAULT_NAMESPACE};
