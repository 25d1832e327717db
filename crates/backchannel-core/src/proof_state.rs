use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// The states of a present-proof exchange, as reported to the test harness.
///
/// Serialized in kebab-case to match the harness wire format
/// (e.g. `request-received`, `presentation-sent`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProofState {
    /// Prover proposed a presentation.
    ProposalSent,
    /// Verifier received a presentation proposal.
    ProposalReceived,
    /// Verifier sent a proof request.
    RequestSent,
    /// Prover received a proof request.
    RequestReceived,
    /// Prover sent the presentation.
    PresentationSent,
    /// Verifier received the presentation.
    PresentationReceived,
    /// One side declined the exchange. Final state.
    Declined,
    /// The exchange was abandoned. Final state.
    Abandoned,
    /// Presentation verified and acknowledged. Final state.
    Done,
}

impl ProofState {
    /// Whether this is a terminal state of the exchange.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Declined | Self::Abandoned | Self::Done)
    }

    /// The harness wire representation of this state.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProposalSent => "proposal-sent",
            Self::ProposalReceived => "proposal-received",
            Self::RequestSent => "request-sent",
            Self::RequestReceived => "request-received",
            Self::PresentationSent => "presentation-sent",
            Self::PresentationReceived => "presentation-received",
            Self::Declined => "declined",
            Self::Abandoned => "abandoned",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for ProofState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProofState {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "proposal-sent" => Ok(Self::ProposalSent),
            "proposal-received" => Ok(Self::ProposalReceived),
            "request-sent" => Ok(Self::RequestSent),
            "request-received" => Ok(Self::RequestReceived),
            "presentation-sent" => Ok(Self::PresentationSent),
            "presentation-received" => Ok(Self::PresentationReceived),
            "declined" => Ok(Self::Declined),
            "abandoned" => Ok(Self::Abandoned),
            "done" => Ok(Self::Done),
            other => Err(CoreError::UnknownProofState(other.to_string())),
        }
    }
}
