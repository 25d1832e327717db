//! Present-proof exchange engine.
//!
//! Each exchange is tracked by its thread id. Transitions happen in two
//! halves, mirroring a real agent pair: the sender-side state is recorded
//! synchronously and the counterpart state is delivered on a background task
//! (the embedded agent talks to itself). Every transition is published on a
//! broadcast channel so the backchannel can wait for states it has not yet
//! observed.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use backchannel_core::ProofState;

use crate::error::AgentError;

/// Notification that a proof exchange changed state.
#[derive(Debug, Clone, Serialize)]
pub struct ProofStateChangedEvent {
    /// Thread id of the exchange that transitioned.
    pub thread_id: String,
    /// The state the exchange entered.
    pub state: ProofState,
    /// When the transition happened.
    pub timestamp: DateTime<Utc>,
}

/// A proof request, as carried inside the harness's send-request body.
///
/// Restrictions and revocation intervals are passed through opaquely; the
/// embedded agent does not evaluate them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProofRequest {
    #[serde(default = "default_request_name")]
    pub name: String,
    #[serde(default = "default_request_version")]
    pub version: String,
    #[serde(default)]
    pub requested_attributes: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub requested_predicates: HashMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_revoked: Option<serde_json::Value>,
}

fn default_request_name() -> String {
    "proof-request".into()
}

fn default_request_version() -> String {
    "1.0".into()
}

/// A presentation proposal, passed through from the harness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresentationProposal {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default)]
    pub attributes: serde_json::Value,
    #[serde(default)]
    pub predicates: serde_json::Value,
}

/// One tracked proof exchange.
#[derive(Debug, Clone, Serialize)]
pub struct ProofExchangeRecord {
    /// Record id.
    pub id: String,
    /// Thread id correlating all messages of this exchange.
    pub thread_id: String,
    /// Connection the exchange runs over, if the harness supplied one.
    pub connection_id: Option<String>,
    /// Current state.
    pub state: ProofState,
    /// The proof request driving the exchange, once one was sent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof_request: Option<ProofRequest>,
    /// The proposal that opened the exchange, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proposal: Option<PresentationProposal>,
    /// Last transition time.
    pub updated_at: DateTime<Utc>,
}

/// All proof exchanges of the embedded agent, plus their event stream.
pub struct ProofExchanges {
    records: Arc<DashMap<String, ProofExchangeRecord>>,
    events_tx: broadcast::Sender<ProofStateChangedEvent>,
}

impl ProofExchanges {
    /// Create an empty exchange table with the given event channel capacity.
    pub fn new(event_channel_capacity: usize) -> Self {
        let (events_tx, _) = broadcast::channel(event_channel_capacity);
        Self {
            records: Arc::new(DashMap::new()),
            events_tx,
        }
    }

    /// Subscribe to state-change events. Each receiver sees every event
    /// emitted after the call.
    pub fn subscribe(&self) -> broadcast::Receiver<ProofStateChangedEvent> {
        self.events_tx.subscribe()
    }

    /// Look up an exchange by thread id.
    pub fn get_by_thread_id(&self, thread_id: &str) -> Option<ProofExchangeRecord> {
        self.records.get(thread_id).map(|e| e.clone())
    }

    /// All tracked exchanges.
    pub fn all(&self) -> Vec<ProofExchangeRecord> {
        self.records.iter().map(|e| e.clone()).collect()
    }

    /// Open an exchange with a presentation proposal.
    ///
    /// Returns the record in `proposal-sent`; the counterpart
    /// `proposal-received` is delivered asynchronously.
    pub fn propose(
        &self,
        connection_id: Option<String>,
        proposal: PresentationProposal,
    ) -> Result<ProofExchangeRecord, AgentError> {
        let thread_id = Uuid::now_v7().to_string();
        let record = ProofExchangeRecord {
            id: Uuid::now_v7().to_string(),
            thread_id: thread_id.clone(),
            connection_id,
            state: ProofState::ProposalSent,
            proof_request: None,
            proposal: Some(proposal),
            updated_at: Utc::now(),
        };
        self.records.insert(thread_id.clone(), record.clone());
        self.emit(&thread_id, ProofState::ProposalSent);
        self.deliver(thread_id, ProofState::ProposalReceived);
        Ok(record)
    }

    /// Send a proof request, creating the exchange if the thread is new.
    ///
    /// Returns the record in `request-sent`; the counterpart
    /// `request-received` is delivered asynchronously.
    pub fn request(
        &self,
        thread_id: Option<String>,
        connection_id: Option<String>,
        proof_request: ProofRequest,
    ) -> Result<ProofExchangeRecord, AgentError> {
        let thread_id = thread_id.unwrap_or_else(|| Uuid::now_v7().to_string());

        let record = match self.records.get_mut(&thread_id) {
            Some(mut entry) => {
                // Requesting on an existing thread answers a proposal.
                let from = entry.state;
                if !matches!(
                    from,
                    ProofState::ProposalSent | ProofState::ProposalReceived
                ) {
                    return Err(AgentError::InvalidTransition {
                        thread_id,
                        from,
                        to: ProofState::RequestSent,
                    });
                }
                entry.state = ProofState::RequestSent;
                entry.proof_request = Some(proof_request);
                entry.updated_at = Utc::now();
                entry.clone()
            }
            None => {
                let record = ProofExchangeRecord {
                    id: Uuid::now_v7().to_string(),
                    thread_id: thread_id.clone(),
                    connection_id,
                    state: ProofState::RequestSent,
                    proof_request: Some(proof_request),
                    proposal: None,
                    updated_at: Utc::now(),
                };
                self.records.insert(thread_id.clone(), record.clone());
                record
            }
        };

        self.emit(&thread_id, ProofState::RequestSent);
        self.deliver(thread_id, ProofState::RequestReceived);
        Ok(record)
    }

    /// Accept a received proof request by presenting.
    ///
    /// The exchange must be in `request-received`; callers that may be racing
    /// the inbound request wait on the event stream first. Returns the record
    /// in `presentation-sent`; `presentation-received` follows asynchronously.
    pub fn accept_request(&self, thread_id: &str) -> Result<ProofExchangeRecord, AgentError> {
        let record = self.transition(thread_id, ProofState::RequestReceived, ProofState::PresentationSent)?;
        self.deliver(thread_id.to_string(), ProofState::PresentationReceived);
        Ok(record)
    }

    /// Accept a received presentation, completing verification.
    ///
    /// The exchange must be in `presentation-received` and ends in `done`.
    pub fn accept_presentation(&self, thread_id: &str) -> Result<ProofExchangeRecord, AgentError> {
        self.transition(
            thread_id,
            ProofState::PresentationReceived,
            ProofState::Done,
        )
    }

    /// Move an exchange from an expected state to the next one and emit the
    /// event.
    fn transition(
        &self,
        thread_id: &str,
        expected: ProofState,
        to: ProofState,
    ) -> Result<ProofExchangeRecord, AgentError> {
        let mut entry = self
            .records
            .get_mut(thread_id)
            .ok_or_else(|| AgentError::NotFound(format!("proof exchange {}", thread_id)))?;
        if entry.state != expected {
            return Err(AgentError::InvalidTransition {
                thread_id: thread_id.to_string(),
                from: entry.state,
                to,
            });
        }
        entry.state = to;
        entry.updated_at = Utc::now();
        let record = entry.clone();
        drop(entry);
        self.emit(thread_id, to);
        Ok(record)
    }

    /// Deliver the counterpart half of a transition on a background task,
    /// the way a real peer's message would arrive.
    fn deliver(&self, thread_id: String, to: ProofState) {
        let records = Arc::clone(&self.records);
        let events_tx = self.events_tx.clone();
        tokio::spawn(async move {
            if let Some(mut entry) = records.get_mut(&thread_id) {
                entry.state = to;
                entry.updated_at = Utc::now();
            } else {
                tracing::warn!(%thread_id, "exchange vanished before delivery");
                return;
            }
            tracing::debug!(%thread_id, state = %to, "proof state delivered");
            let _ = events_tx.send(ProofStateChangedEvent {
                thread_id,
                state: to,
                timestamp: Utc::now(),
            });
        });
    }

    fn emit(&self, thread_id: &str, state: ProofState) {
        tracing::debug!(%thread_id, %state, "proof state changed");
        // No receivers is fine; the backchannel may not be buffering yet.
        let _ = self.events_tx.send(ProofStateChangedEvent {
            thread_id: thread_id.to_string(),
            state,
            timestamp: Utc::now(),
        });
    }
}
