//! HTTP surface of the backchannel: the `/agent/command/*` routes the test
//! harness drives.
//!
//! Handlers reshape bodies between the harness's legacy wire format and the
//! agent's native records: identifiers go out in legacy form, lookups accept
//! either form, and POST bodies arrive wrapped in the harness envelope
//! `{ "id": <optional thread id>, "data": { ... } }`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use backchannel_agent::identifiers::{
    did_indy_credential_definition_id, did_indy_schema_id, legacy_credential_definition_id,
    legacy_schema_id, parse_credential_definition_id, parse_schema_id,
};
use backchannel_agent::proofs::PresentationProposal;
use backchannel_agent::{
    AgentError, AnonCredsCredentialDefinition, AnonCredsSchema, ProofExchangeRecord, ProofRequest,
};
use backchannel_core::ProofState;

use crate::bridge::BridgeError;
use crate::state::BackchannelState;

// --- Harness envelope ---

/// The harness wraps every command body as `{ "id": ..., "data": ... }`.
#[derive(Debug, Deserialize)]
pub struct CommandRequest<T> {
    /// Thread id the command applies to, where relevant.
    #[serde(default)]
    pub id: Option<String>,
    pub data: T,
}

// --- Request types ---

#[derive(Debug, Deserialize)]
pub struct CreateSchemaRequest {
    pub schema_name: String,
    pub schema_version: String,
    pub attributes: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCredentialDefinitionRequest {
    pub tag: String,
    #[serde(default)]
    pub support_revocation: bool,
    pub schema_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SendProposalRequest {
    #[serde(default)]
    pub connection_id: Option<String>,
    pub presentation_proposal: PresentationProposal,
}

#[derive(Debug, Deserialize)]
pub struct SendRequestRequest {
    #[serde(default)]
    pub connection_id: Option<String>,
    pub presentation_request: PresentationRequest,
}

#[derive(Debug, Deserialize)]
pub struct PresentationRequest {
    #[serde(default)]
    pub comment: Option<String>,
    pub proof_request: ProofRequestWrapper,
}

#[derive(Debug, Deserialize)]
pub struct ProofRequestWrapper {
    pub data: ProofRequest,
}

/// Credential selection the prover would apply. The embedded agent presents
/// whatever was requested, so this is accepted for wire compatibility only.
#[derive(Debug, Default, Deserialize)]
pub struct SendPresentationRequest {
    #[serde(default)]
    pub self_attested_attributes: HashMap<String, String>,
    #[serde(default)]
    pub requested_attributes: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub requested_predicates: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub comment: Option<String>,
}

// --- Response types ---

#[derive(Serialize)]
pub struct StatusResponse {
    pub status: String,
    pub uptime_secs: u64,
}

/// A schema as the harness expects it: the record plus its id in the form
/// the caller used.
#[derive(Serialize)]
pub struct ReturnedSchema {
    #[serde(flatten)]
    pub schema: AnonCredsSchema,
    pub id: String,
}

#[derive(Serialize)]
pub struct CreateSchemaResponse {
    pub schema_id: String,
    pub schema: ReturnedSchema,
}

/// A credential definition in harness form: legacy inner schema id, legacy id.
#[derive(Serialize)]
pub struct ReturnedCredentialDefinition {
    #[serde(flatten)]
    pub credential_definition: AnonCredsCredentialDefinition,
    pub id: String,
}

#[derive(Serialize)]
pub struct CreateCredentialDefinitionResponse {
    pub credential_definition_id: String,
    pub credential_definition: ReturnedCredentialDefinition,
}

#[derive(Serialize)]
pub struct ProofExchangeResponse {
    pub state: ProofState,
    pub thread_id: String,
}

impl From<ProofExchangeRecord> for ProofExchangeResponse {
    fn from(record: ProofExchangeRecord) -> Self {
        Self {
            state: record.state,
            thread_id: record.thread_id,
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn not_found(message: impl Into<String>) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn internal_error(context: &str, error: impl std::fmt::Display) -> ApiError {
    tracing::error!(%error, "{}", context);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: format!("{}: {}", context, error),
        }),
    )
}

/// Map agent failures onto harness response codes: absent ledger objects are
/// an expected outcome (404), everything else is a wrapped server error.
fn map_agent_error(context: &str, error: AgentError) -> ApiError {
    match error {
        AgentError::NotFound(what) => not_found(format!("{} not found", what)),
        other => internal_error(context, other),
    }
}

fn map_bridge_error(error: BridgeError) -> ApiError {
    internal_error("error while waiting for proof state", error)
}

fn missing_thread_id() -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: "command requires a thread id".into(),
        }),
    )
}

// --- Handlers ---

async fn handle_status(State(state): State<Arc<BackchannelState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "active".into(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

async fn handle_get_schema(
    State(state): State<Arc<BackchannelState>>,
    Path(schema_id): Path<String>,
) -> Result<Json<ReturnedSchema>, ApiError> {
    let registry = state.agent.registry();

    // Accept legacy ids from the harness; the registry is keyed by the
    // qualified form.
    let parts = parse_schema_id(&schema_id)
        .map_err(|e| internal_error("error while retrieving schema", e))?;
    let namespace = parts.namespace.as_deref().unwrap_or(registry.namespace());
    let qualified = did_indy_schema_id(namespace, &parts.did, &parts.name, &parts.version);

    let record = registry
        .get_schema(&qualified)
        .ok_or_else(|| not_found(format!("schema with schemaId \"{}\" not found", schema_id)))?;

    Ok(Json(ReturnedSchema {
        schema: record.schema,
        id: schema_id,
    }))
}

async fn handle_create_schema(
    State(state): State<Arc<BackchannelState>>,
    Json(command): Json<CommandRequest<CreateSchemaRequest>>,
) -> Result<Json<CreateSchemaResponse>, ApiError> {
    let data = command.data;
    let registry = state.agent.registry();

    // Idempotent by (name, version): return the existing record when the
    // harness re-registers a schema.
    if let Some(existing) = registry.find_schema(&data.schema_name, &data.schema_version) {
        return Ok(Json(schema_response(existing)?));
    }

    let issuer = state
        .agent
        .public_did()
        .map_err(|e| internal_error("error registering schema", e))?;
    let record = registry
        .register_schema(
            issuer,
            &data.schema_name,
            &data.schema_version,
            data.attributes,
        )
        .map_err(|e| map_agent_error("error registering schema", e))?;

    Ok(Json(schema_response(record)?))
}

fn schema_response(
    record: backchannel_agent::registry::SchemaRecord,
) -> Result<CreateSchemaResponse, ApiError> {
    let parts = parse_schema_id(&record.schema_id)
        .map_err(|e| internal_error("error mapping schema id", e))?;
    let legacy = legacy_schema_id(&parts.did, &parts.name, &parts.version);
    Ok(CreateSchemaResponse {
        schema_id: legacy.clone(),
        schema: ReturnedSchema {
            schema: record.schema,
            id: legacy,
        },
    })
}

async fn handle_get_credential_definition(
    State(state): State<Arc<BackchannelState>>,
    Path(credential_definition_id): Path<String>,
) -> Result<Json<ReturnedCredentialDefinition>, ApiError> {
    let registry = state.agent.registry();

    let parts = parse_credential_definition_id(&credential_definition_id)
        .map_err(|e| internal_error("error while retrieving credential definition", e))?;
    let namespace = parts.namespace.as_deref().unwrap_or(registry.namespace());
    let qualified =
        did_indy_credential_definition_id(namespace, &parts.did, parts.schema_seq_no, &parts.tag);

    let record = registry.get_credential_definition(&qualified).ok_or_else(|| {
        not_found(format!(
            "credential definition with credentialDefinitionId \"{}\" not found",
            credential_definition_id
        ))
    })?;

    let mut credential_definition = record.credential_definition;
    let schema_parts = parse_schema_id(&credential_definition.schema_id)
        .map_err(|e| internal_error("error mapping schema id", e))?;
    credential_definition.schema_id = legacy_schema_id(
        &schema_parts.did,
        &schema_parts.name,
        &schema_parts.version,
    );

    Ok(Json(ReturnedCredentialDefinition {
        credential_definition,
        id: credential_definition_id,
    }))
}

async fn handle_create_credential_definition(
    State(state): State<Arc<BackchannelState>>,
    Json(command): Json<CommandRequest<CreateCredentialDefinitionRequest>>,
) -> Result<Json<CreateCredentialDefinitionResponse>, ApiError> {
    let data = command.data;
    let registry = state.agent.registry();

    // Idempotent by (schema, tag).
    if let Some(existing) = registry.find_credential_definition(&data.schema_id, &data.tag) {
        return Ok(Json(credential_definition_response(existing)?));
    }

    let schema_parts = parse_schema_id(&data.schema_id)
        .map_err(|e| internal_error("error registering credential definition", e))?;
    let namespace = schema_parts
        .namespace
        .as_deref()
        .unwrap_or(registry.namespace());
    let qualified_schema_id = did_indy_schema_id(
        namespace,
        &schema_parts.did,
        &schema_parts.name,
        &schema_parts.version,
    );
    let schema = registry.get_schema(&qualified_schema_id).ok_or_else(|| {
        not_found(format!(
            "schema with schemaId \"{}\" not found",
            data.schema_id
        ))
    })?;

    let issuer = state
        .agent
        .public_did()
        .map_err(|e| internal_error("error registering credential definition", e))?;
    let record = registry
        .register_credential_definition(issuer, &schema, &data.tag, data.support_revocation)
        .map_err(|e| map_agent_error("error registering credential definition", e))?;

    Ok(Json(credential_definition_response(record)?))
}

fn credential_definition_response(
    record: backchannel_agent::registry::CredentialDefinitionRecord,
) -> Result<CreateCredentialDefinitionResponse, ApiError> {
    let parts = parse_credential_definition_id(&record.credential_definition_id)
        .map_err(|e| internal_error("error mapping credential definition id", e))?;
    let legacy = legacy_credential_definition_id(&parts.did, parts.schema_seq_no, &parts.tag);

    let mut credential_definition = record.credential_definition;
    let schema_parts = parse_schema_id(&credential_definition.schema_id)
        .map_err(|e| internal_error("error mapping schema id", e))?;
    credential_definition.schema_id = legacy_schema_id(
        &schema_parts.did,
        &schema_parts.name,
        &schema_parts.version,
    );

    Ok(CreateCredentialDefinitionResponse {
        credential_definition_id: legacy.clone(),
        credential_definition: ReturnedCredentialDefinition {
            credential_definition,
            id: legacy,
        },
    })
}

async fn handle_get_proof(
    State(state): State<Arc<BackchannelState>>,
    Path(thread_id): Path<String>,
) -> Result<Json<ProofExchangeResponse>, ApiError> {
    let record = state
        .agent
        .proofs()
        .get_by_thread_id(&thread_id)
        .ok_or_else(|| {
            not_found(format!(
                "proof record for thread id \"{}\" not found",
                thread_id
            ))
        })?;
    Ok(Json(record.into()))
}

async fn handle_get_all_proofs(
    State(state): State<Arc<BackchannelState>>,
) -> Json<Vec<ProofExchangeResponse>> {
    let proofs = state
        .agent
        .proofs()
        .all()
        .into_iter()
        .map(Into::into)
        .collect();
    Json(proofs)
}

async fn handle_send_proposal(
    State(state): State<Arc<BackchannelState>>,
    Json(command): Json<CommandRequest<SendProposalRequest>>,
) -> Result<Json<ProofExchangeResponse>, ApiError> {
    let data = command.data;
    let record = state
        .agent
        .proofs()
        .propose(data.connection_id, data.presentation_proposal)
        .map_err(|e| map_agent_error("error sending proof proposal", e))?;
    Ok(Json(record.into()))
}

async fn handle_send_request(
    State(state): State<Arc<BackchannelState>>,
    Json(command): Json<CommandRequest<SendRequestRequest>>,
) -> Result<Json<ProofExchangeResponse>, ApiError> {
    let data = command.data;
    tracing::info!(
        name = %data.presentation_request.proof_request.data.name,
        comment = data.presentation_request.comment.as_deref().unwrap_or_default(),
        "sending proof request"
    );
    let record = state
        .agent
        .proofs()
        .request(
            command.id,
            data.connection_id,
            data.presentation_request.proof_request.data,
        )
        .map_err(|e| map_agent_error("error sending proof request", e))?;
    Ok(Json(record.into()))
}

async fn handle_send_presentation(
    State(state): State<Arc<BackchannelState>>,
    Json(command): Json<CommandRequest<SendPresentationRequest>>,
) -> Result<Json<ProofExchangeResponse>, ApiError> {
    let thread_id = command.id.ok_or_else(missing_thread_id)?;
    let data = command.data;
    tracing::info!(
        %thread_id,
        requested_attributes = data.requested_attributes.len(),
        requested_predicates = data.requested_predicates.len(),
        self_attested = data.self_attested_attributes.len(),
        comment = data.comment.as_deref().unwrap_or_default(),
        "sending presentation"
    );

    // The inbound request may still be in flight; wait for it instead of
    // racing the agent's event loop.
    state
        .bridge
        .wait_for(&thread_id, ProofState::RequestReceived, state.wait_timeout)
        .await
        .map_err(map_bridge_error)?;

    let record = state
        .agent
        .proofs()
        .accept_request(&thread_id)
        .map_err(|e| map_agent_error("error sending presentation", e))?;
    Ok(Json(record.into()))
}

async fn handle_verify_presentation(
    State(state): State<Arc<BackchannelState>>,
    Json(command): Json<CommandRequest<serde_json::Value>>,
) -> Result<Json<ProofExchangeResponse>, ApiError> {
    let thread_id = command.id.ok_or_else(missing_thread_id)?;

    state
        .bridge
        .wait_for(
            &thread_id,
            ProofState::PresentationReceived,
            state.wait_timeout,
        )
        .await
        .map_err(map_bridge_error)?;

    let record = state
        .agent
        .proofs()
        .accept_presentation(&thread_id)
        .map_err(|e| map_agent_error("error verifying presentation", e))?;
    Ok(Json(record.into()))
}

// --- Server ---

pub fn build_router(state: Arc<BackchannelState>) -> Router {
    Router::new()
        .route("/agent/command/status", get(handle_status))
        .route("/agent/command/schema", post(handle_create_schema))
        .route("/agent/command/schema/{schemaId}", get(handle_get_schema))
        .route(
            "/agent/command/credential-definition",
            post(handle_create_credential_definition),
        )
        .route(
            "/agent/command/credential-definition/{credentialDefinitionId}",
            get(handle_get_credential_definition),
        )
        .route("/agent/command/proof", get(handle_get_all_proofs))
        .route("/agent/command/proof/{threadId}", get(handle_get_proof))
        .route(
            "/agent/command/proof/send-proposal",
            post(handle_send_proposal),
        )
        .route(
            "/agent/command/proof/send-request",
            post(handle_send_request),
        )
        .route(
            "/agent/command/proof/send-presentation",
            post(handle_send_presentation),
        )
        .route(
            "/agent/command/proof/verify-presentation",
            post(handle_verify_presentation),
        )
        .with_state(state)
}

pub async fn start_api_server(
    listen_addr: SocketAddr,
    state: Arc<BackchannelState>,
) -> anyhow::Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!(%listen_addr, "backchannel HTTP server started");
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_envelope_with_id() {
        let json = r#"{"id": "thread-1", "data": {"schema_name": "s", "schema_version": "1.0", "attributes": ["a"]}}"#;
        let command: CommandRequest<CreateSchemaRequest> = serde_json::from_str(json).unwrap();
        assert_eq!(command.id.as_deref(), Some("thread-1"));
        assert_eq!(command.data.schema_name, "s");
    }

    #[test]
    fn test_command_envelope_without_id() {
        let json = r#"{"data": {"tag": "default", "schema_id": "V4SGRU86Z58d6TV7PBUe6f:2:degree:1.0"}}"#;
        let command: CommandRequest<CreateCredentialDefinitionRequest> =
            serde_json::from_str(json).unwrap();
        assert!(command.id.is_none());
        assert!(!command.data.support_revocation);
    }

    #[test]
    fn test_send_request_body_shape() {
        let json = r#"{
            "id": "thread-9",
            "data": {
                "connection_id": "conn-1",
                "presentation_request": {
                    "comment": "please prove",
                    "proof_request": {
                        "data": {
                            "name": "over-18",
                            "requested_attributes": {"attr_1": {"name": "age"}}
                        }
                    }
                }
            }
        }"#;
        let command: CommandRequest<SendRequestRequest> = serde_json::from_str(json).unwrap();
        let request = command.data.presentation_request.proof_request.data;
        assert_eq!(request.name, "over-18");
        assert_eq!(request.version, "1.0");
        assert!(request.requested_attributes.contains_key("attr_1"));
    }
}
