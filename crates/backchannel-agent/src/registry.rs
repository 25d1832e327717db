//! Ledger-emulating registry for AnonCreds schemas and credential
//! definitions.
//!
//! Records are keyed by their fully qualified `did:indy` identifiers, the
//! agent's native form. Sequence numbers stand in for ledger transaction
//! numbers; they are what legacy credential-definition ids are built from.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use backchannel_core::UnqualifiedDid;

use crate::error::AgentError;
use crate::identifiers::{
    did_indy_credential_definition_id, did_indy_schema_id, parse_schema_id,
};

/// An AnonCreds schema as registered on the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnonCredsSchema {
    /// Unqualified DID of the issuer that registered the schema.
    pub issuer_id: String,
    /// Schema name.
    pub name: String,
    /// Schema version.
    pub version: String,
    /// Attribute names the schema defines.
    pub attr_names: Vec<String>,
}

/// An AnonCreds credential definition as registered on the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnonCredsCredentialDefinition {
    /// Unqualified DID of the issuer.
    pub issuer_id: String,
    /// Qualified id of the schema this definition is built on.
    pub schema_id: String,
    /// Signature type; only CL is defined for AnonCreds.
    #[serde(rename = "type")]
    pub cred_def_type: String,
    /// Definition tag.
    pub tag: String,
    /// Opaque public key material.
    pub value: serde_json::Value,
}

/// A registered schema plus its ledger metadata.
#[derive(Debug, Clone)]
pub struct SchemaRecord {
    /// Fully qualified schema id.
    pub schema_id: String,
    /// Ledger sequence number assigned at registration.
    pub seq_no: u64,
    /// The schema itself.
    pub schema: AnonCredsSchema,
}

/// A registered credential definition plus its ledger metadata.
#[derive(Debug, Clone)]
pub struct CredentialDefinitionRecord {
    /// Fully qualified credential-definition id.
    pub credential_definition_id: String,
    /// The definition itself.
    pub credential_definition: AnonCredsCredentialDefinition,
}

/// In-process stand-in for the AnonCreds object registry on a ledger.
pub struct AnonCredsRegistry {
    namespace: String,
    schemas: DashMap<String, SchemaRecord>,
    cred_defs: DashMap<String, CredentialDefinitionRecord>,
    next_seq_no: AtomicU64,
}

impl AnonCredsRegistry {
    /// Create an empty registry for the given did:indy namespace.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            schemas: DashMap::new(),
            cred_defs: DashMap::new(),
            next_seq_no: AtomicU64::new(1),
        }
    }

    /// The did:indy namespace this registry serves.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Register a schema, assigning it a ledger sequence number.
    ///
    /// Re-registering an identical (issuer, name, version) triple returns the
    /// existing record instead of writing a duplicate.
    pub fn register_schema(
        &self,
        issuer: &UnqualifiedDid,
        name: &str,
        version: &str,
        attr_names: Vec<String>,
    ) -> Result<SchemaRecord, AgentError> {
        if name.is_empty() || version.is_empty() {
            return Err(AgentError::RegistrationFailed(
                "schema name and version must be non-empty".into(),
            ));
        }
        if attr_names.is_empty() {
            return Err(AgentError::RegistrationFailed(
                "schema must have at least one attribute".into(),
            ));
        }

        let schema_id = did_indy_schema_id(&self.namespace, issuer.as_str(), name, version);
        if let Some(existing) = self.schemas.get(&schema_id) {
            return Ok(existing.clone());
        }

        let seq_no = self.next_seq_no.fetch_add(1, Ordering::Relaxed);
        let record = SchemaRecord {
            schema_id: schema_id.clone(),
            seq_no,
            schema: AnonCredsSchema {
                issuer_id: issuer.as_str().to_string(),
                name: name.to_string(),
                version: version.to_string(),
                attr_names,
            },
        };
        self.schemas.insert(schema_id.clone(), record.clone());
        tracing::info!(%schema_id, seq_no, "schema registered");
        Ok(record)
    }

    /// Look up a schema by its qualified id.
    pub fn get_schema(&self, schema_id: &str) -> Option<SchemaRecord> {
        self.schemas.get(schema_id).map(|e| e.clone())
    }

    /// Find a schema by name and version, the query the idempotent
    /// create-schema command runs before registering.
    pub fn find_schema(&self, name: &str, version: &str) -> Option<SchemaRecord> {
        self.schemas
            .iter()
            .find(|e| e.schema.name == name && e.schema.version == version)
            .map(|e| e.clone())
    }

    /// Register a credential definition over an already-registered schema.
    ///
    /// Re-registering the same (schema, tag) pair returns the existing record.
    pub fn register_credential_definition(
        &self,
        issuer: &UnqualifiedDid,
        schema: &SchemaRecord,
        tag: &str,
        support_revocation: bool,
    ) -> Result<CredentialDefinitionRecord, AgentError> {
        if tag.is_empty() {
            return Err(AgentError::RegistrationFailed(
                "credential definition tag must be non-empty".into(),
            ));
        }

        let cred_def_id = did_indy_credential_definition_id(
            &self.namespace,
            issuer.as_str(),
            schema.seq_no,
            tag,
        );
        if let Some(existing) = self.cred_defs.get(&cred_def_id) {
            return Ok(existing.clone());
        }

        let record = CredentialDefinitionRecord {
            credential_definition_id: cred_def_id.clone(),
            credential_definition: AnonCredsCredentialDefinition {
                issuer_id: issuer.as_str().to_string(),
                schema_id: schema.schema_id.clone(),
                cred_def_type: "CL".into(),
                tag: tag.to_string(),
                value: placeholder_key_material(support_revocation),
            },
        };
        self.cred_defs.insert(cred_def_id.clone(), record.clone());
        tracing::info!(%cred_def_id, support_revocation, "credential definition registered");
        Ok(record)
    }

    /// Look up a credential definition by its qualified id.
    pub fn get_credential_definition(
        &self,
        cred_def_id: &str,
    ) -> Option<CredentialDefinitionRecord> {
        self.cred_defs.get(cred_def_id).map(|e| e.clone())
    }

    /// Find a credential definition by schema id (either form) and tag, the
    /// query the idempotent create command runs before registering.
    pub fn find_credential_definition(
        &self,
        schema_id: &str,
        tag: &str,
    ) -> Option<CredentialDefinitionRecord> {
        let wanted = parse_schema_id(schema_id).ok()?;
        self.cred_defs
            .iter()
            .find(|e| {
                if e.credential_definition.tag != tag {
                    return false;
                }
                match parse_schema_id(&e.credential_definition.schema_id) {
                    Ok(parts) => {
                        parts.did == wanted.did
                            && parts.name == wanted.name
                            && parts.version == wanted.version
                    }
                    Err(_) => false,
                }
            })
            .map(|e| e.clone())
    }

    /// Number of registered schemas.
    pub fn schema_count(&self) -> usize {
        self.schemas.len()
    }

    /// Number of registered credential definitions.
    pub fn credential_definition_count(&self) -> usize {
        self.cred_defs.len()
    }
}

/// Generate opaque stand-in key material for a credential definition.
///
/// The real CL keys come out of the AnonCreds issuer cryptography, which the
/// embedded test agent does not carry.
fn placeholder_key_material(support_revocation: bool) -> serde_json::Value {
    let mut rng = rand::thread_rng();
    let mut random_component = |len: usize| {
        let mut bytes = vec![0u8; len];
        rng.fill_bytes(&mut bytes);
        hex::encode(bytes)
    };

    let mut value = serde_json::json!({
        "primary": {
            "n": random_component(32),
            "s": random_component(32),
            "z": random_component(32),
        }
    });
    if support_revocation {
        value["revocation"] = serde_json::json!({
            "g": random_component(32),
            "h": random_component(32),
        });
    }
    value
}
