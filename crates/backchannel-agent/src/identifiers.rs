//! Translation between legacy and fully qualified `did:indy` AnonCreds
//! identifiers.
//!
//! The harness speaks the legacy forms (`<did>:2:<name>:<version>` for
//! schemas, `<did>:3:CL:<seq_no>:<tag>` for credential definitions); the
//! agent's native records are keyed by the qualified forms
//! (`did:indy:<namespace>:<did>/anoncreds/v0/...`). All functions here are
//! pure; translating legacy to qualified and back is the identity.

use crate::error::AgentError;

const DID_INDY_PREFIX: &str = "did:indy:";
const SCHEMA_MARKER: &str = "/anoncreds/v0/SCHEMA/";
const CLAIM_DEF_MARKER: &str = "/anoncreds/v0/CLAIM_DEF/";

/// Components of a schema identifier, either form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaIdParts {
    /// Unqualified DID of the schema issuer.
    pub did: String,
    /// Schema name.
    pub name: String,
    /// Schema version.
    pub version: String,
    /// Namespace, present only when parsed from a qualified id.
    pub namespace: Option<String>,
}

/// Components of a credential-definition identifier, either form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialDefinitionIdParts {
    /// Unqualified DID of the definition issuer.
    pub did: String,
    /// Ledger sequence number of the schema this definition is built on.
    pub schema_seq_no: u64,
    /// Definition tag.
    pub tag: String,
    /// Namespace, present only when parsed from a qualified id.
    pub namespace: Option<String>,
}

/// Legacy schema identifier: `<did>:2:<name>:<version>`.
pub fn legacy_schema_id(did: &str, name: &str, version: &str) -> String {
    format!("{}:2:{}:{}", did, name, version)
}

/// Qualified schema identifier:
/// `did:indy:<namespace>:<did>/anoncreds/v0/SCHEMA/<name>/<version>`.
pub fn did_indy_schema_id(namespace: &str, did: &str, name: &str, version: &str) -> String {
    format!(
        "{}{}:{}{}{}/{}",
        DID_INDY_PREFIX, namespace, did, SCHEMA_MARKER, name, version
    )
}

/// Legacy credential-definition identifier: `<did>:3:CL:<seq_no>:<tag>`.
pub fn legacy_credential_definition_id(did: &str, schema_seq_no: u64, tag: &str) -> String {
    format!("{}:3:CL:{}:{}", did, schema_seq_no, tag)
}

/// Qualified credential-definition identifier:
/// `did:indy:<namespace>:<did>/anoncreds/v0/CLAIM_DEF/<seq_no>/<tag>`.
pub fn did_indy_credential_definition_id(
    namespace: &str,
    did: &str,
    schema_seq_no: u64,
    tag: &str,
) -> String {
    format!(
        "{}{}:{}{}{}/{}",
        DID_INDY_PREFIX, namespace, did, CLAIM_DEF_MARKER, schema_seq_no, tag
    )
}

/// Parse a schema identifier in either legacy or qualified form.
pub fn parse_schema_id(id: &str) -> Result<SchemaIdParts, AgentError> {
    if let Some(rest) = id.strip_prefix(DID_INDY_PREFIX) {
        let (namespace, rest) = rest
            .split_once(':')
            .ok_or_else(|| invalid_schema_id(id))?;
        let (did, rest) = rest
            .split_once(SCHEMA_MARKER)
            .ok_or_else(|| invalid_schema_id(id))?;
        let (name, version) = rest
            .split_once('/')
            .ok_or_else(|| invalid_schema_id(id))?;
        if namespace.is_empty() || did.is_empty() || name.is_empty() || version.is_empty() {
            return Err(invalid_schema_id(id));
        }
        return Ok(SchemaIdParts {
            did: did.to_string(),
            name: name.to_string(),
            version: version.to_string(),
            namespace: Some(namespace.to_string()),
        });
    }

    let parts: Vec<&str> = id.split(':').collect();
    match parts.as_slice() {
        [did, "2", name, version]
            if !did.is_empty() && !name.is_empty() && !version.is_empty() =>
        {
            Ok(SchemaIdParts {
                did: did.to_string(),
                name: name.to_string(),
                version: version.to_string(),
                namespace: None,
            })
        }
        _ => Err(invalid_schema_id(id)),
    }
}

/// Parse a credential-definition identifier in either legacy or qualified form.
pub fn parse_credential_definition_id(
    id: &str,
) -> Result<CredentialDefinitionIdParts, AgentError> {
    if let Some(rest) = id.strip_prefix(DID_INDY_PREFIX) {
        let (namespace, rest) = rest
            .split_once(':')
            .ok_or_else(|| invalid_cred_def_id(id))?;
        let (did, rest) = rest
            .split_once(CLAIM_DEF_MARKER)
            .ok_or_else(|| invalid_cred_def_id(id))?;
        let (seq_no, tag) = rest
            .split_once('/')
            .ok_or_else(|| invalid_cred_def_id(id))?;
        let schema_seq_no: u64 = seq_no.parse().map_err(|_| invalid_cred_def_id(id))?;
        if namespace.is_empty() || did.is_empty() || tag.is_empty() {
            return Err(invalid_cred_def_id(id));
        }
        return Ok(CredentialDefinitionIdParts {
            did: did.to_string(),
            schema_seq_no,
            tag: tag.to_string(),
            namespace: Some(namespace.to_string()),
        });
    }

    let parts: Vec<&str> = id.split(':').collect();
    match parts.as_slice() {
        [did, "3", "CL", seq_no, tag] if !did.is_empty() && !tag.is_empty() => {
            let schema_seq_no: u64 = seq_no.parse().map_err(|_| invalid_cred_def_id(id))?;
            Ok(CredentialDefinitionIdParts {
                did: did.to_string(),
                schema_seq_no,
                tag: tag.to_string(),
                namespace: None,
            })
        }
        _ => Err(invalid_cred_def_id(id)),
    }
}

fn invalid_schema_id(id: &str) -> AgentError {
    AgentError::InvalidIdentifier(format!("not a schema id: {}", id))
}

fn invalid_cred_def_id(id: &str) -> AgentError {
    AgentError::InvalidIdentifier(format!("not a credential definition id: {}", id))
}
