use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// The did:indy namespace assumed when an identifier carries none.
///
/// Matches the namespace the test harness registers its ledger objects under.
pub const DEFAULT_NAMESPACE: &str = "main-pool";

/// An unqualified (legacy) Indy DID: a base58 string of 21 or 22 characters,
/// e.g. `V4SGRU86Z58d6TV7PBUe6f`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnqualifiedDid(String);

impl UnqualifiedDid {
    /// Validate and wrap an unqualified DID string.
    pub fn new(did: impl Into<String>) -> Result<Self, CoreError> {
        let did = did.into();
        if did.is_empty() || did.contains(':') || did.contains('/') {
            return Err(CoreError::InvalidDid(format!(
                "not an unqualified DID: {}",
                did
            )));
        }
        Ok(Self(did))
    }

    /// The raw base58 identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnqualifiedDid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unqualified_did_valid() {
        let did = UnqualifiedDid::new("V4SGRU86Z58d6TV7PBUe6f").unwrap();
        assert_eq!(did.as_str(), "V4SGRU86Z58d6TV7PBUe6f");
    }

    #[test]
    fn test_unqualified_did_rejects_qualified() {
        assert!(UnqualifiedDid::new("did:indy:main-pool:V4SGRU86Z58d6TV7PBUe6f").is_err());
        assert!(UnqualifiedDid::new("").is_err());
    }
}
