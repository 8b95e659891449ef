//! Type-safe identifiers.
//!
//! Newtype wrappers keep connection ids and hook correlation keys from
//! being confused with the raw strings that travel on the wire.
//!
//! | Type | Format | Purpose |
//! |------|--------|---------|
//! | [`ConnectionId`] | UUID v4 | One live browser socket |
//! | [`HookKey`] | `(cid, id)`, shown as `"{cid}-{id}"` | One in-flight hook execution |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use uuid::Uuid;

// ============================================================================
// ConnectionId
// ============================================================================

/// Identifier of one accepted browser connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Generates a fresh random connection id.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[inline]
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// HookKey
// ============================================================================

/// Composite key of a pending hook: the session cid plus the per-session
/// hook call id.
///
/// Both parts are kept separately, so `("0-0", "1")` and `("0", "0-1")` are
/// distinct keys even though they display the same.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HookKey {
    cid: String,
    id: String,
}

impl HookKey {
    /// Builds the key for `(cid, id)`.
    #[inline]
    #[must_use]
    pub fn new(cid: &str, id: &str) -> Self {
        Self {
            cid: cid.to_string(),
            id: id.to_string(),
        }
    }

    /// Session cid.
    #[inline]
    #[must_use]
    pub fn cid(&self) -> &str {
        &self.cid
    }

    /// Hook call id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for HookKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.cid, self.id)
    }
}

// ============================================================================
// Cid helpers
// ============================================================================

/// Returns the cid if it has a usable shape (non-blank).
#[inline]
#[must_use]
pub fn valid_cid(cid: Option<&str>) -> Option<&str> {
    cid.filter(|c| !c.trim().is_empty())
}

/// Deserializes an optional cid, mapping non-string values to `None`.
///
/// A command request with a numeric or missing cid must still decode so the
/// caller can be answered with its request id.
pub(crate) fn lenient_cid<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(cid)) => Some(cid),
        _ => None,
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;
    use rustc_hash::FxHashSet;

    #[test]
    fn test_hook_key_format() {
        let key = HookKey::new("0-0", "1");
        assert_eq!(key.cid(), "0-0");
        assert_eq!(key.id(), "1");
        assert_eq!(key.to_string(), "0-0-1");
    }

    #[test]
    fn test_hook_keys_with_same_display_differ() {
        let a = HookKey::new("0-0", "1");
        let b = HookKey::new("0", "0-1");

        assert_eq!(a.to_string(), b.to_string());
        assert_ne!(a, b);

        let keys: FxHashSet<_> = [a, b].into_iter().collect();
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn test_connection_ids_are_unique() {
        let ids: FxHashSet<_> = (0..64).map(|_| ConnectionId::generate()).collect();
        assert_eq!(ids.len(), 64);
    }

    #[test]
    fn test_valid_cid() {
        assert_eq!(valid_cid(Some("0-0")), Some("0-0"));
        assert_eq!(valid_cid(Some("  ")), None);
        assert_eq!(valid_cid(None), None);
    }

    proptest! {
        #[test]
        fn hook_key_is_deterministic(cid in "[0-9]{1,3}-[0-9]{1,3}", id in "[a-z0-9]{1,8}") {
            prop_assert_eq!(HookKey::new(&cid, &id), HookKey::new(&cid, &id));
            let key = HookKey::new(&cid, &id);
            prop_assert_eq!(key.cid(), cid.as_str());
            prop_assert_eq!(key.id(), id.as_str());
        }
    }
}
