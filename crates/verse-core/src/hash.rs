//! Deterministic identities for built-in implementations.
//!
//! A [`DefHash`] is computed from the qualified name of a built-in
//! (`"text.length"`, `"measurement.+"`), so the tree node that declares a
//! built-in and the registry entry holding its implementation agree on an
//! identity without sharing any registration order.
//!
//! ```
//! use verse_core::DefHash;
//!
//! let a = DefHash::from_name("text.length");
//! assert_eq!(a, DefHash::from_name("text.length"));
//! assert_ne!(a, DefHash::from_name("list.length"));
//! ```

use std::fmt;
use xxhash_rust::xxh64::xxh64;

/// Domain marker mixed into every built-in hash.
const NATIVE: u64 = 0x5ea77ffbcdf5f302;

/// A deterministic 64-bit identity for a built-in definition.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct DefHash(pub u64);

impl DefHash {
    /// Hash a qualified built-in name.
    #[inline]
    pub fn from_name(name: &str) -> Self {
        DefHash(NATIVE ^ xxh64(name.as_bytes(), 0))
    }

    /// Hash an owner and member name, e.g. `("text", "length")`.
    #[inline]
    pub fn from_member(owner: &str, member: &str) -> Self {
        Self::from_name(&format!("{owner}.{member}"))
    }
}

impl fmt::Debug for DefHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DefHash({:#018x})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_matches_qualified_name() {
        assert_eq!(
            DefHash::from_member("measurement", "+"),
            DefHash::from_name("measurement.+")
        );
    }

    #[test]
    fn owners_are_distinguished() {
        assert_ne!(
            DefHash::from_member("text", "="),
            DefHash::from_member("boolean", "=")
        );
    }
}
