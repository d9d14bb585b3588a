//! Names and measurement units.

use std::fmt;

/// The set of names a definition answers to.
///
/// A definition may carry several names (for example one per locale). The
/// first name is the preferred one used when rendering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Names(Vec<String>);

impl Names {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    /// A single name.
    pub fn one(name: impl Into<String>) -> Self {
        Self(vec![name.into()])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|n| n == name)
    }

    /// The name used when rendering this definition.
    pub fn preferred(&self) -> &str {
        self.0.first().map(String::as_str).unwrap_or("_")
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A name in this set that differs from `name` only by letter case.
    pub fn case_variant_of(&self, name: &str) -> Option<&str> {
        self.iter()
            .find(|n| *n != name && n.to_lowercase() == name.to_lowercase())
    }
}

impl fmt::Display for Names {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(","))
    }
}

/// The unit of a measurement, such as `m` or `ms`. The empty unit is unitless.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Unit(String);

impl Unit {
    pub fn new(unit: impl Into<String>) -> Self {
        Self(unit.into())
    }

    pub fn unitless() -> Self {
        Self::default()
    }

    pub fn is_unitless(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preferred_is_first() {
        let names = Names::new(["count", "compte"]);
        assert_eq!(names.preferred(), "count");
        assert!(names.contains("compte"));
        assert!(!names.contains("Count"));
    }

    #[test]
    fn case_variant() {
        let names = Names::one("Count");
        assert_eq!(names.case_variant_of("count"), Some("Count"));
        assert_eq!(names.case_variant_of("Count"), None);
        assert_eq!(names.case_variant_of("other"), None);
    }

    #[test]
    fn unitless_default() {
        assert!(Unit::default().is_unitless());
        assert_eq!(Unit::new("m").to_string(), "m");
    }
}
