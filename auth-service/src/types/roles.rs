//! Role sets attached to users and embedded in tokens.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Serialize, Serializer};

/// Error returned when a role name is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleError {
    /// The role is empty or whitespace only.
    Empty,
}

impl fmt::Display for RoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "role must not be empty"),
        }
    }
}

impl std::error::Error for RoleError {}

/// An immutable snapshot of a set of role names.
///
/// # Invariants
///
/// - No role is empty or whitespace only.
/// - No duplicates (set semantics); iteration order is sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleSet(BTreeSet<String>);

impl RoleSet {
    /// Create an empty role set.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Build a role set from role names.
    ///
    /// Duplicates collapse; surrounding whitespace is trimmed.
    ///
    /// # Errors
    /// Returns `RoleError::Empty` if any role is blank.
    pub fn try_from_iter<I, S>(roles: I) -> Result<Self, RoleError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = BTreeSet::new();
        for role in roles {
            set.insert(normalize(role.as_ref())?);
        }
        Ok(Self(set))
    }

    /// Return a new set with `role` added.
    ///
    /// # Errors
    /// Returns `RoleError::Empty` if `role` is blank.
    pub fn with(&self, role: &str) -> Result<Self, RoleError> {
        let mut set = self.0.clone();
        set.insert(normalize(role)?);
        Ok(Self(set))
    }

    /// Return a new set with `role` removed. Removing an absent role is a no-op.
    #[must_use]
    pub fn without(&self, role: &str) -> Self {
        let mut set = self.0.clone();
        set.remove(role.trim());
        Self(set)
    }

    #[must_use]
    pub fn contains(&self, role: &str) -> bool {
        self.0.contains(role)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Roles as an owned, sorted vector (the token claim representation).
    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

fn normalize(role: &str) -> Result<String, RoleError> {
    let role = role.trim();
    if role.is_empty() {
        return Err(RoleError::Empty);
    }
    Ok(role.to_string())
}

impl Serialize for RoleSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicates_collapse() {
        let roles = RoleSet::try_from_iter(["user", "admin", "user"]).expect("valid roles");
        assert_eq!(roles.len(), 2);
        assert_eq!(roles.to_vec(), vec!["admin".to_string(), "user".to_string()]);
    }

    #[test]
    fn test_empty_role_rejected() {
        assert_eq!(
            RoleSet::try_from_iter(["user", ""]),
            Err(RoleError::Empty)
        );
        assert_eq!(RoleSet::try_from_iter(["   "]), Err(RoleError::Empty));
    }

    #[test]
    fn test_roles_are_trimmed() {
        let roles = RoleSet::try_from_iter([" user "]).expect("valid roles");
        assert!(roles.contains("user"));
    }

    #[test]
    fn test_with_and_without_return_new_snapshots() {
        let original = RoleSet::try_from_iter(["user"]).expect("valid roles");
        let added = original.with("admin").expect("valid role");
        let removed = added.without("user");

        assert_eq!(original.len(), 1);
        assert_eq!(added.len(), 2);
        assert_eq!(removed.to_vec(), vec!["admin".to_string()]);
    }

    #[test]
    fn test_without_absent_role_is_noop() {
        let roles = RoleSet::try_from_iter(["user"]).expect("valid roles");
        assert_eq!(roles.without("admin"), roles);
    }

    #[test]
    fn test_with_rejects_empty() {
        let roles = RoleSet::new();
        assert_eq!(roles.with(" "), Err(RoleError::Empty));
    }
}
