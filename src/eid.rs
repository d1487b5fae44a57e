use serde::{Deserialize, Serialize};
use std::{fmt::Display, ops::Deref};

/// Sortable unique identifier for stored entities and history entries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(transparent)]
pub struct Eid(String);

impl Display for Eid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Deref for Eid {
    type Target = String;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Eid> for String {
    fn from(fr: Eid) -> Self {
        fr.0
    }
}

impl Eid {
    #[inline]
    pub fn new() -> Eid {
        Eid(rusty_ulid::generate_ulid_string())
    }
}

impl Default for Eid {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique() {
        assert_ne!(Eid::new(), Eid::new());
    }

    #[test]
    fn test_ulid_shape() {
        let eid = Eid::new();
        assert_eq!(eid.len(), 26);
        assert_eq!(String::from(eid.clone()), eid.to_string());
    }
}
