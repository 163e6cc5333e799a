use core::fmt::Debug;
use std::fmt::Display;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::{LiricalError, LiricalResult};

/// The ID of an HPO term (e.g. `HP:0001265`)
///
/// Term ids are interned into a `u32` so that identifier comparison,
/// hashing and set membership work on plain integers.
///
/// # Examples
///
/// ```
/// use lirical::TermId;
///
/// let id = TermId::try_from("HP:0001265").unwrap();
/// assert_eq!(id, TermId::from_u32(1265));
/// assert_eq!(id.to_string(), "HP:0001265");
/// ```
#[derive(Copy, Clone, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct TermId {
    inner: u32,
}

impl TermId {
    /// Creates a new `TermId` from the numerical part of an HPO term id
    pub const fn from_u32(inner: u32) -> Self {
        TermId { inner }
    }

    /// Returns the numerical part of the term id
    pub const fn as_u32(self) -> u32 {
        self.inner
    }
}

impl TryFrom<&str> for TermId {
    type Error = LiricalError;

    fn try_from(s: &str) -> LiricalResult<Self> {
        if s.len() < 4 || !s.starts_with("HP:") {
            return Err(LiricalError::InvalidTermId(s.to_string()));
        }
        s[3..]
            .parse::<u32>()
            .map(|inner| TermId { inner })
            .map_err(|_| LiricalError::InvalidTermId(s.to_string()))
    }
}

impl From<u32> for TermId {
    fn from(inner: u32) -> Self {
        TermId { inner }
    }
}

impl Debug for TermId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TermId({self})")
    }
}

impl Display for TermId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HP:{:07}", self.inner)
    }
}

impl PartialEq<&str> for TermId {
    fn eq(&self, other: &&str) -> bool {
        TermId::try_from(*other).is_ok_and(|other| *self == other)
    }
}

impl Serialize for TermId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TermId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        TermId::try_from(s.as_str()).map_err(de::Error::custom)
    }
}
