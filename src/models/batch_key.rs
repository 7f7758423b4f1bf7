use serde::{Deserialize, Serialize};
use std::fmt;

/// Key of one entry in a parallel batch.
///
/// Batches may be keyed positionally or by name; results and errors come
/// back under the exact key the caller supplied.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchKey {
    Index(usize),
    Name(String),
}

impl From<usize> for BatchKey {
    fn from(index: usize) -> Self {
        BatchKey::Index(index)
    }
}

impl From<&str> for BatchKey {
    fn from(name: &str) -> Self {
        BatchKey::Name(name.to_string())
    }
}

impl From<String> for BatchKey {
    fn from(name: String) -> Self {
        BatchKey::Name(name)
    }
}

impl From<&BatchKey> for BatchKey {
    fn from(key: &BatchKey) -> Self {
        key.clone()
    }
}

impl fmt::Display for BatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchKey::Index(i) => write!(f, "{}", i),
            BatchKey::Name(n) => write!(f, "{}", n),
        }
    }
}
