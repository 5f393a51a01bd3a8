use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identity of one physical marker across frames.
///
/// Two simultaneously visible copies of the same printed marker share
/// `(dictionary, id)` and differ only in `nonce`. The derived ordering
/// (dictionary, id, nonce) makes register iteration deterministic.
#[derive(
    Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
pub struct Uid {
    pub dictionary: i32,
    pub id: i32,
    pub nonce: u32,
}

impl Uid {
    pub fn new(dictionary: i32, id: i32, nonce: u32) -> Self {
        Self {
            dictionary,
            id,
            nonce,
        }
    }

    /// Whether this UID belongs to the `(dictionary, id)` class.
    pub fn is_class(&self, dictionary: i32, id: i32) -> bool {
        self.dictionary == dictionary && self.id == id
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dict{}id{}#{}", self.dictionary, self.id, self.nonce)
    }
}
