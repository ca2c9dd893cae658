//! Iterator-type codes for index scans

use serde::{Deserialize, Serialize};

/// Scan mode for an index iterator.
///
/// Row requests carry the mode as a raw integer code; `from_code` is the
/// only way back into the enum, so an unrecognized code is rejected before
/// any iterator is allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IteratorType {
    /// Unrestricted scan over the whole index, ascending.
    All,
    /// Exact match; requires a full key.
    Eq,
    /// Forward range: first key >= the search key.
    Ge,
    /// Forward range: first key > the search key.
    Gt,
    /// Backward range: first key <= the search key.
    Le,
    /// Backward range: first key < the search key.
    Lt,
}

impl IteratorType {
    /// Decode a wire code into a scan mode.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(IteratorType::All),
            1 => Some(IteratorType::Eq),
            2 => Some(IteratorType::Ge),
            3 => Some(IteratorType::Gt),
            4 => Some(IteratorType::Le),
            5 => Some(IteratorType::Lt),
            _ => None,
        }
    }

    /// The wire code for this scan mode.
    pub fn code(self) -> u32 {
        match self {
            IteratorType::All => 0,
            IteratorType::Eq => 1,
            IteratorType::Ge => 2,
            IteratorType::Gt => 3,
            IteratorType::Le => 4,
            IteratorType::Lt => 5,
        }
    }

    /// Whether this mode walks the index in descending key order.
    pub fn is_reverse(self) -> bool {
        matches!(self, IteratorType::Le | IteratorType::Lt)
    }
}
