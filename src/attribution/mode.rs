// Aggregation modes and their grouping keys

use crate::cct::Address;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a marker's cost is grouped by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributionMode {
    /// Enclosing function of the marker
    Function,
    /// Enclosing loop of the marker
    Loop,
    /// (caller, callee) function pair
    Callpair,
    /// (call site of the enclosing function, enclosing function)
    Callsite,
    /// Call site of the marker itself
    Address,
}

impl AttributionMode {
    /// Modes that report cost they could not attribute
    pub fn tracks_unaccounted(self) -> bool {
        matches!(
            self,
            AttributionMode::Callpair | AttributionMode::Callsite | AttributionMode::Address
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            AttributionMode::Function => "function",
            AttributionMode::Loop => "loop",
            AttributionMode::Callpair => "callpair",
            AttributionMode::Callsite => "callsite",
            AttributionMode::Address => "address",
        }
    }
}

impl fmt::Display for AttributionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identity a marker's cost is summed under
///
/// Ordering is the natural ordering of the carried addresses and is used to
/// break ties between equal sums.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupKey {
    Function(Address),
    Loop(Address),
    CallPair { caller: Address, callee: Address },
    CallSite { site: Address, callee: Address },
    Address(Address),
}

impl GroupKey {
    /// Addresses of the key in report order
    pub fn addresses(&self) -> Vec<&Address> {
        match self {
            GroupKey::Function(address) | GroupKey::Loop(address) | GroupKey::Address(address) => {
                vec![address]
            }
            GroupKey::CallPair { caller, callee } => vec![caller, callee],
            GroupKey::CallSite { site, callee } => vec![site, callee],
        }
    }
}
