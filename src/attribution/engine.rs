// Bottom-up attribution of marker cost for one database

use super::mode::{AttributionMode, GroupKey};
use crate::cct::{Address, MetricId, NodeRef};
use crate::ingest::ProfileDatabase;
use crate::search::{
    descendant_metric, enclosing_call_site, enclosing_loop, enclosing_procedure,
    StructuralViolation,
};
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;

/// Frame name the binary rewriter gives its instrumentation calls
pub const DEFAULT_MARKER_FRAME: &str = "dyninst_instrumentation_op";

/// One ranked report row
#[derive(Debug, Clone, PartialEq)]
pub struct RankedEntry {
    pub key: GroupKey,
    pub value: f64,
}

/// Summed marker cost per grouping key
#[derive(Debug, Clone)]
pub struct Attribution {
    pub mode: AttributionMode,
    totals: HashMap<GroupKey, f64>,
    /// Cost of markers skipped because a caller or call site was unknown
    pub unaccounted: f64,
    /// Marker nodes visited
    pub markers: usize,
    /// Marker nodes that did not contribute to any group
    pub skipped: usize,
    /// Display labels by address: procedure names and loop labels
    labels: HashMap<Address, String>,
    /// Databases folded into this attribution
    pub databases: usize,
}

impl Attribution {
    pub fn new(mode: AttributionMode) -> Self {
        Self {
            mode,
            totals: HashMap::new(),
            unaccounted: 0.0,
            markers: 0,
            skipped: 0,
            labels: HashMap::new(),
            databases: 0,
        }
    }

    /// Add `value` to the running sum of `key`
    pub fn add(&mut self, key: GroupKey, value: f64) {
        *self.totals.entry(key).or_insert(0.0) += value;
    }

    /// Current sum for `key`
    pub fn total(&self, key: &GroupKey) -> Option<f64> {
        self.totals.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    /// Sum of every grouped value
    pub fn grand_total(&self) -> f64 {
        self.totals.values().sum()
    }

    /// Record a label unless the address already has one
    pub fn label(&mut self, address: Address, label: impl Into<String>) {
        if !address.is_unknown() {
            self.labels.entry(address).or_insert_with(|| label.into());
        }
    }

    pub fn label_of(&self, address: &Address) -> Option<&str> {
        self.labels.get(address).map(String::as_str)
    }

    /// Fold another attribution of the same mode into this one
    pub fn merge(&mut self, other: Attribution) {
        debug_assert_eq!(self.mode, other.mode);
        // Sorted so float sums do not depend on hash order
        let mut totals: Vec<_> = other.totals.into_iter().collect();
        totals.sort_by(|a, b| a.0.cmp(&b.0));
        for (key, value) in totals {
            self.add(key, value);
        }
        self.unaccounted += other.unaccounted;
        self.markers += other.markers;
        self.skipped += other.skipped;
        self.databases += other.databases;
        for (address, label) in other.labels {
            self.labels.entry(address).or_insert(label);
        }
    }

    /// Entries by descending value, ties by descending key, truncated to `top_k`
    pub fn ranked(&self, top_k: Option<usize>) -> Vec<RankedEntry> {
        let mut entries: Vec<RankedEntry> = self
            .totals
            .iter()
            .map(|(key, &value)| RankedEntry {
                key: key.clone(),
                value,
            })
            .collect();
        entries.sort_by(|a, b| rank_order(b, a));
        if let Some(k) = top_k {
            entries.truncate(k);
        }
        entries
    }
}

fn rank_order(a: &RankedEntry, b: &RankedEntry) -> Ordering {
    a.value
        .total_cmp(&b.value)
        .then_with(|| a.key.cmp(&b.key))
}

/// What happened to one marker
enum Outcome {
    Grouped(GroupKey),
    /// Unknown caller / call site: counted as unaccounted
    Unaccounted,
    /// No group for this mode (no address, no loop): dropped
    Dropped,
}

/// Attribute every marker node of `db` under `mode`
///
/// Markers are the nodes named `marker`; each contributes the value of
/// `metric` found on its first-child chain.
pub fn attribute(
    db: &ProfileDatabase,
    mode: AttributionMode,
    marker: &str,
    metric: MetricId,
) -> Result<Attribution, StructuralViolation> {
    let mut attribution = Attribution::new(mode);
    attribution.databases = 1;
    for (address, name) in db.tables.address_names() {
        attribution.label(address, name);
    }

    for (node_ref, node) in db.tree.records() {
        if node.name() != marker {
            continue;
        }
        attribution.markers += 1;

        let value = descendant_metric(&db.tree, node_ref, metric)?;
        match group(db, mode, node_ref, &mut attribution)? {
            Outcome::Grouped(key) => attribution.add(key, value),
            Outcome::Unaccounted => {
                debug!("Marker {} unaccounted in {} mode", node.id(), mode);
                attribution.unaccounted += value;
                attribution.skipped += 1;
            }
            Outcome::Dropped => {
                debug!("Marker {} has no {} group", node.id(), mode);
                attribution.skipped += 1;
            }
        }
    }

    debug!(
        "{}: {} markers, {} groups, {} skipped",
        db.source.display(),
        attribution.markers,
        attribution.len(),
        attribution.skipped
    );
    Ok(attribution)
}

fn group(
    db: &ProfileDatabase,
    mode: AttributionMode,
    marker: NodeRef,
    attribution: &mut Attribution,
) -> Result<Outcome, StructuralViolation> {
    let tree = &db.tree;
    let outcome = match mode {
        AttributionMode::Function => {
            let callee = enclosing_procedure(tree, marker)?;
            if callee.address.is_unknown() {
                Outcome::Dropped
            } else {
                Outcome::Grouped(GroupKey::Function(callee.address))
            }
        }
        AttributionMode::Loop => match enclosing_loop(tree, marker)? {
            Some(lp) => {
                let node = tree.node(lp);
                if node.address().is_unknown() {
                    Outcome::Dropped
                } else {
                    attribution.label(node.address().clone(), node.name());
                    Outcome::Grouped(GroupKey::Loop(node.address().clone()))
                }
            }
            None => Outcome::Dropped,
        },
        AttributionMode::Callpair => {
            let callee = enclosing_procedure(tree, marker)?;
            // A callee at the root of the tree has no caller frame
            let caller = if tree.node(callee.node).is_root() {
                Address::unknown()
            } else {
                enclosing_procedure(tree, callee.node)?.address
            };
            if caller.is_unknown() || callee.address.is_unknown() {
                Outcome::Unaccounted
            } else {
                Outcome::Grouped(GroupKey::CallPair {
                    caller,
                    callee: callee.address,
                })
            }
        }
        AttributionMode::Callsite => {
            let callee = enclosing_procedure(tree, marker)?;
            let site = enclosing_call_site(tree, callee.node);
            if site.is_unknown() || callee.address.is_unknown() {
                Outcome::Unaccounted
            } else {
                Outcome::Grouped(GroupKey::CallSite {
                    site,
                    callee: callee.address,
                })
            }
        }
        AttributionMode::Address => {
            let site = enclosing_call_site(tree, marker);
            if site.is_unknown() {
                Outcome::Unaccounted
            } else {
                Outcome::Grouped(GroupKey::Address(site))
            }
        }
    };
    Ok(outcome)
}
