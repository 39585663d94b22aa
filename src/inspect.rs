// Database diagnostics: summaries and tree dumps

use crate::attribution::format_value;
use crate::cct::{CallingContextTree, MetricId, NodeKind};
use crate::ingest::ProfileDatabase;
use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;

fn kind_name(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Procedure => "procedure",
        NodeKind::ProcedureMerge => "merged procedure",
        NodeKind::Loop => "loop",
        NodeKind::Statement => "statement",
        NodeKind::CallSite => "call site",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSummary {
    pub raw_id: String,
    pub name: String,
    pub selected: bool,
}

/// Shape and contents of one loaded database
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatabaseSummary {
    pub source: String,
    pub nodes: usize,
    pub roots: usize,
    pub max_depth: usize,
    pub kinds: BTreeMap<&'static str, usize>,
    pub metrics: Vec<MetricSummary>,
    pub markers: usize,
    /// Sum of the selected metric over every node
    pub total: f64,
}

/// Summarize `db`, marking `selected` as the attribution metric
pub fn summarize(db: &ProfileDatabase, marker: &str, selected: Option<MetricId>) -> DatabaseSummary {
    let tree = &db.tree;
    let mut kinds = BTreeMap::new();
    let mut markers = 0;
    let mut total = 0.0;
    for (_, node) in tree.records() {
        *kinds.entry(kind_name(node.kind())).or_insert(0) += 1;
        if node.name() == marker {
            markers += 1;
        }
        if let Some(value) = selected.and_then(|metric| node.metric(metric)) {
            total += value;
        }
    }

    let max_depth = tree
        .roots()
        .iter()
        .flat_map(|&root| tree.breadth_first(root))
        .map(|(_, node)| node.depth())
        .max()
        .unwrap_or(0);

    let metrics = db
        .tables
        .metrics
        .iter()
        .map(|(id, entry)| MetricSummary {
            raw_id: entry.raw_id.clone(),
            name: entry.name.clone(),
            selected: Some(id) == selected,
        })
        .collect();

    DatabaseSummary {
        source: db.source.display().to_string(),
        nodes: tree.len(),
        roots: tree.roots().len(),
        max_depth,
        kinds,
        metrics,
        markers,
        total,
    }
}

pub fn write_summary<W: Write>(summary: &DatabaseSummary, out: &mut W) -> Result<()> {
    writeln!(out, "{}", summary.source)?;
    writeln!(
        out,
        "  nodes: {} ({} roots, max depth {})",
        summary.nodes, summary.roots, summary.max_depth
    )?;
    for (kind, count) in &summary.kinds {
        writeln!(out, "  {}: {}", kind, count)?;
    }
    writeln!(out, "  metrics:")?;
    for metric in &summary.metrics {
        let marker = if metric.selected { " *" } else { "" };
        writeln!(out, "    [{}] {}{}", metric.raw_id, metric.name, marker)?;
    }
    writeln!(out, "  markers: {}", summary.markers)?;
    writeln!(out, "  total: {}", format_value(summary.total))?;
    Ok(())
}

/// Inclusive value of `metric` for every node, indexed by `NodeRef::index`
pub fn inclusive_totals(tree: &CallingContextTree, metric: MetricId) -> Vec<f64> {
    let mut totals = vec![0.0; tree.len()];
    for (node_ref, node) in tree.post_order_forest() {
        let own = node.metric(metric).unwrap_or(0.0);
        let below: f64 = node.children().iter().map(|child| totals[child.index()]).sum();
        totals[node_ref.index()] = own + below;
    }
    totals
}

/// Indented pre-order dump of the tree, one node per line
///
/// Each line carries the node kind, its name, its address when known, the
/// metrics attached directly to it and, when a metric is selected, the
/// inclusive value of that metric.
pub fn write_tree<W: Write>(
    db: &ProfileDatabase,
    selected: Option<MetricId>,
    max_depth: Option<usize>,
    out: &mut W,
) -> Result<()> {
    let tree = &db.tree;
    let inclusive = selected.map(|metric| inclusive_totals(tree, metric));

    let walk = match max_depth {
        Some(limit) => tree.pre_order_forest_to(limit),
        None => tree.pre_order_forest(),
    };
    for (node_ref, node) in walk {
        let mut line = format!(
            "{:indent$}{} {}",
            "",
            node.kind().tag(),
            node.name(),
            indent = node.depth() * 2
        );
        if !node.address().is_unknown() {
            line.push_str(&format!(" @{}", node.address()));
        }
        for &(metric, value) in node.metrics() {
            let raw_id = db
                .tables
                .metrics
                .entry(metric)
                .map_or("?", |entry| entry.raw_id.as_str());
            line.push_str(&format!(" m{}={}", raw_id, format_value(value)));
        }
        if let Some(totals) = &inclusive {
            line.push_str(&format!(" (incl {})", format_value(totals[node_ref.index()])));
        }
        writeln!(out, "{}", line)?;
    }
    Ok(())
}
