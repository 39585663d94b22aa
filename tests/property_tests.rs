//! Property-based tests over generated calling-context trees
//!
//! Properties covered:
//! 1. Tree well-formedness (single parent, callpath length = parent + 1)
//! 2. Passthrough transparency of call sites and unnamed merged procedures
//! 3. Metric conservation from marker leaves to grouped sums
//! 4. Version classification idempotence
//! 5. Ranking determinism

mod utils;

use cctprof::attribution::{attribute, write_text, AttributionMode, DEFAULT_MARKER_FRAME};
use cctprof::cct::MetricId;
use cctprof::ingest::{IngestOptions, ProfileDatabase};
use cctprof::version_map::VersionMap;
use proptest::prelude::*;
use utils::*;

const EXCLUSIVE: MetricId = MetricId(1);

/// Generated scope shapes below the `main` root
#[derive(Debug, Clone)]
enum Shape {
    Statement(u32),
    Marker(u32),
    Procedure(u32, Vec<Shape>),
    Merged(bool, Vec<Shape>),
    Loop(Vec<Shape>),
    Call(Vec<Shape>),
}

fn shape() -> impl Strategy<Value = Shape> {
    let leaf = prop_oneof![
        (0u32..100).prop_map(Shape::Statement),
        (0u32..100).prop_map(Shape::Marker),
    ];
    leaf.prop_recursive(5, 48, 4, |inner| {
        prop_oneof![
            (prop::sample::select(vec![F, G, ANON]), prop::collection::vec(inner.clone(), 0..4))
                .prop_map(|(p, c)| Shape::Procedure(p, c)),
            (any::<bool>(), prop::collection::vec(inner.clone(), 0..4))
                .prop_map(|(named, c)| Shape::Merged(named, c)),
            prop::collection::vec(inner.clone(), 0..4).prop_map(Shape::Loop),
            prop::collection::vec(inner, 0..4).prop_map(Shape::Call),
        ]
    })
}

/// Rendered document plus what ingestion must make of it
struct Rendered {
    xml: String,
    created: usize,
    passthrough: Vec<u64>,
    marker_total: f64,
}

struct Renderer {
    next_id: u64,
    created: usize,
    passthrough: Vec<u64>,
    marker_total: f64,
}

impl Renderer {
    fn id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn children(&mut self, shapes: &[Shape]) -> String {
        shapes.iter().map(|s| self.render(s)).collect()
    }

    fn render(&mut self, shape: &Shape) -> String {
        let id = self.id();
        match shape {
            Shape::Statement(v) => {
                self.created += 1;
                stmt(id, 5, 0x1000 + id, f64::from(*v))
            }
            Shape::Marker(v) => {
                self.created += 2;
                self.next_id += 1;
                self.marker_total += f64::from(*v);
                marker(id, f64::from(*v))
            }
            Shape::Procedure(p, c) => {
                self.created += 1;
                let body = self.children(c);
                pf(id, *p, &body)
            }
            Shape::Merged(named, c) => {
                let body = self.children(c);
                if *named {
                    self.created += 1;
                    pr(id, G, &body)
                } else {
                    self.passthrough.push(id);
                    pr(id, UNNAMED, &body)
                }
            }
            Shape::Loop(c) => {
                self.created += 1;
                let body = self.children(c);
                lp(id, 7, 0x5000 + id, &body)
            }
            Shape::Call(c) => {
                self.passthrough.push(id);
                let body = self.children(c);
                call(id, 0x7000 + id, &body)
            }
        }
    }
}

fn render(shapes: &[Shape]) -> Rendered {
    let mut renderer = Renderer {
        next_id: 1,
        created: 1,
        passthrough: Vec::new(),
        marker_total: 0.0,
    };
    let body = renderer.children(shapes);
    Rendered {
        xml: experiment(&pf(1, MAIN, &body)),
        created: renderer.created,
        passthrough: renderer.passthrough,
        marker_total: renderer.marker_total,
    }
}

fn load(xml: &str, call_site_nodes: bool) -> ProfileDatabase {
    let options = IngestOptions {
        call_site_nodes,
        ..IngestOptions::default()
    };
    ProfileDatabase::from_xml("generated", xml, &options).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_tree_is_well_formed(shapes in prop::collection::vec(shape(), 0..5)) {
        let rendered = render(&shapes);
        let db = load(&rendered.xml, false);

        prop_assert_eq!(db.tree.len(), rendered.created);
        prop_assert_eq!(db.tree.roots().len(), 1);
        for (node_ref, node) in db.tree.records() {
            match node.parent() {
                Some(parent) => {
                    let parent = db.tree.node(parent);
                    prop_assert_eq!(node.callpath().len(), parent.callpath().len() + 1);
                    prop_assert_eq!(
                        parent.children().iter().filter(|&&c| c == node_ref).count(),
                        1
                    );
                }
                None => {
                    prop_assert_eq!(node.callpath().len(), 1);
                }
            }
        }
    }

    #[test]
    fn prop_passthrough_levels_are_transparent(shapes in prop::collection::vec(shape(), 0..5)) {
        let rendered = render(&shapes);
        let db = load(&rendered.xml, false);

        for id in &rendered.passthrough {
            prop_assert!(db.tree.find(*id).is_none());
        }
        for (_, node) in db.tree.records() {
            prop_assert!(!node.callpath().leaf().starts_with("callsite@"));
            prop_assert!(!node.callpath().leaf().is_empty());
        }
    }

    #[test]
    fn prop_call_site_nodes_only_add_levels(shapes in prop::collection::vec(shape(), 0..5)) {
        let rendered = render(&shapes);
        let plain = load(&rendered.xml, false);
        let with_sites = load(&rendered.xml, true);

        let calls = rendered.xml.matches("<C ").count();
        prop_assert_eq!(with_sites.tree.len(), plain.tree.len() + calls);
    }

    #[test]
    fn prop_every_marker_is_grouped_or_unaccounted(
        shapes in prop::collection::vec(shape(), 0..5),
        call_site_nodes in any::<bool>(),
    ) {
        let rendered = render(&shapes);
        let db = load(&rendered.xml, call_site_nodes);

        for mode in [AttributionMode::Callpair, AttributionMode::Callsite, AttributionMode::Address] {
            let result = attribute(&db, mode, DEFAULT_MARKER_FRAME, EXCLUSIVE).unwrap();
            prop_assert_eq!(result.grand_total() + result.unaccounted, rendered.marker_total);
        }
        for mode in [AttributionMode::Function, AttributionMode::Loop] {
            let result = attribute(&db, mode, DEFAULT_MARKER_FRAME, EXCLUSIVE).unwrap();
            prop_assert!(result.grand_total() <= rendered.marker_total);
            prop_assert_eq!(result.unaccounted, 0.0);
        }
    }

    #[test]
    fn prop_single_marker_value_conserved(value in 0u32..10_000, loops in 0usize..4) {
        let mut body = marker(100, f64::from(value));
        for i in 0..loops {
            body = lp(200 + i as u64, 3, 0x2100 + i as u64, &body);
        }
        let xml = experiment(&pf(1, MAIN, &call(2, 0x1010, &pf(3, F, &body))));
        let db = load(&xml, true);
        let expected = f64::from(value);

        for mode in [
            AttributionMode::Function,
            AttributionMode::Callpair,
            AttributionMode::Callsite,
            AttributionMode::Address,
        ] {
            let result = attribute(&db, mode, DEFAULT_MARKER_FRAME, EXCLUSIVE).unwrap();
            prop_assert_eq!(result.grand_total(), expected, "{} mode", mode);
        }

        let result = attribute(&db, AttributionMode::Loop, DEFAULT_MARKER_FRAME, EXCLUSIVE).unwrap();
        let grouped = if loops > 0 { expected } else { 0.0 };
        prop_assert_eq!(result.grand_total(), grouped);
    }

    #[test]
    fn prop_ranking_is_deterministic(shapes in prop::collection::vec(shape(), 0..5)) {
        let rendered = render(&shapes);
        let db = load(&rendered.xml, true);

        let report = |mode| {
            let result = attribute(&db, mode, DEFAULT_MARKER_FRAME, EXCLUSIVE).unwrap();
            let mut out = Vec::new();
            write_text(&result, None, &mut out).unwrap();
            out
        };
        for mode in [AttributionMode::Function, AttributionMode::Callsite] {
            prop_assert_eq!(report(mode), report(mode));
        }
    }
}

/// Sorted, non-overlapping intervals with gaps
fn version_map() -> impl Strategy<Value = (String, Vec<(u64, u64)>)> {
    prop::collection::vec((1u64..0x100, 1u64..0x100), 1..8).prop_map(|pieces| {
        let mut start = 0x1000;
        let mut intervals = Vec::new();
        let mut text = format!("{}\n", pieces.len());
        for (i, (gap, size)) in pieces.into_iter().enumerate() {
            start += gap;
            let original = if i % 2 == 0 { format!("{:x}", 0x400 + i) } else { "-1".to_string() };
            text.push_str(&format!("{:x} {} {:x} v{}\n", start, original, size, i));
            intervals.push((start, size));
            start += size;
        }
        text.push_str("1\nclone\n");
        (text, intervals)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_classification_is_idempotent(
        (text, intervals) in version_map(),
        queries in prop::collection::vec(0u64..0x3000, 1..32),
    ) {
        let map = VersionMap::parse(&text).unwrap();

        let forward: Vec<(String, String)> = queries
            .iter()
            .map(|&q| {
                let (label, version) = map.classify(q);
                (label.to_string(), version.to_string())
            })
            .collect();
        for (i, &q) in queries.iter().enumerate().rev() {
            let (label, version) = map.classify(q);
            prop_assert_eq!(&forward[i].0, label);
            prop_assert_eq!(&forward[i].1, version);
        }

        for &q in &queries {
            let inside = intervals.iter().any(|&(start, size)| q >= start && q < start + size);
            let (label, version) = map.classify(q);
            prop_assert_eq!(inside, label != "other", "query {:#x}", q);
            if !inside {
                prop_assert_eq!(version, "other");
            }
        }

        let (first, _) = intervals[0];
        prop_assert_eq!(map.classify(first - 1), ("other", "other"));
    }
}
