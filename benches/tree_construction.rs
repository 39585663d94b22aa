/// Calling-context tree construction and attribution benchmarks
///
/// Ingests generated experiment documents of growing size (wide call trees
/// of loop nests, each ending in an instrumentation marker) and measures
/// function-mode attribution over the result.
use cctprof::attribution::{attribute, AttributionMode, DEFAULT_MARKER_FRAME};
use cctprof::cct::MetricId;
use cctprof::ingest::{IngestOptions, ProfileDatabase};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::fmt::Write;
use std::time::Duration;

/// `callers` call chains of `depth` nested loops, each with a marker leaf
fn generate(callers: usize, depth: usize) -> (String, usize) {
    let mut body = String::new();
    let mut id = 10u64;
    let mut nodes = 1;
    for caller in 0..callers {
        id += 1;
        let _ = write!(body, r#"<C i="{}" l="4" v="0x{:x}">"#, id, 0x1000 + caller);
        id += 1;
        let _ = write!(body, r#"<PF i="{}" n="2" f="8" lm="7" l="9">"#, id);
        for level in 0..depth {
            id += 1;
            let _ = write!(body, r#"<L i="{}" l="{}" f="8" v="0x{:x}">"#, id, level, 0x2000 + id);
        }
        id += 1;
        let _ = write!(body, r#"<PF i="{}" n="3" f="8" lm="7" l="0">"#, id);
        id += 1;
        let _ = write!(body, r#"<S i="{}" l="0" v="0x9000"><M n="1" v="1.5"/></S></PF>"#, id);
        for _ in 0..depth {
            body.push_str("</L>");
        }
        body.push_str("</PF></C>");
        nodes += depth + 3;
    }

    let xml = format!(
        r#"<HPCToolkitExperiment>
<SecHeader>
  <MetricTable><Metric i="0" n="time (I)"/><Metric i="1" n="time (E)"/></MetricTable>
  <LoadModuleTable><LoadModule i="7" n="/bin/app"/></LoadModuleTable>
  <FileTable><File i="8" n="app.c"/></FileTable>
  <ProcedureTable>
    <Procedure i="1" n="main" v="0x1000"/>
    <Procedure i="2" n="work" v="0x2000"/>
    <Procedure i="3" n="{}" v="0"/>
  </ProcedureTable>
</SecHeader>
<SecCallPathProfileData><PF i="1" n="1" f="8" lm="7" l="1">{}</PF></SecCallPathProfileData>
</HPCToolkitExperiment>"#,
        DEFAULT_MARKER_FRAME, body
    );
    (xml, nodes)
}

fn bench_ingest(c: &mut Criterion) {
    let mut group = c.benchmark_group("ingest");
    group.measurement_time(Duration::from_secs(5));

    for &(callers, depth) in &[(10, 4), (100, 8), (1000, 8), (10, 1000)] {
        let (xml, nodes) = generate(callers, depth);
        group.throughput(Throughput::Elements(nodes as u64));
        group.bench_with_input(
            BenchmarkId::new("from_xml", format!("{}x{}", callers, depth)),
            &xml,
            |b, xml| {
                b.iter(|| {
                    let db = ProfileDatabase::from_xml("bench", xml, &IngestOptions::default())
                        .unwrap();
                    black_box(db.tree.len())
                });
            },
        );
    }
    group.finish();
}

fn bench_attribute(c: &mut Criterion) {
    let mut group = c.benchmark_group("attribute");
    group.measurement_time(Duration::from_secs(5));

    for &(callers, depth) in &[(100, 8), (1000, 8)] {
        let (xml, _) = generate(callers, depth);
        let db = ProfileDatabase::from_xml("bench", &xml, &IngestOptions::default()).unwrap();
        group.throughput(Throughput::Elements(callers as u64));
        group.bench_function(
            BenchmarkId::new("function_mode", format!("{}x{}", callers, depth)),
            |b| {
                b.iter(|| {
                    let result =
                        attribute(&db, AttributionMode::Function, DEFAULT_MARKER_FRAME, MetricId(1))
                            .unwrap();
                    black_box(result.grand_total())
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_ingest, bench_attribute);
criterion_main!(benches);
