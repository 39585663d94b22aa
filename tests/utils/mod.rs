// Shared helpers for integration tests: synthetic experiment.xml documents
// and database directories

#![allow(dead_code)]

use std::fs;
use tempfile::TempDir;

pub const FIXTURE: &str = include_str!("../fixtures/experiment.xml");

pub const MARKER: &str = "dyninst_instrumentation_op";

/// Procedure table ids of `experiment`
pub const MAIN: u32 = 1;
pub const F: u32 = 2;
pub const G: u32 = 3;
pub const ANON: u32 = 4;
pub const MARKER_PROC: u32 = 5;
pub const UNNAMED: u32 = 6;

/// Wrap a call-path body in a complete document
///
/// Procedures: main 0x1000, f 0x2000, g 0x3000, anon (no address), the
/// marker frame, and an unnamed merged procedure. Metric "1" is exclusive.
pub fn experiment(body: &str) -> String {
    format!(
        r#"<?xml version="1.0"?>
<HPCToolkitExperiment version="2.0">
<SecCallPathProfile i="0" n="synthetic">
<SecHeader>
  <MetricTable>
    <Metric i="0" n="time (I)"/>
    <Metric i="1" n="time (E)"/>
  </MetricTable>
  <LoadModuleTable><LoadModule i="7" n="/bin/app"/></LoadModuleTable>
  <FileTable><File i="8" n="./src/app.c"/></FileTable>
  <ProcedureTable>
    <Procedure i="1" n="main" v="0x1000"/>
    <Procedure i="2" n="f" v="0x2000"/>
    <Procedure i="3" n="g" v="0x3000"/>
    <Procedure i="4" n="anon" v="0"/>
    <Procedure i="5" n="{}" v="0"/>
    <Procedure i="6" n=""/>
  </ProcedureTable>
</SecHeader>
<SecCallPathProfileData>
{}
</SecCallPathProfileData>
</SecCallPathProfile>
</HPCToolkitExperiment>
"#,
        MARKER, body
    )
}

pub fn pf(id: u64, procedure: u32, children: &str) -> String {
    format!(
        r#"<PF i="{}" n="{}" f="8" lm="7" l="1">{}</PF>"#,
        id, procedure, children
    )
}

pub fn pr(id: u64, procedure: u32, children: &str) -> String {
    format!(
        r#"<Pr i="{}" n="{}" f="8" lm="7" l="2">{}</Pr>"#,
        id, procedure, children
    )
}

pub fn lp(id: u64, line: u32, address: u64, children: &str) -> String {
    format!(
        r#"<L i="{}" l="{}" f="8" v="0x{:x}">{}</L>"#,
        id, line, address, children
    )
}

pub fn call(id: u64, address: u64, children: &str) -> String {
    format!(r#"<C i="{}" l="3" v="0x{:x}">{}</C>"#, id, address, children)
}

pub fn stmt(id: u64, line: u32, address: u64, value: f64) -> String {
    format!(
        r#"<S i="{}" l="{}" v="0x{:x}"><M n="1" v="{}"/></S>"#,
        id, line, address, value
    )
}

/// A marker frame whose only child carries `value`
pub fn marker(id: u64, value: f64) -> String {
    pf(id, MARKER_PROC, &stmt(id + 1, 0, 0x9000, value))
}

/// Database directory holding `xml` as experiment.xml
pub fn database_dir(xml: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("experiment.xml"), xml).unwrap();
    dir
}
