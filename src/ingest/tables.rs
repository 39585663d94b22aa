// Flat lookup tables: load modules, files, procedures, metrics
//
// Each table maps the short string ids used inside the call-path section to
// display strings. Procedures additionally map display name -> starting
// address ("0" when the profiler did not record one).

use super::document::Document;
use super::error::{IngestError, TableKind};
use crate::cct::{Address, MetricId};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

pub const LOAD_MODULE_SECTION: &str = "LoadModuleTable";
pub const FILE_SECTION: &str = "FileTable";
pub const PROCEDURE_SECTION: &str = "ProcedureTable";
pub const METRIC_SECTION: &str = "MetricTable";

/// id -> display name
#[derive(Debug, Clone)]
pub struct NameTable {
    kind: TableKind,
    names: HashMap<String, Arc<str>>,
}

impl NameTable {
    pub fn new(kind: TableKind) -> Self {
        Self {
            kind,
            names: HashMap::new(),
        }
    }

    pub fn insert(&mut self, id: impl Into<String>, name: impl Into<Arc<str>>) {
        self.names.insert(id.into(), name.into());
    }

    pub fn get(&self, id: &str) -> Option<&Arc<str>> {
        self.names.get(id)
    }

    /// Display name for `id`; unknown ids are fatal
    pub fn resolve(&self, id: &str) -> Result<Arc<str>, IngestError> {
        self.names
            .get(id)
            .cloned()
            .ok_or_else(|| IngestError::UnknownReference {
                table: self.kind,
                id: id.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// One metric definition
#[derive(Debug, Clone, PartialEq)]
pub struct MetricEntry {
    /// Id used by `<M n="...">` elements
    pub raw_id: String,
    /// Display name, e.g. "CPUTIME (usec):Sum (E)"
    pub name: String,
}

/// Metric definitions in document order
#[derive(Debug, Clone, Default)]
pub struct MetricTable {
    entries: Vec<MetricEntry>,
    by_raw_id: HashMap<String, MetricId>,
}

impl MetricTable {
    pub fn insert(&mut self, raw_id: impl Into<String>, name: impl Into<String>) -> MetricId {
        let raw_id = raw_id.into();
        let name = name.into();
        if let Some(&existing) = self.by_raw_id.get(&raw_id) {
            self.entries[existing.0].name = name;
            return existing;
        }
        let id = MetricId(self.entries.len());
        self.by_raw_id.insert(raw_id.clone(), id);
        self.entries.push(MetricEntry { raw_id, name });
        id
    }

    pub fn resolve(&self, raw_id: &str) -> Result<MetricId, IngestError> {
        self.by_raw_id
            .get(raw_id)
            .copied()
            .ok_or_else(|| IngestError::UnknownReference {
                table: TableKind::Metric,
                id: raw_id.to_string(),
            })
    }

    pub fn entry(&self, id: MetricId) -> Option<&MetricEntry> {
        self.entries.get(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (MetricId, &MetricEntry)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (MetricId(index), entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Metric used for attribution
    ///
    /// The last metric whose name contains `exclusive_tag` wins; with no
    /// tagged metric the first one in the table is used.
    pub fn select(&self, exclusive_tag: &str) -> Option<MetricId> {
        self.iter()
            .filter(|(_, entry)| entry.name.contains(exclusive_tag))
            .map(|(id, _)| id)
            .last()
            .or_else(|| self.iter().next().map(|(id, _)| id))
    }
}

/// All flat tables of one database
#[derive(Debug, Clone)]
pub struct ProfileTables {
    pub load_modules: NameTable,
    pub source_files: NameTable,
    pub procedures: NameTable,
    pub metrics: MetricTable,
    procedure_addresses: HashMap<Arc<str>, Address>,
}

impl ProfileTables {
    pub fn new() -> Self {
        Self {
            load_modules: NameTable::new(TableKind::LoadModule),
            source_files: NameTable::new(TableKind::File),
            procedures: NameTable::new(TableKind::Procedure),
            metrics: MetricTable::default(),
            procedure_addresses: HashMap::new(),
        }
    }

    /// Read the four table sections of an experiment document
    pub fn from_document(document: &Document) -> Result<Self, IngestError> {
        let mut tables = Self::new();

        let section = document.section(LOAD_MODULE_SECTION)?;
        for module in document.descendants_named(section, "LoadModule") {
            tables
                .load_modules
                .insert(module.require("i")?, module.require("n")?);
        }

        let section = document.section(FILE_SECTION)?;
        for file in document.descendants_named(section, "File") {
            tables
                .source_files
                .insert(file.require("i")?, file.require("n")?);
        }

        let section = document.section(PROCEDURE_SECTION)?;
        for procedure in document.descendants_named(section, "Procedure") {
            let address = procedure.attr("v").unwrap_or("0");
            tables.insert_procedure(procedure.require("i")?, procedure.require("n")?, address);
        }

        let section = document.section(METRIC_SECTION)?;
        for metric in document.descendants_named(section, "Metric") {
            tables
                .metrics
                .insert(metric.require("i")?, metric.require("n")?);
        }

        Ok(tables)
    }

    /// Register a procedure; a later procedure with the same name replaces
    /// the earlier name -> address entry
    pub fn insert_procedure(&mut self, id: &str, name: &str, address: &str) {
        let name: Arc<str> = Arc::from(name);
        self.procedures.insert(id, Arc::clone(&name));
        self.procedure_addresses.insert(name, Address::new(address));
    }

    /// Starting address of a procedure by display name
    pub fn procedure_address(&self, name: &str) -> Address {
        self.procedure_addresses
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    /// Known address -> procedure name, skipping procedures without an address
    ///
    /// When several procedures share an address the lexically smallest name
    /// is kept, so the map does not depend on hash order.
    pub fn address_names(&self) -> BTreeMap<Address, String> {
        let mut named: Vec<(&Arc<str>, &Address)> = self
            .procedure_addresses
            .iter()
            .filter(|(_, address)| !address.is_unknown())
            .collect();
        named.sort();

        let mut names = BTreeMap::new();
        for (name, address) in named {
            names
                .entry(address.clone())
                .or_insert_with(|| name.to_string());
        }
        names
    }
}

impl Default for ProfileTables {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLES: &str = r#"<HPCToolkitExperiment>
  <SecHeader>
    <MetricTable>
      <Metric i="0" n="CPUTIME (usec):Sum (I)" t="inclusive"/>
      <Metric i="1" n="CPUTIME (usec):Sum (E)" t="exclusive"/>
    </MetricTable>
    <LoadModuleTable><LoadModule i="2" n="/bin/app"/></LoadModuleTable>
    <FileTable>
      <File i="3" n="./src/app.c"/>
      <File i="4" n="~unknown-file~"/>
    </FileTable>
    <ProcedureTable>
      <Procedure i="5" n="main" v="0x4005d0"/>
      <Procedure i="6" n="helper"/>
      <Procedure i="7" n="dyninst_instrumentation_op" v="0"/>
    </ProcedureTable>
  </SecHeader>
</HPCToolkitExperiment>"#;

    #[test]
    fn test_tables_from_document() {
        let doc = Document::parse(TABLES).unwrap();
        let tables = ProfileTables::from_document(&doc).unwrap();

        assert_eq!(tables.load_modules.len(), 1);
        assert_eq!(tables.source_files.len(), 2);
        assert_eq!(tables.procedures.len(), 3);
        assert_eq!(tables.metrics.len(), 2);
        assert_eq!(&*tables.procedures.resolve("5").unwrap(), "main");
        assert_eq!(tables.procedure_address("main").as_str(), "0x4005d0");
        assert!(tables.procedure_address("helper").is_unknown());
        assert!(tables.procedure_address("nonexistent").is_unknown());
    }

    #[test]
    fn test_unknown_reference_is_error() {
        let doc = Document::parse(TABLES).unwrap();
        let tables = ProfileTables::from_document(&doc).unwrap();
        let err = tables.source_files.resolve("99").unwrap_err();
        assert!(matches!(
            err,
            IngestError::UnknownReference {
                table: TableKind::File,
                ..
            }
        ));
        assert!(tables.metrics.resolve("9").is_err());
    }

    #[test]
    fn test_missing_section_is_error() {
        let doc = Document::parse(
            "<X><LoadModuleTable/><FileTable/><ProcedureTable/></X>",
        )
        .unwrap();
        let err = ProfileTables::from_document(&doc).unwrap_err();
        assert!(matches!(err, IngestError::MissingSection("MetricTable")));
    }

    #[test]
    fn test_address_names_skip_unknown() {
        let doc = Document::parse(TABLES).unwrap();
        let tables = ProfileTables::from_document(&doc).unwrap();
        let names = tables.address_names();
        assert_eq!(names.len(), 1);
        assert_eq!(names[&Address::new("0x4005d0")], "main");
    }

    #[test]
    fn test_address_names_shared_address_is_stable() {
        let mut tables = ProfileTables::new();
        tables.insert_procedure("1", "zeta", "0x10");
        tables.insert_procedure("2", "alpha", "0x10");
        tables.insert_procedure("3", "beta", "0x20");
        let names = tables.address_names();
        assert_eq!(names[&Address::new("0x10")], "alpha");
        assert_eq!(names[&Address::new("0x20")], "beta");
    }

    #[test]
    fn test_select_prefers_last_exclusive_metric() {
        let mut metrics = MetricTable::default();
        metrics.insert("0", "cycles (I)");
        metrics.insert("1", "cycles (E)");
        metrics.insert("2", "time (I)");
        metrics.insert("3", "time (E)");
        assert_eq!(metrics.select("(E)"), Some(MetricId(3)));
    }

    #[test]
    fn test_select_falls_back_to_first_metric() {
        let mut metrics = MetricTable::default();
        metrics.insert("7", "CPUTIME");
        metrics.insert("8", "REALTIME");
        assert_eq!(metrics.select("(E)"), Some(MetricId(0)));
        assert_eq!(MetricTable::default().select("(E)"), None);
    }

    #[test]
    fn test_metric_reinsert_keeps_id() {
        let mut metrics = MetricTable::default();
        let first = metrics.insert("0", "a");
        let again = metrics.insert("0", "b");
        assert_eq!(first, again);
        assert_eq!(metrics.entry(first).unwrap().name, "b");
        assert_eq!(metrics.len(), 1);
    }
}
