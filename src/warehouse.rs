//! Directory-backed SQL warehouse.
//!
//! A warehouse root holds one directory per schema and one entry per
//! table inside it (`<root>/<schema>/<table>.parquet`, `.arrow`, `.csv`,
//! or a directory of part files). Queries are planned by `polars-sql`
//! against the tables of the active schema.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use polars::prelude::*;
use polars_sql::SQLContext;
use tracing::{debug, info, warn};

use crate::config::WarehouseConfig;
use crate::error::{Error, Result};
use crate::storage::TableStorage;

#[derive(Debug, Clone, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct TableName {
    pub schema: String,
    pub name: String,
}

impl TableName {
    pub fn new(schema: &str, name: &str) -> Self {
        Self {
            schema: schema.to_string(),
            name: name.to_string(),
        }
    }

    /// Name the table is registered under in the SQL context.
    pub fn handler(&self) -> &str {
        &self.name
    }
}

pub struct Warehouse {
    root: PathBuf,
    separator: u8,
    schemas: BTreeSet<String>,
    tables: BTreeMap<TableName, TableStorage>,
}

impl Warehouse {
    /// Walks the root directory and catalogs every schema and table.
    pub fn open(root: &Path, separator: u8) -> Result<Self> {
        if !root.is_dir() {
            return Err(Error::Warehouse(format!(
                "warehouse root {} is not a directory",
                root.display()
            )));
        }

        let mut schemas = BTreeSet::new();
        let mut tables = BTreeMap::new();
        let mut ambiguous = BTreeSet::new();
        for entry in fs::read_dir(root).map_err(Error::io(root))? {
            let schema_dir = entry.map_err(Error::io(root))?.path();
            let Some(schema) = visible_name(&schema_dir) else { continue };
            if !schema_dir.is_dir() {
                continue;
            }
            for entry in fs::read_dir(&schema_dir).map_err(Error::io(&schema_dir))? {
                let path = entry.map_err(Error::io(&schema_dir))?.path();
                let Some(name) = table_name(&path) else { continue };
                match TableStorage::discover(&path).map_err(Error::io(&path))? {
                    Some(storage) => {
                        debug!(schema, table = name, format = ?storage.format, "cataloged table");
                        let tn = TableName::new(schema, name);
                        if tables.insert(tn.clone(), storage).is_some() {
                            ambiguous.insert(tn);
                        }
                    }
                    None => warn!(path = %path.display(), "skipping entry without readable data"),
                }
            }
            schemas.insert(schema.to_string());
        }
        // Two entries with the same stem (`clientes.csv`, `clientes.parquet`)
        // give no way to pick one, so the name is left out of the catalog.
        for tn in ambiguous {
            warn!(schema = %tn.schema, table = %tn.name, "several entries share this table name, skipping it");
            tables.remove(&tn);
        }

        Ok(Self {
            root: root.to_path_buf(),
            separator,
            schemas,
            tables,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn schemas(&self) -> impl Iterator<Item = &str> {
        self.schemas.iter().map(String::as_str)
    }

    pub fn has_schema(&self, schema: &str) -> bool {
        self.schemas.contains(schema)
    }

    pub fn tables<'a>(&'a self, schema: &'a str) -> impl Iterator<Item = &'a TableName> {
        self.tables.keys().filter(move |tn| tn.schema == schema)
    }

    /// Plans and runs `sql` with every table of `schema` in scope. A table
    /// that cannot be scanned is left out, so queries touching it fail
    /// while the rest still work.
    pub fn execute_sql(&self, schema: &str, sql: &str) -> PolarsResult<DataFrame> {
        let mut ctx = SQLContext::new();
        for (tn, storage) in self.tables.iter().filter(|(tn, _)| tn.schema == schema) {
            match storage.scan(self.separator) {
                Ok(lf) => ctx.register(tn.handler(), lf),
                Err(e) => warn!(table = tn.handler(), error = %e, "could not scan table"),
            }
        }
        ctx.execute(sql)?.collect()
    }
}

fn visible_name(path: &Path) -> Option<&str> {
    let name = path.file_name()?.to_str()?;
    (!name.starts_with('.') && !name.starts_with('_')).then_some(name)
}

fn table_name(path: &Path) -> Option<&str> {
    visible_name(path)?;
    if path.is_dir() {
        path.file_name()?.to_str()
    } else {
        path.file_stem()?.to_str()
    }
}

/// Catalog statements handled by the session itself.
enum Statement<'a> {
    Use(&'a str),
    ShowDatabases,
    ShowTables,
    Query,
}

impl<'a> Statement<'a> {
    fn parse(sql: &'a str) -> Self {
        let words: Vec<&str> = sql.trim().trim_end_matches(';').split_whitespace().collect();
        match words.as_slice() {
            [kw, schema] if kw.eq_ignore_ascii_case("use") => Statement::Use(*schema),
            [kw, what] if kw.eq_ignore_ascii_case("show")
                && (what.eq_ignore_ascii_case("databases") || what.eq_ignore_ascii_case("schemas")) =>
            {
                Statement::ShowDatabases
            }
            [kw, what] if kw.eq_ignore_ascii_case("show") && what.eq_ignore_ascii_case("tables") => {
                Statement::ShowTables
            }
            _ => Statement::Query,
        }
    }
}

/// Tells whether a session has been given back, from outside the session.
#[derive(Debug, Clone, Default)]
pub struct ReleaseFlag(Arc<AtomicBool>);

impl ReleaseFlag {
    pub fn is_released(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// An open connection to the warehouse.
///
/// The session is released when [`Session::stop`] is called or, failing
/// that, when it is dropped, so every exit path gives it back.
pub struct Session {
    app_name: String,
    warehouse: Option<Warehouse>,
    current_schema: String,
    released: ReleaseFlag,
}

impl Session {
    pub fn open(config: &WarehouseConfig) -> Result<Self> {
        let warehouse = Warehouse::open(&config.root, config.separator_byte())?;
        info!(app = %config.app_name, root = %config.root.display(), "session opened");
        Ok(Self {
            app_name: config.app_name.clone(),
            warehouse: Some(warehouse),
            current_schema: "default".to_string(),
            released: ReleaseFlag::default(),
        })
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn version(&self) -> String {
        format!("polars-sql ({} {})", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
    }

    pub fn current_schema(&self) -> &str {
        &self.current_schema
    }

    fn warehouse(&self) -> Result<&Warehouse> {
        self.warehouse
            .as_ref()
            .ok_or_else(|| Error::Warehouse("session already released".to_string()))
    }

    pub fn use_schema(&mut self, schema: &str) -> Result<()> {
        if !self.warehouse()?.has_schema(schema) {
            return Err(Error::Warehouse(format!("schema not found: {schema}")));
        }
        self.current_schema = schema.to_string();
        Ok(())
    }

    pub fn show_databases(&self) -> Result<DataFrame> {
        let names: Vec<&str> = self.warehouse()?.schemas().collect();
        DataFrame::new(vec![Series::new("namespace", names)])
            .map_err(|e| Error::Warehouse(e.to_string()))
    }

    pub fn show_tables(&self) -> Result<DataFrame> {
        let names: Vec<&str> = self
            .warehouse()?
            .tables(&self.current_schema)
            .map(|tn| tn.name.as_str())
            .collect();
        let namespace = vec![self.current_schema.as_str(); names.len()];
        DataFrame::new(vec![
            Series::new("namespace", namespace),
            Series::new("tableName", names),
        ])
        .map_err(|e| Error::Warehouse(e.to_string()))
    }

    /// Runs a statement against the active schema. `USE`, `SHOW DATABASES`
    /// and `SHOW TABLES` are answered from the catalog.
    pub fn sql(&mut self, sql: &str) -> Result<DataFrame> {
        match Statement::parse(sql) {
            Statement::Use(schema) => {
                self.use_schema(schema)?;
                Ok(DataFrame::empty())
            }
            Statement::ShowDatabases => self.show_databases(),
            Statement::ShowTables => self.show_tables(),
            Statement::Query => {
                let warehouse = self.warehouse()?;
                debug!(schema = %self.current_schema, sql, "executing query");
                warehouse
                    .execute_sql(&self.current_schema, sql)
                    .map_err(|source| Error::Query { query: sql.to_string(), source })
            }
        }
    }

    pub fn is_open(&self) -> bool {
        self.warehouse.is_some()
    }

    pub fn release_flag(&self) -> ReleaseFlag {
        self.released.clone()
    }

    /// Releases the session. Returns false if it had already been released.
    pub fn stop(mut self) -> bool {
        self.release()
    }

    fn release(&mut self) -> bool {
        let Some(warehouse) = self.warehouse.take() else {
            return false;
        };
        self.released.set();
        info!(app = %self.app_name, root = %warehouse.root().display(), "session released");
        true
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let _ = self.release();
    }
}
