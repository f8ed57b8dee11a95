use serde::Serialize;
use tracing::warn;

use crate::config::{QueryConfig, WarehouseConfig};
use crate::error::Result;
use crate::warehouse::Session;

#[derive(Debug, Clone, Serialize)]
pub struct QueryOutcome {
    pub label: String,
    pub rows: Option<usize>,
    pub error: Option<String>,
}

impl QueryOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub app_name: String,
    pub version: String,
    pub schema: String,
    pub queries: Vec<QueryOutcome>,
    pub session_released: bool,
}

impl ProbeReport {
    pub fn failed(&self) -> usize {
        self.queries.iter().filter(|q| !q.succeeded()).count()
    }
}

/// Opens a session, lists the catalog and runs the sample queries.
///
/// Opening the warehouse or switching schema are fatal; individual query
/// failures are recorded in the report and the next query still runs.
pub fn run(config: &WarehouseConfig) -> Result<ProbeReport> {
    run_session(Session::open(config)?, config)
}

/// Runs the probe over an already open session, which is released on
/// every return path.
pub fn run_session(mut session: Session, config: &WarehouseConfig) -> Result<ProbeReport> {
    println!("=== WAREHOUSE PROBE ===");
    println!("Application: {}", session.app_name());
    println!("Engine version: {}", session.version());

    session.use_schema(&config.schema)?;

    println!("\nAvailable schemas:");
    println!("{}", session.show_databases()?);

    println!("\nTables in {}:", session.current_schema());
    println!("{}", session.show_tables()?);

    println!("\nRunning sample queries:");
    let queries = config
        .queries
        .iter()
        .map(|query| run_query(&mut session, query))
        .collect();

    let app_name = session.app_name().to_string();
    let version = session.version();
    let schema = session.current_schema().to_string();
    let session_released = session.stop();
    let report = ProbeReport {
        app_name,
        version,
        schema,
        queries,
        session_released,
    };
    println!("\nProbe completed");
    Ok(report)
}

fn run_query(session: &mut Session, query: &QueryConfig) -> QueryOutcome {
    match session.sql(&query.sql) {
        Ok(df) => {
            if query.count {
                println!("{}: {} rows", query.label, df.height());
            } else {
                println!("{}:", query.label);
            }
            if query.show > 0 {
                println!("{}", df.head(Some(query.show)));
            }
            QueryOutcome {
                label: query.label.clone(),
                rows: Some(df.height()),
                error: None,
            }
        }
        Err(e) => {
            println!("Error in {}: {e}", query.label);
            warn!(query = %query.label, error = %e, "probe query failed");
            QueryOutcome {
                label: query.label.clone(),
                rows: None,
                error: Some(e.to_string()),
            }
        }
    }
}
