use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Columns every customer batch must carry, in the order they are reported.
pub const REQUIRED_COLUMNS: [&str; 15] = [
    "ID",
    "Provincia",
    "Nombre_y_Apellido",
    "Domicilio",
    "Telefono",
    "Edad",
    "Localidad",
    "X",
    "Y",
    "Fecha_Alta",
    "Usuario_Alta",
    "Fecha_Ultima_Modificacion",
    "Usuario_Ultima_Modificacion",
    "Marca_Baja",
    "col10",
];

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub exporter: ExporterConfig,
    pub warehouse: WarehouseConfig,
}

impl Config {
    /// Reads a TOML file, or returns the defaults when no path is given.
    /// Sections and fields missing from the file keep their defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml(&contents).map_err(|message| Error::Config {
            path: path.to_path_buf(),
            message,
        })
    }

    fn from_toml(contents: &str) -> std::result::Result<Self, String> {
        let config: Self = toml::from_str(contents).map_err(|e| e.to_string())?;
        for (section, sep) in [
            ("exporter", config.exporter.separator),
            ("warehouse", config.warehouse.separator),
        ] {
            if !sep.is_ascii() {
                return Err(format!("{section}.separator must be a single ASCII character, got {sep:?}"));
            }
        }
        Ok(config)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ExporterConfig {
    pub separator: char,
    pub output_dir: PathBuf,
    /// Rows printed as a preview after loading a batch.
    pub sample_rows: usize,
    pub batches: Vec<BatchConfig>,
    pub schema: RecordSchema,
}

impl ExporterConfig {
    pub fn separator_byte(&self) -> u8 {
        self.separator as u8
    }
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            separator: ';',
            output_dir: PathBuf::from("output"),
            sample_rows: 3,
            batches: vec![
                BatchConfig::new("nuevos clientes", "data/nuevos_clientes.csv", "nuevos_clientes_hdfs.csv"),
                BatchConfig::new(
                    "modificaciones de clientes",
                    "data/modificaciones_clientes.csv",
                    "modificaciones_clientes_hdfs.csv",
                ),
            ],
            schema: RecordSchema::default(),
        }
    }
}

/// One input file and the name it is staged under.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BatchConfig {
    pub label: String,
    pub input: PathBuf,
    pub output: String,
}

impl BatchConfig {
    pub fn new(label: &str, input: impl Into<PathBuf>, output: &str) -> Self {
        Self {
            label: label.to_string(),
            input: input.into(),
            output: output.to_string(),
        }
    }
}

/// Business rules a customer batch is checked against before export.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct RecordSchema {
    pub required_columns: Vec<String>,
    pub id_column: String,
    pub age_column: String,
    pub min_age: i64,
    pub max_age: i64,
}

impl Default for RecordSchema {
    fn default() -> Self {
        Self {
            required_columns: REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(),
            id_column: "ID".to_string(),
            age_column: "Edad".to_string(),
            min_age: 0,
            max_age: 120,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct WarehouseConfig {
    pub app_name: String,
    /// Directory holding one sub-directory per schema.
    pub root: PathBuf,
    pub schema: String,
    /// Separator of CSV-backed tables.
    pub separator: char,
    pub queries: Vec<QueryConfig>,
}

impl WarehouseConfig {
    pub fn separator_byte(&self) -> u8 {
        self.separator as u8
    }
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            app_name: "TestSparkHive".to_string(),
            root: PathBuf::from("warehouse"),
            schema: "educacionit".to_string(),
            separator: ';',
            queries: vec![
                QueryConfig {
                    label: "canal_venta".to_string(),
                    sql: "SELECT * FROM canal_venta".to_string(),
                    count: true,
                    show: 5,
                },
                QueryConfig {
                    label: "productos (primeros 5)".to_string(),
                    sql: "SELECT * FROM productos LIMIT 5".to_string(),
                    count: false,
                    show: default_show(),
                },
                QueryConfig {
                    label: "clientes".to_string(),
                    sql: "SELECT COUNT(*) AS total FROM clientes".to_string(),
                    count: false,
                    show: default_show(),
                },
            ],
        }
    }
}

/// A labelled sample query run by the probe.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct QueryConfig {
    pub label: String,
    pub sql: String,
    /// Print the number of rows returned.
    #[serde(default)]
    pub count: bool,
    /// Rows of the result to print; 0 prints nothing.
    #[serde(default = "default_show")]
    pub show: usize,
}

fn default_show() -> usize {
    20
}
