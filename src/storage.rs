use std::fs;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// On-disk formats a warehouse table can be stored in.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Parquet,
    Ipc,
    Csv,
}

impl Format {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "parquet" => Some(Format::Parquet),
            "ipc" | "arrow" | "feather" => Some(Format::Ipc),
            "csv" => Some(Format::Csv),
            _ => None,
        }
    }
}

/// Where a table's data lives: one file, or a directory of part files.
#[derive(Debug, Clone)]
pub struct TableStorage {
    pub format: Format,
    pub files: Vec<PathBuf>,
}

impl TableStorage {
    /// Resolves a table entry. Returns `None` for entries holding no
    /// readable data, or mixing formats.
    pub fn discover(path: &Path) -> std::io::Result<Option<Self>> {
        if path.is_file() {
            return Ok(Format::from_path(path).map(|format| Self {
                format,
                files: vec![path.to_path_buf()],
            }));
        }

        let mut files = Vec::new();
        extract_files(path, &mut files)?;
        files.sort();
        let Some(format) = files.first().and_then(|f| Format::from_path(f)) else {
            return Ok(None);
        };
        if files.iter().any(|f| Format::from_path(f) != Some(format)) {
            return Ok(None);
        }
        Ok(Some(Self { format, files }))
    }

    pub fn scan(&self, separator: u8) -> PolarsResult<LazyFrame> {
        let mut frames = self
            .files
            .iter()
            .map(|path| scan_file(path, self.format, separator))
            .collect::<PolarsResult<Vec<LazyFrame>>>()?;
        if frames.len() == 1 {
            return Ok(frames.remove(0));
        }
        concat(frames, UnionArgs::default())
    }
}

fn scan_file(path: &Path, format: Format, separator: u8) -> PolarsResult<LazyFrame> {
    match format {
        Format::Parquet => LazyFrame::scan_parquet(path, ScanArgsParquet::default()),
        Format::Ipc => LazyFrame::scan_ipc(path, ScanArgsIpc::default()),
        Format::Csv => LazyCsvReader::new(path)
            .has_header(true)
            .with_separator(separator)
            .finish(),
    }
}

/// Collects every data file below `dir`, skipping hidden entries such as
/// `_SUCCESS` markers or `.crc` files.
pub fn extract_files<'a>(dir: &Path, files: &'a mut Vec<PathBuf>) -> std::io::Result<&'a mut Vec<PathBuf>> {
    if dir.is_dir() {
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let hidden = path
                .file_name()
                .and_then(|n| n.to_str())
                .map_or(true, |n| n.starts_with('.') || n.starts_with('_'));
            if hidden {
                continue;
            }
            if path.is_dir() {
                extract_files(&path, files)?;
            } else if Format::from_path(&path).is_some() {
                files.push(path);
            }
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn format_from_extension() {
        assert_eq!(Format::from_path(Path::new("a/b.parquet")), Some(Format::Parquet));
        assert_eq!(Format::from_path(Path::new("b.CSV")), Some(Format::Csv));
        assert_eq!(Format::from_path(Path::new("b.arrow")), Some(Format::Ipc));
        assert_eq!(Format::from_path(Path::new("b.txt")), None);
        assert_eq!(Format::from_path(Path::new("noext")), None);
    }

    #[test]
    fn partitioned_table_is_scanned_as_one() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let root = dir.path().join("canal_venta");
        for (part, rows) in [("anio=2023", 2), ("anio=2024", 3)] {
            let folder = root.join(part);
            fs::create_dir_all(&folder)?;
            let mut df = df!("id" => (0..rows).collect::<Vec<i64>>())?;
            let mut file = fs::File::create(folder.join("file.parquet"))?;
            ParquetWriter::new(&mut file).finish(&mut df)?;
        }
        fs::write(root.join("_SUCCESS"), "")?;

        let storage = TableStorage::discover(&root)?.expect("table");
        assert_eq!(storage.format, Format::Parquet);
        assert_eq!(storage.files.len(), 2);
        assert_eq!(storage.scan(b';')?.collect()?.height(), 5);
        Ok(())
    }

    #[test]
    fn mixed_or_empty_directories_are_ignored() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let empty = dir.path().join("vacia");
        fs::create_dir_all(&empty)?;
        assert!(TableStorage::discover(&empty)?.is_none());

        let mixed = dir.path().join("mixta");
        fs::create_dir_all(&mixed)?;
        fs::write(mixed.join("a.csv"), "id\n1\n")?;
        fs::write(mixed.join("b.arrow"), "")?;
        assert!(TableStorage::discover(&mixed)?.is_none());
        Ok(())
    }
}
