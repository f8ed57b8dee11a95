use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use polars::prelude::*;

use crate::error::{Error, Result};

/// Reads a delimited file with a header row.
///
/// Every column is read as text so that pass-through fields (phone
/// numbers, coordinates, dates) come back out exactly as they went in.
pub fn load(path: &Path, separator: u8) -> Result<DataFrame> {
    if !path.is_file() {
        return Err(Error::MissingFile { path: path.to_path_buf() });
    }
    let parse = |source| Error::Parse { path: path.to_path_buf(), source };
    CsvReader::from_path(path)
        .map_err(parse)?
        .has_header(true)
        .with_separator(separator)
        .infer_schema(Some(0))
        .finish()
        .map_err(parse)
}

/// Writes `df` as `<output_dir>/<filename>`, creating the directory if
/// needed, and returns the written path.
pub fn export(df: &DataFrame, output_dir: &Path, filename: &str, separator: u8) -> Result<PathBuf> {
    fs::create_dir_all(output_dir).map_err(Error::io(output_dir))?;

    let path = output_dir.join(filename);
    let mut file = BufWriter::new(fs::File::create(&path).map_err(Error::io(&path))?);
    let mut df = df.clone();
    tracing::debug!(path = %path.display(), shape = ?df.shape(), "writing batch");
    CsvWriter::new(&mut file)
        .has_header(true)
        .with_separator(separator)
        .finish(&mut df)
        .map_err(|source| Error::Write { path: path.clone(), source })?;
    file.flush().map_err(Error::io(&path))?;
    Ok(path)
}
