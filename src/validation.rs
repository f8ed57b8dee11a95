//! Business rules applied to a customer batch before it is staged.
//!
//! The checks run in a fixed order and stop at the first failure:
//! required columns, unique key, then the age range.

use polars::prelude::*;
use thiserror::Error;

use crate::config::RecordSchema;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required column: {0}")]
    MissingColumn(String),

    #[error("duplicate values in {column}: {}", values.join(", "))]
    DuplicateIds { column: String, values: Vec<String> },

    #[error("{rows} value(s) in key column {column} are missing or not integers")]
    IdNotInteger { column: String, rows: usize },

    #[error("{rows} value(s) in {column} are not integers")]
    AgeNotInteger { column: String, rows: usize },

    #[error("{rows} value(s) in {column} outside the valid range ({min}-{max}), observed {lowest} to {highest}")]
    AgeOutOfRange {
        column: String,
        rows: usize,
        min: i64,
        max: i64,
        lowest: i64,
        highest: i64,
    },

    #[error("could not check {column}: {message}")]
    Unreadable { column: String, message: String },
}

/// Checks a batch against the schema, returning the first rule it breaks.
pub fn check(df: &DataFrame, schema: &RecordSchema) -> Result<(), ValidationError> {
    let names = df.get_column_names();
    if let Some(missing) = schema
        .required_columns
        .iter()
        .find(|c| !names.contains(&c.as_str()))
    {
        return Err(ValidationError::MissingColumn(missing.clone()));
    }

    check_unique(column(df, &schema.id_column)?)?;
    check_ages(column(df, &schema.age_column)?, schema)
}

/// Prints the verdict for a batch and returns whether it may be exported.
pub fn validate(df: &DataFrame, schema: &RecordSchema) -> bool {
    report(check(df, schema)).is_ok()
}

pub(crate) fn report(verdict: Result<(), ValidationError>) -> Result<(), ValidationError> {
    println!("\nValidating data...");
    match &verdict {
        Ok(()) => println!("Data validated successfully"),
        Err(e) => println!("Validation failed: {e}"),
    }
    verdict
}

fn column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series, ValidationError> {
    df.column(name)
        .map_err(|_| ValidationError::MissingColumn(name.to_string()))
}

fn check_unique(ids: &Series) -> Result<(), ValidationError> {
    let column = ids.name().to_string();
    let keys = integers(ids).map_err(|rows| ValidationError::IdNotInteger { column: column.clone(), rows })?;
    // A missing key cannot be told apart from any other row.
    if keys.null_count() > 0 {
        return Err(ValidationError::IdNotInteger { column, rows: keys.null_count() });
    }

    let values = duplicated_keys(&keys).map_err(|e| ValidationError::Unreadable {
        column: column.clone(),
        message: e.to_string(),
    })?;
    if values.is_empty() {
        return Ok(());
    }
    Err(ValidationError::DuplicateIds { column, values })
}

/// Keys occurring more than once, in order of first appearance.
fn duplicated_keys(keys: &Series) -> PolarsResult<Vec<String>> {
    let mask = is_duplicated(keys)?;
    let repeated = keys.filter(&mask)?.unique_stable()?;
    Ok(repeated.i64()?.into_iter().flatten().map(|v| v.to_string()).collect())
}

/// Reads a column as whole numbers, trimming text values first. Nulls and
/// blank strings stay null. On failure returns how many values are not
/// integers.
fn integers(values: &Series) -> Result<Series, usize> {
    let trimmed = match values.utf8() {
        Ok(text) => text
            .into_iter()
            .map(|v| v.map(str::trim).filter(|v| !v.is_empty()))
            .collect::<Utf8Chunked>()
            .with_name(values.name())
            .into_series(),
        Err(_) => values.clone(),
    };
    let present = trimmed.len() - trimmed.null_count();

    // Text that fails to parse comes back as null.
    let numeric = trimmed.cast(&DataType::Float64).map_err(|_| present)?;
    let floats = numeric.f64().map_err(|_| present)?;
    let unparsed = numeric.null_count().saturating_sub(trimmed.null_count());
    let fractional = floats.into_iter().flatten().filter(|v| v.fract() != 0.0).count();
    if unparsed + fractional > 0 {
        return Err(unparsed + fractional);
    }
    numeric.cast(&DataType::Int64).map_err(|_| present)
}

fn check_ages(ages: &Series, schema: &RecordSchema) -> Result<(), ValidationError> {
    let column = ages.name().to_string();
    let values = integers(ages).map_err(|rows| ValidationError::AgeNotInteger { column: column.clone(), rows })?;
    let values = values.i64().map_err(|e| ValidationError::Unreadable {
        column: column.clone(),
        message: e.to_string(),
    })?;

    let mut rows = 0;
    let mut lowest = i64::MAX;
    let mut highest = i64::MIN;
    for age in values.into_iter().flatten() {
        lowest = lowest.min(age);
        highest = highest.max(age);
        if age < schema.min_age || age > schema.max_age {
            rows += 1;
        }
    }
    if rows > 0 {
        return Err(ValidationError::AgeOutOfRange {
            column,
            rows,
            min: schema.min_age,
            max: schema.max_age,
            lowest,
            highest,
        });
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::REQUIRED_COLUMNS;
    use anyhow::Result;

    /// A batch with every required column, all values as text like a CSV load.
    pub(crate) fn customers(ids: &[&str], ages: &[&str]) -> DataFrame {
        let rows = ids.len();
        let columns = REQUIRED_COLUMNS
            .iter()
            .map(|name| match *name {
                "ID" => Series::new(name, ids),
                "Edad" => Series::new(name, ages),
                _ => Series::new(
                    name,
                    (0..rows).map(|i| format!("{name}-{i}")).collect::<Vec<_>>(),
                ),
            })
            .collect::<Vec<_>>();
        DataFrame::new(columns).unwrap()
    }

    #[test]
    fn accepts_clean_batch() {
        let df = customers(&["1", "2", "3"], &["25", "40", "65"]);
        assert_eq!(check(&df, &RecordSchema::default()), Ok(()));
        assert!(validate(&df, &RecordSchema::default()));
    }

    #[test]
    fn every_required_column_is_enforced() -> Result<()> {
        let df = customers(&["1", "2"], &["30", "31"]);
        for name in REQUIRED_COLUMNS {
            let without = df.drop(name)?;
            assert_eq!(
                check(&without, &RecordSchema::default()),
                Err(ValidationError::MissingColumn(name.to_string())),
            );
            assert!(!validate(&without, &RecordSchema::default()));
        }
        Ok(())
    }

    #[test]
    fn extra_columns_and_order_are_tolerated() -> Result<()> {
        let mut df = customers(&["1", "2"], &["30", "31"]);
        df.with_column(Series::new("Observaciones", &["a", "b"]))?;
        let mut reversed: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
        reversed.reverse();
        let df = df.select(reversed)?;
        assert!(validate(&df, &RecordSchema::default()));
        Ok(())
    }

    #[test]
    fn rejects_duplicate_ids() {
        let df = customers(&["1", "1", "2", "2", "2"], &["20", "21", "22", "23", "24"]);
        assert_eq!(
            check(&df, &RecordSchema::default()),
            Err(ValidationError::DuplicateIds {
                column: "ID".to_string(),
                values: vec!["1".to_string(), "2".to_string()],
            }),
        );
    }

    #[test]
    fn ids_compare_as_integers() {
        let df = customers(&["1", "01", "2", " 2"], &["20", "21", "22", "23"]);
        assert_eq!(
            check(&df, &RecordSchema::default()),
            Err(ValidationError::DuplicateIds {
                column: "ID".to_string(),
                values: vec!["1".to_string(), "2".to_string()],
            }),
        );
    }

    #[test]
    fn non_integer_ids_are_rejected() {
        let df = customers(&["abc", "1.5", "2"], &["20", "21", "22"]);
        assert_eq!(
            check(&df, &RecordSchema::default()),
            Err(ValidationError::IdNotInteger { column: "ID".to_string(), rows: 2 }),
        );
        assert!(!validate(&df, &RecordSchema::default()));
    }

    #[test]
    fn missing_ids_are_rejected() -> Result<()> {
        let mut df = customers(&["1", "2"], &["20", "21"]);
        df.with_column(Series::new("ID", &[Some("1"), None]))?;
        assert_eq!(
            check(&df, &RecordSchema::default()),
            Err(ValidationError::IdNotInteger { column: "ID".to_string(), rows: 1 }),
        );
        Ok(())
    }

    #[test]
    fn duplicate_check_works_on_integer_keys() -> Result<()> {
        let mut df = customers(&["a", "b", "c"], &["1", "2", "3"]);
        df.with_column(Series::new("ID", &[7i64, 8, 7]))?;
        match check(&df, &RecordSchema::default()) {
            Err(ValidationError::DuplicateIds { values, .. }) => assert_eq!(values, vec!["7"]),
            other => panic!("expected duplicate ids, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn age_bounds_are_inclusive() {
        let df = customers(&["1", "2"], &["0", "120"]);
        assert!(validate(&df, &RecordSchema::default()));

        for bad in ["-1", "121"] {
            let df = customers(&["1", "2"], &["30", bad]);
            assert!(!validate(&df, &RecordSchema::default()), "age {bad} accepted");
        }
    }

    #[test]
    fn out_of_range_reports_observed_span() {
        let df = customers(&["1", "2", "3"], &["-4", "50", "130"]);
        assert_eq!(
            check(&df, &RecordSchema::default()),
            Err(ValidationError::AgeOutOfRange {
                column: "Edad".to_string(),
                rows: 2,
                min: 0,
                max: 120,
                lowest: -4,
                highest: 130,
            }),
        );
    }

    #[test]
    fn non_numeric_ages_are_rejected() {
        let df = customers(&["1", "2", "3"], &["30", "treinta", "30.5"]);
        assert_eq!(
            check(&df, &RecordSchema::default()),
            Err(ValidationError::AgeNotInteger { column: "Edad".to_string(), rows: 2 }),
        );
    }

    #[test]
    fn missing_ages_are_not_range_checked() -> Result<()> {
        let mut df = customers(&["1", "2"], &["30", "31"]);
        df.with_column(Series::new("Edad", &[Some("44"), None]))?;
        assert!(validate(&df, &RecordSchema::default()));
        Ok(())
    }

    #[test]
    fn padded_ages_are_read_as_numbers() {
        let df = customers(&["1", "2", "3"], &[" 30", "40 ", "\t0"]);
        assert_eq!(check(&df, &RecordSchema::default()), Ok(()));

        let df = customers(&["1", "2"], &[" 30", " 121 "]);
        assert!(matches!(
            check(&df, &RecordSchema::default()),
            Err(ValidationError::AgeOutOfRange { rows: 1, highest: 121, .. })
        ));
    }

    #[test]
    fn custom_rules_apply() {
        let schema = RecordSchema { max_age: 99, ..RecordSchema::default() };
        let df = customers(&["1"], &["100"]);
        assert!(!validate(&df, &schema));
    }
}
