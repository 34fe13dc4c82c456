use std::collections::HashMap;
use std::fmt::Display;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{PresolveError, Result};


// A convenience type for parsing csv data
pub type Row = HashMap<String, String>;

pub fn str_to_absolute_path(path_str: &str, default_base_dir: &Path) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        return path;
    } else {
        return [default_base_dir, Path::new(&path)].iter().collect();
    }
}

pub fn file_label(path: &Path) -> String {
    match path.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => path.display().to_string(),
    }
}

/// Reads every row of a headed csv file into a column-name -> value map.
pub fn read_rows(csvpath: &Path) -> Result<Vec<Row>> {
    let file = File::open(csvpath)?;
    let mut reader = csv::Reader::from_reader(file);
    let mut rows = vec![];
    for result in reader.deserialize() {
        let row: Row = result?;
        rows.push(row);
    }
    Ok(rows)
}

/// Returns the trimmed value of a column, treating blank cells as missing.
pub fn get_row_value<'a>(row: &'a Row, column: &str) -> Option<&'a str> {
    match row.get(column) {
        Some(value) if !value.trim().is_empty() => Some(value.trim()),
        _ => None,
    }
}

pub fn parse_required<T>(row: &Row, column: &str, file: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match parse_optional(row, column, file)? {
        Some(value) => Ok(value),
        None => Err(PresolveError::input(file, format!("missing value for column '{}'", column))),
    }
}

pub fn parse_optional<T>(row: &Row, column: &str, file: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    match get_row_value(row, column) {
        Some(value) => match value.parse::<T>() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(err) => Err(PresolveError::input(
                file,
                format!("bad value '{}' in column '{}': {}", value, column, err),
            )),
        },
        None => Ok(None),
    }
}
