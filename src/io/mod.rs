//! Sheet readers. Each reader exposes a main sheet plus any number of
//! sub-sheets as rows of raw cells keyed by their column header.

pub mod csv_read;
pub mod excel_read;

use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::error::Result;
use crate::model::RawValue;

pub use csv_read::CsvInput;
pub use excel_read::XlsxInput;

/// One data row: column header → raw cell, in sheet column order.
pub type Row = IndexMap<String, RawValue>;

/// Source of tabular data made of a main sheet and zero or more sub-sheets.
pub trait SpreadsheetInput {
    /// Discovers the available sheets and checks the main sheet is present.
    fn read_sheets(&mut self) -> Result<()>;

    /// Name of the main sheet. `None` until [`read_sheets`](Self::read_sheets)
    /// has resolved it when no name was configured.
    fn main_sheet_name(&self) -> Option<&str>;

    /// Every sheet other than the main sheet.
    fn sub_sheet_names(&self) -> &[String];

    /// Reads all data rows of the named sheet.
    fn sheet_lines(&mut self, sheet_name: &str) -> Result<Vec<Row>>;

    /// Reads all data rows of the main sheet.
    fn main_sheet_lines(&mut self) -> Result<Vec<Row>> {
        if self.main_sheet_name().is_none() {
            self.read_sheets()?;
        }
        let name = self.main_sheet_name().unwrap_or_default().to_string();
        self.sheet_lines(&name)
    }
}

/// Physical layout of the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// A directory holding one `.csv` file per sheet.
    Csv,
    /// A single `.xlsx` workbook.
    Xlsx,
}

impl InputFormat {
    /// Guesses the format: directories are CSV, everything else is a workbook
    /// unless it carries a `.csv` extension.
    pub fn detect(path: &Path) -> InputFormat {
        if path.is_dir() {
            return InputFormat::Csv;
        }
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => InputFormat::Csv,
            _ => InputFormat::Xlsx,
        }
    }
}

/// Reader configuration shared by the CSV and XLSX inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputOptions {
    /// Explicit format; detected from the path when `None`.
    pub format: Option<InputFormat>,
    /// Main sheet name; the first sheet is used when `None`.
    pub main_sheet_name: Option<String>,
    /// IANA timezone used to render timestamps.
    pub timezone: String,
    /// Text encoding label for CSV files.
    pub encoding: String,
}

impl Default for InputOptions {
    fn default() -> Self {
        Self {
            format: None,
            main_sheet_name: None,
            timezone: "UTC".to_string(),
            encoding: "utf-8".to_string(),
        }
    }
}

/// Builds the reader matching the configured or detected format.
///
/// A path naming a single `.csv` file reads its whole directory, with that
/// file as the main sheet unless another one is configured.
pub fn open_input(path: &Path, options: &InputOptions) -> Box<dyn SpreadsheetInput> {
    match options.format.unwrap_or_else(|| InputFormat::detect(path)) {
        InputFormat::Csv => {
            let (directory, file_stem) = split_csv_path(path);
            let main_sheet_name = options.main_sheet_name.clone().or(file_stem);
            Box::new(CsvInput::new(
                directory,
                main_sheet_name,
                options.encoding.clone(),
            ))
        }
        InputFormat::Xlsx => Box::new(XlsxInput::new(
            path.to_path_buf(),
            options.main_sheet_name.clone(),
        )),
    }
}

fn split_csv_path(path: &Path) -> (PathBuf, Option<String>) {
    let is_csv_file = !path.is_dir()
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if !is_csv_file {
        return (path.to_path_buf(), None);
    }

    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string);
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    (directory, stem)
}
