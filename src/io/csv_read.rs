use std::fs;
use std::path::PathBuf;

use csv::ReaderBuilder;
use encoding_rs::Encoding;
use tracing::{debug, instrument};

use crate::error::{IngestError, Result};
use crate::io::{Row, SpreadsheetInput};
use crate::model::RawValue;

/// Reads a directory of CSV files, one sheet per `<sheet name>.csv` file.
#[derive(Debug, Clone)]
pub struct CsvInput {
    directory: PathBuf,
    main_sheet_name: Option<String>,
    encoding: String,
    sub_sheet_names: Vec<String>,
}

impl CsvInput {
    /// Creates a reader; nothing is touched on disk until
    /// [`read_sheets`](SpreadsheetInput::read_sheets) is called.
    pub fn new(
        directory: impl Into<PathBuf>,
        main_sheet_name: Option<String>,
        encoding: impl Into<String>,
    ) -> Self {
        Self {
            directory: directory.into(),
            main_sheet_name,
            encoding: encoding.into(),
            sub_sheet_names: Vec::new(),
        }
    }

    fn resolve_encoding(&self) -> Result<&'static Encoding> {
        Encoding::for_label(normalize_label(&self.encoding).as_bytes())
            .ok_or_else(|| IngestError::UnknownEncoding(self.encoding.clone()))
    }

    fn sheet_path(&self, sheet_name: &str) -> PathBuf {
        self.directory.join(format!("{sheet_name}.csv"))
    }
}

impl SpreadsheetInput for CsvInput {
    #[instrument(level = "debug", skip(self), fields(directory = %self.directory.display()))]
    fn read_sheets(&mut self) -> Result<()> {
        self.resolve_encoding()?;

        let mut sheet_names: Vec<String> = Vec::new();
        for entry in fs::read_dir(&self.directory)? {
            let path = entry?.path();
            let is_csv = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
            if !is_csv || !path.is_file() {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                sheet_names.push(stem.to_string());
            }
        }
        sheet_names.sort();

        let main = match &self.main_sheet_name {
            Some(name) => name.clone(),
            None => sheet_names.first().cloned().ok_or_else(|| {
                IngestError::EmptyInput(self.directory.display().to_string())
            })?,
        };
        if !sheet_names.contains(&main) {
            return Err(IngestError::MainSheetNotFound {
                name: main,
                container: "directory",
            });
        }

        sheet_names.retain(|name| name != &main);
        debug!(main = %main, sub_sheets = sheet_names.len(), "discovered CSV sheets");
        self.main_sheet_name = Some(main);
        self.sub_sheet_names = sheet_names;
        Ok(())
    }

    fn main_sheet_name(&self) -> Option<&str> {
        self.main_sheet_name.as_deref()
    }

    fn sub_sheet_names(&self) -> &[String] {
        &self.sub_sheet_names
    }

    #[instrument(level = "debug", skip(self))]
    fn sheet_lines(&mut self, sheet_name: &str) -> Result<Vec<Row>> {
        let encoding = self.resolve_encoding()?;
        let bytes = fs::read(self.sheet_path(sheet_name))?;
        // A byte order mark overrides the configured encoding.
        let (text, _, _) = encoding.decode(&bytes);

        let mut reader = ReaderBuilder::new()
            .flexible(true)
            .from_reader(text.as_bytes());
        let headers = reader.headers()?.clone();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.iter().all(str::is_empty) {
                continue;
            }

            let mut row = Row::new();
            for (col_idx, header) in headers.iter().enumerate() {
                if header.is_empty() {
                    continue;
                }
                let cell = record.get(col_idx).unwrap_or_default();
                row.insert(header.to_string(), RawValue::String(cell.to_string()));
            }
            rows.push(row);
        }

        debug!(row_count = rows.len(), "read CSV sheet");
        Ok(rows)
    }
}

/// Maps codec spellings such as `latin-1`, `utf16` or `UTF_8` onto the
/// WHATWG labels `encoding_rs` understands.
fn normalize_label(label: &str) -> String {
    let label = label.trim().to_ascii_lowercase().replace('_', "-");
    match label.as_str() {
        "latin-1" | "latin" | "l1" => "latin1".to_string(),
        "utf8" | "u8" => "utf-8".to_string(),
        "utf16" | "u16" => "utf-16".to_string(),
        "utf16le" | "utf-16-le" => "utf-16le".to_string(),
        "utf16be" | "utf-16-be" => "utf-16be".to_string(),
        _ => label,
    }
}
