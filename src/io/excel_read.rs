use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use calamine::{DataType, Range, Reader, Xlsx};
use chrono::{DurationRound, NaiveDateTime, TimeDelta};
use tracing::{debug, instrument};

use crate::convert::whole_float;
use crate::error::{IngestError, Result};
use crate::io::{Row, SpreadsheetInput};
use crate::model::RawValue;

type Workbook = Xlsx<BufReader<File>>;

/// Reads an `.xlsx` workbook; every worksheet is one sheet.
pub struct XlsxInput {
    path: PathBuf,
    main_sheet_name: Option<String>,
    sub_sheet_names: Vec<String>,
    workbook: Option<Workbook>,
}

impl XlsxInput {
    /// Creates a reader; the file is opened by
    /// [`read_sheets`](SpreadsheetInput::read_sheets).
    pub fn new(path: impl Into<PathBuf>, main_sheet_name: Option<String>) -> Self {
        Self {
            path: path.into(),
            main_sheet_name,
            sub_sheet_names: Vec::new(),
            workbook: None,
        }
    }

    fn workbook(&mut self) -> Result<&mut Workbook> {
        let workbook = match self.workbook.take() {
            Some(workbook) => workbook,
            None => open_xlsx(&self.path)?,
        };
        Ok(self.workbook.insert(workbook))
    }
}

fn open_xlsx(path: &Path) -> Result<Workbook> {
    // Open through std so a missing file surfaces as a plain I/O error.
    let file = File::open(path)?;
    Ok(Xlsx::new(BufReader::new(file))?)
}

impl SpreadsheetInput for XlsxInput {
    #[instrument(level = "debug", skip(self), fields(path = %self.path.display()))]
    fn read_sheets(&mut self) -> Result<()> {
        let mut sheet_names = self.workbook()?.sheet_names().to_vec();

        let main = match &self.main_sheet_name {
            Some(name) => name.clone(),
            None => sheet_names
                .first()
                .cloned()
                .ok_or_else(|| IngestError::EmptyInput(self.path.display().to_string()))?,
        };
        if !sheet_names.contains(&main) {
            return Err(IngestError::MainSheetNotFound {
                name: main,
                container: "workbook",
            });
        }

        sheet_names.retain(|name| name != &main);
        debug!(main = %main, sub_sheets = sheet_names.len(), "discovered worksheets");
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
        let range = self
            .workbook()?
            .worksheet_range(sheet_name)
            .ok_or_else(|| IngestError::MissingSheet(sheet_name.to_string()))??;
        let rows = range_to_rows(&range);
        debug!(row_count = rows.len(), "read worksheet");
        Ok(rows)
    }
}

fn range_to_rows(range: &Range<DataType>) -> Vec<Row> {
    let mut lines = range.rows();
    let headers: Vec<String> = match lines.next() {
        Some(first_row) => first_row
            .iter()
            .map(|cell| cell_to_raw(cell).to_string())
            .collect(),
        None => return Vec::new(),
    };

    let mut rows = Vec::new();
    for line in lines {
        if line.iter().all(|cell| matches!(cell, DataType::Empty)) {
            continue;
        }

        let mut row = Row::new();
        for (col_idx, header) in headers.iter().enumerate() {
            if header.is_empty() {
                continue;
            }
            let value = line.get(col_idx).map(cell_to_raw).unwrap_or(RawValue::Empty);
            row.insert(header.clone(), value);
        }
        rows.push(row);
    }
    rows
}

/// Maps a decoded cell to a raw value. Formula cells arrive as their cached
/// result, so no formula text ever reaches the converter.
fn cell_to_raw(cell: &DataType) -> RawValue {
    match cell {
        DataType::Empty => RawValue::Empty,
        DataType::String(value) => RawValue::String(value.clone()),
        DataType::Int(value) => RawValue::Integer(*value),
        DataType::Float(value) => match whole_float(*value) {
            Some(integer) => RawValue::Integer(integer),
            None => RawValue::Float(*value),
        },
        DataType::Bool(value) => RawValue::Boolean(*value),
        DataType::DateTime(serial) => match cell.as_datetime() {
            Some(timestamp) => RawValue::Timestamp(round_to_second(timestamp)),
            None => RawValue::Float(*serial),
        },
        other => RawValue::String(other.to_string()),
    }
}

/// Serial dates are stored as fractional days, so decoded times can land a
/// hair before the intended second.
fn round_to_second(timestamp: NaiveDateTime) -> NaiveDateTime {
    timestamp
        .duration_round(TimeDelta::seconds(1))
        .unwrap_or(timestamp)
}
