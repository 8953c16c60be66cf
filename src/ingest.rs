use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, instrument};

use crate::convert::{ConversionWarning, TypeConverter};
use crate::error::Result;
use crate::io::{self, InputOptions, Row, SpreadsheetInput};
use crate::model::{ConvertedValue, DeclaredType};

/// Declared type per column header, as written in configuration.
pub type ColumnTypes = HashMap<String, String>;

/// A warning tied to the cell it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellWarning {
    pub sheet: String,
    /// 1-based data row number; the header row is not counted.
    pub row: usize,
    pub column: String,
    pub warning: ConversionWarning,
}

/// A converted row: column header → typed value.
pub type ConvertedRow = IndexMap<String, ConvertedValue>;

#[derive(Debug, Clone, PartialEq)]
pub struct ConvertedSheet {
    pub name: String,
    pub rows: Vec<ConvertedRow>,
}

impl ConvertedSheet {
    /// Renders the rows as a JSON array of objects, keeping column order.
    pub fn to_json(&self) -> Result<Value> {
        let mut rows = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            let mut object = Map::new();
            for (column, value) in row {
                object.insert(column.clone(), value.to_json()?);
            }
            rows.push(Value::Object(object));
        }
        Ok(Value::Array(rows))
    }
}

/// Everything produced by one conversion pass over an input.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertedInput {
    pub main: ConvertedSheet,
    pub sub_sheets: Vec<ConvertedSheet>,
    pub warnings: Vec<CellWarning>,
}

impl ConvertedInput {
    pub fn to_json(&self) -> Result<Value> {
        let mut sub_sheets = Map::new();
        for sheet in &self.sub_sheets {
            sub_sheets.insert(sheet.name.clone(), sheet.to_json()?);
        }

        let mut document = Map::new();
        document.insert("main_sheet".into(), Value::String(self.main.name.clone()));
        document.insert("main".into(), self.main.to_json()?);
        document.insert("sub_sheets".into(), Value::Object(sub_sheets));
        document.insert("warnings".into(), serde_json::to_value(&self.warnings)?);
        Ok(Value::Object(document))
    }
}

/// Converts rows cell by cell, recording every warning against its cell.
#[derive(Debug, Clone)]
pub struct SheetConverter {
    converter: TypeConverter,
    column_types: HashMap<String, DeclaredType>,
}

impl SheetConverter {
    /// Validates every declared type before any data is touched; an unknown
    /// one aborts with [`IngestError::UnrecognisedType`](crate::IngestError).
    pub fn new(converter: TypeConverter, column_types: &ColumnTypes) -> Result<Self> {
        let column_types = column_types
            .iter()
            .map(|(column, type_name)| Ok((column.clone(), DeclaredType::from_str(type_name)?)))
            .collect::<Result<HashMap<_, _>>>()?;
        Ok(Self {
            converter,
            column_types,
        })
    }

    pub fn declared_type(&self, column: &str) -> DeclaredType {
        self.column_types.get(column).copied().unwrap_or_default()
    }

    pub fn convert_sheet(
        &self,
        sheet_name: &str,
        rows: &[Row],
        warnings: &mut Vec<CellWarning>,
    ) -> ConvertedSheet {
        let mut converted = Vec::with_capacity(rows.len());
        for (row_idx, row) in rows.iter().enumerate() {
            let mut converted_row = ConvertedRow::with_capacity(row.len());
            for (column, raw) in row {
                let conversion = self.converter.convert(self.declared_type(column), raw);
                if let Some(warning) = conversion.warning {
                    warnings.push(CellWarning {
                        sheet: sheet_name.to_string(),
                        row: row_idx + 1,
                        column: column.clone(),
                        warning,
                    });
                }
                converted_row.insert(column.clone(), conversion.value);
            }
            converted.push(converted_row);
        }

        ConvertedSheet {
            name: sheet_name.to_string(),
            rows: converted,
        }
    }
}

/// Reads the input at `path` and converts the main sheet and every sub-sheet.
#[instrument(level = "info", skip_all, fields(input = %path.display()))]
pub fn convert_input(
    path: &Path,
    options: &InputOptions,
    column_types: &ColumnTypes,
) -> Result<ConvertedInput> {
    let converter = TypeConverter::with_timezone_name(&options.timezone)?;
    let sheet_converter = SheetConverter::new(converter, column_types)?;

    let mut input = io::open_input(path, options);
    convert_sheets(input.as_mut(), &sheet_converter)
}

/// Runs a conversion pass over an already constructed reader.
pub fn convert_sheets(
    input: &mut dyn SpreadsheetInput,
    sheet_converter: &SheetConverter,
) -> Result<ConvertedInput> {
    input.read_sheets()?;
    let main_name = input.main_sheet_name().unwrap_or_default().to_string();
    let sub_names = input.sub_sheet_names().to_vec();

    let mut warnings = Vec::new();
    let main_rows = input.sheet_lines(&main_name)?;
    let main = sheet_converter.convert_sheet(&main_name, &main_rows, &mut warnings);
    info!(sheet = %main_name, row_count = main.rows.len(), "converted main sheet");

    let mut sub_sheets = Vec::with_capacity(sub_names.len());
    for name in &sub_names {
        let rows = input.sheet_lines(name)?;
        let sheet = sheet_converter.convert_sheet(name, &rows, &mut warnings);
        info!(sheet = %name, row_count = sheet.rows.len(), "converted sub-sheet");
        sub_sheets.push(sheet);
    }

    if !warnings.is_empty() {
        info!(warning_count = warnings.len(), "conversion finished with warnings");
    }

    Ok(ConvertedInput {
        main,
        sub_sheets,
        warnings,
    })
}
