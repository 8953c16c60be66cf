//! Core library for the sheet-ingest command line application.
//!
//! Spreadsheet rows come in through the readers under [`io`], as raw cells
//! described in [`model`]. The [`convert`] module turns each cell into a typed
//! value according to the column's declared type, and [`ingest`] runs that
//! conversion over a main sheet and its sub-sheets.

pub mod convert;
pub mod error;
pub mod ingest;
pub mod io;
pub mod model;

pub use convert::{Conversion, ConversionWarning, TypeConverter};
pub use error::{IngestError, Result};
pub use model::{ArrayItem, ConvertedValue, DeclaredType, RawValue};
