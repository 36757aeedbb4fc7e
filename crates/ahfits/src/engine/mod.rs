//! The FITS engine boundary.
//!
//! The file context never touches bytes directly; it drives an engine through
//! [`FitsEngine`] and receives a [`Status`] for every failure.

mod pure;

pub use pure::PureEngine;

use std::path::Path;

use crate::hdu::HduKind;
use crate::header::Card;
use crate::status::Status;
use crate::tform::Tform;
use crate::value::Value;

/// Whether a file is opened for reading or writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOpenMode {
    ReadOnly,
    ReadWrite,
}

/// Result of a column-name lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnMatch {
    /// The template identified exactly one column.
    Unique { name: String, number: usize },
    /// One of several columns matching the template.
    NotUnique { name: String, number: usize },
}

impl ColumnMatch {
    pub fn name(&self) -> &str {
        match self {
            ColumnMatch::Unique { name, .. } | ColumnMatch::NotUnique { name, .. } => name,
        }
    }

    pub fn number(&self) -> usize {
        match self {
            ColumnMatch::Unique { number, .. } | ColumnMatch::NotUnique { number, .. } => *number,
        }
    }
}

/// A column to create in a new binary table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub tform: String,
    pub unit: Option<String>,
}

impl ColumnSpec {
    pub fn new(name: &str, tform: &str) -> ColumnSpec {
        ColumnSpec {
            name: name.to_string(),
            tform: tform.to_string(),
            unit: None,
        }
    }

    pub fn with_unit(mut self, unit: &str) -> ColumnSpec {
        self.unit = Some(unit.to_string());
        self
    }
}

/// Operations the file context needs from a FITS engine.
///
/// HDU indices are 0-based (primary = 0); column and row numbers are 1-based.
pub trait FitsEngine {
    /// Open an existing file.
    fn open(path: &Path, mode: FileOpenMode) -> Result<Self, Status>
    where
        Self: Sized;

    /// Create a new file holding an empty primary HDU. Fails when the file
    /// already exists.
    fn create(path: &Path) -> Result<Self, Status>
    where
        Self: Sized;

    fn mode(&self) -> FileOpenMode;

    fn num_hdus(&self) -> usize;

    fn current_hdu(&self) -> usize;

    fn move_to_hdu(&mut self, index: usize) -> Result<HduKind, Status>;

    /// Move to the first extension whose EXTNAME matches, ignoring case.
    fn move_to_extname(&mut self, extname: &str) -> Result<HduKind, Status>;

    fn hdu_kind(&self) -> HduKind;

    /// Read a keyword of the current HDU. Absent keywords are `KEY_NO_EXIST`.
    fn read_card(&self, keyword: &str) -> Result<Card, Status>;

    /// Set a keyword value, keeping the existing comment unless one is
    /// given. Absent keywords are appended.
    fn update_key(&mut self, keyword: &str, value: Value, comment: Option<&str>)
        -> Result<(), Status>;

    fn modify_comment(&mut self, keyword: &str, comment: &str) -> Result<(), Status>;

    /// Append a commentary card such as HISTORY or COMMENT.
    fn write_commentary(&mut self, keyword: &str, text: &str) -> Result<(), Status>;

    /// Find a column by name template. Several matches give the first one as
    /// [`ColumnMatch::NotUnique`].
    fn column_number(&self, case_sensitive: bool, template: &str) -> Result<ColumnMatch, Status>;

    /// Iterative template match. With `resume` set, the search continues
    /// after the previously reported column; `COL_NOT_FOUND` ends it.
    fn match_column(
        &mut self,
        case_sensitive: bool,
        template: &str,
        resume: bool,
    ) -> Result<ColumnMatch, Status>;

    /// Parsed TFORM of a binary-table column.
    fn column_type(&self, colnum: usize) -> Result<Tform, Status>;

    fn num_columns(&self) -> Result<usize, Status>;

    fn num_rows(&self) -> Result<usize, Status>;

    /// Element count and heap offset of a variable-length cell.
    fn read_descriptor(&self, colnum: usize, row: usize) -> Result<(u64, u64), Status>;

    /// Insert a column so that it becomes column `colnum`. Later columns
    /// and their keywords shift up by one.
    fn insert_column(&mut self, colnum: usize, name: &str, tform: &str) -> Result<(), Status>;

    /// Append an empty binary table with `rows` zeroed rows and move to it.
    fn create_binary_table(
        &mut self,
        extname: &str,
        columns: &[ColumnSpec],
        rows: usize,
    ) -> Result<(), Status>;

    /// Write pending changes to disk.
    fn flush(&mut self) -> Result<(), Status>;

    /// Flush and release the file.
    fn close(&mut self) -> Result<(), Status>;
}
