//! The open-file context: engine handle, current HDU and row, flags.

use std::fs;
use std::path::Path;

use crate::colinfo::ColumnCache;
use crate::config::Settings;
use crate::engine::{ColumnSpec, FileOpenMode, FitsEngine, PureEngine};
use crate::error::{Error, Result};
use crate::hdu::HduKind;
use crate::header::Card;
use crate::status::Status;
use crate::value::Value;

/// Split `file.fits[EXT]` into the file name and the HDU selector.
pub fn split_extended_name(spec: &str) -> (&str, Option<&str>) {
    match spec.find('[') {
        Some(open) if spec.ends_with(']') => (&spec[..open], Some(&spec[open + 1..spec.len() - 1])),
        Some(open) => (&spec[..open], None),
        None => (spec, None),
    }
}

/// An open FITS file together with its current HDU, current row and
/// column-metadata cache.
///
/// Every HDU change drops the cache. After [`FitsFile::close`] all
/// operations fail with [`Error::NullContext`].
#[derive(Debug)]
pub struct FitsFile<E: FitsEngine = PureEngine> {
    engine: Option<E>,
    filename: String,
    settings: Settings,
    row: usize,
    history: bool,
    stamp_params: bool,
    buffer_padding: bool,
    pub(crate) cache: ColumnCache,
}

impl<E: FitsEngine> FitsFile<E> {
    /// Open an existing file read-only. `file.fits[EXT]` moves to `EXT`.
    pub fn open(spec: &str, settings: &Settings) -> Result<Self> {
        Self::open_with_mode(spec, settings, FileOpenMode::ReadOnly)
    }

    /// Open an existing file for reading and writing.
    pub fn edit(spec: &str, settings: &Settings) -> Result<Self> {
        Self::open_with_mode(spec, settings, FileOpenMode::ReadWrite)
    }

    fn open_with_mode(spec: &str, settings: &Settings, mode: FileOpenMode) -> Result<Self> {
        let (path, selector) = split_extended_name(spec);
        let engine = E::open(Path::new(path), mode).map_err(|status| Error::Engine {
            prefix: format!("{path}: "),
            context: "could not open file".to_string(),
            status,
        })?;
        let mut file = Self::from_engine(engine, path, settings);
        if let Some(selector) = selector {
            file.select_hdu(selector)?;
        }
        log::info!(
            "opened {} ({:?}, buffer: {})",
            file.filename,
            mode,
            file.buffer_description()
        );
        Ok(file)
    }

    /// Create a new file holding an empty primary HDU. An existing file is
    /// replaced only when clobber is set.
    pub fn create(path: &str, settings: &Settings) -> Result<Self> {
        let (path, _) = split_extended_name(path);
        if Path::new(path).exists() {
            if !settings.clobber() {
                return Err(Error::FileExists {
                    prefix: format!("{path}: "),
                });
            }
            fs::remove_file(path)?;
        }
        let engine = E::create(Path::new(path)).map_err(|status| Error::Engine {
            prefix: format!("{path}: "),
            context: "could not create file".to_string(),
            status,
        })?;
        log::info!("created {path}");
        Ok(Self::from_engine(engine, path, settings))
    }

    /// Wrap an engine that is already open.
    pub fn from_engine(engine: E, filename: &str, settings: &Settings) -> Self {
        FitsFile {
            engine: Some(engine),
            filename: split_extended_name(filename).0.to_string(),
            settings: settings.clone(),
            row: 0,
            history: settings.history(),
            stamp_params: settings.history(),
            buffer_padding: false,
            cache: ColumnCache::default(),
        }
    }

    /// Flush and release the file. The cache goes with it.
    pub fn close(&mut self) -> Result<()> {
        let prefix = self.prefix(false);
        let mut engine = self.engine.take().ok_or(Error::NullContext)?;
        self.cache.clear();
        self.row = 0;
        engine.close().map_err(|status| Error::Engine {
            prefix,
            context: "could not close file".to_string(),
            status,
        })?;
        log::info!("closed {}", self.filename);
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.engine.is_some()
    }

    pub fn engine(&self) -> Result<&E> {
        self.engine.as_ref().ok_or(Error::NullContext)
    }

    pub fn engine_mut(&mut self) -> Result<&mut E> {
        self.engine.as_mut().ok_or(Error::NullContext)
    }

    /// File name without any extended-syntax suffix.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Write pending changes to disk.
    pub fn flush(&mut self) -> Result<()> {
        let prefix = self.prefix(false);
        self.engine_mut()?.flush().map_err(|status| Error::Engine {
            prefix: prefix.clone(),
            context: "could not flush file".to_string(),
            status,
        })?;
        log::debug!("{prefix}flushed");
        Ok(())
    }

    // --- error helpers -------------------------------------------------------

    /// Diagnostic prefix; empty for a closed context.
    pub(crate) fn prefix(&self, include_row: bool) -> String {
        match self.file_and_hdu_string() {
            Ok(mut out) => {
                if include_row {
                    out.push_str(&format!(" (row {})", self.row));
                }
                out.push_str(": ");
                out
            }
            Err(_) => String::new(),
        }
    }

    pub(crate) fn engine_error(&self, context: impl Into<String>, status: Status) -> Error {
        Error::Engine {
            prefix: self.prefix(false),
            context: context.into(),
            status,
        }
    }

    // --- HDU navigation ------------------------------------------------------

    pub fn hdu_count(&self) -> Result<usize> {
        Ok(self.engine()?.num_hdus())
    }

    /// 0-based index of the current HDU; the primary HDU is 0.
    pub fn hdu_index(&self) -> Result<usize> {
        Ok(self.engine()?.current_hdu())
    }

    fn hdu_changed(&mut self) {
        self.cache.clear();
        self.row = 0;
    }

    pub fn move_to_hdu(&mut self, index: usize) -> Result<()> {
        let prefix = self.prefix(false);
        self.engine_mut()?
            .move_to_hdu(index)
            .map_err(|status| Error::HduNotFound {
                prefix,
                hdu: index.to_string(),
                status,
            })?;
        self.hdu_changed();
        Ok(())
    }

    /// Move to the extension with the given EXTNAME (case-insensitive).
    pub fn move_to_extname(&mut self, extname: &str) -> Result<()> {
        let prefix = self.prefix(false);
        self.engine_mut()?
            .move_to_extname(extname)
            .map_err(|status| Error::HduNotFound {
                prefix,
                hdu: extname.to_string(),
                status,
            })?;
        self.hdu_changed();
        Ok(())
    }

    pub fn next_hdu(&mut self) -> Result<()> {
        let next = self.hdu_index()? + 1;
        self.move_to_hdu(next)
    }

    /// Move by extended-syntax selector: a number or an EXTNAME.
    fn select_hdu(&mut self, selector: &str) -> Result<()> {
        match selector.trim().parse::<usize>() {
            Ok(index) => self.move_to_hdu(index),
            Err(_) => self.move_to_extname(selector),
        }
    }

    fn hdu_kind(&self) -> Result<HduKind> {
        Ok(self.engine()?.hdu_kind())
    }

    pub fn is_primary(&self) -> Result<bool> {
        Ok(self.hdu_index()? == 0)
    }

    /// True for image extensions and the primary array.
    pub fn is_image(&self) -> Result<bool> {
        Ok(matches!(self.hdu_kind()?, HduKind::Image | HduKind::Primary))
    }

    pub fn is_bintable(&self) -> Result<bool> {
        Ok(self.hdu_kind()? == HduKind::BinaryTable)
    }

    pub fn is_ascii(&self) -> Result<bool> {
        Ok(self.hdu_kind()? == HduKind::AsciiTable)
    }

    // --- rows ----------------------------------------------------------------

    pub fn num_rows(&self) -> Result<usize> {
        self.engine()?
            .num_rows()
            .map_err(|status| self.engine_error("could not get number of rows", status))
    }

    pub fn first_row(&mut self) -> Result<()> {
        self.engine()?;
        self.row = 1;
        Ok(())
    }

    pub fn next_row(&mut self) -> Result<()> {
        self.engine()?;
        self.row += 1;
        Ok(())
    }

    pub fn last_row(&mut self) -> Result<()> {
        self.row = self.num_rows()?;
        Ok(())
    }

    pub fn set_row(&mut self, row: usize) -> Result<()> {
        self.engine()?;
        self.row = row;
        Ok(())
    }

    /// Current 1-based row; 0 before the first row is selected.
    pub fn current_row(&self) -> usize {
        self.row
    }

    /// True while the current row lies inside the table.
    pub fn read_ok(&self) -> Result<bool> {
        Ok(self.row >= 1 && self.row <= self.num_rows()?)
    }

    /// Element count of a variable-length column at the current row.
    pub fn variable_length(&mut self, name: &str) -> Result<usize> {
        let number = self.column_info(name)?.number;
        let row = self.row;
        let (len, _) = self.engine()?.read_descriptor(number, row).map_err(|status| {
            Error::Engine {
                prefix: self.prefix(true),
                context: format!("could not read array descriptor of column {name}"),
                status,
            }
        })?;
        Ok(len as usize)
    }

    // --- structure -----------------------------------------------------------

    /// Append a binary table and make it current.
    pub fn create_table(&mut self, extname: &str, columns: &[ColumnSpec], rows: usize) -> Result<()> {
        let created = self.engine_mut()?.create_binary_table(extname, columns, rows);
        created.map_err(|status| Error::Engine {
            prefix: format!("{}: ", self.filename),
            context: format!("could not create table {extname}"),
            status,
        })?;
        self.hdu_changed();
        log::info!("{}added table with {} columns", self.prefix(false), columns.len());
        Ok(())
    }

    /// Insert a column in front of `existing`.
    pub fn insert_column_before(&mut self, existing: &str, name: &str, tform: &str) -> Result<()> {
        let at = self.column_info(existing)?.number;
        self.insert_column_at(at, name, tform)
    }

    /// Insert a column after `existing`.
    pub fn insert_column_after(&mut self, existing: &str, name: &str, tform: &str) -> Result<()> {
        let at = self.column_info(existing)?.number + 1;
        self.insert_column_at(at, name, tform)
    }

    fn insert_column_at(&mut self, at: usize, name: &str, tform: &str) -> Result<()> {
        let inserted = self.engine_mut()?.insert_column(at, name, tform);
        inserted.map_err(|status| self.engine_error(format!("could not insert column {name}"), status))?;
        self.flush()?;
        self.reload_all_column_info()
    }

    // --- header access -------------------------------------------------------

    fn read_card(&self, keyword: &str) -> Result<Card> {
        self.engine()?
            .read_card(keyword)
            .map_err(|status| Error::KeywordNotFound {
                prefix: self.prefix(false),
                keyword: keyword.to_string(),
                status,
            })
    }

    pub fn keyword_exists(&self, keyword: &str) -> Result<bool> {
        match self.engine()?.read_card(keyword) {
            Ok(_) => Ok(true),
            Err(Status::KEY_NO_EXIST) => Ok(false),
            Err(status) => Err(self.engine_error(format!("could not read keyword {keyword}"), status)),
        }
    }

    /// Keyword value as header text (strings without quotes).
    pub fn read_key_text(&self, keyword: &str) -> Result<String> {
        match self.read_card(keyword)?.value {
            Some(value) => Ok(value.to_text()),
            None => Err(self.engine_error(format!("keyword {keyword} has no value"), Status::VALUE_UNDEFINED)),
        }
    }

    pub fn read_key_i64(&self, keyword: &str) -> Result<i64> {
        self.read_card(keyword)?
            .value
            .and_then(|v| v.as_i64())
            .ok_or_else(|| self.engine_error(format!("could not read keyword {keyword} as integer"), Status::BAD_INTKEY))
    }

    /// Comment of a keyword, if it has one.
    pub fn read_key_comment(&self, keyword: &str) -> Result<Option<String>> {
        Ok(self.read_card(keyword)?.comment)
    }

    /// Set a keyword. An existing keyword keeps its comment unless one is
    /// given.
    pub fn write_key(&mut self, keyword: &str, value: impl Into<Value>, comment: Option<&str>) -> Result<()> {
        let written = self.engine_mut()?.update_key(keyword, value.into(), comment);
        written.map_err(|status| self.engine_error(format!("could not write keyword {keyword}"), status))
    }

    pub fn modify_key_comment(&mut self, keyword: &str, comment: &str) -> Result<()> {
        let modified = self.engine_mut()?.modify_comment(keyword, comment);
        modified.map_err(|status| self.engine_error(format!("could not modify comment of {keyword}"), status))
    }

    pub fn write_history(&mut self, text: &str) -> Result<()> {
        let written = self.engine_mut()?.write_commentary("HISTORY", text);
        written.map_err(|status| self.engine_error("could not write HISTORY", status))
    }

    pub fn write_comment(&mut self, text: &str) -> Result<()> {
        let written = self.engine_mut()?.write_commentary("COMMENT", text);
        written.map_err(|status| self.engine_error("could not write COMMENT", status))
    }

    // --- flags ---------------------------------------------------------------

    pub fn clobber(&self) -> bool {
        self.settings.clobber()
    }

    pub fn buffer_rows(&self) -> Option<usize> {
        self.settings.buffer_rows()
    }

    fn buffer_description(&self) -> String {
        match self.settings.buffer_rows() {
            Some(rows) => format!("{rows} rows"),
            None => "default".to_string(),
        }
    }

    pub fn history(&self) -> bool {
        self.history
    }

    pub fn set_history(&mut self, history: bool) {
        self.history = history;
    }

    pub fn enable_parameter_stamping(&mut self) {
        self.stamp_params = true;
    }

    pub fn disable_parameter_stamping(&mut self) {
        self.stamp_params = false;
    }

    pub fn set_parameter_stamping(&mut self, state: bool) {
        self.stamp_params = state;
    }

    pub fn is_parameter_stamping(&self) -> bool {
        self.stamp_params
    }

    /// Allow extra rows at the end of a table so write buffers stay full.
    pub fn enable_buffer_padding(&mut self) {
        self.buffer_padding = true;
    }

    pub fn disable_buffer_padding(&mut self) {
        self.buffer_padding = false;
    }

    pub fn is_buffer_padding(&self) -> bool {
        self.buffer_padding
    }

    /// Record tool parameters as HISTORY cards in the current HDU.
    ///
    /// Nothing is written unless history and stamping are both on and the
    /// file is writable. Returns the number of parameters written.
    pub fn stamp_parameters(&mut self, params: &[(&str, &str)]) -> Result<usize> {
        let writable = self.engine()?.mode() == FileOpenMode::ReadWrite;
        if !(self.history && self.stamp_params && writable) {
            return Ok(0);
        }
        let exec = match self.settings.exec_name() {
            "" => "ahfits".to_string(),
            name => name.to_string(),
        };
        self.write_history(&format!("START PARAMETER list for {exec}"))?;
        for (i, (name, value)) in params.iter().enumerate() {
            self.write_history(&format!("P{} {} = {}", i + 1, name, value))?;
        }
        self.write_history(&format!("END PARAMETER list for {exec}"))?;
        Ok(params.len())
    }

    // --- diagnostics ---------------------------------------------------------

    /// `file.fits[EXTNAME]`, or `file.fits[HDU<n>]` when the HDU has no
    /// EXTNAME.
    pub fn file_and_hdu_string(&self) -> Result<String> {
        let engine = self.engine()?;
        let ext = match engine.read_card("EXTNAME").ok().and_then(|c| c.value) {
            Some(value) => value.to_text(),
            None => format!("HDU{}", engine.current_hdu()),
        };
        Ok(format!("{}[{}]", self.filename, ext))
    }

    /// Standard message prefix: file and HDU, optionally the current row,
    /// then `": "`.
    pub fn err_prefix(&self, include_row: bool) -> Result<String> {
        self.engine()?;
        Ok(self.prefix(include_row))
    }
}
