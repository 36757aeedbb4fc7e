//! Column metadata cache.
//!
//! Descriptors are loaded from the header the first time a column is asked
//! about and served from the cache afterwards. Writing an attribute keyword
//! reloads the descriptor; moving to another HDU drops the whole cache.

use std::collections::{BTreeMap, HashMap};

use crate::context::FitsFile;
use crate::engine::{ColumnMatch, FitsEngine};
use crate::error::{Error, Result};
use crate::range::{ColumnRange, RangeValue};
use crate::status::Status;
use crate::tform::TypeCode;
use crate::value::Value;

/// Metadata of one binary-table column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    /// 1-based position.
    pub number: usize,
    /// Name as written in `TTYPEn`.
    pub name: String,
    pub units: String,
    pub display: String,
    pub type_code: TypeCode,
    pub variable: bool,
    /// Elements per row; the declared maximum for variable-length columns.
    pub repeat: usize,
    /// Bytes per element.
    pub width: usize,
    pub range: ColumnRange,
    /// `TNULLn`, integer columns only.
    pub null: Option<i64>,
}

impl ColumnInfo {
    /// Type code with the variable-length sign applied.
    pub fn signed_type_code(&self) -> i32 {
        if self.variable {
            -self.type_code.code()
        } else {
            self.type_code.code()
        }
    }

    /// Characters per string for string columns, elements per row otherwise.
    pub fn length(&self) -> usize {
        if self.type_code == TypeCode::String && self.width > 0 {
            self.repeat / self.width
        } else {
            self.repeat
        }
    }
}

/// Descriptors keyed by column number, with the name index kept in step.
#[derive(Debug, Default)]
pub struct ColumnCache {
    columns: BTreeMap<usize, ColumnInfo>,
    by_name: HashMap<String, usize>,
}

fn name_key(name: &str) -> String {
    name.trim().to_ascii_uppercase()
}

impl ColumnCache {
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, number: usize) -> Option<&ColumnInfo> {
        self.columns.get(&number)
    }

    pub fn number_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(&name_key(name)).copied()
    }

    pub fn get_by_name(&self, name: &str) -> Option<&ColumnInfo> {
        self.number_of(name).and_then(|n| self.columns.get(&n))
    }

    /// Cached names in column order.
    pub fn names(&self) -> Vec<String> {
        self.columns.values().map(|c| c.name.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnInfo> {
        self.columns.values()
    }

    /// Store a descriptor, replacing whatever was cached under its number
    /// or its name.
    pub fn insert(&mut self, info: ColumnInfo) {
        self.remove_number(info.number);
        self.remove_name(&info.name);
        self.by_name.insert(name_key(&info.name), info.number);
        self.columns.insert(info.number, info);
    }

    pub fn remove_number(&mut self, number: usize) -> Option<ColumnInfo> {
        let info = self.columns.remove(&number)?;
        self.by_name.remove(&name_key(&info.name));
        Some(info)
    }

    pub fn remove_name(&mut self, name: &str) -> Option<ColumnInfo> {
        let number = self.by_name.remove(&name_key(name))?;
        self.columns.remove(&number)
    }

    pub fn clear(&mut self) {
        self.columns.clear();
        self.by_name.clear();
    }
}

/// Comment given to an attribute keyword when it is first written.
pub fn default_comment(prefix: &str) -> Option<&'static str> {
    Some(match prefix {
        "TNULL" => "Data null value",
        "TUNIT" => "Physical units of field",
        "TDISP" => "Display format",
        "TZERO" => "Data offset",
        "TSCALE" => "Data scaling",
        "TLMIN" => "Min legal value",
        "TLMAX" => "Max legal value",
        _ => return None,
    })
}

fn optional_value<E: FitsEngine>(engine: &E, keyword: &str) -> std::result::Result<Option<Value>, Status> {
    match engine.read_card(keyword) {
        Ok(card) => Ok(card.value),
        Err(Status::KEY_NO_EXIST) => Ok(None),
        Err(status) => Err(status),
    }
}

impl<E: FitsEngine> FitsFile<E> {
    fn require_bintable(&self) -> Result<()> {
        if self.is_bintable()? {
            Ok(())
        } else {
            Err(Error::NotBinaryTable {
                prefix: self.prefix(false),
            })
        }
    }

    /// Read a column's descriptor from the header and cache it. Returns the
    /// column number.
    fn load_from_engine(&mut self, name: &str) -> Result<usize> {
        let engine = self.engine()?;
        let found = match engine.column_number(false, name) {
            Ok(found) => found,
            Err(status) => {
                return Err(Error::ColumnNotFound {
                    prefix: self.prefix(false),
                    column: name.to_string(),
                    status,
                })
            }
        };
        // A template may resolve to a column already cached under its name.
        if let Some(number) = self.cache.number_of(found.name()) {
            return Ok(number);
        }

        let number = found.number();
        let read = |keyword: String| {
            optional_value(engine, &keyword)
                .map_err(|status| self.engine_error(format!("could not read {keyword}"), status))
        };
        let tform = engine
            .column_type(number)
            .map_err(|status| self.engine_error(format!("could not get type of column {name}"), status))?;
        let units = read(format!("TUNIT{number}"))?.map(|v| v.to_text()).unwrap_or_default();
        let display = read(format!("TDISP{number}"))?.map(|v| v.to_text()).unwrap_or_default();
        let mut range = ColumnRange::default();
        if let Some(min) = read(format!("TLMIN{number}"))? {
            range.min = RangeValue::from_value(&min);
        }
        if let Some(max) = read(format!("TLMAX{number}"))? {
            range.max = RangeValue::from_value(&max);
        }
        let null = match read(format!("TNULL{number}"))? {
            Some(value) => Some(value.as_i64().ok_or_else(|| {
                self.engine_error(format!("could not read TNULL{number} as integer"), Status::BAD_INTKEY)
            })?),
            None => None,
        };

        let info = ColumnInfo {
            number,
            name: found.name().to_string(),
            units,
            display,
            type_code: tform.type_code,
            variable: tform.is_variable(),
            repeat: tform.repeat,
            width: tform.width,
            range,
            null,
        };
        log::debug!("{}loaded column info for {} (column {})", self.prefix(false), info.name, number);
        self.cache.insert(info);
        Ok(number)
    }

    /// Descriptor of `name`, loading it on first use.
    pub fn column_info(&mut self, name: &str) -> Result<&ColumnInfo> {
        self.require_bintable()?;
        let number = match self.cache.number_of(name) {
            Some(number) => number,
            None => self.load_from_engine(name)?,
        };
        match self.cache.get(number) {
            Some(info) => Ok(info),
            None => Err(Error::ColumnNotFound {
                prefix: self.prefix(false),
                column: name.to_string(),
                status: Status::COL_NOT_FOUND,
            }),
        }
    }

    pub fn column_type(&mut self, name: &str) -> Result<TypeCode> {
        Ok(self.column_info(name)?.type_code)
    }

    /// Numeric type code; negative for variable-length columns.
    pub fn column_type_code(&mut self, name: &str) -> Result<i32> {
        Ok(self.column_info(name)?.signed_type_code())
    }

    pub fn is_variable_column(&mut self, name: &str) -> Result<bool> {
        Ok(self.column_info(name)?.variable)
    }

    pub fn column_units(&mut self, name: &str) -> Result<String> {
        Ok(self.column_info(name)?.units.clone())
    }

    pub fn column_repeat(&mut self, name: &str) -> Result<usize> {
        Ok(self.column_info(name)?.repeat)
    }

    pub fn column_width(&mut self, name: &str) -> Result<usize> {
        Ok(self.column_info(name)?.width)
    }

    pub fn column_display(&mut self, name: &str) -> Result<String> {
        Ok(self.column_info(name)?.display.clone())
    }

    /// Number of strings for string columns, repeat count otherwise.
    pub fn column_length(&mut self, name: &str) -> Result<usize> {
        Ok(self.column_info(name)?.length())
    }

    /// Tagged range. Check [`ColumnRange::is_set`] before using it.
    pub fn column_range(&mut self, name: &str) -> Result<ColumnRange> {
        Ok(self.column_info(name)?.range.clone())
    }

    /// Range as integers; `None` when no range is defined.
    pub fn column_range_i64(&mut self, name: &str) -> Result<Option<(i64, i64)>> {
        Ok(self.column_info(name)?.range.as_i64())
    }

    pub fn column_range_f64(&mut self, name: &str) -> Result<Option<(f64, f64)>> {
        Ok(self.column_info(name)?.range.as_f64())
    }

    pub fn column_range_text(&mut self, name: &str) -> Result<Option<(String, String)>> {
        Ok(self.column_info(name)?.range.as_text())
    }

    /// `TNULLn` of the column, if defined.
    pub fn column_null(&mut self, name: &str) -> Result<Option<i64>> {
        Ok(self.column_info(name)?.null)
    }

    pub fn is_integer_type_column(&mut self, name: &str) -> Result<bool> {
        Ok(self.column_info(name)?.type_code.is_integer())
    }

    pub fn is_float_type_column(&mut self, name: &str) -> Result<bool> {
        Ok(self.column_info(name)?.type_code.is_float())
    }

    /// Whether the current table has a column called `name`
    /// (case-insensitive). On success the descriptor is cached.
    pub fn have_column(&mut self, name: &str) -> Result<bool> {
        self.require_bintable()?;
        if self.cache.number_of(name).is_some() {
            return Ok(true);
        }
        let lookup = self.engine()?.column_number(false, name);
        match lookup {
            Ok(_) => {
                self.column_info(name)?;
                Ok(true)
            }
            Err(Status::COL_NOT_FOUND) => Ok(false),
            Err(status) => Err(self.engine_error(format!("could not look up column {name}"), status)),
        }
    }

    /// 1-based number of a cached column.
    pub fn column_number(&self, name: &str) -> Result<usize> {
        self.cache.number_of(name).ok_or_else(|| Error::ColumnNotFound {
            prefix: self.prefix(false),
            column: format!("{name} (not loaded)"),
            status: Status::COL_NOT_FOUND,
        })
    }

    /// Name of a cached column number.
    pub fn column_name(&self, number: usize) -> Result<String> {
        self.cache.get(number).map(|c| c.name.clone()).ok_or_else(|| Error::ColumnNotFound {
            prefix: self.prefix(false),
            column: format!("number {number} (not loaded)"),
            status: Status::COL_NOT_FOUND,
        })
    }

    /// Cached column number for `name`, resolving templates through the
    /// engine.
    fn cached_number(&self, name: &str) -> Option<usize> {
        if let Some(number) = self.cache.number_of(name) {
            return Some(number);
        }
        let found = self.engine().ok()?.column_number(false, name).ok()?;
        self.cache.number_of(found.name())
    }

    /// Drop one cached descriptor. `name` may be a template.
    pub fn clear_column_info(&mut self, name: &str) {
        let Some(number) = self.cached_number(name) else {
            return;
        };
        if let Some(info) = self.cache.remove_number(number) {
            log::debug!("{}cleared column info for {}", self.prefix(false), info.name);
        }
    }

    pub fn clear_all_column_info(&mut self) {
        self.cache.clear();
    }

    /// Re-read one descriptor from the header. `name` may be a template.
    pub fn reload_column_info(&mut self, name: &str) -> Result<()> {
        let number = self.column_info(name)?.number;
        self.cache.remove_number(number);
        self.column_info(name).map(|_| ())
    }

    /// Reload every cached descriptor. Columns that have disappeared are
    /// skipped.
    pub fn reload_all_column_info(&mut self) -> Result<()> {
        let names = self.cache.names();
        self.cache.clear();
        for name in names {
            if !self.have_column(&name)? {
                log::warn!("{}column {} no longer present; not reloaded", self.prefix(false), name);
            }
        }
        Ok(())
    }

    /// Every column name matching `pattern` (`*`, `?` and `#` wildcards), in
    /// table order.
    pub fn search_columns(&mut self, pattern: &str, case_sensitive: bool) -> Result<Vec<String>> {
        self.require_bintable()?;
        let mut found = Vec::new();
        let mut resume = false;
        loop {
            let next = self.engine_mut()?.match_column(case_sensitive, pattern, resume);
            match next {
                Ok(ColumnMatch::Unique { name, .. }) => {
                    found.push(name);
                    break;
                }
                Ok(ColumnMatch::NotUnique { name, .. }) => {
                    found.push(name);
                    resume = true;
                }
                Err(Status::COL_NOT_FOUND) => break,
                Err(status) => {
                    return Err(self.engine_error(
                        format!("problem searching for column fragment: {pattern}"),
                        status,
                    ))
                }
            }
        }
        Ok(found)
    }

    /// Keyword name of a column attribute: `prefix` followed by the column
    /// number, e.g. `TUNIT4`.
    pub fn form_column_attribute(&mut self, name: &str, prefix: &str) -> Result<String> {
        let number = self.column_info(name)?.number;
        Ok(format!("{prefix}{number}"))
    }

    /// Write a column attribute keyword, flush, and reload the descriptor.
    ///
    /// With `integer_only` set the column must be integer-like; otherwise
    /// nothing is written. A new keyword gets `comment`, or the standard
    /// comment for `prefix`; an existing keyword keeps its comment unless
    /// `comment` is given.
    pub fn set_column_attribute(
        &mut self,
        name: &str,
        prefix: &str,
        value: Value,
        comment: Option<&str>,
        integer_only: bool,
    ) -> Result<()> {
        let info = self.column_info(name)?;
        let (number, is_integer) = (info.number, info.type_code.is_integer());
        if integer_only && !is_integer {
            return Err(Error::TypeMismatch {
                prefix: self.prefix(false),
                keyword: prefix.to_string(),
                column: name.to_string(),
            });
        }

        let keyword = format!("{prefix}{number}");
        let comment = match comment {
            Some(c) => Some(c),
            None if !self.keyword_exists(&keyword)? => default_comment(prefix),
            None => None,
        };
        self.write_key(&keyword, value, comment)?;
        self.flush()?;
        self.reload_column_info(name)
    }

    pub fn set_tnull(&mut self, name: &str, null: i64, comment: Option<&str>) -> Result<()> {
        self.set_column_attribute(name, "TNULL", Value::Integer(null), comment, true)
    }

    pub fn set_tunit(&mut self, name: &str, unit: &str, comment: Option<&str>) -> Result<()> {
        self.set_column_attribute(name, "TUNIT", Value::from(unit), comment, false)
    }

    pub fn set_tdisp(&mut self, name: &str, display: &str, comment: Option<&str>) -> Result<()> {
        self.set_column_attribute(name, "TDISP", Value::from(display), comment, false)
    }

    pub fn set_tzero(&mut self, name: &str, zero: i64, comment: Option<&str>) -> Result<()> {
        self.set_column_attribute(name, "TZERO", Value::Integer(zero), comment, true)
    }

    /// Writes `TSCALEn`.
    pub fn set_tscale(&mut self, name: &str, scale: i64, comment: Option<&str>) -> Result<()> {
        self.set_column_attribute(name, "TSCALE", Value::Integer(scale), comment, true)
    }

    pub fn set_tlmin(&mut self, name: &str, min: impl Into<Value>, comment: Option<&str>) -> Result<()> {
        self.set_column_attribute(name, "TLMIN", min.into(), comment, false)
    }

    pub fn set_tlmax(&mut self, name: &str, max: impl Into<Value>, comment: Option<&str>) -> Result<()> {
        self.set_column_attribute(name, "TLMAX", max.into(), comment, false)
    }

    /// Set the human-readable description held in the `TTYPEn` comment.
    pub fn set_column_description(&mut self, name: &str, description: &str) -> Result<()> {
        let keyword = self.form_column_attribute(name, "TTYPE")?;
        self.modify_key_comment(&keyword, description)
    }

    /// The `TTYPEn` comment, empty when there is none.
    pub fn column_description(&mut self, name: &str) -> Result<String> {
        let keyword = self.form_column_attribute(name, "TTYPE")?;
        Ok(self.read_key_comment(&keyword)?.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(number: usize, name: &str) -> ColumnInfo {
        ColumnInfo {
            number,
            name: name.to_string(),
            units: String::new(),
            display: String::new(),
            type_code: TypeCode::Long,
            variable: false,
            repeat: 1,
            width: 4,
            range: ColumnRange::default(),
            null: None,
        }
    }

    #[test]
    fn cache_indexes_stay_in_step() {
        let mut cache = ColumnCache::default();
        cache.insert(info(1, "TIME"));
        cache.insert(info(2, "PHA"));
        assert_eq!(cache.number_of("pha"), Some(2));
        assert_eq!(cache.get(1).map(|c| c.name.as_str()), Some("TIME"));

        let removed = cache.remove_name("Time").unwrap();
        assert_eq!(removed.number, 1);
        assert!(cache.get(1).is_none());
        assert!(cache.number_of("TIME").is_none());

        cache.remove_number(2);
        assert!(cache.is_empty());
        assert!(cache.number_of("PHA").is_none());
    }

    #[test]
    fn insert_replaces_stale_entries() {
        let mut cache = ColumnCache::default();
        cache.insert(info(2, "PHA"));
        // PHA moved to column 3 after an insertion.
        cache.insert(info(3, "PHA"));
        assert_eq!(cache.len(), 1);
        assert!(cache.get(2).is_none());
        assert_eq!(cache.number_of("PHA"), Some(3));

        cache.insert(info(3, "PI"));
        assert_eq!(cache.len(), 1);
        assert!(cache.number_of("PHA").is_none());
        assert_eq!(cache.names(), vec!["PI".to_string()]);
    }

    #[test]
    fn string_length_divides_by_width() {
        let mut c = info(1, "OBJECT");
        c.type_code = TypeCode::String;
        c.repeat = 20;
        c.width = 5;
        assert_eq!(c.length(), 4);
        c.type_code = TypeCode::Short;
        assert_eq!(c.length(), 20);
    }

    #[test]
    fn signed_code_for_variable_columns() {
        let mut c = info(1, "SPEC");
        c.variable = true;
        assert_eq!(c.signed_type_code(), -41);
    }

    #[test]
    fn default_comments() {
        assert_eq!(default_comment("TSCALE"), Some("Data scaling"));
        assert_eq!(default_comment("TLMAX"), Some("Max legal value"));
        assert_eq!(default_comment("TTYPE"), None);
    }
}
