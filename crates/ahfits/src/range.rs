//! Legal-value ranges of a column (`TLMINn` / `TLMAXn`).

use std::cmp::Ordering;
use std::fmt;

use crate::value::{parse_float_text, Value};

/// One bound of a column range, tagged with the type it was written as.
#[derive(Debug, Clone, PartialEq)]
pub enum RangeValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl RangeValue {
    pub fn from_value(value: &Value) -> RangeValue {
        match value {
            Value::Integer(n) => RangeValue::Integer(*n),
            Value::Float(f) => RangeValue::Float(*f),
            other => RangeValue::Text(other.to_text()),
        }
    }

    /// Integer view. Floats are truncated after exponent scaling, so a
    /// header `1.5E2` reads as 150; text reads its leading integer and falls
    /// back to 0.
    pub fn as_i64(&self) -> i64 {
        match self {
            RangeValue::Integer(n) => *n,
            RangeValue::Float(f) => f.trunc() as i64,
            RangeValue::Text(s) => leading_integer(s).unwrap_or(0),
        }
    }

    /// Floating view; unparsable text reads as 0.
    pub fn as_f64(&self) -> f64 {
        match self {
            RangeValue::Integer(n) => *n as f64,
            RangeValue::Float(f) => *f,
            RangeValue::Text(s) => parse_float_text(s).unwrap_or(0.0),
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            RangeValue::Integer(n) => n.to_string(),
            RangeValue::Float(f) => Value::Float(*f).to_text(),
            RangeValue::Text(s) => s.clone(),
        }
    }

    fn is_numeric(&self) -> bool {
        !matches!(self, RangeValue::Text(_))
    }
}

impl fmt::Display for RangeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl PartialOrd for RangeValue {
    /// Numbers compare numerically; anything involving text compares the
    /// text renderings.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (RangeValue::Integer(a), RangeValue::Integer(b)) => Some(a.cmp(b)),
            (a, b) if a.is_numeric() && b.is_numeric() => a.as_f64().partial_cmp(&b.as_f64()),
            (a, b) => Some(a.as_text().cmp(&b.as_text())),
        }
    }
}

fn leading_integer(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let sign = usize::from(s.starts_with(['+', '-']));
    let digits = s[sign..].bytes().take_while(u8::is_ascii_digit).count();
    s[..sign + digits].parse().ok()
}

/// Minimum and maximum legal value of a column.
///
/// A range whose maximum is less than its minimum is unset. Columns without
/// `TLMINn`/`TLMAXn` get 0 and -1.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRange {
    pub min: RangeValue,
    pub max: RangeValue,
}

impl Default for ColumnRange {
    fn default() -> Self {
        ColumnRange {
            min: RangeValue::Integer(0),
            max: RangeValue::Integer(-1),
        }
    }
}

impl ColumnRange {
    pub fn is_set(&self) -> bool {
        !matches!(self.max.partial_cmp(&self.min), Some(Ordering::Less))
    }

    /// Bounds as integers, `None` when the decoded maximum is below the
    /// decoded minimum.
    pub fn as_i64(&self) -> Option<(i64, i64)> {
        let (min, max) = (self.min.as_i64(), self.max.as_i64());
        (max >= min).then_some((min, max))
    }

    pub fn as_f64(&self) -> Option<(f64, f64)> {
        let (min, max) = (self.min.as_f64(), self.max.as_f64());
        (max >= min).then_some((min, max))
    }

    /// Bounds as header text, compared as strings.
    pub fn as_text(&self) -> Option<(String, String)> {
        let (min, max) = (self.min.as_text(), self.max.as_text());
        (max >= min).then_some((min, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(min: RangeValue, max: RangeValue) -> ColumnRange {
        ColumnRange { min, max }
    }

    #[test]
    fn default_range_is_unset_in_every_view() {
        let r = ColumnRange::default();
        assert!(!r.is_set());
        assert_eq!(r.as_i64(), None);
        assert_eq!(r.as_f64(), None);
        assert_eq!(r.as_text(), None);
    }

    #[test]
    fn integer_bounds() {
        let r = range(RangeValue::Integer(0), RangeValue::Integer(1023));
        assert!(r.is_set());
        assert_eq!(r.as_i64(), Some((0, 1023)));
        assert_eq!(r.as_f64(), Some((0.0, 1023.0)));
    }

    #[test]
    fn float_bounds() {
        let r = range(RangeValue::Float(0.5), RangeValue::Float(12.25));
        assert!(r.is_set());
        assert_eq!(r.as_f64(), Some((0.5, 12.25)));
        assert_eq!(r.as_i64(), Some((0, 12)));

        let r = range(RangeValue::Float(2.5), RangeValue::Float(-2.5));
        assert!(!r.is_set());
        assert_eq!(r.as_f64(), None);
    }

    #[test]
    fn text_bounds() {
        let r = range(RangeValue::Text("A".into()), RangeValue::Text("Z".into()));
        assert!(r.is_set());
        assert_eq!(r.as_text(), Some(("A".into(), "Z".into())));
        // Unparsable text reads as zero, so the numeric view is a point range.
        assert_eq!(r.as_i64(), Some((0, 0)));

        let r = range(RangeValue::Text("Z".into()), RangeValue::Text("A".into()));
        assert!(!r.is_set());
        assert_eq!(r.as_text(), None);
    }

    #[test]
    fn mixed_numeric_compares_numerically() {
        let r = range(RangeValue::Integer(2), RangeValue::Float(10.0));
        assert!(r.is_set());
        let r = range(RangeValue::Float(2.5), RangeValue::Integer(2));
        assert!(!r.is_set());
    }

    #[test]
    fn text_numbers_are_parsed() {
        assert_eq!(RangeValue::Text(" -12abc".into()).as_i64(), -12);
        assert_eq!(RangeValue::Text("3.5".into()).as_i64(), 3);
        assert_eq!(RangeValue::Text("1.5D2".into()).as_f64(), 150.0);
        assert_eq!(RangeValue::Text("n/a".into()).as_f64(), 0.0);
    }

    #[test]
    fn exponent_bounds_read_by_value() {
        let (min, _) = crate::value::parse_value("              1.5E2").unwrap();
        let min = RangeValue::from_value(&min);
        assert_eq!(min, RangeValue::Float(150.0));
        assert_eq!(min.as_i64(), 150);
        assert_eq!(min.as_text(), "150.0");
    }

    #[test]
    fn from_header_value() {
        assert_eq!(RangeValue::from_value(&Value::Integer(5)), RangeValue::Integer(5));
        assert_eq!(
            RangeValue::from_value(&Value::Logical(true)),
            RangeValue::Text("T".into())
        );
    }
}
