//! Header keyword values: parsing from and formatting into the 70-byte value
//! field of a card (card bytes 10..80).

use std::fmt;

/// A typed header keyword value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `T` or `F`.
    Logical(bool),
    Integer(i64),
    Float(f64),
    /// Content between the quotes, trailing blanks removed.
    String(String),
}

impl Value {
    /// Integer view; floats are truncated, strings are parsed.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            Value::Float(f) => Some(f.trunc() as i64),
            Value::String(s) => s.trim().parse().ok(),
            Value::Logical(_) => None,
        }
    }

    /// The value as it reads in the header, without string quotes.
    pub fn to_text(&self) -> String {
        match self {
            Value::Logical(b) => if *b { "T" } else { "F" }.to_string(),
            Value::Integer(n) => n.to_string(),
            Value::Float(f) => format_float(*f),
            Value::String(s) => s.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Logical(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

/// Split the non-string part of a value field at the comment separator.
///
/// Writers commonly omit the space after the slash, so ` /` is enough.
fn split_comment(field: &str) -> (&str, Option<String>) {
    match field.find(" /") {
        Some(idx) => {
            let rest = &field[idx + 2..];
            let rest = rest.strip_prefix(' ').unwrap_or(rest).trim_end();
            let comment = (!rest.is_empty()).then(|| rest.to_string());
            (&field[..idx], comment)
        }
        None => (field, None),
    }
}

/// Parse a quoted string starting at `field[0] == '\''`.
fn parse_quoted(field: &str) -> (Value, Option<String>) {
    let mut text = String::new();
    let mut chars = field[1..].char_indices().peekable();
    let mut end = field.len();
    while let Some((i, c)) = chars.next() {
        if c == '\'' {
            if matches!(chars.peek(), Some((_, '\''))) {
                text.push('\'');
                chars.next();
            } else {
                end = i + 2;
                break;
            }
        } else {
            text.push(c);
        }
    }
    let remainder = field.get(end..).unwrap_or("");
    let (_, comment) = split_comment(remainder);
    (Value::String(text.trim_end().to_string()), comment)
}

/// Parse a float, accepting the FITS `D` exponent.
pub fn parse_float_text(s: &str) -> Option<f64> {
    s.trim().replace(['D', 'd'], "E").parse().ok()
}

/// Parse the value field of a card.
///
/// Returns `None` when the field holds no value (blank or undefined).
pub fn parse_value(field: &str) -> Option<(Value, Option<String>)> {
    let trimmed = field.trim_start();
    if trimmed.starts_with('\'') {
        return Some(parse_quoted(trimmed));
    }

    let (text, comment) = split_comment(field);
    let text = text.trim();
    let value = match text {
        "" => return None,
        "T" => Value::Logical(true),
        "F" => Value::Logical(false),
        _ if !text.contains(['.', 'E', 'e', 'D', 'd']) => match text.parse::<i64>() {
            Ok(n) => Value::Integer(n),
            Err(_) => Value::Float(parse_float_text(text)?),
        },
        _ => Value::Float(parse_float_text(text)?),
    };
    Some((value, comment))
}

fn format_float(f: f64) -> String {
    if f == 0.0 {
        return "0.0".to_string();
    }
    if f.fract() == 0.0 && f.abs() < 1e15 {
        return format!("{f:.1}");
    }
    let mut precision = 15usize;
    loop {
        let s = format!("{f:.precision$E}");
        if s.len() <= 20 || precision == 0 {
            return s;
        }
        precision -= 1;
    }
}

/// Format a value into a 70-byte value field (without comment).
///
/// Numbers and logicals are right-justified in the first 20 bytes; strings
/// start with a quote and are padded to at least 8 characters.
pub fn format_value(value: &Value) -> [u8; 70] {
    let mut buf = [b' '; 70];
    let text = match value {
        Value::String(s) => {
            let mut quoted = String::with_capacity(s.len() + 2);
            quoted.push('\'');
            // A quote pair is never split; the closing quote needs byte 69.
            for c in s.chars() {
                let escaped = if c == '\'' { 2 } else { c.len_utf8() };
                if quoted.len() + escaped > 69 {
                    break;
                }
                quoted.push(c);
                if c == '\'' {
                    quoted.push('\'');
                }
            }
            while quoted.len() < 9 {
                quoted.push(' ');
            }
            quoted.push('\'');
            let bytes = quoted.as_bytes();
            buf[..bytes.len()].copy_from_slice(bytes);
            return buf;
        }
        other => other.to_text(),
    };
    let bytes = text.as_bytes();
    let len = bytes.len().min(20);
    buf[20 - len..20].copy_from_slice(&bytes[..len]);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(s: &str) -> String {
        format!("{s:<70}")
    }

    #[test]
    fn parse_logical_with_comment() {
        let (v, c) = parse_value(&field("                   T / flag")).unwrap();
        assert_eq!(v, Value::Logical(true));
        assert_eq!(c.as_deref(), Some("flag"));
    }

    #[test]
    fn parse_integer() {
        let (v, c) = parse_value(&field("                 -99")).unwrap();
        assert_eq!(v, Value::Integer(-99));
        assert!(c.is_none());
    }

    #[test]
    fn parse_float_with_d_exponent() {
        let (v, _) = parse_value(&field("            1.5D+02")).unwrap();
        assert_eq!(v, Value::Float(150.0));
    }

    #[test]
    fn parse_string_with_embedded_quote_and_comment() {
        let (v, c) = parse_value(&field("'it''s ok '         / remark")).unwrap();
        assert_eq!(v, Value::String("it's ok".into()));
        assert_eq!(c.as_deref(), Some("remark"));
    }

    #[test]
    fn comment_without_trailing_space() {
        let (v, c) = parse_value(&field("                  16 /bits")).unwrap();
        assert_eq!(v, Value::Integer(16));
        assert_eq!(c.as_deref(), Some("bits"));
    }

    #[test]
    fn blank_field_has_no_value() {
        assert!(parse_value(&field("")).is_none());
        assert!(parse_value(&field("                     / only comment")).is_none());
    }

    #[test]
    fn format_integer_right_justified() {
        let buf = format_value(&Value::Integer(42));
        assert_eq!(&buf[18..20], b"42");
        assert!(buf[..18].iter().all(|&b| b == b' '));
    }

    #[test]
    fn format_string_is_padded_to_eight() {
        let buf = format_value(&Value::String("cm".into()));
        assert_eq!(&buf[..10], b"'cm      '");
    }

    #[test]
    fn long_string_keeps_quote_pairs_whole() {
        let s = format!("{}'tail", "x".repeat(67));
        let buf = format_value(&Value::String(s));
        let field = std::str::from_utf8(&buf).unwrap();
        assert_eq!(field.len(), 70);
        assert!(field.trim_end().ends_with("x'"));
        let (v, _) = parse_value(field).unwrap();
        assert_eq!(v, Value::String("x".repeat(67)));

        let s = format!("{}'tail", "x".repeat(66));
        let buf = format_value(&Value::String(s));
        let (v, _) = parse_value(std::str::from_utf8(&buf).unwrap()).unwrap();
        assert_eq!(v, Value::String(format!("{}'", "x".repeat(66))));
    }

    #[test]
    fn format_then_parse_float() {
        let buf = format_value(&Value::Float(2.5e-7));
        let text = std::str::from_utf8(&buf).unwrap();
        let (v, _) = parse_value(text).unwrap();
        match v {
            Value::Float(f) => assert!((f - 2.5e-7).abs() < 1e-20),
            other => panic!("expected float, got {other:?}"),
        }
    }

    #[test]
    fn text_views() {
        assert_eq!(Value::Integer(7).to_text(), "7");
        assert_eq!(Value::Float(3.0).to_text(), "3.0");
        assert_eq!(Value::Logical(false).to_text(), "F");
        assert_eq!(Value::String("TIME".into()).to_text(), "TIME");
        assert_eq!(Value::String(" 12 ".into()).as_i64(), Some(12));
        assert_eq!(Value::Float(-2.7).as_i64(), Some(-2));
    }
}
