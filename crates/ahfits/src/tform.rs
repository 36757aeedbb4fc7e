//! Binary table column format (`TFORMn`) parsing.

use crate::status::Status;

/// Element type of a binary-table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCode {
    Bit,
    Byte,
    Logical,
    String,
    Short,
    Long,
    LongLong,
    Float,
    Double,
    Complex,
    DoubleComplex,
}

impl TypeCode {
    /// Numeric type code, numbered as in cfitsio.
    pub fn code(self) -> i32 {
        match self {
            TypeCode::Bit => 1,
            TypeCode::Byte => 11,
            TypeCode::Logical => 14,
            TypeCode::String => 16,
            TypeCode::Short => 21,
            TypeCode::Long => 41,
            TypeCode::Float => 42,
            TypeCode::LongLong => 81,
            TypeCode::Double => 82,
            TypeCode::Complex => 83,
            TypeCode::DoubleComplex => 163,
        }
    }

    /// Integer-like element types. Bit columns are not integers.
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            TypeCode::Byte | TypeCode::Short | TypeCode::Long | TypeCode::LongLong
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, TypeCode::Float | TypeCode::Double)
    }

    /// Bytes per stored element. Bits are packed, so this is 1 for a lone bit.
    pub fn element_size(self) -> usize {
        match self {
            TypeCode::Bit | TypeCode::Byte | TypeCode::Logical | TypeCode::String => 1,
            TypeCode::Short => 2,
            TypeCode::Long | TypeCode::Float => 4,
            TypeCode::LongLong | TypeCode::Double | TypeCode::Complex => 8,
            TypeCode::DoubleComplex => 16,
        }
    }

    fn from_letter(letter: u8) -> Option<TypeCode> {
        Some(match letter {
            b'X' => TypeCode::Bit,
            b'B' => TypeCode::Byte,
            b'L' => TypeCode::Logical,
            b'A' => TypeCode::String,
            b'I' => TypeCode::Short,
            b'J' => TypeCode::Long,
            b'K' => TypeCode::LongLong,
            b'E' => TypeCode::Float,
            b'D' => TypeCode::Double,
            b'C' => TypeCode::Complex,
            b'M' => TypeCode::DoubleComplex,
            _ => return None,
        })
    }
}

/// Array descriptor flavour of a variable-length column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Descriptor {
    /// Two 32-bit integers.
    P,
    /// Two 64-bit integers.
    Q,
}

impl Descriptor {
    pub fn byte_size(self) -> usize {
        match self {
            Descriptor::P => 8,
            Descriptor::Q => 16,
        }
    }
}

/// A parsed `TFORMn` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tform {
    pub type_code: TypeCode,
    /// Element count. For variable-length columns this is the `(max)`
    /// suffix, 0 when absent or malformed.
    pub repeat: usize,
    /// Bytes per element; for `rAw` strings, `w`.
    pub width: usize,
    /// Set for `P`/`Q` columns.
    pub descriptor: Option<Descriptor>,
}

impl Tform {
    pub fn is_variable(&self) -> bool {
        self.descriptor.is_some()
    }

    /// Type code with the variable-length sign applied.
    pub fn signed_code(&self) -> i32 {
        if self.is_variable() {
            -self.type_code.code()
        } else {
            self.type_code.code()
        }
    }

    /// Bytes the column occupies in one row of the main table.
    pub fn field_bytes(&self) -> usize {
        match self.descriptor {
            Some(d) => d.byte_size(),
            None if self.type_code == TypeCode::Bit => self.repeat.div_ceil(8),
            None if self.type_code == TypeCode::String => self.repeat,
            None => self.repeat * self.type_code.element_size(),
        }
    }
}

/// Leading decimal digits of `s` as a number, like C `strtol`: 0 when none.
fn leading_number(s: &str) -> usize {
    let s = s.trim_start();
    let end = s.bytes().take_while(u8::is_ascii_digit).count();
    s[..end].parse().unwrap_or(0)
}

/// Parse a binary-table TFORM value such as `1J`, `20A8`, `1PE(100)`.
pub fn parse_tform(s: &str) -> Result<Tform, Status> {
    let s = s.trim().to_ascii_uppercase();
    if s.is_empty() {
        return Err(Status::BAD_TFORM);
    }

    let digits = s.bytes().take_while(u8::is_ascii_digit).count();
    let repeat = if digits == 0 {
        1
    } else {
        s[..digits].parse::<usize>().map_err(|_| Status::BAD_TFORM)?
    };
    let rest = &s.as_bytes()[digits..];
    let Some(&letter) = rest.first() else {
        return Err(Status::BAD_TFORM);
    };

    if letter == b'P' || letter == b'Q' {
        let descriptor = if letter == b'P' {
            Descriptor::P
        } else {
            Descriptor::Q
        };
        let type_code = rest
            .get(1)
            .and_then(|&b| TypeCode::from_letter(b))
            .ok_or(Status::BAD_TFORM_DTYPE)?;
        let max = s.find('(').map_or(0, |paren| leading_number(&s[paren + 1..]));
        return Ok(Tform {
            type_code,
            repeat: max,
            width: type_code.element_size(),
            descriptor: Some(descriptor),
        });
    }

    let type_code = TypeCode::from_letter(letter).ok_or(Status::BAD_TFORM_DTYPE)?;
    let width = if type_code == TypeCode::String {
        match leading_number(&s[digits + 1..]) {
            0 => repeat,
            w => w,
        }
    } else {
        type_code.element_size()
    };
    Ok(Tform {
        type_code,
        repeat,
        width,
        descriptor: None,
    })
}
