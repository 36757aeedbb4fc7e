//! Engine status codes.
//!
//! The engine reports every failure as an integer status, numbered the way
//! cfitsio numbers them so that codes seen in logs can be looked up in the
//! usual FITS documentation.

use std::fmt;

/// A non-zero engine status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status(pub i32);

impl Status {
    pub const FILE_NOT_OPENED: Status = Status(104);
    pub const FILE_NOT_CREATED: Status = Status(105);
    pub const WRITE_ERROR: Status = Status(106);
    pub const END_OF_FILE: Status = Status(107);
    pub const READ_ERROR: Status = Status(108);
    pub const READONLY_FILE: Status = Status(112);
    pub const NULL_INPUT_PTR: Status = Status(115);
    pub const KEY_NO_EXIST: Status = Status(202);
    pub const VALUE_UNDEFINED: Status = Status(204);
    pub const NO_QUOTE: Status = Status(205);
    pub const BAD_KEYCHAR: Status = Status(207);
    pub const NOT_POS_INT: Status = Status(209);
    pub const NO_END: Status = Status(210);
    pub const COL_NOT_FOUND: Status = Status(219);
    pub const NOT_ATABLE: Status = Status(226);
    pub const NOT_BTABLE: Status = Status(227);
    pub const NO_SIMPLE: Status = Status(221);
    pub const NOT_TABLE: Status = Status(235);
    pub const COL_NOT_UNIQUE: Status = Status(237);
    pub const UNKNOWN_EXT: Status = Status(251);
    pub const BAD_TFORM: Status = Status(261);
    pub const BAD_TFORM_DTYPE: Status = Status(262);
    pub const BAD_HDU_NUM: Status = Status(301);
    pub const BAD_COL_NUM: Status = Status(302);
    pub const BAD_ROW_NUM: Status = Status(307);
    pub const NOT_VARI_LEN: Status = Status(317);
    pub const BAD_INTKEY: Status = Status(401);
    pub const BAD_C2I: Status = Status(407);

    /// Raw numeric code.
    pub fn code(self) -> i32 {
        self.0
    }

    /// Decoded description of the status.
    pub fn text(self) -> &'static str {
        match self.0 {
            104 => "could not open the named file",
            105 => "couldn't create the named file",
            106 => "error writing to FITS file",
            107 => "tried to move past end of file",
            108 => "error reading from FITS file",
            112 => "cannot write to readonly file",
            115 => "null input pointer",
            202 => "keyword not found in header",
            204 => "keyword value field is blank",
            205 => "string is missing the closing quote",
            207 => "illegal character in keyword name or card",
            209 => "required keyword value is not a positive integer",
            210 => "couldn't find END keyword",
            219 => "named column not found",
            221 => "first keyword not SIMPLE",
            226 => "CHDU is not an ASCII table extension",
            227 => "CHDU is not a binary table extension",
            235 => "CHDU is not a table",
            237 => "column name template matched more than one column",
            251 => "unrecognizable FITS extension type",
            261 => "illegal TFORM format code",
            262 => "unrecognizable TFORM datatype code",
            301 => "illegal HDU number",
            302 => "column number < 1 or > tfields",
            307 => "bad first row number",
            317 => "this is not a variable length column",
            401 => "can't convert keyword string to integer",
            407 => "bad formatted string to int conversion",
            _ => "unknown error status",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[FITS STATUS {}: {}]", self.0, self.text())
    }
}

impl std::error::Error for Status {}
