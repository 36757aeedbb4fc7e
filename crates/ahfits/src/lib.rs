pub mod block;
pub mod chatter;
pub mod colinfo;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod file_list;
pub mod hdu;
pub mod header;
pub mod range;
pub mod status;
pub mod template;
pub mod tform;
pub mod value;

pub use colinfo::{ColumnCache, ColumnInfo};
pub use config::Settings;
pub use context::FitsFile;
pub use engine::{ColumnMatch, ColumnSpec, FileOpenMode, FitsEngine, PureEngine};
pub use error::{Error, ErrorKind, Result};
pub use file_list::expand_file_list;
pub use range::{ColumnRange, RangeValue};
pub use status::Status;
pub use tform::TypeCode;
pub use value::Value;
