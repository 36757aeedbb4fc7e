//! `@file` list expansion.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Longest accepted file name, cfitsio's `FLEN_FILENAME` less the
/// terminator.
pub const MAX_LINE_LEN: usize = 1024;

/// Expand a file argument.
///
/// A plain argument comes back as a one-element list. `@path` is replaced by
/// the lines of the text file `path`, in order, skipping blank lines.
pub fn expand_file_list(arg: &str) -> Result<Vec<String>> {
    let Some(list) = arg.strip_prefix('@') else {
        return Ok(vec![arg.to_string()]);
    };

    let path = PathBuf::from(list);
    let file = File::open(&path).map_err(|source| Error::FileListOpen {
        path: path.clone(),
        source,
    })?;

    let mut files = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        let line = line.trim_end();
        if line.len() > MAX_LINE_LEN {
            return Err(Error::FileListLine {
                path,
                line: idx + 1,
                max: MAX_LINE_LEN,
            });
        }
        if !line.trim_start().is_empty() {
            files.push(line.to_string());
        }
    }

    if files.is_empty() {
        return Err(Error::FileListEmpty {
            spec: arg.to_string(),
        });
    }
    log::debug!("expanded {} into {} file names", arg, files.len());
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Write;

    fn list_file(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn plain_name_passes_through() {
        assert_eq!(expand_file_list("evt.fits").unwrap(), vec!["evt.fits"]);
        assert_eq!(
            expand_file_list("evt.fits[EVENTS]").unwrap(),
            vec!["evt.fits[EVENTS]"]
        );
    }

    #[test]
    fn list_lines_in_order() {
        let f = list_file("a.fits\n\nb.fits[1]\r\n   \nc.fits");
        let arg = format!("@{}", f.path().display());
        assert_eq!(
            expand_file_list(&arg).unwrap(),
            vec!["a.fits", "b.fits[1]", "c.fits"]
        );
    }

    #[test]
    fn missing_list_file() {
        let dir = tempfile::tempdir().unwrap();
        let arg = format!("@{}", dir.path().join("nope.lis").display());
        let err = expand_file_list(&arg).unwrap_err();
        assert!(matches!(err, Error::FileListOpen { .. }));
        assert_eq!(err.kind(), ErrorKind::FileList);
    }

    #[test]
    fn empty_list_file() {
        let f = list_file("\n\n");
        let arg = format!("@{}", f.path().display());
        let err = expand_file_list(&arg).unwrap_err();
        assert!(matches!(err, Error::FileListEmpty { ref spec } if *spec == arg));
    }

    #[test]
    fn overlong_line() {
        let f = list_file(&format!("ok.fits\n{}\n", "x".repeat(MAX_LINE_LEN + 1)));
        let arg = format!("@{}", f.path().display());
        let err = expand_file_list(&arg).unwrap_err();
        assert!(matches!(err, Error::FileListLine { line: 2, .. }));
    }
}
