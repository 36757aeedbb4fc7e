use std::process;

use ahfits::{chatter, expand_file_list, ColumnInfo, FitsFile, Settings};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "ahcolinfo")]
#[command(about = "Print binary-table column metadata of FITS files")]
#[command(version)]
struct Args {
    /// FITS file, optionally with [EXT], or @list of files
    file: String,

    /// Column name template (*, ? and # wildcards)
    #[arg(default_value = "*")]
    pattern: String,

    /// HDU to inspect, by number or EXTNAME; default is the first binary table
    #[arg(long)]
    hdu: Option<String>,

    /// Set TUNIT for a column, as COL=UNIT
    #[arg(long = "set-tunit", value_name = "COL=UNIT")]
    set_tunit: Vec<String>,

    /// Set TNULL for an integer column, as COL=VALUE
    #[arg(long = "set-tnull", value_name = "COL=VALUE")]
    set_tnull: Vec<String>,

    /// Chatter level (0-5)
    #[arg(long, default_value_t = 2)]
    chatter: u8,

    /// Debug mode
    #[arg(long)]
    debug: bool,

    /// Overwrite existing output files
    #[arg(long)]
    clobber: bool,

    /// Do not record parameters in HISTORY
    #[arg(long = "no-history")]
    no_history: bool,
}

fn split_assignment(arg: &str) -> Result<(&str, &str), String> {
    match arg.split_once('=') {
        Some((col, value)) if !col.trim().is_empty() => Ok((col.trim(), value.trim())),
        _ => Err(format!("expected COL=VALUE, got '{}'", arg)),
    }
}

fn format_range(info: &ColumnInfo) -> String {
    if info.range.is_set() {
        format!("[{}, {}]", info.range.min, info.range.max)
    } else {
        "-".to_string()
    }
}

fn format_column(info: &ColumnInfo) -> String {
    let null = info.null.map_or_else(|| "-".to_string(), |n| n.to_string());
    format!(
        "{:>4}  {:<16} {:>5} {:>6} {:>5}  {:<10} {:<8} {:<16} {}",
        info.number,
        info.name,
        info.signed_type_code(),
        info.repeat,
        info.width,
        if info.units.is_empty() { "-" } else { info.units.as_str() },
        if info.display.is_empty() { "-" } else { info.display.as_str() },
        format_range(info),
        null
    )
}

/// Move to the HDU named on the command line, or to the first binary table.
fn select_hdu(file: &mut FitsFile, hdu: Option<&str>) -> ahfits::Result<()> {
    match hdu {
        Some(sel) => match sel.parse::<usize>() {
            Ok(index) => file.move_to_hdu(index),
            Err(_) => file.move_to_extname(sel),
        },
        None => {
            while !file.is_bintable()? {
                file.next_hdu()?;
            }
            Ok(())
        }
    }
}

fn describe(spec: &str, args: &Args, settings: &Settings) -> ahfits::Result<String> {
    let editing = !args.set_tunit.is_empty() || !args.set_tnull.is_empty();
    let mut file: FitsFile = if editing {
        FitsFile::edit(spec, settings)?
    } else {
        FitsFile::open(spec, settings)?
    };
    if args.hdu.is_some() || !spec.ends_with(']') {
        select_hdu(&mut file, args.hdu.as_deref())?;
    }

    let mut params = Vec::new();
    for assignment in &args.set_tunit {
        let (col, unit) = split_assignment(assignment).map_err(|msg| invalid_input(&msg))?;
        file.set_tunit(col, unit, None)?;
        params.push(("set-tunit", assignment.as_str()));
    }
    for assignment in &args.set_tnull {
        let (col, value) = split_assignment(assignment).map_err(|msg| invalid_input(&msg))?;
        let null = value
            .parse::<i64>()
            .map_err(|_| invalid_input(&format!("TNULL must be an integer, got '{}'", value)))?;
        file.set_tnull(col, null, None)?;
        params.push(("set-tnull", assignment.as_str()));
    }
    if editing {
        file.stamp_parameters(&params)?;
    }

    let mut out = format!("{}\n", file.file_and_hdu_string()?);
    out.push_str(&format!(
        "{:>4}  {:<16} {:>5} {:>6} {:>5}  {:<10} {:<8} {:<16} {}\n",
        "#", "NAME", "TYPE", "REPEAT", "WIDTH", "UNITS", "DISPLAY", "RANGE", "TNULL"
    ));
    for name in file.search_columns(&args.pattern, false)? {
        out.push_str(&format_column(file.column_info(&name)?));
        out.push('\n');
    }
    file.close()?;
    Ok(out)
}

fn invalid_input(msg: &str) -> ahfits::Error {
    ahfits::Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidInput, msg.to_string()))
}

fn run(args: &Args) -> Result<String, String> {
    let settings = Settings::builder()
        .chatter(args.chatter)
        .debug(args.debug)
        .clobber(args.clobber)
        .history(!args.no_history)
        .exec_name("ahcolinfo")
        .build();
    // A logger may already be installed when run from tests.
    let _ = chatter::init(&settings);

    let files = expand_file_list(&args.file).map_err(|e| e.to_string())?;
    let mut out = String::new();
    for (i, spec) in files.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&describe(spec, args, &settings).map_err(|e| e.to_string())?);
    }
    Ok(out)
}

fn main() {
    let args = Args::parse();
    match run(&args) {
        Ok(output) => print!("{}", output),
        Err(msg) => {
            log::error!("{}", msg);
            eprintln!("{}", msg);
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ahfits::{ColumnRange, ColumnSpec, RangeValue, TypeCode};

    fn args(file: &str, extra: &[&str]) -> Args {
        let mut argv = vec!["ahcolinfo", file];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    fn sample(dir: &tempfile::TempDir) -> String {
        let path = dir.path().join("evt.fits").to_str().unwrap().to_string();
        let mut f: FitsFile = FitsFile::create(&path, &Settings::default()).unwrap();
        f.create_table(
            "EVENTS",
            &[
                ColumnSpec::new("TIME", "1D").with_unit("s"),
                ColumnSpec::new("PHA", "1J"),
            ],
            2,
        )
        .unwrap();
        f.close().unwrap();
        path
    }

    #[test]
    fn assignment_parsing() {
        assert_eq!(split_assignment("PHA=-1").unwrap(), ("PHA", "-1"));
        assert_eq!(split_assignment(" TIME = s ").unwrap(), ("TIME", "s"));
        assert!(split_assignment("PHA").is_err());
        assert!(split_assignment("=5").is_err());
    }

    #[test]
    fn column_line() {
        let info = ColumnInfo {
            number: 2,
            name: "PHA".into(),
            units: "chan".into(),
            display: String::new(),
            type_code: TypeCode::Long,
            variable: false,
            repeat: 1,
            width: 4,
            range: ColumnRange {
                min: RangeValue::Integer(0),
                max: RangeValue::Integer(4095),
            },
            null: Some(-1),
        };
        let line = format_column(&info);
        assert!(line.contains("PHA"));
        assert!(line.contains("chan"));
        assert!(line.contains("[0, 4095]"));
        assert!(line.trim_end().ends_with("-1"));
    }

    #[test]
    fn lists_columns_of_first_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = sample(&dir);
        let out = run(&args(&path, &[])).unwrap();
        assert!(out.starts_with(&format!("{path}[EVENTS]")));
        assert!(out.contains("TIME"));
        assert!(out.contains("PHA"));
    }

    #[test]
    fn set_options_write_keywords() {
        let dir = tempfile::tempdir().unwrap();
        let path = sample(&dir);
        let out = run(&args(&path, &["PHA", "--set-tnull", "PHA=-99", "--set-tunit", "PHA=chan"]))
            .unwrap();
        assert!(out.contains("chan"));
        assert!(out.contains("-99"));
        assert!(!out.contains("TIME "));
    }

    #[test]
    fn tnull_on_float_column_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = sample(&dir);
        let err = run(&args(&path, &["--set-tnull", "TIME=0"])).unwrap_err();
        assert!(err.contains("non-integer type column: TIME"));
    }
}
