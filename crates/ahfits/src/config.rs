//! Settings shared by every file context opened by a tool.

use std::env;

/// Chatter level used when none is given.
pub const DEFAULT_CHATTER: u8 = 2;

/// Highest meaningful chatter level.
pub const MAX_CHATTER: u8 = 5;

/// Tool-wide options copied into each [`FitsFile`](crate::FitsFile) when it
/// is opened. Build with [`Settings::builder`]; settings are immutable once
/// built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    clobber: bool,
    buffer_rows: Option<usize>,
    history: bool,
    debug: bool,
    chatter: u8,
    exec_name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            clobber: false,
            buffer_rows: None,
            history: true,
            debug: false,
            chatter: DEFAULT_CHATTER,
            exec_name: String::new(),
        }
    }
}

impl Settings {
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder {
            settings: Settings::default(),
        }
    }

    /// Settings from `AHFITS_CLOBBER`, `AHFITS_BUFFER`, `AHFITS_HISTORY`,
    /// `AHFITS_CHATTER` and `AHFITS_DEBUG`. Unset or unparsable variables
    /// keep their defaults.
    pub fn from_env() -> Settings {
        Settings::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Settings {
        let mut builder = Settings::builder();
        if let Some(b) = lookup("AHFITS_CLOBBER").and_then(|v| parse_flag(&v)) {
            builder = builder.clobber(b);
        }
        if let Some(n) = lookup("AHFITS_BUFFER").and_then(|v| v.trim().parse::<i64>().ok()) {
            builder = builder.buffer(n);
        }
        if let Some(b) = lookup("AHFITS_HISTORY").and_then(|v| parse_flag(&v)) {
            builder = builder.history(b);
        }
        if let Some(n) = lookup("AHFITS_CHATTER").and_then(|v| v.trim().parse::<u8>().ok()) {
            builder = builder.chatter(n);
        }
        if let Some(b) = lookup("AHFITS_DEBUG").and_then(|v| parse_flag(&v)) {
            builder = builder.debug(b);
        }
        if let Some(name) = env::args().next() {
            builder = builder.exec_name(&name);
        }
        builder.build()
    }

    /// Overwrite existing files on create.
    pub fn clobber(&self) -> bool {
        self.clobber
    }

    /// Rows to buffer when reading tables; `None` lets the engine decide.
    pub fn buffer_rows(&self) -> Option<usize> {
        self.buffer_rows
    }

    /// Write HISTORY cards (parameter stamps) to output files.
    pub fn history(&self) -> bool {
        self.history
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn chatter(&self) -> u8 {
        self.chatter
    }

    /// Executable name used to prefix log lines.
    pub fn exec_name(&self) -> &str {
        &self.exec_name
    }
}

/// Builder for [`Settings`].
#[derive(Debug, Clone)]
pub struct SettingsBuilder {
    settings: Settings,
}

impl SettingsBuilder {
    pub fn clobber(mut self, clobber: bool) -> Self {
        self.settings.clobber = clobber;
        self
    }

    /// Row-buffer hint. Negative values mean "engine default".
    pub fn buffer(mut self, rows: i64) -> Self {
        self.settings.buffer_rows = usize::try_from(rows).ok();
        self
    }

    pub fn history(mut self, history: bool) -> Self {
        self.settings.history = history;
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.settings.debug = debug;
        self
    }

    /// Chatter level, capped at [`MAX_CHATTER`].
    pub fn chatter(mut self, chatter: u8) -> Self {
        self.settings.chatter = chatter.min(MAX_CHATTER);
        self
    }

    /// Executable name; a leading directory is dropped.
    pub fn exec_name(mut self, name: &str) -> Self {
        let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
        self.settings.exec_name = base.to_string();
        self
    }

    pub fn build(self) -> Settings {
        self.settings
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "y" | "yes" | "t" | "true" => Some(true),
        "0" | "n" | "no" | "f" | "false" => Some(false),
        _ => None,
    }
}
