//! Binding configuration: which implementation serves which contract.
//!
//! The table is read once, when the [`Injector`](crate::injector::Injector)
//! is built, from any [`ConfigSource`]. The usual source is a properties
//! resource:
//!
//! ```text
//! # contract = implementation
//! org.example.SomeInterface=org.example.SomeImpl
//! org.example.SomeOtherInterface=org.example.SODoer
//! ```

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::str::Chars;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{HaqnError, Result};

/// Immutable contract → implementation table.
///
/// Values are kept exactly as loaded; [`Bindings::implementation_for`]
/// trims them at lookup.
///
/// # Examples
/// ```
/// use haqn_core::config::Bindings;
///
/// let bindings: Bindings = [("org.example.SomeInterface", " org.example.SomeImpl ")]
///     .into_iter()
///     .collect();
///
/// assert_eq!(
///     bindings.implementation_for("org.example.SomeInterface"),
///     Some("org.example.SomeImpl")
/// );
/// assert_eq!(bindings.implementation_for("org.example.Missing"), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bindings {
    entries: BTreeMap<String, String>,
}

impl Bindings {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the trimmed implementation name bound to `contract`.
    ///
    /// A binding whose value is blank after trimming counts as absent.
    pub fn implementation_for(&self, contract: &str) -> Option<&str> {
        self.entries
            .get(contract)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    /// Adds or replaces a binding.
    ///
    /// A loaded injector never sees this: it keeps its own table.
    pub fn insert(&mut self, contract: impl Into<String>, implementation: impl Into<String>) {
        self.entries.insert(contract.into(), implementation.into());
    }

    /// Returns the raw value for `key`, untrimmed.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Returns `true` if `key` is present, even with a blank value.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Iterates over `(contract, raw implementation)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns all configured contract names.
    pub fn keys(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Anything that can produce a complete [`Bindings`] table.
///
/// Loading is all-or-nothing: a source either returns the whole table
/// or an error, never a partial table.
pub trait ConfigSource {
    /// Loads the table.
    ///
    /// # Errors
    /// [`HaqnError::ConfigurationNotFound`] if the backing resource does not
    /// exist, [`HaqnError::ConfigurationRead`] if it cannot be read or parsed.
    fn load(&self) -> Result<Bindings>;

    /// Human-readable location, used in log lines and errors.
    fn describe(&self) -> String;
}

impl ConfigSource for Bindings {
    fn load(&self) -> Result<Bindings> {
        Ok(self.clone())
    }

    fn describe(&self) -> String {
        format!("<in-memory bindings, {} entries>", self.len())
    }
}

/// Properties resource on disk.
#[derive(Debug, Clone)]
pub struct PropertiesFile {
    path: PathBuf,
}

impl PropertiesFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigSource for PropertiesFile {
    fn load(&self) -> Result<Bindings> {
        let location = self.describe();
        debug!(location = %location, "Loading properties file");

        let bytes = std::fs::read(&self.path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => HaqnError::ConfigurationNotFound {
                location: location.clone(),
            },
            _ => HaqnError::ConfigurationRead {
                location: location.clone(),
                source: Box::new(e),
            },
        })?;

        let text = String::from_utf8(bytes).map_err(|e| HaqnError::ConfigurationRead {
            location: location.clone(),
            source: Box::new(e),
        })?;

        parse_properties(&text).map_err(|e| HaqnError::ConfigurationRead {
            location,
            source: Box::new(e),
        })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Properties text already in memory, e.g. an `include_str!` resource.
///
/// ```
/// use haqn_core::config::{ConfigSource, PropertiesText};
///
/// let source = PropertiesText::new("embedded", "a.Contract = a.Impl\n");
/// let bindings = source.load().unwrap();
/// assert_eq!(bindings.implementation_for("a.Contract"), Some("a.Impl"));
/// ```
#[derive(Debug, Clone)]
pub struct PropertiesText {
    name: String,
    text: String,
}

impl PropertiesText {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

impl ConfigSource for PropertiesText {
    fn load(&self) -> Result<Bindings> {
        parse_properties(&self.text).map_err(|e| HaqnError::ConfigurationRead {
            location: self.describe(),
            source: Box::new(e),
        })
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

/// Properties text that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {message}")]
pub struct ParseError {
    /// 1-based line where the offending logical line starts
    pub line: usize,
    pub message: String,
}

/// Parses properties text into a [`Bindings`] table.
///
/// Supported syntax:
/// - `key=value`, `key:value` or `key value`
/// - `#` and `!` comment lines, blank lines
/// - a trailing backslash continues the logical line
/// - escapes `\t`, `\n`, `\r`, `\f`, `\uXXXX`; any other escaped
///   character stands for itself
///
/// Later duplicates replace earlier ones.
///
/// ```
/// use haqn_core::config::parse_properties;
///
/// let bindings = parse_properties("# demo\nx.A=x.B\nx.C : x.D\n").unwrap();
/// assert_eq!(bindings.get("x.A"), Some("x.B"));
/// assert_eq!(bindings.get("x.C"), Some("x.D"));
/// ```
pub fn parse_properties(text: &str) -> std::result::Result<Bindings, ParseError> {
    let mut entries = BTreeMap::new();
    let mut lines = text.lines().enumerate();

    while let Some((index, raw)) = lines.next() {
        let start_line = index + 1;
        let first = raw.trim_start();
        if first.is_empty() || first.starts_with('#') || first.starts_with('!') {
            continue;
        }

        let mut logical = String::from(first);
        while ends_with_continuation(&logical) {
            logical.pop();
            match lines.next() {
                Some((_, next)) => logical.push_str(next.trim_start()),
                None => break,
            }
        }

        let (key, value) = split_entry(&logical);
        let key = unescape(key, start_line)?;
        let value = unescape(value, start_line)?;
        trace!(key = %key, value = %value, "Parsed binding");
        entries.insert(key, value);
    }

    Ok(Bindings { entries })
}

/// `true` if the line ends in an odd number of backslashes.
fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

/// Splits a logical line at the first unescaped `=`, `:` or whitespace.
fn split_entry(line: &str) -> (&str, &str) {
    let mut escaped = false;
    let mut split = None;

    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => {
                split = Some((i, i + c.len_utf8(), true));
                break;
            }
            c if c.is_whitespace() => {
                split = Some((i, i + c.len_utf8(), false));
                break;
            }
            _ => {}
        }
    }

    let Some((key_end, rest_start, explicit)) = split else {
        return (line, "");
    };

    let key = &line[..key_end];
    let mut rest = line[rest_start..].trim_start();

    // "key  = value": whitespace first, then one optional separator
    if !explicit {
        if let Some(stripped) = rest.strip_prefix(['=', ':']) {
            rest = stripped.trim_start();
        }
    }

    (key, rest)
}

/// Writes `key` the way it must appear on the left of a properties entry.
///
/// Separators, whitespace, backslashes and a leading comment character are
/// escaped, so `parse_properties` reads the key back unchanged.
///
/// ```
/// use haqn_core::config::{escape_properties_key, parse_properties};
///
/// let key = escape_properties_key("my_app::Printer");
/// assert_eq!(key, r"my_app\:\:Printer");
///
/// let bindings = parse_properties(&format!("{key} = my_app::Thermal")).unwrap();
/// assert_eq!(bindings.implementation_for("my_app::Printer"), Some("my_app::Thermal"));
/// ```
pub fn escape_properties_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());

    for (i, c) in key.chars().enumerate() {
        match c {
            '\\' | '=' | ':' | ' ' => {
                out.push('\\');
                out.push(c);
            }
            '#' | '!' if i == 0 => {
                out.push('\\');
                out.push(c);
            }
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{000C}' => out.push_str("\\f"),
            c => out.push(c),
        }
    }

    out
}

fn unescape(raw: &str, line: usize) -> std::result::Result<String, ParseError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{000C}'),
            Some('u') => {
                let unit = utf16_unit(&mut chars, line)?;
                out.push(decode_unit(unit, &mut chars, line)?);
            }
            Some(other) => out.push(other),
            None => {}
        }
    }

    Ok(out)
}

/// Reads the four hex digits of a `\uXXXX` escape.
fn utf16_unit(chars: &mut Chars<'_>, line: usize) -> std::result::Result<u16, ParseError> {
    let hex: String = chars.by_ref().take(4).collect();

    if hex.len() != 4 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ParseError {
            line,
            message: format!("malformed \\uxxxx encoding: \\u{hex}"),
        });
    }

    u16::from_str_radix(&hex, 16).map_err(|e| ParseError {
        line,
        message: format!("malformed \\uxxxx encoding: \\u{hex}: {e}"),
    })
}

/// Decodes one UTF-16 unit, consuming the following `\uXXXX` low surrogate
/// when `unit` is a high surrogate.
fn decode_unit(
    unit: u16,
    chars: &mut Chars<'_>,
    line: usize,
) -> std::result::Result<char, ParseError> {
    let unpaired = || ParseError {
        line,
        message: format!("unpaired surrogate in \\u{unit:04X}"),
    };

    if !(0xD800..=0xDBFF).contains(&unit) {
        return char::from_u32(u32::from(unit)).ok_or_else(unpaired);
    }

    let mut ahead = chars.clone();
    let (Some('\\'), Some('u')) = (ahead.next(), ahead.next()) else {
        return Err(unpaired());
    };

    let low = utf16_unit(&mut ahead, line)?;
    if !(0xDC00..=0xDFFF).contains(&low) {
        return Err(unpaired());
    }

    *chars = ahead;
    char::decode_utf16([unit, low])
        .next()
        .and_then(|decoded| decoded.ok())
        .ok_or_else(unpaired)
}
