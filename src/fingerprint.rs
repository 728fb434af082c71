use lazy_static::lazy_static;
use regex::Regex;
use std::{fmt, path::Path};
use thiserror::Error;

/// Number of characters kept from the concatenated date fields of a log prefix.
const DATE_LEN: usize = 8;

/// Where a log line came from: the venue and date embedded in the line's own prefix.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OriginKey {
    pub venue: String,
    pub date: String,
}

impl OriginKey {
    /// Split `prefix` on `-`: field 1 is the venue, fields 2 to 4 joined and cut to
    /// eight characters are the date. `None` when there is no venue field.
    pub fn parse(prefix: &str) -> Option<Self> {
        let mut fields = prefix.split('-').skip(1);
        let venue = fields.next()?.to_owned();
        let date = fields.take(3).collect::<String>().chars().take(DATE_LEN).collect();
        Some(Self { venue, date })
    }
}

impl fmt::Display for OriginKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.venue, self.date)
    }
}

/// Why a line carrying the delimiter could not be fingerprinted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MalformedLine {
    #[error("only {found} of {needed} tokens after the delimiter")]
    TooFewTokens { found: usize, needed: usize },
    #[error("no venue field in the log prefix")]
    NoOrigin,
}

/// The token window and origin of one matching line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fingerprint {
    pub window: Vec<String>,
    pub origin: OriginKey,
}

impl Fingerprint {
    /// Build the fingerprint of `line` for `delimiter`, taking `window_len` tokens
    /// from the text after the last `"<delimiter>:"`. The origin comes from the
    /// text before the first one. A line without the marker uses the whole line
    /// for both.
    pub fn extract(line: &str, delimiter: &str, window_len: usize) -> Result<Self, MalformedLine> {
        let marker = format!("{}:", delimiter);
        let prefix = line.split(marker.as_str()).next().unwrap_or(line);
        let message = line.rsplit(marker.as_str()).next().unwrap_or(line);
        let window: Vec<String> = message.split_whitespace().take(window_len).map(String::from).collect();
        if window.len() < window_len {
            return Err(MalformedLine::TooFewTokens {
                found: window.len(),
                needed: window_len,
            });
        }
        let origin = OriginKey::parse(prefix).ok_or(MalformedLine::NoOrigin)?;
        Ok(Self { window, origin })
    }
}

lazy_static! {
    static ref DATED_FILE_NAME: Regex = Regex::new(r"^[^-]+-(\d{4}-\d{2}-\d{2}|\d{8})").unwrap();
}

/// The single-character loader tag of a log file: the last character of its file
/// name before the first `-`, or before the first `.` when there is no `-`.
pub fn loader_tag(path: &Path) -> Option<char> {
    let name = path.file_name()?.to_string_lossy();
    let separator = if name.contains('-') { '-' } else { '.' };
    name.split(separator).next()?.chars().last()
}

/// Whether the file name has the `<loader>-<date>` shape the loader tag relies on.
pub fn is_dated_file_name(path: &Path) -> bool {
    path.file_name()
        .map(|name| DATED_FILE_NAME.is_match(&name.to_string_lossy()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE: &str =
        "ldr-CME-2020-01-03 12:00:01.123 ERROR: Failed to load symbol ESH0 from feed 4 at offset 77 retrying";

    #[test]
    fn extracts_window_and_origin() {
        let fingerprint = Fingerprint::extract(LINE, "ERROR", 9).unwrap();
        assert_eq!(
            fingerprint.window,
            vec!["Failed", "to", "load", "symbol", "ESH0", "from", "feed", "4", "at"]
        );
        assert_eq!(
            fingerprint.origin,
            OriginKey {
                venue: "CME".into(),
                date: "20200103".into()
            }
        );
        assert_eq!(fingerprint.origin.to_string(), "CME,20200103");
    }

    #[test]
    fn window_comes_after_last_marker() {
        let line = "x-NYM-2020-02-01 WARNING: relayed WARNING: a b c d e f g h i j";
        let fingerprint = Fingerprint::extract(line, "WARNING", 9).unwrap();
        assert_eq!(fingerprint.window.join(" "), "a b c d e f g h i");
        assert_eq!(fingerprint.origin.venue, "NYM");
    }

    #[test]
    fn short_message_is_malformed() {
        let line = "x-CME-2020-01-03 WARNING: a b c d e f g h";
        assert_eq!(
            Fingerprint::extract(line, "WARNING", 9),
            Err(MalformedLine::TooFewTokens { found: 8, needed: 9 })
        );
        assert!(Fingerprint::extract(line, "WARNING", 8).is_ok());
    }

    #[test]
    fn missing_venue_is_malformed() {
        let line = "no prefix here ERROR: a b c d e f g h i";
        assert_eq!(Fingerprint::extract(line, "ERROR", 9), Err(MalformedLine::NoOrigin));
    }

    #[test]
    fn delimiter_without_colon_uses_whole_line() {
        let line = "x-CME-2020-01-03 ERRORS seen a b c d e f";
        let fingerprint = Fingerprint::extract(line, "ERROR", 9).unwrap();
        assert_eq!(fingerprint.window[0], "x-CME-2020-01-03");
    }

    #[test]
    fn short_date_fields_are_kept_as_is() {
        assert_eq!(
            OriginKey::parse("a-IOM"),
            Some(OriginKey {
                venue: "IOM".into(),
                date: String::new()
            })
        );
        assert_eq!(OriginKey::parse("a-CBT-2021-1").unwrap().date, "20211");
        assert_eq!(OriginKey::parse("nodash"), None);
    }

    #[test]
    fn loader_tag_from_file_name() {
        assert_eq!(loader_tag(Path::new("/var/log/loader3-2020-01-03.log")), Some('3'));
        assert_eq!(loader_tag(Path::new("logs-dir/loaderB.log")), Some('B'));
        assert_eq!(loader_tag(Path::new("-2020-01-03.log")), None);
        assert_eq!(loader_tag(Path::new("")), None);
    }

    #[test]
    fn dated_file_names() {
        assert!(is_dated_file_name(Path::new("logs/loader3-2020-01-03.log")));
        assert!(is_dated_file_name(Path::new("loaderA-20200103.log")));
        assert!(!is_dated_file_name(Path::new("loaderA.log")));
        assert!(!is_dated_file_name(Path::new("loaderA-latest.log")));
    }
}
