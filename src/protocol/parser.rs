//! Validator report parser.
//!
//! A report is a run of `<key>:<blanks><text>` lines. `Process` names the
//! offending component and `File` carries the details; the last occurrence of
//! either wins. Parsing never fails: a report too mangled to name anything
//! still produces the `(unknown)` sentinel pair, so it still escalates.

use memchr::memchr;
use serde::Serialize;

/// Placeholder for a field the report did not provide.
pub const UNKNOWN: &str = "(unknown)";

const COMPONENT_KEY: &str = "Process";
const DETAILS_KEY: &str = "File";

/// Normalized result of parsing one report. Both fields are always non-empty
/// unless the report itself carried an empty value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedViolation {
    /// Offending process, from the last `Process` line.
    pub component: String,
    /// Offending file, from the last `File` line.
    pub details: String,
}

/// One `key: text` line borrowed from the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Line<'a> {
    key: &'a str,
    text: &'a str,
}

/// Split the next line off `rest`. Returns `None` when the line has no `:`,
/// which ends parsing of the whole report.
fn next_line<'a>(rest: &mut &'a str) -> Option<Line<'a>> {
    let input = *rest;
    let bytes = input.as_bytes();
    let line_end = memchr(b'\n', bytes).unwrap_or(bytes.len());
    let colon = memchr(b':', &bytes[..line_end])?;

    let key = &input[..colon];
    let text_start = bytes[colon + 1..line_end]
        .iter()
        .position(|&b| b != b' ' && b != b'\t')
        .map_or(line_end, |offset| colon + 1 + offset);
    let text = &input[text_start..line_end];

    *rest = input.get(line_end + 1..).unwrap_or("");
    Some(Line { key, text })
}

/// Parse a Validator report.
#[must_use]
pub fn parse_report(report: &str) -> ParsedViolation {
    let mut component: Option<&str> = None;
    let mut details: Option<&str> = None;

    let mut rest = report;
    while !rest.is_empty() {
        let Some(line) = next_line(&mut rest) else {
            break;
        };
        match line.key {
            COMPONENT_KEY => component = Some(line.text),
            DETAILS_KEY => details = Some(line.text),
            _ => {}
        }
    }

    ParsedViolation {
        component: component.unwrap_or(UNKNOWN).to_string(),
        details: details.unwrap_or(UNKNOWN).to_string(),
    }
}

/// Parse raw payload bytes. Invalid UTF-8 is replaced rather than rejected.
#[must_use]
pub fn parse_payload(payload: &[u8]) -> ParsedViolation {
    parse_report(&String::from_utf8_lossy(payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn parsed(component: &str, details: &str) -> ParsedViolation {
        ParsedViolation {
            component: component.to_string(),
            details: details.to_string(),
        }
    }

    #[test]
    fn two_field_report() {
        assert_eq!(
            parse_report("Process: evil-binary\nFile: /usr/bin/evil-binary\n"),
            parsed("evil-binary", "/usr/bin/evil-binary")
        );
    }

    #[test]
    fn empty_input_yields_sentinels() {
        assert_eq!(parse_report(""), parsed(UNKNOWN, UNKNOWN));
    }

    #[test]
    fn last_occurrence_wins() {
        assert_eq!(parse_report("Process: A\nProcess: B\n").component, "B");
        assert_eq!(parse_report("File: x\nFile: y").details, "y");
    }

    #[test]
    fn missing_trailing_newline() {
        assert_eq!(parse_report("Process: A"), parsed("A", UNKNOWN));
    }

    #[test]
    fn unrecognized_keys_are_ignored() {
        assert_eq!(
            parse_report("Foo: bar\nProcess: A\n"),
            parsed("A", UNKNOWN)
        );
    }

    #[test]
    fn empty_text_after_colon() {
        assert_eq!(parse_report("Process:\nFile:   \n"), parsed("", ""));
    }

    #[test]
    fn blanks_skipped_but_trailing_content_verbatim() {
        assert_eq!(
            parse_report("Process:\t \tname with spaces  \r\n").component,
            "name with spaces  \r"
        );
    }

    #[test]
    fn key_is_not_trimmed() {
        assert_eq!(parse_report(" Process: A\n"), parsed(UNKNOWN, UNKNOWN));
        assert_eq!(parse_report("Process : A\n"), parsed(UNKNOWN, UNKNOWN));
    }

    #[test]
    fn text_may_contain_colons() {
        assert_eq!(
            parse_report("File: /opt/app:1\n").details,
            "/opt/app:1"
        );
    }

    #[test]
    fn line_without_colon_stops_parsing() {
        assert_eq!(
            parse_report("Process: A\ngarbage\nProcess: B\nFile: f\n"),
            parsed("A", UNKNOWN)
        );
    }

    #[test]
    fn empty_line_stops_parsing() {
        assert_eq!(
            parse_report("File: f\n\nProcess: late\n"),
            parsed(UNKNOWN, "f")
        );
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let violation = parse_payload(b"Process: ev\xffil\n");
        assert_eq!(violation.component, "ev\u{fffd}il");
    }

    proptest! {
        #[test]
        fn well_formed_pairs_round_trip(
            component in "[A-Za-z0-9_./-][A-Za-z0-9_./ -]{0,40}",
            details in "[A-Za-z0-9_./-][A-Za-z0-9_./: -]{0,80}",
        ) {
            let report = format!("Process: {component}\nFile: {details}\n");
            let violation = parse_report(&report);
            prop_assert_eq!(violation.component, component);
            prop_assert_eq!(violation.details, details);
        }

        #[test]
        fn never_panics_and_never_returns_none(input in any::<Vec<u8>>()) {
            let violation = parse_payload(&input);
            prop_assert!(!input.is_empty() || violation == parsed(UNKNOWN, UNKNOWN));
        }
    }
}
