//! Built-in line parsers.

use serde::Deserialize;
use tracing::warn;

use crate::input::LineParser;

/// Hands every line through unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct StringLineParser;

impl LineParser for StringLineParser {
    type Record = String;

    fn parse_line(&self, line: &str) -> Result<String, String> {
        Ok(line.to_string())
    }
}

/// One integer per line, surrounding whitespace ignored. Anything else is rejected.
#[derive(Debug, Default, Clone, Copy)]
pub struct IntegerLineParser;

impl LineParser for IntegerLineParser {
    type Record = i64;

    fn parse_line(&self, line: &str) -> Result<i64, String> {
        line.trim()
            .parse()
            .map_err(|e| format!("'{line}' is not an integer: {e}"))
    }
}

/// Two comma-separated integers per line.
///
/// Malformed lines are not rejected: they become the sentinel pair
/// [`PairIntegerCsvLineParser::MALFORMED`], which tasks are expected to filter.
#[derive(Debug, Default, Clone, Copy)]
pub struct PairIntegerCsvLineParser;

impl PairIntegerCsvLineParser {
    pub const MALFORMED: (i32, i32) = (-1, -1);
}

// Intermediate type mirroring the CSV columns
#[derive(Deserialize)]
struct RawPair(i32, i32);

impl LineParser for PairIntegerCsvLineParser {
    type Record = (i32, i32);

    fn parse_line(&self, line: &str) -> Result<(i32, i32), String> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(line.as_bytes());

        match reader.deserialize::<RawPair>().next() {
            Some(Ok(RawPair(left, right))) => Ok((left, right)),
            Some(Err(e)) => {
                warn!(%line, error = %e, "unable to parse line");
                Ok(Self::MALFORMED)
            }
            None => {
                warn!(%line, "unable to parse empty line");
                Ok(Self::MALFORMED)
            }
        }
    }
}
