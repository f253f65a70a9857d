//! Deterministic replay from captured account data

use crate::oracle::Candle;
use anyhow::Context;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

/// One captured observation: account state, fresh marks, and the bar
/// series each symbol would have seen at that moment.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplayEvent {
    pub at: DateTime<Utc>,
    pub balance: Decimal,
    pub equity: Decimal,
    #[serde(default)]
    pub margin_used: Decimal,
    /// Symbol to latest mark price; carries only symbols that moved
    #[serde(default)]
    pub marks: HashMap<String, Decimal>,
    /// Symbol to recent bars of the base timeframe
    #[serde(default)]
    pub candles: HashMap<String, Vec<Candle>>,
}

/// Streams [`ReplayEvent`]s from a JSONL capture in file order.
///
/// Events are expected to be timestamp-sorted; blank lines are skipped,
/// a malformed line surfaces as an error carrying its line number.
pub struct ReplayFeed {
    lines: Lines<BufReader<File>>,
    line_no: usize,
}

impl ReplayFeed {
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let file = File::open(path.as_ref())
            .with_context(|| format!("opening replay file {}", path.as_ref().display()))?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
            line_no: 0,
        })
    }
}

impl Iterator for ReplayFeed {
    type Item = anyhow::Result<ReplayEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.line_no += 1;
            match self.lines.next()? {
                Err(error) => return Some(Err(error.into())),
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => {
                    return Some(
                        serde_json::from_str(&line)
                            .with_context(|| format!("replay line {}", self.line_no)),
                    )
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;

    fn capture(lines: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(lines.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_reads_events_in_order() {
        let file = capture(concat!(
            r#"{"at":"2025-03-10T14:00:00Z","balance":200000,"equity":200000,"marks":{"EURUSD":1.1000}}"#,
            "\n",
            "\n",
            r#"{"at":"2025-03-10T14:00:10Z","balance":200000,"equity":199950,"marks":{"EURUSD":1.0995}}"#,
            "\n",
        ));

        let events: Vec<ReplayEvent> = ReplayFeed::open(file.path())
            .unwrap()
            .collect::<anyhow::Result<_>>()
            .unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].balance, dec!(200000));
        assert_eq!(events[1].marks["EURUSD"], dec!(1.0995));
        assert!(events[0].candles.is_empty());
    }

    #[test]
    fn test_malformed_line_reports_position() {
        let file = capture(concat!(
            r#"{"at":"2025-03-10T14:00:00Z","balance":200000,"equity":200000}"#,
            "\n",
            "not json\n",
        ));

        let mut feed = ReplayFeed::open(file.path()).unwrap();
        assert!(feed.next().unwrap().is_ok());
        let error = feed.next().unwrap().unwrap_err();
        assert!(error.to_string().contains("line 2"));
    }

    #[test]
    fn test_missing_file() {
        assert!(ReplayFeed::open("/nonexistent/capture.jsonl").is_err());
    }
}
