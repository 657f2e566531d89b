//! Replays recorded events from a JSON-lines file into a running model.
//!
//! Each non-empty line is `{"source": "<source name>", "data": {...}}`.
//! Lines starting with `#` are skipped.

use anyhow::{anyhow, Context};
use cep_pipeline::ProcessingRuntime;
use cep_types::Event;
use serde::{Deserialize, Serialize};
use std::io::BufRead;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayRecord {
    pub source: String,
    pub data: serde_json::Value,
}

pub fn parse_line(line: &str) -> anyhow::Result<Option<ReplayRecord>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(line)?))
}

/// Sends every record in `reader` to `runtime`, returning how many were sent.
/// Stops at the first malformed line or rejected event.
pub fn replay<R: BufRead>(runtime: &ProcessingRuntime, reader: R) -> anyhow::Result<usize> {
    let mut sent = 0;
    for (index, line) in reader.lines().enumerate() {
        let number = index + 1;
        let line = line.with_context(|| format!("Could not read event line {}", number))?;
        let record = match parse_line(&line).with_context(|| format!("Malformed event on line {}", number))? {
            Some(record) => record,
            None => continue,
        };
        let source = runtime
            .source_by_name(&record.source)
            .ok_or_else(|| anyhow!("Line {}: unknown source '{}'", number, record.source))?;
        let event = Event::from_json(&record.data, &source.event_type)
            .with_context(|| format!("Line {}: invalid event for '{}'", number, record.source))?;
        debug!(line = number, source = %record.source, %event, "replaying event");
        runtime
            .send_event_from_source(event, source.id)
            .with_context(|| format!("Line {}: event rejected", number))?;
        sent += 1;
    }
    info!(events = sent, "replay finished");
    Ok(sent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line("").unwrap(), None);
        assert_eq!(parse_line("  # comment").unwrap(), None);
        let record = parse_line(r#"{"source": "ticks", "data": {"price": 1.5}}"#)
            .unwrap()
            .unwrap();
        assert_eq!(record.source, "ticks");
        assert_eq!(record.data["price"], 1.5);
        assert!(parse_line("{not json").is_err());
    }
}
