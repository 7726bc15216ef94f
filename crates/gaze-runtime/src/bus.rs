//! JSON-lines bus adapter.
//!
//! Inbound: one [`GazeEvent`] per line. Blank lines and lines starting with
//! `#` are skipped; malformed lines are logged, counted and dropped.
//! Outbound: one [`OutboundMessage`] per line.

use gaze_arbiter::{telemetry, DiagnosticsSnapshot, WinnerChange};
use gaze_models::GazeEvent;
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{RuntimeError, RuntimeResult};

/// Messages written to the outbound stream.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage<'a> {
    Winner(&'a WinnerChange),
    Diagnostics(&'a DiagnosticsSnapshot),
}

/// Parse one inbound line. `Ok(None)` for lines that carry no event.
pub fn parse_line(line: &str) -> RuntimeResult<Option<GazeEvent>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(trimmed)?))
}

/// Encode one outbound message as a single line (without newline).
pub fn encode(message: &OutboundMessage<'_>) -> RuntimeResult<String> {
    Ok(serde_json::to_string(message)?)
}

/// Read events line by line and forward them until input ends or the
/// receiver is gone. Returns the number of events forwarded.
pub async fn read_events<R>(reader: R, tx: mpsc::Sender<GazeEvent>) -> RuntimeResult<u64>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut forwarded = 0u64;

    while let Some(line) = lines.next_line().await? {
        let event = match parse_line(&line) {
            Ok(Some(event)) => event,
            Ok(None) => continue,
            Err(e) => {
                warn!(error = %e, "Dropping malformed bus line");
                telemetry::record_malformed_event("bus");
                continue;
            }
        };
        debug!(kind = event.kind(), "Bus event received");
        if tx.send(event).await.is_err() {
            debug!("Event receiver closed, stopping bus reader");
            break;
        }
        forwarded += 1;
    }

    info!(forwarded, "Bus input closed");
    Ok(forwarded)
}

/// Write one message followed by a newline and flush.
pub async fn write_message<W>(writer: &mut W, message: &OutboundMessage<'_>) -> RuntimeResult<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = encode(message)?;
    line.push('\n');
    writer
        .write_all(line.as_bytes())
        .await
        .map_err(|e| RuntimeError::bus(format!("write failed: {e}")))?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gaze_models::{Timestamp, Topic};

    #[test]
    fn test_parse_line_variants() {
        assert!(parse_line("").unwrap().is_none());
        assert!(parse_line("   # comment").unwrap().is_none());

        let event = parse_line(r#"{"type":"robot_mode","face_tracking":false}"#)
            .unwrap()
            .unwrap();
        assert_eq!(event, GazeEvent::RobotMode { face_tracking: false });

        assert!(matches!(parse_line("{not json"), Err(RuntimeError::Json(_))));
        assert!(parse_line(r#"{"type":"unknown_kind"}"#).is_err());
    }

    #[test]
    fn test_encode_winner_change() {
        let change = WinnerChange {
            topic: Topic::look(),
            at: Timestamp::from_millis(3),
            winner: None,
        };
        let line = encode(&OutboundMessage::Winner(&change)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["type"], "winner");
        assert_eq!(value["topic"], "look");
        assert!(value["winner"].is_null());
        assert!(!line.contains('\n'));
    }
}
