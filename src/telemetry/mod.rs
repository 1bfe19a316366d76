//! # Telemetry Module
//!
//! Handles telemetry logging to JSONL files with rotation.
//!
//! This module handles:
//! - Observing commit notifications from the decoder
//! - Formatting committed blocks as JSONL (JSON Lines)
//! - Writing to rotating log files
//! - Managing file rotation (max N records per file)
//! - Retaining only last M files

pub mod logger;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::vedirect::decoder::CommitRecord;
use logger::TelemetryLogger;

/// Log every commit notification until the decoder goes away
///
/// Commit notifications are latest-value: if the logger falls behind, only
/// the newest block is written.
pub async fn run_telemetry(
    mut commits: watch::Receiver<Option<CommitRecord>>,
    mut logger: TelemetryLogger,
) {
    while commits.changed().await.is_ok() {
        let record = commits.borrow_and_update().clone();
        let Some(record) = record else {
            continue;
        };

        if let Err(e) = logger.log(&record) {
            warn!("Failed to write telemetry record {}: {}", record.sequence, e);
        }
    }

    debug!("Commit source closed, telemetry logger stopping");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vedirect::decoder::VeDirectDecoder;
    use crate::vedirect::encoder::encode_block;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_logs_commits_until_decoder_dropped() {
        let dir = TempDir::new().unwrap();
        let logger = TelemetryLogger::new(dir.path(), 100, 3).unwrap();

        let mut decoder = VeDirectDecoder::new();
        let task = tokio::spawn(run_telemetry(decoder.subscribe_commits(), logger));

        let mut stream = b"\n".to_vec();
        stream.extend(encode_block(&[("V", "12800"), ("LOAD", "ON")]));
        decoder.drain(&mut stream.as_slice());

        // Let the logger observe the commit before the sender goes away
        tokio::task::yield_now().await;
        drop(decoder);
        task.await.unwrap();

        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
        let path = files[0].as_ref().unwrap().path();
        let contents = std::fs::read_to_string(path).unwrap();
        assert!(contents.contains("\"label\":\"LOAD\""));
        assert!(contents.contains("\"sequence\":1"));
    }
}
