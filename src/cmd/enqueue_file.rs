// ============================================================================
// src/cmd/enqueue_file.rs – Replay JSON lines into a worker queue
// ============================================================================

//! Each line is either a JSON payload or two tab-separated fields, the second
//! of which is the payload. The two-field form is what queue workers write to
//! their error files: a timestamp, then the event that failed.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use tracing::info;

use crate::error::AdminError;
use crate::store::queue::QueuePublisher;
use crate::ui::UX;

/// The JSON text carried by one input line.
pub fn extract_payload(line: &str) -> &str {
    let line = line.trim();
    match line.split('\t').nth(1) {
        Some(payload) => payload,
        None => line,
    }
}

/// Read `file_name` (`-` for stdin) and publish every line to `queue_name`.
pub fn run(ux: &UX, queue: &mut dyn QueuePublisher, queue_name: &str, file_name: &str) -> Result<usize> {
    let published = if file_name == "-" {
        let stdin = io::stdin();
        enqueue_lines(ux, queue, queue_name, stdin.lock())?
    } else {
        let f = File::open(file_name).with_context(|| format!("open {file_name}"))?;
        enqueue_lines(ux, queue, queue_name, BufReader::new(f))?
    };
    info!(queue = queue_name, published, "file enqueued");
    Ok(published)
}

pub fn enqueue_lines<R: BufRead>(
    ux: &UX,
    queue: &mut dyn QueuePublisher,
    queue_name: &str,
    reader: R,
) -> Result<usize> {
    let mut published = 0;
    for (idx, line) in reader.lines().enumerate() {
        let line = line.context("read input line")?;
        let payload = extract_payload(&line);
        ux.line(&format!("Queueing to queue {queue_name}: {payload}"));

        let data: serde_json::Value = serde_json::from_str(payload)
            .map_err(|source| AdminError::InvalidJson { line: idx + 1, source })?;
        queue.publish_json(queue_name, &data)?;
        published += 1;
    }
    Ok(published)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fixtures::now;
    use crate::store::queue::{DisabledQueue, SpoolQueue};
    use crate::store::Store;
    use serde_json::json;

    #[test]
    fn tab_separated_and_bare_lines_yield_same_payload() {
        assert_eq!(extract_payload("ts\t{\"a\":1}"), "{\"a\":1}");
        assert_eq!(extract_payload("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(extract_payload("  2024-01-01 00:00:00\t{\"a\":1}\n"), "{\"a\":1}");
    }

    #[test]
    fn publishes_each_line_in_order() {
        let store = Store::open_in_memory().unwrap();
        let mut queue = SpoolQueue::new(&store, now());
        let (ux, out) = UX::capture();
        let input = "ts\t{\"a\":1}\n{\"a\":1}\n{\"b\":[2]}\n";

        let n = enqueue_lines(&ux, &mut queue, "missedmessage_emails", input.as_bytes()).unwrap();
        assert_eq!(n, 3);
        assert_eq!(
            store.queued_payloads("missedmessage_emails").unwrap(),
            vec![json!({"a": 1}), json!({"a": 1}), json!({"b": [2]})]
        );
        assert!(out
            .text()
            .starts_with("Queueing to queue missedmessage_emails: {\"a\":1}\n"));
    }

    #[test]
    fn malformed_json_stops_before_publishing_that_line() {
        let store = Store::open_in_memory().unwrap();
        let mut queue = SpoolQueue::new(&store, now());
        let (ux, _out) = UX::capture();
        let input = "{\"ok\":true}\n{\"a\":\n{\"never\":1}\n";

        let err = enqueue_lines(&ux, &mut queue, "q", input.as_bytes()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AdminError>(),
            Some(AdminError::InvalidJson { line: 2, .. })
        ));
        assert_eq!(store.queued_payloads("q").unwrap(), vec![json!({"ok": true})]);
    }

    #[test]
    fn blank_line_is_invalid_json() {
        let store = Store::open_in_memory().unwrap();
        let mut queue = SpoolQueue::new(&store, now());
        let (ux, _out) = UX::capture();
        let input = "{\"a\":1}\n\n{\"b\":2}\n";

        let err = enqueue_lines(&ux, &mut queue, "q", input.as_bytes()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AdminError>(),
            Some(AdminError::InvalidJson { line: 2, .. })
        ));
        assert_eq!(store.queued_payloads("q").unwrap(), vec![json!({"a": 1})]);
    }

    #[test]
    fn disabled_backend_is_an_error() {
        let (ux, _out) = UX::capture();
        let err = enqueue_lines(&ux, &mut DisabledQueue, "q", "{}".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("queue backend is disabled"));
    }
}
