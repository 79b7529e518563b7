// ============================================================================
// src/store/queue.rs – Worker queue publishing
// ============================================================================

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::params;
use serde_json::Value;
use tracing::debug;

use super::{to_ts, Store};
use crate::error::AdminError;

/// Destination for JSON jobs consumed by queue workers.
pub trait QueuePublisher {
    fn publish_json(&mut self, queue_name: &str, payload: &Value) -> Result<()>;
}

/// Appends events to the durable `queue_event` spool that workers drain.
pub struct SpoolQueue<'a> {
    store: &'a Store,
    now: DateTime<Utc>,
}

impl<'a> SpoolQueue<'a> {
    pub fn new(store: &'a Store, now: DateTime<Utc>) -> Self {
        Self { store, now }
    }
}

impl QueuePublisher for SpoolQueue<'_> {
    fn publish_json(&mut self, queue_name: &str, payload: &Value) -> Result<()> {
        let body = serde_json::to_string(payload).context("serialize payload")?;
        self.store
            .conn()
            .execute(
                "insert into queue_event (queue_name, payload, enqueued_at) values (?1, ?2, ?3)",
                params![queue_name, body, to_ts(self.now)],
            )
            .with_context(|| format!("spool event to queue {queue_name}"))?;
        debug!(queue = queue_name, "event spooled");
        Ok(())
    }
}

/// Used when the queue backend is switched off: every publish is refused.
pub struct DisabledQueue;

impl QueuePublisher for DisabledQueue {
    fn publish_json(&mut self, _queue_name: &str, _payload: &Value) -> Result<()> {
        Err(AdminError::QueueDisabled.into())
    }
}

#[cfg(test)]
impl Store {
    /// Payloads waiting in `queue_name`, oldest first.
    pub fn queued_payloads(&self, queue_name: &str) -> Result<Vec<Value>> {
        let mut stmt = self
            .conn()
            .prepare("select payload from queue_event where queue_name = ?1 order by id")?;
        let rows = stmt.query_map([queue_name], |r| r.get::<_, String>(0))?;
        let mut out = Vec::new();
        for body in rows {
            let body = body?;
            out.push(serde_json::from_str(&body).context("decode spooled payload")?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fixtures::now;
    use serde_json::json;

    #[test]
    fn spool_keeps_queues_apart_and_ordered() {
        let store = Store::open_in_memory().unwrap();
        let mut q = SpoolQueue::new(&store, now());
        q.publish_json("email_senders", &json!({"n": 1})).unwrap();
        q.publish_json("deferred_work", &json!({"n": 2})).unwrap();
        q.publish_json("email_senders", &json!({"n": 3})).unwrap();

        assert_eq!(
            store.queued_payloads("email_senders").unwrap(),
            vec![json!({"n": 1}), json!({"n": 3})]
        );
    }

    #[test]
    fn disabled_queue_refuses() {
        let err = DisabledQueue.publish_json("q", &json!({})).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AdminError>(),
            Some(AdminError::QueueDisabled)
        ));
    }
}
