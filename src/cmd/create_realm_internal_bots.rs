// ============================================================================
// src/cmd/create_realm_internal_bots.rs – Ensure every realm has its internal bots
// ============================================================================

//! Internal bots are normally created with the realm, so this is a no-op
//! except after an upgrade that introduces a new one.

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::config::Bots;
use crate::store::Store;
use crate::ui::UX;

pub fn run(ux: &UX, store: &mut Store, cfg: &Bots, now: DateTime<Utc>) -> Result<usize> {
    let created = store.create_missing_internal_bots(&cfg.internal_bot_domain, now)?;
    if created.is_empty() {
        ux.line("All realm internal bots already exist.");
    }
    for bot in &created {
        ux.line(&format!("Created {bot}"));
    }
    Ok(created.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fixtures::{self, now};

    #[test]
    fn second_run_is_a_no_op() {
        let mut store = Store::open_in_memory().unwrap();
        fixtures::realm(&store, "zulip", None);
        let cfg = Bots::default();

        let (ux, out) = UX::capture();
        assert_eq!(run(&ux, &mut store, &cfg, now()).unwrap(), 3);
        assert!(out.text().contains("Created zulip: notification-bot@chat.internal"));

        let (ux, out) = UX::capture();
        assert_eq!(run(&ux, &mut store, &cfg, now()).unwrap(), 0);
        assert_eq!(out.text(), "All realm internal bots already exist.\n");
    }
}
