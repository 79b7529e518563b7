// ============================================================================
// src/cmd/deactivate_user.rs – Deactivate a user and end their sessions
// ============================================================================

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::cmd::realm_args::{get_user, RealmArgs};
use crate::error::AdminError;
use crate::store::Store;
use crate::ui::UX;
use crate::util::audit::AuditLog;

pub fn run(
    ux: &UX,
    store: &mut Store,
    audit: &AuditLog,
    now: DateTime<Utc>,
    email: &str,
    realm: &RealmArgs,
    for_real: bool,
) -> Result<()> {
    let realm = realm.resolve(store)?;
    let user = get_user(store, email, realm.as_ref())?;
    let user_realm = store.realm_by_id(user.realm_id)?;

    ux.line(&format!(
        "Deactivating {} ({}) - {}",
        user.full_name, user.delivery_email, user_realm.string_id
    ));
    ux.line(&format!(
        "{} has the following active sessions:",
        user.delivery_email
    ));
    for session in store.active_sessions(user.id, now)? {
        ux.line(&format!("{} {}", session.expire_date, session.data));
    }
    ux.blank();
    let bots = store.active_bots_owned_by(user.id)?;
    ux.line(&format!(
        "{} has {} active bots that will also be deactivated.",
        user.delivery_email,
        bots.len()
    ));

    if !for_real {
        return Err(AdminError::DryRun("deactivate").into());
    }

    store.deactivate_user(user.id)?;
    audit.record(
        "USER_DEACTIVATE",
        &format!("{} realm={} bots={}", user.delivery_email, user_realm.string_id, bots.len()),
    );
    ux.success("Sessions deleted, user deactivated.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fixtures::{self, now};
    use crate::store::Role;
    use chrono::Duration;
    use rusqlite::params;

    fn seed() -> Store {
        let store = Store::open_in_memory().unwrap();
        let r = fixtures::realm(&store, "zulip", None);
        let hamlet = fixtures::user(&store, r, "hamlet@x.com", "Hamlet", Role::Member);
        fixtures::bot(&store, r, "hamlet-bot@x.com", hamlet, Role::Member);
        store
            .conn()
            .execute(
                "insert into session (session_key, user_id, expire_date, data) values ('s1', ?1, ?2, '{\"_auth_user_id\":\"7\"}')",
                params![hamlet, (now() + Duration::days(2)).timestamp()],
            )
            .unwrap();
        store
    }

    #[test]
    fn dry_run_reports_and_changes_nothing() {
        let mut store = seed();
        let (ux, out) = UX::capture();
        let err = run(&ux, &mut store, &AuditLog::disabled(), now(), "hamlet@x.com", &RealmArgs::default(), false)
            .unwrap_err();

        assert_eq!(err.to_string(), "This was a dry run. Pass -f to actually deactivate.");
        let text = out.text();
        assert!(text.starts_with("Deactivating Hamlet (hamlet@x.com) - zulip\n"));
        assert!(text.contains("2024-06-03 12:00:00 UTC {\"_auth_user_id\":\"7\"}"));
        assert!(text.contains("hamlet@x.com has 1 active bots that will also be deactivated."));
        assert!(store.users_by_email("hamlet@x.com", None).unwrap()[0].is_active);
    }

    #[test]
    fn for_real_deactivates() {
        let mut store = seed();
        let dir = tempfile::tempdir().unwrap();
        let audit = AuditLog::at(&dir.path().join("audit.log"));
        let (ux, out) = UX::capture();
        run(&ux, &mut store, &audit, now(), "hamlet@x.com", &RealmArgs::default(), true).unwrap();

        assert!(out.text().ends_with("Sessions deleted, user deactivated.\n"));
        assert!(!store.users_by_email("hamlet@x.com", None).unwrap()[0].is_active);
        assert!(!store.users_by_email("hamlet-bot@x.com", None).unwrap()[0].is_active);
        let log = std::fs::read_to_string(dir.path().join("audit.log")).unwrap();
        assert!(log.contains("USER_DEACTIVATE: hamlet@x.com realm=zulip bots=1"));
    }
}
