// ============================================================================
// src/cmd/delete_realm.rs – Permanently delete a realm and its stored files
// ============================================================================

//! Intended for removing test realms. The operator must type the realm's
//! string id before anything is touched.

use anyhow::Result;
use tracing::warn;

use crate::cmd::realm_args::RequiredRealmArgs;
use crate::error::AdminError;
use crate::store::Store;
use crate::ui::UX;
use crate::util::audit::AuditLog;
use crate::util::upload::LocalUploads;

pub fn run<F>(
    ux: &UX,
    store: &mut Store,
    uploads: &LocalUploads,
    audit: &AuditLog,
    realm: &RequiredRealmArgs,
    confirm: F,
) -> Result<()>
where
    F: FnOnce(&str) -> Result<String>,
{
    let realm = realm.resolve(store)?;
    let users = store.active_human_count(realm.id)?;
    let messages = store.message_count(realm.id)?;

    ux.line(&format!("This realm has {users} users and {messages} messages."));
    ux.blank();
    ux.warn("This command will PERMANENTLY DELETE all data for this realm.");

    let answer = confirm("Type the name of the realm to confirm")?;
    if answer.trim() != realm.string_id {
        return Err(AdminError::Aborted.into());
    }

    // Files first: once the rows are gone nothing points at them.
    let paths = store.realm_attachment_paths(realm.id)?;
    let removed = uploads.delete_many(&paths)?;
    if removed < paths.len() {
        warn!(missing = paths.len() - removed, "some attachment files were already gone");
    }

    store.delete_realm(realm.id)?;
    audit.record(
        "REALM_DELETE",
        &format!("{} users={users} messages={messages} files={removed}", realm.string_id),
    );
    ux.success("Realm has been successfully permanently deleted.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fixtures::{self, days_ago};
    use crate::store::Role;
    use std::fs;

    fn args(realm: &str) -> RequiredRealmArgs {
        RequiredRealmArgs {
            realm: realm.to_string(),
        }
    }

    fn seed() -> (Store, LocalUploads, tempfile::TempDir) {
        let store = Store::open_in_memory().unwrap();
        let r = fixtures::realm(&store, "doomed", None);
        let keep = fixtures::realm(&store, "keep", None);
        let u = fixtures::user(&store, r, "a@x.com", "A", Role::Owner);
        let m = fixtures::message(&store, r, u, None, "hi", days_ago(1), &[u]);
        fixtures::attachment(&store, r, u, "1/aa/doc.pdf", days_ago(1), &[m]);
        fixtures::user(&store, keep, "b@x.com", "B", Role::Owner);

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("1/aa/doc.pdf");
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, b"pdf").unwrap();
        let uploads = LocalUploads::new(dir.path());
        (store, uploads, dir)
    }

    #[test]
    fn wrong_confirmation_aborts_without_changes() {
        let (mut store, uploads, dir) = seed();
        let (ux, out) = UX::capture();
        let err = run(&ux, &mut store, &uploads, &AuditLog::disabled(), &args("doomed"), |_| {
            Ok("keep".to_string())
        })
        .unwrap_err();

        assert!(matches!(err.downcast_ref::<AdminError>(), Some(AdminError::Aborted)));
        assert!(out.text().starts_with("This realm has 1 users and 1 messages.\n"));
        assert!(store.find_realm("doomed").unwrap().is_some());
        assert!(dir.path().join("1/aa/doc.pdf").exists());
    }

    #[test]
    fn confirmed_delete_removes_rows_and_files() {
        let (mut store, uploads, dir) = seed();
        let (ux, out) = UX::capture();
        run(&ux, &mut store, &uploads, &AuditLog::disabled(), &args("doomed"), |prompt| {
            assert_eq!(prompt, "Type the name of the realm to confirm");
            Ok("doomed\n".to_string())
        })
        .unwrap();

        assert!(out.text().ends_with("Realm has been successfully permanently deleted.\n"));
        assert!(store.find_realm("doomed").unwrap().is_none());
        assert!(store.find_realm("keep").unwrap().is_some());
        assert_eq!(fixtures::count(&store, "message"), 0);
        assert_eq!(fixtures::count(&store, "attachment"), 0);
        assert_eq!(fixtures::count(&store, "user_profile"), 1);
        assert!(!dir.path().join("1/aa/doc.pdf").exists());
    }
}
