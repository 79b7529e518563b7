// ============================================================================
// src/cmd/show_admins.rs – List the owners and administrators of a realm
// ============================================================================

use anyhow::Result;

use crate::cmd::realm_args::RequiredRealmArgs;
use crate::error::AdminError;
use crate::store::Store;
use crate::ui::UX;

pub fn run(ux: &UX, store: &Store, realm: &RequiredRealmArgs) -> Result<usize> {
    let realm = realm.resolve(store)?;
    let admins = store.admin_users_and_bots(realm.id)?;
    if admins.is_empty() {
        return Err(AdminError::NoAdmins.into());
    }
    let owners = store.human_owner_ids(realm.id)?;

    ux.heading("Administrators:");
    ux.blank();
    for user in &admins {
        let owner_detail = if owners.contains(&user.id) { " [owner]" } else { "" };
        ux.line(&format!(
            "  {} ({}){}",
            user.delivery_email, user.full_name, owner_detail
        ));
    }
    ux.blank();
    ux.line("You can use the \"change-user-role\" command to adjust roles.");
    Ok(admins.len())
}
