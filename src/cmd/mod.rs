// ============================================================================
// src/cmd/mod.rs – command subsystem root
// ============================================================================
pub mod base; // allowlisted external tools (Cmd, OutputData)
pub mod realm_args; // --realm selector and user lookup

pub mod archive_messages;
pub mod checkconfig;
pub mod create_realm_internal_bots;
pub mod deactivate_user;
pub mod delete_old_unclaimed_attachments;
pub mod delete_realm;
pub mod edit_linkifiers;
pub mod enqueue_file;
pub mod export_single_user;
pub mod promote_new_full_members;
pub mod show_admins;

pub use realm_args::{RealmArgs, RequiredRealmArgs};
