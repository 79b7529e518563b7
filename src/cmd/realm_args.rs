// ============================================================================
// src/cmd/realm_args.rs – Realm selector and user lookup shared by commands
// ============================================================================

use anyhow::Result;
use clap::Args;

use crate::error::AdminError;
use crate::store::{Realm, Store, UserProfile};

#[derive(Args, Debug, Clone, Default)]
pub struct RealmArgs {
    /// The numeric or string ID (subdomain) of the realm
    #[arg(short = 'r', long = "realm", value_name = "REALM")]
    pub realm: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct RequiredRealmArgs {
    /// The numeric or string ID (subdomain) of the realm
    #[arg(short = 'r', long = "realm", value_name = "REALM")]
    pub realm: String,
}

impl RealmArgs {
    pub fn resolve(&self, store: &Store) -> Result<Option<Realm>> {
        match &self.realm {
            Some(selector) => require_realm(store, selector).map(Some),
            None => Ok(None),
        }
    }
}

impl RequiredRealmArgs {
    pub fn resolve(&self, store: &Store) -> Result<Realm> {
        require_realm(store, &self.realm)
    }
}

fn require_realm(store: &Store, selector: &str) -> Result<Realm> {
    store
        .find_realm(selector)?
        .ok_or_else(|| AdminError::RealmNotFound(selector.to_string()).into())
}

/// Resolve `email` to exactly one user, within `realm` when given.
pub fn get_user(store: &Store, email: &str, realm: Option<&Realm>) -> Result<UserProfile> {
    let mut users = store.users_by_email(email, realm.map(|r| r.id))?;
    match (users.len(), realm) {
        (1, _) => Ok(users.remove(0)),
        (0, Some(realm)) => Err(AdminError::UserNotInRealm {
            realm: realm.string_id.clone(),
            email: email.to_string(),
        }
        .into()),
        (0, None) => Err(AdminError::UserNotFound(email.to_string()).into()),
        (_, _) => {
            let mut realm_ids: Vec<String> = Vec::with_capacity(users.len());
            for user in &users {
                realm_ids.push(store.realm_by_id(user.realm_id)?.string_id);
            }
            Err(AdminError::AmbiguousUser {
                realms: realm_ids.join(", "),
            }
            .into())
        }
    }
}
