// ============================================================================
// src/cmd/promote_new_full_members.rs – Grant full membership after the waiting period
// ============================================================================

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::store::Store;
use crate::ui::UX;

pub fn run(ux: &UX, store: &mut Store, now: DateTime<Utc>) -> Result<usize> {
    let promoted = store.promote_new_full_members(now)?;
    let total: usize = promoted.iter().map(|(_, n)| n).sum();
    for (realm, n) in promoted.iter().filter(|(_, n)| *n > 0) {
        ux.line(&format!("{realm}: {n} users added to full members"));
    }
    ux.line(&format!("Promoted {total} users."));
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fixtures::{self, now};
    use crate::store::Role;

    #[test]
    fn reports_per_realm_and_total() {
        let mut store = Store::open_in_memory().unwrap();
        let a = fixtures::realm(&store, "a", None);
        fixtures::realm(&store, "b", None);
        fixtures::user(&store, a, "x@a.com", "X", Role::Member);
        fixtures::user(&store, a, "y@a.com", "Y", Role::Moderator);
        let (ux, out) = UX::capture();

        assert_eq!(run(&ux, &mut store, now()).unwrap(), 2);
        assert_eq!(out.text(), "a: 2 users added to full members\nPromoted 2 users.\n");
    }
}
