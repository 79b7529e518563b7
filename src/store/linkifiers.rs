// ============================================================================
// src/store/linkifiers.rs – Realm linkifier rules
// ============================================================================

use anyhow::{Context, Result};
use regex::Regex;
use rusqlite::params;
use std::collections::HashSet;

use super::models::Linkifier;
use super::Store;
use crate::error::AdminError;

/// Check that `pattern` compiles and that every `{var}` in `url_template`
/// names a capture group of the pattern.
pub fn validate_linkifier(pattern: &str, url_template: &str) -> Result<(), AdminError> {
    let re = Regex::new(pattern)
        .map_err(|e| AdminError::InvalidLinkifier(format!("bad pattern: {e}")))?;
    let groups: HashSet<&str> = re.capture_names().flatten().collect();

    let mut rest = url_template;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let close = after
            .find('}')
            .ok_or_else(|| AdminError::InvalidLinkifier("unclosed '{' in URL template".into()))?;
        let var = &after[..close];
        if !groups.contains(var) {
            return Err(AdminError::InvalidLinkifier(format!(
                "URL template variable '{var}' is not a named group of the pattern"
            )));
        }
        rest = &after[close + 1..];
    }
    Ok(())
}

impl Store {
    pub fn linkifiers_for_realm(&self, realm_id: i64) -> Result<Vec<Linkifier>> {
        let mut stmt = self.conn().prepare(
            "select pattern, url_template from realm_linkifier where realm_id = ?1 order by id",
        )?;
        let rows = stmt.query_map([realm_id], |r| {
            Ok(Linkifier {
                pattern: r.get(0)?,
                url_template: r.get(1)?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("list linkifiers")
    }

    pub fn add_linkifier(&self, realm_id: i64, pattern: &str, url_template: &str) -> Result<()> {
        validate_linkifier(pattern, url_template)?;
        let added = self
            .conn()
            .execute(
                "insert or ignore into realm_linkifier (realm_id, pattern, url_template)
                 values (?1, ?2, ?3)",
                params![realm_id, pattern, url_template],
            )
            .context("insert linkifier")?;
        if added == 0 {
            return Err(AdminError::InvalidLinkifier(format!(
                "a linkifier for '{pattern}' already exists"
            ))
            .into());
        }
        Ok(())
    }

    pub fn remove_linkifier(&self, realm_id: i64, pattern: &str) -> Result<()> {
        let removed = self
            .conn()
            .execute(
                "delete from realm_linkifier where realm_id = ?1 and pattern = ?2",
                params![realm_id, pattern],
            )
            .context("delete linkifier")?;
        if removed == 0 {
            return Err(AdminError::InvalidLinkifier(format!("no linkifier matches '{pattern}'")).into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fixtures;

    #[test]
    fn template_variables_must_be_named_groups() {
        assert!(validate_linkifier(r"#(?P<id>[0-9]{2,8})", "https://trac.example.com/ticket/{id}").is_ok());
        assert!(matches!(
            validate_linkifier(r"#([0-9]+)", "https://x/{id}"),
            Err(AdminError::InvalidLinkifier(_))
        ));
        assert!(validate_linkifier(r"#(?P<id>[0-9]+", "https://x/{id}").is_err());
        assert!(validate_linkifier(r"#(?P<id>[0-9]+)", "https://x/{id").is_err());
    }

    #[test]
    fn add_show_remove() {
        let store = Store::open_in_memory().unwrap();
        let r = fixtures::realm(&store, "zulip", None);
        store.add_linkifier(r, r"#(?P<id>\d+)", "https://t/{id}").unwrap();
        assert!(store.add_linkifier(r, r"#(?P<id>\d+)", "https://other/{id}").is_err());

        let rules = store.linkifiers_for_realm(r).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].url_template, "https://t/{id}");

        store.remove_linkifier(r, r"#(?P<id>\d+)").unwrap();
        assert!(store.remove_linkifier(r, r"#(?P<id>\d+)").is_err());
        assert!(store.linkifiers_for_realm(r).unwrap().is_empty());
    }
}
