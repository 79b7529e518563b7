// ============================================================================
// src/cmd/edit_linkifiers.rs – Show, add, or remove a realm's linkifier rules
// ============================================================================

use anyhow::Result;
use clap::ValueEnum;

use crate::cmd::realm_args::RequiredRealmArgs;
use crate::error::AdminError;
use crate::store::Store;
use crate::ui::UX;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkifierOp {
    #[default]
    Show,
    Add,
    Remove,
}

pub fn run(
    ux: &UX,
    store: &Store,
    realm: &RequiredRealmArgs,
    op: LinkifierOp,
    pattern: Option<&str>,
    url_template: Option<&str>,
) -> Result<()> {
    let realm = realm.resolve(store)?;
    match op {
        LinkifierOp::Show => {
            let rules: Vec<String> = store
                .linkifiers_for_realm(realm.id)?
                .iter()
                .map(|l| format!("{} -> {}", l.pattern, l.url_template))
                .collect();
            ux.line(&format!("{}: [{}]", realm.string_id, rules.join(", ")));
        }
        LinkifierOp::Add => {
            let pattern = required(pattern, "a pattern is required for add and remove")?;
            let url_template = required(url_template, "a URL template is required for add")?;
            store.add_linkifier(realm.id, pattern, url_template)?;
            ux.success(&format!("Added linkifier {pattern} -> {url_template}"));
        }
        LinkifierOp::Remove => {
            let pattern = required(pattern, "a pattern is required for add and remove")?;
            store.remove_linkifier(realm.id, pattern)?;
            ux.success(&format!("Removed linkifier {pattern}"));
        }
    }
    Ok(())
}

fn required<'a>(value: Option<&'a str>, usage: &str) -> Result<&'a str, AdminError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AdminError::Usage(usage.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fixtures;

    const PATTERN: &str = r"#(?P<id>[0-9]{2,8})";
    const TEMPLATE: &str = "https://support.example.com/ticket/{id}";

    fn args() -> RequiredRealmArgs {
        RequiredRealmArgs {
            realm: "zulip".to_string(),
        }
    }

    fn show(store: &Store) -> String {
        let (ux, out) = UX::capture();
        run(&ux, store, &args(), LinkifierOp::Show, None, None).unwrap();
        out.text()
    }

    #[test]
    fn add_show_remove() {
        let store = Store::open_in_memory().unwrap();
        fixtures::realm(&store, "zulip", None);
        assert_eq!(show(&store), "zulip: []\n");

        let (ux, _) = UX::capture();
        run(&ux, &store, &args(), LinkifierOp::Add, Some(PATTERN), Some(TEMPLATE)).unwrap();
        assert_eq!(show(&store), format!("zulip: [{PATTERN} -> {TEMPLATE}]\n"));

        run(&ux, &store, &args(), LinkifierOp::Remove, Some(PATTERN), None).unwrap();
        assert_eq!(show(&store), "zulip: []\n");
    }

    #[test]
    fn missing_arguments_are_usage_errors() {
        let store = Store::open_in_memory().unwrap();
        fixtures::realm(&store, "zulip", None);
        let (ux, _) = UX::capture();

        for (op, pattern, template) in [
            (LinkifierOp::Add, None, Some(TEMPLATE)),
            (LinkifierOp::Add, Some(PATTERN), None),
            (LinkifierOp::Remove, Some(""), None),
        ] {
            let err = run(&ux, &store, &args(), op, pattern, template).unwrap_err();
            assert!(matches!(err.downcast_ref::<AdminError>(), Some(AdminError::Usage(_))));
        }
    }

    #[test]
    fn template_must_use_named_groups() {
        let store = Store::open_in_memory().unwrap();
        fixtures::realm(&store, "zulip", None);
        let (ux, _) = UX::capture();

        let err = run(&ux, &store, &args(), LinkifierOp::Add, Some(PATTERN), Some("https://x/{ticket}"))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AdminError>(),
            Some(AdminError::InvalidLinkifier(_))
        ));
    }
}
