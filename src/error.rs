// ============================================================================
// src/error.rs – Command errors surfaced to the operator
// ============================================================================

use std::path::PathBuf;

/// Errors that terminate a command with a message for the operator.
///
/// Lower layers propagate `anyhow::Error` with context; these variants are the
/// conditions a command raises on purpose. `main` prints them and exits 1.
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("line {line}: invalid JSON payload: {source}")]
    InvalidJson {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("We cannot enqueue because the queue backend is disabled.")]
    QueueDisabled,

    #[error("Refusing to overwrite nonempty directory: {}. Aborting...", .0.display())]
    NonEmptyOutputDir(PathBuf),

    #[error("There are no admins for this realm!")]
    NoAdmins,

    #[error("There is no realm with id '{0}'. Aborting.")]
    RealmNotFound(String),

    #[error("The realm '{realm}' does not contain a user with email '{email}'")]
    UserNotInRealm { realm: String, email: String },

    #[error("This server does not contain a user with email '{0}'")]
    UserNotFound(String),

    #[error(
        "This server contains multiple users with that email (in realms {realms}); \
         please pass `--realm` to specify which one to modify."
    )]
    AmbiguousUser { realms: String },

    #[error("This was a dry run. Pass -f to actually {0}.")]
    DryRun(&'static str),

    #[error("Aborting!")]
    Aborted,

    #[error("{0}")]
    Usage(String),

    #[error("invalid linkifier: {0}")]
    InvalidLinkifier(String),

    #[error("configuration problems found:\n{}", .0.join("\n"))]
    Config(Vec<String>),
}

#[cfg(test)]
mod tests {
    use super::AdminError;
    use std::path::PathBuf;

    #[test]
    fn messages_match_operator_wording() {
        assert_eq!(
            AdminError::NonEmptyOutputDir(PathBuf::from("/tmp/out")).to_string(),
            "Refusing to overwrite nonempty directory: /tmp/out. Aborting..."
        );
        assert_eq!(
            AdminError::DryRun("deactivate").to_string(),
            "This was a dry run. Pass -f to actually deactivate."
        );
        assert_eq!(
            AdminError::Config(vec!["a".into(), "b".into()]).to_string(),
            "configuration problems found:\na\nb"
        );
    }
}
