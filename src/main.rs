// ============================================================================
// src/main.rs – realm-admin entry point and command dispatch
// ============================================================================

mod cmd;
mod config;
mod error;
mod store;
mod ui;
mod util;

use anyhow::Result;
use chrono::Utc;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cmd::delete_old_unclaimed_attachments::ReapOptions;
use cmd::edit_linkifiers::LinkifierOp;
use cmd::export_single_user::ExportOptions;
use cmd::{RealmArgs, RequiredRealmArgs};
use config::Config;
use store::queue::{DisabledQueue, QueuePublisher, SpoolQueue};
use store::Store;
use ui::UX;
use util::audit::AuditLog;
use util::upload::LocalUploads;

#[derive(Parser, Debug)]
#[command(name = "realm-admin", version, about = "Administrative commands for a group chat server")]
struct Cli {
    /// Configuration file (.toml, .yaml or .yml)
    #[arg(long, global = true, env = "REALM_ADMIN_CONFIG")]
    config: Option<PathBuf>,
    /// Database path, overriding the configuration
    #[arg(long, global = true)]
    database: Option<PathBuf>,
    /// More diagnostics on stderr (-v, -vv)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the database schema if it does not exist
    Migrate,
    /// Archive messages past their retention period and vacuum old archives
    ArchiveMessages,
    /// Replay a file of JSON events (one per line) into a queue
    EnqueueFile {
        /// Name of the worker queue
        queue_name: String,
        /// Input file, or '-' for stdin
        file_name: String,
    },
    /// Export a single user's message history as a tarball
    ExportSingleUser {
        /// Email of the user to export
        email: String,
        /// Directory to write the export to (must be absent or empty)
        #[arg(long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        realm: RealmArgs,
    },
    /// List the administrators and owners of a realm
    ShowAdmins {
        #[command(flatten)]
        realm: RequiredRealmArgs,
    },
    /// Deactivate a user, their bots and their sessions
    DeactivateUser {
        email: String,
        /// Actually deactivate the user
        #[arg(short = 'f', long)]
        for_real: bool,
        #[command(flatten)]
        realm: RealmArgs,
    },
    /// Delete attachments no message references
    DeleteOldUnclaimedAttachments {
        /// Minimum age of an unclaimed attachment, in weeks
        #[arg(short, long, default_value_t = 5, value_parser = clap::value_parser!(i64).range(0..))]
        weeks: i64,
        /// Actually delete the files
        #[arg(short = 'f', long)]
        for_real: bool,
        /// Also remove stored files that no attachment owns
        #[arg(short = 'C', long)]
        clean_up_storage: bool,
    },
    /// Add users past the waiting period to the full members group
    PromoteNewFullMembers,
    /// Create any missing internal bots in every realm
    CreateRealmInternalBots,
    /// Permanently delete a realm
    DeleteRealm {
        #[command(flatten)]
        realm: RequiredRealmArgs,
    },
    /// Show, add or remove linkifier rules
    EditLinkifiers {
        #[arg(long, value_enum, default_value_t = LinkifierOp::Show)]
        op: LinkifierOp,
        /// Regular expression to match
        pattern: Option<String>,
        /// URL template to expand
        url_template: Option<String>,
        #[command(flatten)]
        realm: RequiredRealmArgs,
    },
    /// Validate the configuration
    Checkconfig,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "realm_admin=warn",
        1 => "realm_admin=info",
        _ => "realm_admin=debug",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut cfg = Config::load_or_default(cli.config.as_deref())?;
    if let Some(db) = cli.database {
        cfg.database.path = db;
    }
    debug!(database = %cfg.database.path.display(), "configuration loaded");

    let ux = UX::stdout();
    // checkconfig must not create the database it is checking for.
    let mut store = match cli.command {
        Commands::Checkconfig => return cmd::checkconfig::run(&ux, &cfg),
        _ => Store::open(&cfg.database.path)?,
    };
    let audit = AuditLog::from_config(&cfg.audit);
    let uploads = LocalUploads::new(&cfg.uploads.local_dir);
    let now = Utc::now();

    match cli.command {
        Commands::Migrate => {
            store.migrate()?;
            ux.success(&format!("Schema ready at {}", cfg.database.path.display()));
        }
        Commands::ArchiveMessages => {
            cmd::archive_messages::run(&ux, &mut store, &cfg.retention, &audit, now)?;
        }
        Commands::EnqueueFile {
            queue_name,
            file_name,
        } => {
            let mut spool;
            let mut disabled = DisabledQueue;
            let queue: &mut dyn QueuePublisher = if cfg.queue.enabled {
                spool = SpoolQueue::new(&store, now);
                &mut spool
            } else {
                &mut disabled
            };
            cmd::enqueue_file::run(&ux, queue, &queue_name, &file_name)?;
        }
        Commands::ExportSingleUser {
            email,
            output,
            realm,
        } => {
            let opts = ExportOptions {
                email,
                output_dir: output,
                realm,
            };
            cmd::export_single_user::run(&ux, &store, &cfg.export, &opts)?;
        }
        Commands::ShowAdmins { realm } => {
            cmd::show_admins::run(&ux, &store, &realm)?;
        }
        Commands::DeactivateUser {
            email,
            for_real,
            realm,
        } => {
            cmd::deactivate_user::run(&ux, &mut store, &audit, now, &email, &realm, for_real)?;
        }
        Commands::DeleteOldUnclaimedAttachments {
            weeks,
            for_real,
            clean_up_storage,
        } => {
            let opts = ReapOptions {
                weeks,
                for_real,
                clean_up_storage,
            };
            cmd::delete_old_unclaimed_attachments::run(&ux, &mut store, &uploads, &audit, now, opts)?;
        }
        Commands::PromoteNewFullMembers => {
            cmd::promote_new_full_members::run(&ux, &mut store, now)?;
        }
        Commands::CreateRealmInternalBots => {
            cmd::create_realm_internal_bots::run(&ux, &mut store, &cfg.bots, now)?;
        }
        Commands::DeleteRealm { realm } => {
            cmd::delete_realm::run(&ux, &mut store, &uploads, &audit, &realm, |prompt| {
                ux.ask(prompt)
            })?;
        }
        Commands::EditLinkifiers {
            op,
            pattern,
            url_template,
            realm,
        } => {
            cmd::edit_linkifiers::run(
                &ux,
                &store,
                &realm,
                op,
                pattern.as_deref(),
                url_template.as_deref(),
            )?;
        }
        Commands::Checkconfig => {}
    }
    Ok(())
}
