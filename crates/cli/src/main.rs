//! Tagfield CLI - bulk tag and metafield operations from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Add a metafield value to every product in a CSV (Handle,value)
//! tagfield batch metafield-update --resource product --csv colors.csv \
//!     --namespace custom --key color --type single_line_text_field
//!
//! # Tag customers by email
//! tagfield batch tags-add --resource customer --csv vips.csv --tags vip
//!
//! # Remove a metafield from every collection
//! tagfield metafields delete-all --resource collection --namespace custom --key legacy
//!
//! # Undo a history record
//! tagfield history undo gid://shopify/Metaobject/42
//!
//! # Export products with tags and metafields
//! tagfield export --resource product --out products.csv
//! ```
//!
//! # Commands
//!
//! - `batch` - Apply one operation to every row of a CSV
//! - `metafields` - Definitions and delete-all
//! - `tags` - Search and remove-all
//! - `history` - Setup, list, sweep and undo
//! - `export` - CSV export of a resource type or metaobjects

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tagfield_admin::services::{Combinator, OperationKind, PageDirection, TagMatch};
use tagfield_core::{ListMode, ResourceType};

mod commands;

#[derive(Parser)]
#[command(name = "tagfield")]
#[command(author, version, about = "Bulk tag and metafield manager for Shopify")]
struct Cli {
    /// Store domain (`*.myshopify.com`); defaults to `SHOPIFY_STORE`
    #[arg(long, global = true)]
    store: Option<String>,

    /// Admin API token; defaults to `SHOPIFY_ADMIN_ACCESS_TOKEN`
    #[arg(long, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply one operation to every row of a CSV file
    Batch {
        /// `tags-add`, `tags-remove`, `metafield-update` or `metafield-remove`
        operation: OperationKind,

        #[arg(short, long)]
        resource: ResourceType,

        /// Input CSV with a match column and optional `value` column
        #[arg(long)]
        csv: PathBuf,

        /// Where to write the per-row outcome report
        #[arg(long)]
        report: Option<PathBuf>,

        #[arg(long)]
        namespace: Option<String>,

        #[arg(long)]
        key: Option<String>,

        /// Metafield type, e.g. `list.single_line_text_field`
        #[arg(long = "type")]
        metafield_type: Option<String>,

        /// List update mode
        #[arg(long, value_enum, default_value = "replace")]
        mode: ModeArg,

        /// Remove only the listed values from a list metafield
        #[arg(long)]
        partial: bool,

        /// Tags for every row, comma separated
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
    },
    /// Metafield definitions and bulk removal
    Metafields {
        #[command(subcommand)]
        action: MetafieldsAction,
    },
    /// Tag search and bulk removal
    Tags {
        #[command(subcommand)]
        action: TagsAction,
    },
    /// History ledger maintenance and undo
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
    /// Export a resource type or metaobject type to CSV
    Export {
        #[arg(short, long, required_unless_present = "metaobject_type")]
        resource: Option<ResourceType>,

        /// Export metaobjects of this type instead of a resource type
        #[arg(long, conflicts_with = "resource")]
        metaobject_type: Option<String>,

        #[arg(short, long)]
        out: PathBuf,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum ModeArg {
    Replace,
    Merge,
}

impl From<ModeArg> for ListMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Replace => Self::Replace,
            ModeArg::Merge => Self::Merge,
        }
    }
}

#[derive(Subcommand)]
enum MetafieldsAction {
    /// List metafield definitions for a resource type
    Definitions {
        #[arg(short, long)]
        resource: ResourceType,
    },
    /// Remove one metafield from every resource of a type
    DeleteAll {
        #[arg(short, long)]
        resource: ResourceType,

        #[arg(long)]
        namespace: String,

        #[arg(long)]
        key: String,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum MatchArg {
    Exact,
    StartsWith,
    EndsWith,
    Contains,
}

impl From<MatchArg> for TagMatch {
    fn from(kind: MatchArg) -> Self {
        match kind {
            MatchArg::Exact => Self::Exact,
            MatchArg::StartsWith => Self::StartsWith,
            MatchArg::EndsWith => Self::EndsWith,
            MatchArg::Contains => Self::Contains,
        }
    }
}

#[derive(Subcommand)]
enum TagsAction {
    /// Distinct tags across every taggable resource
    Search {
        /// How each `--value` is compared
        #[arg(long = "match", value_enum, default_value = "contains")]
        kind: MatchArg,

        /// Values to match; none lists every tag
        #[arg(long = "value")]
        values: Vec<String>,

        /// Require any condition instead of all
        #[arg(long)]
        any: bool,
    },
    /// Remove tags from every resource that carries them
    RemoveAll {
        #[arg(required = true, value_delimiter = ',')]
        tags: Vec<String>,
    },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// Create the history metaobject definition if missing
    Setup,
    /// Show one page of records, newest first
    List {
        #[arg(long)]
        cursor: Option<String>,

        /// Page towards newer records
        #[arg(long)]
        previous: bool,
    },
    /// Delete records past retention
    Sweep,
    /// Replay the inverse of a record
    Undo {
        /// History record id (`gid://shopify/Metaobject/...`)
        id: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tagfield_cli=info,tagfield_admin=info".into());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let state = commands::connect(cli.store, cli.token)?;

    match cli.command {
        Commands::Batch {
            operation,
            resource,
            csv,
            report,
            namespace,
            key,
            metafield_type,
            mode,
            partial,
            tags,
        } => {
            let args = commands::batch::BatchArgs {
                kind: operation,
                resource_type: resource,
                csv,
                report,
                namespace,
                key,
                metafield_type,
                mode: mode.into(),
                partial,
                tags,
            };
            commands::batch::run(&state, args).await?;
        }
        Commands::Metafields { action } => match action {
            MetafieldsAction::Definitions { resource } => {
                commands::metafields::definitions(&state, resource).await?;
            }
            MetafieldsAction::DeleteAll {
                resource,
                namespace,
                key,
            } => commands::metafields::delete_all(&state, resource, &namespace, &key).await?,
        },
        Commands::Tags { action } => match action {
            TagsAction::Search { kind, values, any } => {
                let combinator = if any { Combinator::Or } else { Combinator::And };
                commands::tags::search(&state, kind.into(), values, combinator).await?;
            }
            TagsAction::RemoveAll { tags } => commands::tags::remove_all(&state, tags).await?,
        },
        Commands::History { action } => match action {
            HistoryAction::Setup => commands::history::setup(&state).await?,
            HistoryAction::List { cursor, previous } => {
                let direction = if previous {
                    PageDirection::Backward
                } else {
                    PageDirection::Forward
                };
                commands::history::list(&state, cursor, direction).await?;
            }
            HistoryAction::Sweep => commands::history::sweep(&state).await?,
            HistoryAction::Undo { id } => commands::history::undo(&state, id).await?,
        },
        Commands::Export {
            resource,
            metaobject_type,
            out,
        } => commands::export::run(&state, resource, metaobject_type, &out).await?,
    }
    Ok(())
}
