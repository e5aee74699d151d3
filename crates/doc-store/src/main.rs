//! # Doc Store CLI (`dstore`)
//!
//! ```bash
//! dstore --config ./config/dstore.toml init
//! dstore owner add --developer $DEV --kind agent --id $AGENT
//! dstore put --developer $DEV --title "Mint julep" --content "Bourbon, sugar, mint." \
//!     --embedding-model voyage-3 --embedding-dimensions 1024
//! dstore link --developer $DEV --doc $DOC --kind agent --id $AGENT
//! dstore search --developer $DEV "julep" --agent $AGENT --explain
//! ```
//!
//! Logs go to stderr (`RUST_LOG` overrides `[logging].level`); results go
//! to stdout.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use doc_store::config::{self, Config};
use doc_store::ingest::{self, IngestRequest};
use doc_store::search::SearchOptions;
use doc_store::{db, edit, get, migrate, owners, search};
use doc_store_core::models::{DocumentPatch, Modality, OwnerKind, OwnerRef};

/// Multi-tenant document store with language-aware keyword and fuzzy search.
#[derive(Parser)]
#[command(name = "dstore", version)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/dstore.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Register or remove users and agents.
    Owner {
        #[command(subcommand)]
        action: OwnerAction,
    },

    /// Ingest a document (or a split set of chunks).
    Put {
        #[arg(long)]
        developer: Uuid,
        /// Document id. Generated when omitted.
        #[arg(long)]
        doc: Option<Uuid>,
        /// Chunk index (first index when splitting).
        #[arg(long, default_value_t = 0)]
        index: i64,
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long)]
        content: String,
        #[arg(long, default_value = "text")]
        modality: Modality,
        #[arg(long)]
        embedding_model: String,
        #[arg(long)]
        embedding_dimensions: i64,
        /// Language tag. Defaults to `[search].default_language`.
        #[arg(long)]
        language: Option<String>,
        /// Metadata as a JSON object.
        #[arg(long)]
        metadata: Option<String>,
        /// Split content into chunks of `[chunking].max_tokens`.
        #[arg(long)]
        split: bool,
    },

    /// Print every chunk of a document and its owners.
    Get {
        #[arg(long)]
        developer: Uuid,
        #[arg(long)]
        doc: Uuid,
    },

    /// Patch one chunk. Changing title, content or language reindexes it.
    Update {
        #[arg(long)]
        developer: Uuid,
        #[arg(long)]
        doc: Uuid,
        #[arg(long, default_value_t = 0)]
        index: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        language: Option<String>,
        #[arg(long)]
        metadata: Option<String>,
    },

    /// Delete a document, or one chunk with `--index`.
    Delete {
        #[arg(long)]
        developer: Uuid,
        #[arg(long)]
        doc: Uuid,
        #[arg(long)]
        index: Option<i64>,
    },

    /// Attach a document to a user or agent.
    Link {
        #[command(flatten)]
        target: LinkTarget,
    },

    /// Detach a document from a user or agent.
    Unlink {
        #[command(flatten)]
        target: LinkTarget,
    },

    /// Ranked keyword + fuzzy search.
    Search {
        #[arg(long)]
        developer: Uuid,
        query: String,
        /// Language used to analyze the query.
        #[arg(long)]
        lang: Option<String>,
        /// Only documents linked to this user (repeatable).
        #[arg(long = "user")]
        users: Vec<Uuid>,
        /// Only documents linked to this agent (repeatable).
        #[arg(long = "agent")]
        agents: Vec<Uuid>,
        /// Metadata equality filter as a JSON object.
        #[arg(long)]
        metadata: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
        /// Show exact score, fuzzy score and matched terms.
        #[arg(long)]
        explain: bool,
    },
}

#[derive(Subcommand)]
enum OwnerAction {
    Add {
        #[command(flatten)]
        owner: OwnerArgs,
    },
    Remove {
        #[command(flatten)]
        owner: OwnerArgs,
    },
}

#[derive(clap::Args)]
struct OwnerArgs {
    #[arg(long)]
    developer: Uuid,
    /// `user` or `agent`.
    #[arg(long)]
    kind: OwnerKind,
    #[arg(long)]
    id: Uuid,
}

impl OwnerArgs {
    fn owner(&self) -> OwnerRef {
        OwnerRef {
            kind: self.kind,
            id: self.id,
        }
    }
}

#[derive(clap::Args)]
struct LinkTarget {
    #[arg(long)]
    developer: Uuid,
    #[arg(long)]
    doc: Uuid,
    #[arg(long)]
    kind: OwnerKind,
    #[arg(long)]
    id: Uuid,
}

impl LinkTarget {
    fn owner(&self) -> OwnerRef {
        OwnerRef {
            kind: self.kind,
            id: self.id,
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    init_tracing(&cfg);

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg).await?;
            migrate::run_migrations(&pool).await?;
            pool.close().await;
            println!("Database initialized successfully.");
        }
        Commands::Owner { action } => match action {
            OwnerAction::Add { owner } => {
                owners::run_owner_add(&cfg, owner.developer, owner.owner()).await?;
            }
            OwnerAction::Remove { owner } => {
                owners::run_owner_remove(&cfg, owner.developer, owner.owner()).await?;
            }
        },
        Commands::Put {
            developer,
            doc,
            index,
            title,
            content,
            modality,
            embedding_model,
            embedding_dimensions,
            language,
            metadata,
            split,
        } => {
            let req = IngestRequest {
                developer_id: developer,
                doc_id: doc,
                index,
                title,
                content,
                modality,
                embedding_model,
                embedding_dimensions,
                language: language.unwrap_or_else(|| cfg.search.default_language.clone()),
                metadata: match metadata {
                    Some(raw) => ingest::parse_metadata(&raw)?,
                    None => Default::default(),
                },
            };
            ingest::run_put(&cfg, req, split).await?;
        }
        Commands::Get { developer, doc } => {
            get::run_get(&cfg, developer, doc).await?;
        }
        Commands::Update {
            developer,
            doc,
            index,
            title,
            content,
            language,
            metadata,
        } => {
            let patch = DocumentPatch {
                title,
                content,
                language,
                metadata: metadata
                    .as_deref()
                    .map(ingest::parse_metadata)
                    .transpose()?,
            };
            edit::run_update(&cfg, developer, doc, index, patch).await?;
        }
        Commands::Delete {
            developer,
            doc,
            index,
        } => {
            edit::run_delete(&cfg, developer, doc, index).await?;
        }
        Commands::Link { target } => {
            owners::run_link(&cfg, target.developer, target.doc, target.owner()).await?;
        }
        Commands::Unlink { target } => {
            owners::run_unlink(&cfg, target.developer, target.doc, target.owner()).await?;
        }
        Commands::Search {
            developer,
            query,
            lang,
            users,
            agents,
            metadata,
            limit,
            explain,
        } => {
            let owners = users
                .into_iter()
                .map(OwnerRef::user)
                .chain(agents.into_iter().map(OwnerRef::agent))
                .collect();
            let opts = SearchOptions {
                language: lang,
                owners,
                metadata: metadata
                    .as_deref()
                    .map(ingest::parse_metadata)
                    .transpose()?,
                limit,
                explain,
            };
            search::run_search(&cfg, developer, &query, &opts).await?;
        }
    }

    Ok(())
}
