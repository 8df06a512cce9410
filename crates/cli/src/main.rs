use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use cli::context::{self, ListOptions};
use cli::render;
use lexdocs_core::config::{self, AppConfig};
use lexdocs_core::models::FolderEntry;
use lexdocs_core::{view, BrowserError, FolderBrowser};
use providers::http::HttpDocumentService;
use providers::ServiceError;
use std::fmt;
use std::sync::Arc;
use storage::Settings;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let cfg = match config::load(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&cfg.logging.level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli.command, cfg).await {
        // Failures already shown as notices only need the exit code.
        if e.downcast_ref::<Reported>().is_none() {
            eprintln!("Error: {e:#}");
        }
        std::process::exit(1);
    }
}

#[derive(Parser)]
#[command(name = "lexdocs")]
#[command(about = "Browse and reorganize folders of a legal document service", long_about = None)]
struct Cli {
    /// Path to config file (defaults to config/default if present)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the folder tree with document counts
    Tree {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// List subfolders and documents of a folder
    Ls {
        /// Folder to list (defaults to root)
        folder: Option<String>,
        /// Case-insensitive search in name, summary and tags
        #[arg(long)]
        search: Option<String>,
        /// File type or extension, e.g. pdf
        #[arg(long = "type")]
        file_type: Option<String>,
        /// Only documents carrying this tag
        #[arg(long)]
        tag: Option<String>,
        /// Filename glob, e.g. "*.docx"
        #[arg(long)]
        pattern: Option<String>,
        /// Sort key: name|date|size|type
        #[arg(long)]
        sort: Option<String>,
        /// Sort descending
        #[arg(long, default_value_t = false)]
        desc: bool,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a folder
    Mkdir {
        name: String,
        /// Parent folder (defaults to root)
        #[arg(long)]
        parent: Option<String>,
    },
    /// Delete a folder and its subfolders
    Rmdir { path: String },
    /// Move a document to another folder ("" or "/" for root)
    Mv { id: i64, destination: String },
    /// Copy a document into another folder
    Cp { id: i64, destination: String },
    /// Delete a document
    Rm { id: i64 },
    /// Rename a folder, or move it when NEW contains a slash
    RenameFolder { path: String, new_name: String },
    /// Move, copy or delete several documents
    Bulk {
        action: BulkAction,
        /// Comma-separated document IDs
        #[arg(long, value_delimiter = ',', num_args = 1.., required = true)]
        ids: Vec<i64>,
        /// Destination folder for move and copy
        destination: Option<String>,
        /// Use the server's batch endpoint instead of one request per document
        #[arg(long, default_value_t = false)]
        server_side: bool,
        /// Output JSON summary
        #[arg(long)]
        json: bool,
    },
    /// Remove empty folders on the server
    Cleanup,
    /// Chat sessions
    Chat {
        #[command(subcommand)]
        command: ChatCommand,
    },
    /// Show or set a boolean preference
    Pref { key: Option<String>, value: Option<bool> },
}

#[derive(Subcommand)]
enum ChatCommand {
    /// List chat sessions
    Sessions {
        /// Include archived sessions
        #[arg(long, default_value_t = false)]
        all: bool,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Send a message and print the reply (Ctrl-C cancels)
    Send { session: String, message: String },
    /// Hide a session from the default listing
    Archive { session: String },
    /// Show an archived session again
    Unarchive { session: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BulkAction {
    Move,
    Copy,
    Delete,
}

/// Marker for failures whose message was already printed.
#[derive(Debug)]
struct Reported;

impl fmt::Display for Reported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "operation failed")
    }
}

impl std::error::Error for Reported {}

async fn run(command: Commands, cfg: AppConfig) -> Result<()> {
    match command {
        Commands::Tree { json } => run_tree(&cfg, json).await,
        Commands::Ls {
            folder,
            search,
            file_type,
            tag,
            pattern,
            sort,
            desc,
            json,
        } => {
            let opts = ListOptions {
                search,
                file_type,
                tag,
                pattern,
                sort,
                desc,
            };
            run_ls(&cfg, folder.as_deref(), &opts, json).await
        }
        Commands::Mkdir { name, parent } => {
            let mut browser = open_browser(&cfg).await?;
            browser.open_folder(parent.as_deref().unwrap_or("/"));
            let result = browser.create_folder(&name).await;
            finish(&mut browser, result).map(|_| ())
        }
        Commands::Rmdir { path } => {
            let mut browser = open_browser(&cfg).await?;
            let result = browser.delete_folder(&path).await;
            finish(&mut browser, result)
        }
        Commands::Mv { id, destination } => {
            let mut browser = open_browser(&cfg).await?;
            let result = browser.move_document(id, &destination).await;
            finish(&mut browser, result).map(|_| ())
        }
        Commands::Cp { id, destination } => {
            let mut browser = open_browser(&cfg).await?;
            let result = browser.copy_document(id, &destination).await;
            finish(&mut browser, result).map(|_| ())
        }
        Commands::Rm { id } => {
            let mut browser = open_browser(&cfg).await?;
            let result = browser.delete_document(id).await;
            finish(&mut browser, result)
        }
        Commands::RenameFolder { path, new_name } => {
            let mut browser = open_browser(&cfg).await?;
            let result = browser.rename_folder(&path, &new_name).await;
            let outcome = finish(&mut browser, result)?;
            if outcome.old_removed {
                Ok(())
            } else {
                Err(Reported.into())
            }
        }
        Commands::Bulk {
            action,
            ids,
            destination,
            server_side,
            json,
        } => run_bulk(&cfg, action, &ids, destination.as_deref(), server_side, json).await,
        Commands::Cleanup => {
            let mut browser = open_browser(&cfg).await?;
            let result = browser.cleanup_folders().await;
            finish(&mut browser, result)
        }
        Commands::Chat { command } => run_chat(&cfg, command).await,
        Commands::Pref { key, value } => run_pref(&cfg, key.as_deref(), value).await,
    }
}

fn http_service(cfg: &AppConfig) -> Result<Arc<HttpDocumentService>> {
    let service = context::document_service(cfg).context("build document service client")?;
    Ok(Arc::new(service))
}

async fn open_browser(cfg: &AppConfig) -> Result<FolderBrowser> {
    browser_with(http_service(cfg)?).await
}

async fn browser_with(service: Arc<HttpDocumentService>) -> Result<FolderBrowser> {
    let mut browser = FolderBrowser::new(service);
    browser.refresh().await.context("load documents and folders")?;
    Ok(browser)
}

/// Prints queued notices and turns a failed operation into a non-zero exit.
fn finish<T>(browser: &mut FolderBrowser, result: Result<T, BrowserError>) -> Result<T> {
    render::print_notices(&browser.take_notices());
    result.map_err(|e| {
        debug!(kind = %e.kind(), error = %e, "command failed");
        Reported.into()
    })
}

async fn run_tree(cfg: &AppConfig, json: bool) -> Result<()> {
    let browser = open_browser(cfg).await?;
    if json {
        let snapshot = FolderEntry::snapshot(browser.tree(), browser.documents(), "/");
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        let counts = view::folder_counts(browser.documents());
        for line in render::tree_lines(browser.tree(), &counts) {
            println!("{line}");
        }
    }
    Ok(())
}

async fn run_ls(cfg: &AppConfig, folder: Option<&str>, opts: &ListOptions, json: bool) -> Result<()> {
    let mut browser = open_browser(cfg).await?;
    browser.open_folder(folder.unwrap_or("/"));
    let listing = opts.listing(&browser, cfg)?;
    info!(folder = %listing.folder, documents = listing.documents.len(), "listing");

    if json {
        let out = serde_json::json!({
            "folder": listing.folder,
            "known": listing.known,
            "folders": listing.folders,
            "documents": listing.documents,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        if !listing.known {
            println!("info: {} is not in the folder list", listing.folder);
        }
        for line in render::listing_lines(&listing.folders, &listing.documents) {
            println!("{line}");
        }
    }
    Ok(())
}

async fn run_bulk(
    cfg: &AppConfig,
    action: BulkAction,
    ids: &[i64],
    destination: Option<&str>,
    server_side: bool,
    json: bool,
) -> Result<()> {
    let service = http_service(cfg)?;
    let needs_destination = matches!(action, BulkAction::Move | BulkAction::Copy);
    let destination = match (needs_destination, destination) {
        (true, Some(d)) => d,
        (true, None) => bail!("a destination folder is required for {action:?}"),
        (false, _) => "/",
    };

    if server_side {
        let dest = lexdocs_core::paths::normalize_destination(destination);
        let result = match action {
            BulkAction::Move => service.bulk_move_remote(ids, &dest).await,
            BulkAction::Delete => service.bulk_delete_remote(ids).await,
            BulkAction::Copy => bail!("the server has no batch copy endpoint; omit --server-side"),
        };
        return match result {
            Ok(()) => {
                println!("ok: {action:?} of {} documents accepted", ids.len());
                Ok(())
            }
            Err(e) => Err(server_error(e)),
        };
    }

    let mut browser = browser_with(service).await?;
    let result = match action {
        BulkAction::Move => browser.bulk_move(ids, destination).await,
        BulkAction::Copy => browser.bulk_copy(ids, destination).await,
        BulkAction::Delete => browser.bulk_delete(ids).await,
    };
    let summary = finish(&mut browser, result)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    summary.into_result().map(|_| ()).map_err(|_| Reported.into())
}

fn server_error(err: ServiceError) -> anyhow::Error {
    match err.server_message() {
        Some(msg) => anyhow!("{msg}"),
        None => anyhow!(err),
    }
}

async fn run_chat(cfg: &AppConfig, command: ChatCommand) -> Result<()> {
    let pool = storage::open(&cfg.database.path)
        .await
        .context("open settings database")?;
    let mut settings = Settings::load(&pool).await?;

    match command {
        ChatCommand::Sessions { all, json } => {
            let client = context::chat_client(cfg).context("build chat client")?;
            let sessions = client.list_sessions().await.map_err(server_error)?;
            let (active, archived) = settings.partition_sessions(sessions, |s| s.id.as_str());
            if json {
                let out = if all {
                    serde_json::json!({ "active": active, "archived": archived })
                } else {
                    serde_json::json!({ "active": active })
                };
                println!("{}", serde_json::to_string_pretty(&out)?);
                return Ok(());
            }
            for s in &active {
                println!("{}", render::session_line(s, false));
            }
            if all {
                for s in &archived {
                    println!("{}", render::session_line(s, true));
                }
            } else if !archived.is_empty() {
                eprintln!("({} archived, use --all to show)", archived.len());
            }
            Ok(())
        }
        ChatCommand::Send { session, message } => {
            let client = context::chat_client(cfg).context("build chat client")?;
            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            let watcher = tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    on_interrupt.cancel();
                }
            });
            let reply = client.send_message(&session, &message, &cancel).await;
            watcher.abort();
            match reply {
                Ok(reply) => {
                    println!("{}", reply.message);
                    Ok(())
                }
                Err(ServiceError::Cancelled) => {
                    eprintln!("cancelled");
                    Err(Reported.into())
                }
                Err(e) => Err(server_error(e)),
            }
        }
        ChatCommand::Archive { session } => {
            if settings.archive_session(&session) {
                settings.save(&pool).await?;
                println!("ok: archived {session}");
            } else {
                println!("info: {session} was already archived");
            }
            Ok(())
        }
        ChatCommand::Unarchive { session } => {
            if settings.unarchive_session(&session) {
                settings.save(&pool).await?;
                println!("ok: unarchived {session}");
            } else {
                println!("info: {session} was not archived");
            }
            Ok(())
        }
    }
}

async fn run_pref(cfg: &AppConfig, key: Option<&str>, value: Option<bool>) -> Result<()> {
    let pool = storage::open(&cfg.database.path)
        .await
        .context("open settings database")?;
    let mut settings = Settings::load(&pool).await?;
    match (key, value) {
        (None, _) => {
            for (k, v) in &settings.preferences {
                println!("{k} = {v}");
            }
        }
        (Some(k), None) => match settings.preference(k) {
            Some(v) => println!("{k} = {v}"),
            None => bail!("preference {k} is not set"),
        },
        (Some(k), Some(v)) => {
            settings.set_preference(k, v);
            settings.save(&pool).await?;
            println!("{k} = {v}");
        }
    }
    Ok(())
}
