use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use songbook_core::model::{BlockId, BlockKind, Document, DocumentId};
use songbook_core::paths::data_dir;
use songbook_core::Journal;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

const PASSWORD_ENV: &str = "SONGBOOK_PASSWORD";

#[derive(Parser, Debug)]
#[command(author, version, about = "Encrypted songwriting journal", long_about = None)]
struct Cli {
    /// Directory holding the encrypted journal and settings
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List documents
    List,

    /// Create a document and open it
    New {
        title: String,
    },

    /// Print a document
    Show {
        /// Document title or id (defaults to the first document)
        #[arg(short, long)]
        doc: Option<String>,
    },

    /// Append a block to a document
    AddBlock {
        #[arg(short, long)]
        doc: Option<String>,
        /// intro, verse, pre-chorus, chorus, bridge, hook or outro
        #[arg(short, long, default_value = "verse")]
        kind: BlockKind,
    },

    /// Replace (or append to) the text of a block
    Write {
        #[arg(short, long)]
        doc: Option<String>,
        /// Block position (1-based) or id
        #[arg(short, long)]
        block: String,
        /// Append instead of replacing
        #[arg(short, long)]
        append: bool,
        text: String,
    },

    /// Remove a block from a document
    RemoveBlock {
        #[arg(short, long)]
        doc: Option<String>,
        #[arg(short, long)]
        block: String,
    },

    /// Delete a document
    Delete {
        doc: String,
    },

    /// Show journal status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let dir = match cli.data_dir {
        Some(dir) => dir,
        None => data_dir()?,
    };
    std::fs::create_dir_all(&dir)?;
    debug!(dir = %dir.display(), "opening journal");

    let mut journal = Journal::open_dir(&dir)?;
    let password = prompt_password("Journal password: ")?;
    journal.unlock(&password).await?;

    let result = run(&journal, cli.command).await;
    journal.flush().await?;
    result
}

async fn run(journal: &Journal, command: Commands) -> Result<()> {
    match command {
        Commands::List => {
            let docs = journal.documents();
            if docs.is_empty() {
                println!("No documents yet.");
            }
            for doc in docs {
                println!(
                    "{}  {}  {} block(s)  {}",
                    doc.id,
                    doc.created.format("%Y-%m-%d %H:%M"),
                    doc.block_count,
                    doc.title
                );
            }
        }
        Commands::New { title } => {
            let id = journal.create_document(&title).await?;
            println!("Created {id}");
        }
        Commands::Show { doc } => {
            select(journal, doc.as_deref())?;
            let doc = current(journal)?;
            print_document(&doc);
        }
        Commands::AddBlock { doc, kind } => {
            select(journal, doc.as_deref())?;
            let id = journal.add_block(kind).await?;
            println!("Added {kind} block {id}");
        }
        Commands::Write {
            doc,
            block,
            append,
            text,
        } => {
            select(journal, doc.as_deref())?;
            let id = resolve_block(&current(journal)?, &block)?;
            let updated = if append {
                if text.trim().is_empty() {
                    return Ok(());
                }
                journal.append_block_text(id, &text)?
            } else {
                journal.edit_block(id, &text)?
            };
            if !updated {
                return Err(anyhow!("block {block} not found"));
            }
        }
        Commands::RemoveBlock { doc, block } => {
            select(journal, doc.as_deref())?;
            let id = resolve_block(&current(journal)?, &block)?;
            journal.remove_block(id).await?;
            println!("Removed block {id}");
        }
        Commands::Delete { doc } => {
            let id = resolve_document(journal, &doc)?;
            journal.delete_document(id).await?;
            println!("Deleted {id}");
        }
        Commands::Status => {
            let stats = journal.stats();
            println!("Status: {}", journal.status().current().label());
            println!("Documents: {}", journal.documents().len());
            if let Some(doc) = journal.current_document() {
                println!(
                    "Open: {} ({} words, {} blocks)",
                    doc.title, stats.words, stats.blocks
                );
            }
            if let Some(err) = journal.status().last_error() {
                println!("Last error: {err}");
            }
        }
    }
    Ok(())
}

fn select(journal: &Journal, doc: Option<&str>) -> Result<()> {
    if let Some(doc) = doc {
        let id = resolve_document(journal, doc)?;
        journal.open_document(id)?;
    }
    Ok(())
}

fn current(journal: &Journal) -> Result<Document> {
    journal
        .current_document()
        .ok_or_else(|| anyhow!("no documents; create one with `songbook new <title>`"))
}

fn resolve_document(journal: &Journal, reference: &str) -> Result<DocumentId> {
    if let Ok(id) = reference.parse::<DocumentId>() {
        if journal.store().document(id).is_some() {
            return Ok(id);
        }
    }
    journal
        .store()
        .find_by_title(reference)
        .map(|doc| doc.id)
        .ok_or_else(|| anyhow!("no document named {reference:?}"))
}

fn resolve_block(doc: &Document, reference: &str) -> Result<BlockId> {
    if let Ok(position) = reference.parse::<usize>() {
        return position
            .checked_sub(1)
            .and_then(|i| doc.blocks.get(i))
            .map(|block| block.id)
            .ok_or_else(|| anyhow!("{} has no block {position}", doc.title));
    }
    reference
        .parse::<BlockId>()
        .map_err(|e| anyhow!("invalid block reference {reference:?}: {e}"))
}

fn print_document(doc: &Document) {
    println!("# {}", doc.title);
    println!("{} words", doc.word_count());
    for (i, block) in doc.blocks.iter().enumerate() {
        println!();
        println!("[{}] {} ({})", i + 1, block.kind, block.id);
        if !block.content.is_empty() {
            println!("{}", block.content);
        }
    }
}

fn prompt_password(prompt: &str) -> Result<Zeroizing<String>> {
    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        if !pw.is_empty() {
            return Ok(Zeroizing::new(pw));
        }
    }
    let pw = rpassword::prompt_password(prompt).map_err(|e| anyhow!("password prompt: {e}"))?;
    Ok(Zeroizing::new(pw))
}
