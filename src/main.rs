use clap::{Parser, Subcommand};
use docshelf::Result;
use docshelf::commands::{ask, delete, ingest, init, list, rebuild, search, show_config, watch};
use docshelf::retrieval::DEFAULT_TOP_N;

#[derive(Parser)]
#[command(name = "docshelf")]
#[command(about = "Index a directory of PDF documents and answer questions grounded in them")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default configuration and create the index
    Init,
    /// Run one ingestion pass over the data directory
    Ingest,
    /// Drop the index and re-ingest every document
    Rebuild,
    /// Watch the data directory and ingest on change
    Watch,
    /// Show the chunks most similar to a query
    Search {
        /// Query text
        query: String,
        /// Number of chunks to return
        #[arg(long, default_value_t = DEFAULT_TOP_N)]
        top_n: usize,
    },
    /// Ask a question answered with retrieved context
    Ask {
        /// Question text
        query: String,
        /// Number of chunks used as context
        #[arg(long, default_value_t = DEFAULT_TOP_N)]
        top_n: usize,
    },
    /// List all indexed documents
    List,
    /// Delete a document from the index
    Delete {
        /// Document id to delete
        document: String,
    },
    /// Show the active configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => init()?,
        Commands::Ingest => ingest()?,
        Commands::Rebuild => rebuild()?,
        Commands::Watch => watch().await?,
        Commands::Search { query, top_n } => search(&query, top_n)?,
        Commands::Ask { query, top_n } => ask(&query, top_n)?,
        Commands::List => list()?,
        Commands::Delete { document } => delete(&document)?,
        Commands::Config => show_config()?,
    }

    Ok(())
}
