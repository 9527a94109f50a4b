use clap::{Parser, Subcommand};
use serde::Serialize;
use std::error::Error;
use std::path::PathBuf;
use tracing::debug;

use b2_bucket::{Bucket, BucketConfig};

#[derive(Parser)]
#[command(name = "b2-bucket")]
#[command(about = "Work with the files of a Backblaze B2 bucket", long_about = None)]
struct Cli {
    #[arg(value_name = "BUCKET", env = "B2_BUCKET")]
    bucket: String,

    #[arg(long, value_name = "URL", help = "Override the B2 authorization host")]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Show the bucket id, account id and download base URL")]
    Info,
    #[command(about = "List files, optionally under a prefix")]
    List {
        #[arg(value_name = "PREFIX")]
        prefix: Option<String>,
    },
    #[command(about = "Count files, optionally under a prefix")]
    Count {
        #[arg(value_name = "PREFIX")]
        prefix: Option<String>,
    },
    #[command(about = "Check whether a file exists")]
    Exists {
        #[arg(value_name = "NAME")]
        name: String,
    },
    #[command(about = "Upload a local file; a REMOTE ending in / is used as a folder")]
    Upload {
        #[arg(value_name = "LOCAL")]
        local: PathBuf,
        #[arg(value_name = "REMOTE")]
        remote: Option<String>,
    },
    #[command(about = "Download a file to disk")]
    Download {
        #[arg(value_name = "REMOTE")]
        remote: String,
        #[arg(value_name = "LOCAL")]
        local: Option<PathBuf>,
    },
    #[command(about = "Print the content of a text file")]
    Read {
        #[arg(value_name = "REMOTE")]
        remote: String,
    },
    #[command(about = "Delete every version of a file")]
    Remove {
        #[arg(value_name = "NAME")]
        name: String,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error + Send + Sync>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Ok(path) = dotenvy::dotenv() {
        debug!("Loaded environment from {}", path.display());
    }

    let cli = Cli::parse();
    let mut config = BucketConfig::from_env(&cli.bucket);
    if let Some(api_url) = cli.api_url {
        config = config.with_option("api_url", api_url);
    }
    let bucket = Bucket::new(config)?;

    match cli.command {
        Commands::Info => print_json(&bucket.info().await?)?,
        Commands::List { prefix } => print_json(&bucket.list(prefix.as_deref()).await?)?,
        Commands::Count { prefix } => println!("{}", bucket.count(prefix.as_deref()).await?),
        Commands::Exists { name } => println!("{}", bucket.exists(name).await?),
        Commands::Upload { local, remote } => {
            print_json(&bucket.upload(&local, remote.as_deref()).await?)?
        }
        Commands::Download { remote, local } => {
            let path = bucket.download(remote, local.as_deref()).await?;
            println!("{}", path.display());
        }
        Commands::Read { remote } => print!("{}", bucket.read(remote).await?),
        Commands::Remove { name } => print_json(&bucket.remove(name).await?)?,
    }

    Ok(())
}
