use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueHint};
use damup::{
    ChunkFailurePolicy, FsMediaLibrary, MediaMetadata, UploadEvent, UploadOutcome, Uploader,
    read_media,
};
use futures::StreamExt;
use serde_json::Value;
use std::{
    env,
    path::{Path, PathBuf},
};
use tracing_subscriber::EnvFilter;

mod config;

const DEFAULT_LIBRARY: &str = "library";

#[derive(Parser)]
#[command(name = "damup")]
#[command(version)]
#[command(about = "A tool uploading media assets to Frontify")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a media file and wait until Frontify has processed it
    Upload {
        /// File to upload, relative to the library directory
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Directory containing the library directories
        #[arg(short, long, value_hint = ValueHint::DirPath)]
        root: Option<PathBuf>,
        /// Library directory the file belongs to
        #[arg(short, long)]
        library: Option<String>,
        /// Asset title, defaults to the file name without extension
        #[arg(short, long)]
        title: Option<String>,
        /// Asset description
        #[arg(short, long)]
        description: Option<String>,
        /// Asset author
        #[arg(short, long)]
        author: Option<String>,
        /// Fail the upload when any chunk could not be transferred
        #[arg(long)]
        strict_chunks: bool,
    },
    /// Delete an asset
    Delete { asset_id: String },
    /// Print the uploader parameters
    Params,
    /// Store your Frontify token in the OS keyring
    SetToken { token: String },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("damup=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let cli = Cli::parse();

    rt.block_on(async {
        match cli.command {
            Commands::SetToken { token } => config::set_token_keyring(token),
            requires_token => {
                let mut config = config::read_config()?;

                match requires_token {
                    Commands::Upload {
                        file,
                        root,
                        library,
                        title,
                        description,
                        author,
                        strict_chunks,
                    } => {
                        if strict_chunks {
                            config = config.with_chunk_failures(ChunkFailurePolicy::Fail);
                        }
                        let metadata = MediaMetadata {
                            title,
                            description,
                            author,
                        };
                        upload_media(Uploader::new(config), root, library, file, metadata).await
                    }
                    Commands::Delete { asset_id } => delete_asset(&Uploader::new(config), &asset_id).await,
                    Commands::Params => print_params(&Uploader::new(config)),
                    Commands::SetToken { token: _ } => panic!("This state should be unreachable"),
                }
            }
        }
    })
}

/// Splits `file` into root, library and media id. Without an explicit library
/// the first path component names it.
fn library_location(
    root: Option<PathBuf>,
    library: Option<String>,
    file: &Path,
) -> Result<(PathBuf, String, String)> {
    let relative = file.to_string_lossy().replace('\\', "/");
    let relative = relative.trim_start_matches("./").trim_start_matches('/');
    let root = match root {
        Some(root) => root,
        None => env::current_dir()?,
    };

    match (library, relative.split_once('/')) {
        (Some(library), _) => Ok((root, library, relative.to_string())),
        (None, Some((library, media_id))) => Ok((root, library.to_string(), media_id.to_string())),
        (None, None) => Ok((root, DEFAULT_LIBRARY.to_string(), relative.to_string())),
    }
}

async fn upload_media(
    uploader: Uploader,
    root: Option<PathBuf>,
    library: Option<String>,
    file: PathBuf,
    metadata: MediaMetadata,
) -> Result<()> {
    let (root, provider, media_id) = library_location(root, library, &file)?;
    let media_library = FsMediaLibrary::new(root).with_metadata(metadata);

    let (item, content) = read_media(&media_library, &media_id, &provider)
        .with_context(|| format!("Unable to read {}", file.display()))?;

    let mut events = uploader.upload_stream(&item, content);
    let mut outcome = UploadOutcome::default();
    while let Some(event) = events.next().await {
        match event {
            UploadEvent::Phase(phase) => eprintln!("{}", phase),
            UploadEvent::ChunkUploaded {
                index,
                total,
                success,
            } => {
                let status = if success { "ok" } else { "failed" };
                eprintln!("  chunk {}/{} {}", index + 1, total, status);
            }
            UploadEvent::Polled { attempt, asset_type } => {
                let asset_type = asset_type
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                eprintln!("  attempt {}: {}", attempt, asset_type);
            }
            UploadEvent::Finished(finished) => outcome = finished,
        }
    }

    match outcome.error_message {
        None => {
            println!(
                "Asset uploaded successfully with ID: {}, url: {}",
                outcome.asset_id.unwrap_or_default(),
                outcome.url.unwrap_or_else(|| "<none>".to_string())
            );
            Ok(())
        }
        Some(error) => match outcome.asset_id {
            Some(asset_id) => bail!("{} (asset ID: {})", error, asset_id),
            None => bail!("{}", error),
        },
    }
}

async fn delete_asset(uploader: &Uploader, asset_id: &str) -> Result<()> {
    uploader
        .delete_asset(asset_id)
        .await
        .context("Error while trying to delete asset")?;
    println!("Asset {} deleted successfully", asset_id);
    Ok(())
}

fn print_params(uploader: &Uploader) -> Result<()> {
    let mut params = uploader.config().to_params();
    if let Some(token) = params.get_mut(damup::params::TOKEN_PARAMETER_KEY) {
        *token = Value::from("********");
    }
    println!("{}", serde_json::to_string_pretty(&params)?);
    Ok(())
}
