use std::path::PathBuf;

use anyhow::{Context, Result};
use basic_cleaning_core::store::{ArtifactManifest, ArtifactRef, ArtifactStore, PublishRequest};
use basic_cleaning_core::{LocalArtifactStore, StoreConfig};
use clap::{Args, Parser, Subcommand};
use comfy_table::Table;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Artifact store administrative tooling", long_about = None)]
struct Cli {
    /// Artifact store directory (defaults to ARTIFACT_STORE_ROOT or ./artifacts)
    #[arg(long = "store_root", global = true)]
    store_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Publish a local file as a new artifact version
    Upload(UploadArgs),
    /// List every version of an artifact
    List(ListArgs),
    /// Print the manifest of an artifact version
    Show(ShowArgs),
}

#[derive(Args, Debug)]
struct UploadArgs {
    /// Artifact name
    #[arg(long)]
    name: String,
    /// Artifact type, e.g. raw_data
    #[arg(long = "type")]
    artifact_type: String,
    #[arg(long, default_value = "")]
    description: String,
    /// Extra aliases to attach to the new version
    #[arg(long = "alias")]
    aliases: Vec<String>,
    file: PathBuf,
}

#[derive(Args, Debug)]
struct ListArgs {
    name: String,
}

#[derive(Args, Debug)]
struct ShowArgs {
    /// name, name:latest, name:vN or name:<alias>
    reference: String,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter())
        .json()
        .init();

    let cli = Cli::parse();
    let config = match cli.store_root {
        Some(root) => StoreConfig { root },
        None => StoreConfig::from_env(),
    };
    let store = LocalArtifactStore::from_config(&config);

    match cli.command {
        Command::Upload(args) => handle_upload(&store, args),
        Command::List(args) => handle_list(&store, args),
        Command::Show(args) => handle_show(&store, args),
    }
}

/// `RUST_LOG` when set, `info` otherwise.
fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn handle_upload(store: &LocalArtifactStore, args: UploadArgs) -> Result<()> {
    let mut request =
        PublishRequest::new(args.name, args.artifact_type, args.description, args.file);
    request.aliases = args.aliases;

    let manifest = store.publish(request).context("upload failed")?;
    info!(artifact = %manifest.reference(), digest = %manifest.digest, "Uploaded artifact");
    println!("{}", manifest.reference());
    Ok(())
}

fn handle_list(store: &LocalArtifactStore, args: ListArgs) -> Result<()> {
    let versions = store
        .list_versions(&args.name)
        .with_context(|| format!("failed to list versions of '{}'", args.name))?;
    println!("{}", versions_table(&versions));
    Ok(())
}

fn handle_show(store: &LocalArtifactStore, args: ShowArgs) -> Result<()> {
    let reference: ArtifactRef = args.reference.parse()?;
    let fetched = store
        .fetch(&reference)
        .with_context(|| format!("failed to resolve {reference}"))?;
    println!("{}", serde_json::to_string_pretty(&fetched.manifest)?);
    Ok(())
}

fn versions_table(versions: &[ArtifactManifest]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        "version", "type", "aliases", "digest", "size", "created_at",
    ]);

    let newest = versions.last().map(|manifest| manifest.version);
    for manifest in versions {
        let mut aliases = manifest.aliases.clone();
        if Some(manifest.version) == newest {
            aliases.insert(0, "latest".to_string());
        }
        table.add_row(vec![
            format!("v{}", manifest.version),
            manifest.artifact_type.clone(),
            aliases.join(", "),
            manifest.digest.chars().take(12).collect(),
            manifest.size_bytes.to_string(),
            manifest.created_at.to_rfc3339(),
        ]);
    }
    table
}
