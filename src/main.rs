//! NOMAD API CLI - query the NOMAD materials database from the terminal
//!
//! Thin front end over the `nomad_api` library: cache inspection and
//! maintenance, token verification, and the cached convenience queries.

use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use nomad_api::cli::{CacheCommand, Cli, Command};
use nomad_api::{verify_token, CacheKey, CacheManager, ClientConfig, NomadClient, StorageError};

type BoxError = Box<dyn std::error::Error>;

/// Installs the stderr log subscriber; `RUST_LOG` wins over `-v`
fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// The cache named by the configuration, whether or not queries use it
fn cache_manager(config: &ClientConfig) -> Result<CacheManager, StorageError> {
    match &config.cache_dir {
        Some(dir) => Ok(CacheManager::with_dir(dir.clone())),
        None => CacheManager::new(),
    }
}

fn run_cache_command(command: &CacheCommand, cache: &CacheManager) -> Result<(), BoxError> {
    match command {
        CacheCommand::Stats => {
            let stats = cache.stats()?;
            println!("Cache directory: {}", cache.cache_dir().display());
            println!("Entries: {}", stats.entry_count);
            println!("Total size: {} bytes", stats.total_size_bytes);
            if let (Some(oldest), Some(newest)) = (stats.oldest_entry, stats.newest_entry) {
                println!("Oldest entry: {}", oldest.to_rfc3339());
                println!("Newest entry: {}", newest.to_rfc3339());
            }
        }
        CacheCommand::List => {
            for entry in cache.entries()? {
                println!(
                    "{}  {:>10}  {}",
                    entry.modified.to_rfc3339(),
                    entry.size_bytes,
                    entry.key.as_deref().unwrap_or("<unreadable>")
                );
            }
        }
        CacheCommand::Clear { key } => {
            let key = key.as_deref().map(CacheKey::new);
            let removed = cache.clear(key.as_ref())?;
            println!("Removed {} {}", removed, if removed == 1 { "entry" } else { "entries" });
        }
        CacheCommand::Path { key } => {
            println!("{}", cache.cache_path(&CacheKey::new(key.as_str())).display());
        }
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<(), BoxError> {
    let config = cli.client_config()?;

    let mut client = NomadClient::new(&config)?;
    if let Some(token) = cli.access_token() {
        client = client.with_token(token);
    }
    let refresh = cli.refresh;

    match &cli.command {
        Command::Cache(command) => run_cache_command(command, &cache_manager(&config)?)?,
        Command::Verify => {
            let token = cli.access_token().ok_or("no access token given (use --token or NOMAD_CLIENT_ACCESS_TOKEN)")?;
            let user = verify_token(client.base_url(), &token).await?;
            println!(
                "Token valid for {} ({})",
                user.name.as_deref().unwrap_or("<unnamed>"),
                user.user_id
            );
        }
        Command::Batches { entry_type } => {
            for id in client.get_batch_ids(entry_type, refresh).await? {
                println!("{}", id);
            }
        }
        Command::Samples { batch_ids, entry_type } => {
            for id in client.get_ids_in_batch(batch_ids.as_slice(), entry_type, refresh).await? {
                println!("{}", id);
            }
        }
        Command::Uploads { author } => {
            for id in client.get_uploads_by_author(author, refresh).await? {
                println!("{}", id);
            }
        }
        Command::User { user_id } => match client.get_user_details(user_id, refresh).await? {
            Some(user) => println!("{}", serde_json::to_string_pretty(&user)?),
            None => return Err(format!("no user with id '{}'", user_id).into()),
        },
        Command::Attribute { entry_type } => {
            let attributions = client.get_all_samples_with_authors(entry_type, refresh).await?;
            let cache = cache_manager(&config)?;
            cache.save_attributions(&attributions)?;
            println!(
                "Saved attributions for {} samples to {}",
                attributions.len(),
                cache.attributions_path().display()
            );
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_filter());

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
