//! Command-line interface parsing for the `nomad` binary
//!
//! This module handles parsing of CLI arguments using clap and turns the
//! global flags into a `ClientConfig`.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use thiserror::Error;

use crate::auth::{Token, OASIS_OPTIONS, TOKEN_ENV_VAR};
use crate::config::ClientConfig;

/// Default schema type of batch entries
pub const DEFAULT_BATCH_TYPE: &str = "HySprint_Batch";

/// Default schema type of sample entries
pub const DEFAULT_SAMPLE_TYPE: &str = "HySprint_Sample";

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// The --oasis name is not one of `OASIS_OPTIONS`
    #[error("Invalid oasis: '{name}'. Valid options: {valid}")]
    UnknownOasis { name: String, valid: String },
}

/// NOMAD API client - query the materials database with a local result cache
#[derive(Parser, Debug)]
#[command(name = "nomad")]
#[command(about = "Query the NOMAD materials database with a local result cache")]
#[command(version)]
pub struct Cli {
    /// Cache directory (defaults to the platform cache directory)
    #[arg(long, global = true, env = "NOMAD_CACHE_DIR", value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// API base URL
    #[arg(long, global = true, env = "NOMAD_URL", value_name = "URL")]
    pub url: Option<String>,

    /// Named deployment (central, staging, test, local); overrides --url
    #[arg(long, global = true, value_name = "NAME")]
    pub oasis: Option<String>,

    /// Access token
    #[arg(long, global = true, env = TOKEN_ENV_VAR, hide_env_values = true)]
    pub token: Option<String>,

    /// Ignore cached results and overwrite them with fresh ones
    #[arg(long, global = true)]
    pub refresh: bool,

    /// Do not read or write the result cache
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Inspect or clear the local result cache
    #[command(subcommand)]
    Cache(CacheCommand),

    /// Check that the access token is accepted and show its account
    Verify,

    /// List batch lab ids
    Batches {
        /// Schema type of batch entries
        #[arg(long, default_value = DEFAULT_BATCH_TYPE)]
        entry_type: String,
    },

    /// List the sample lab ids belonging to batches
    Samples {
        /// Batch lab ids
        #[arg(required = true)]
        batch_ids: Vec<String>,

        /// Schema type of sample entries
        #[arg(long, default_value = DEFAULT_SAMPLE_TYPE)]
        entry_type: String,
    },

    /// List upload ids with entries by an author
    Uploads {
        /// Author name as shown in NOMAD
        author: String,
    },

    /// Show a user's account details
    User {
        user_id: String,
    },

    /// Collect sample authors and store them as the attribution table
    Attribute {
        /// Schema type of sample entries
        #[arg(long, default_value = DEFAULT_SAMPLE_TYPE)]
        entry_type: String,
    },
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum CacheCommand {
    /// Show entry count, total size and entry age range
    Stats,
    /// List entries, oldest first
    List,
    /// Remove one entry, or all entries when no key is given
    Clear {
        key: Option<String>,
    },
    /// Print the file an entry for KEY is stored in
    Path {
        key: String,
    },
}

impl Cli {
    /// Builds the client configuration from the global flags
    ///
    /// # Returns
    /// * `Ok(ClientConfig)` for the selected deployment
    /// * `Err(CliError::UnknownOasis)` if `--oasis` names no known deployment
    pub fn client_config(&self) -> Result<ClientConfig, CliError> {
        let mut config = match (&self.oasis, &self.url) {
            (Some(name), _) => ClientConfig::for_oasis(name).ok_or_else(|| CliError::UnknownOasis {
                name: name.clone(),
                valid: OASIS_OPTIONS
                    .iter()
                    .map(|(option, _)| *option)
                    .collect::<Vec<_>>()
                    .join(", "),
            })?,
            (None, Some(url)) => ClientConfig::with_base_url(url.as_str()),
            (None, None) => ClientConfig::default(),
        };

        if let Some(ref dir) = self.cache_dir {
            config = config.cache_dir(dir.clone());
        }
        if self.no_cache {
            config = config.without_cache();
        }
        Ok(config)
    }

    /// The access token, if one was given and is non-empty
    pub fn access_token(&self) -> Option<Token> {
        self.token.as_deref().and_then(|raw| Token::new(raw).ok())
    }

    /// Default log filter for the requested verbosity
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
