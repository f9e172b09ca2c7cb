//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// SDK runtime CLI: obtain and manage OAuth2 tokens for a configured client
#[derive(Parser, Debug)]
#[command(name = "sdk-runtime")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Client configuration file (YAML or JSON)
    #[arg(short = 'C', long, global = true, default_value = "sdk-runtime.yaml")]
    pub config: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print a usable access token, fetching or refreshing it as needed
    Token {
        /// Do not refresh a token that is about to expire
        #[arg(long)]
        no_refresh: bool,
    },

    /// Print the authorization URL for the authorization code flow
    AuthorizeUrl {
        /// Redirect URI registered with the provider
        #[arg(long)]
        redirect_url: Option<String>,

        /// Scopes to request (repeatable, overrides configured scopes)
        #[arg(long = "scope")]
        scopes: Vec<String>,

        /// Opaque state value to round-trip
        #[arg(long, conflicts_with = "signed_state")]
        state: Option<String>,

        /// Generate a signed, short-lived state value
        #[arg(long)]
        signed_state: bool,
    },

    /// Exchange an authorization code for a token and store it
    ExchangeCode {
        /// Authorization code from the redirect
        code: String,

        /// State value from the redirect, verified before the exchange
        #[arg(long)]
        state: Option<String>,
    },

    /// Show the stored token
    ShowToken,

    /// Remove the stored token
    ClearToken,
}
