//! CLI module
//!
//! Command-line interface for managing a client's OAuth2 tokens.
//!
//! # Commands
//!
//! - `token` - Print a usable access token
//! - `authorize-url` - Print the authorization code redirect URL
//! - `exchange-code` - Exchange an authorization code for a token
//! - `show-token` - Show the stored token
//! - `clear-token` - Remove the stored token

mod commands;
mod runner;

pub use commands::{Cli, Commands};
pub use runner::Runner;
