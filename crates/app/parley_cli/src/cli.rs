use clap::{Parser, Subcommand};

pub const DEFAULT_SERVER: &str = "http://127.0.0.1:3001";

#[derive(Parser, Debug)]
#[command(name = "parley", version, about = "Chat with a Parley relay from the terminal")]
pub struct Cli {
    /// Base URL of the Parley API server.
    #[arg(long, global = true, env = "PARLEY_SERVER", default_value = DEFAULT_SERVER)]
    pub server: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start an interactive chat session.
    Chat,
    /// Check that the server is up.
    Health,
    /// Print the version.
    Version,
}
