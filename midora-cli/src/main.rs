//! Main entry point for the Midora CLI.

use clap::{Parser, Subcommand};
use clap_complete::shells::Shell;
use dotenv::dotenv;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

/// Midora CLI
#[derive(Parser)]
#[command(name = "midora")]
#[command(about = "Terminal client for the Midora chat service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Subcommands for the Midora CLI
#[derive(Subcommand)]
enum Commands {
    /// Manage the sign-in session
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },

    /// List conversations, view history, and send messages
    Chat {
        #[command(subcommand)]
        command: ChatCommands,
    },

    /// Follow realtime events for the signed-in user
    Follow(commands::follow::FollowArgs),

    /// Generate a configuration file with the built-in defaults
    Config {
        /// Output path (defaults to midora.toml)
        #[arg(long, short)]
        path: Option<PathBuf>,
    },

    /// Generate shell completion scripts for the CLI
    Completion {
        /// The shell type for which to generate the completion script
        #[arg(long, short)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum SessionCommands {
    /// Sign in with email and password
    Login(commands::session::LoginArgs),
    /// Show the signed-in user
    Me(commands::session::MeArgs),
    /// Rotate the token pair
    Refresh(commands::session::RefreshArgs),
    /// Sign out and clear local tokens
    Logout(commands::session::LogoutArgs),
}

#[derive(Subcommand)]
enum ChatCommands {
    /// List conversations
    List(commands::chat::ListArgs),
    /// Show a conversation's message history
    History(commands::chat::HistoryArgs),
    /// Send a message and stream the assistant response
    Send(commands::chat::SendArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Session { command } => match command {
            SessionCommands::Login(args) => commands::session::login(args).await?,
            SessionCommands::Me(args) => commands::session::me(args).await?,
            SessionCommands::Refresh(args) => commands::session::refresh(args).await?,
            SessionCommands::Logout(args) => commands::session::logout(args).await?,
        },
        Commands::Chat { command } => match command {
            ChatCommands::List(args) => commands::chat::list(args).await?,
            ChatCommands::History(args) => commands::chat::history(args).await?,
            ChatCommands::Send(args) => commands::chat::send(args).await?,
        },
        Commands::Follow(args) => commands::follow::follow(args).await?,
        Commands::Config { path } => commands::config::generate_config(path)?,
        Commands::Completion { shell } => commands::completion::generate_completion(shell),
    }

    Ok(())
}
