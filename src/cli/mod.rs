//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "replybot",
    version,
    about = "Messaging webhook bot answering from a phrase corpus with a generation fallback",
    long_about = "Replybot receives chat webhooks, matches each message against a corpus of \
                  greetings and questions by embedding similarity, and replies with the stored \
                  answer. Messages without a close match are answered by a text-generation model."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/replybot/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration profile to apply
    #[arg(short, long, global = true)]
    pub profile: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the webhook server in the foreground
    Serve,

    /// Answer one utterance locally, without the messaging platform
    Ask {
        /// Utterance to answer
        utterance: String,

        /// Print the resolution only, never call the generation model
        #[arg(long)]
        no_generate: bool,

        /// Show the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect the phrase corpus
    Corpus {
        #[command(subcommand)]
        action: CorpusAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum CorpusAction {
    /// Load the corpus from its store and print it
    Show {
        /// Show entries as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,

    /// Validate a configuration file
    Validate {
        /// Config file to validate (defaults to the global config)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Write a default configuration and sample corpus
    Init {
        /// Overwrite existing files
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
