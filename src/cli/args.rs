//! CLI argument parsing using clap.
//!
//! Contains the Cli struct and Commands enum.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

const QUICK_START: &str = "Quick Start:
  $ export GOOGLE_API_KEY=...                # or put it in a .env file
  $ pdfchat process report.pdf appendix.pdf  # build the index
  $ pdfchat ask \"What does the report conclude?\"
  $ pdfchat serve                            # open the page in a browser";

/// Ask questions about PDF documents
#[derive(Parser)]
#[command(
    name = "pdfchat",
    version = env!("CARGO_PKG_VERSION"),
    about = "Ask questions about PDF documents",
    long_about = "Index PDF documents and answer questions from their content with a hosted LLM.",
    next_line_help = true,
    styles = clap_cargo_style(),
    after_help = QUICK_START
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Initialize project
    #[command(about = "Set up .pdfchat directory with default configuration")]
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show current configuration settings
    #[command(about = "Display active settings")]
    Config,

    /// Serve the question page
    #[command(
        about = "Start the web page",
        after_help = "Examples:\n  pdfchat serve\n  pdfchat serve --bind 0.0.0.0:8501"
    )]
    Serve {
        /// Bind address (overrides server.bind)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Replace the index with the given PDF files
    #[command(about = "Extract, chunk and index PDF files (replaces the current index)")]
    Process {
        /// PDF files to index
        #[arg(value_name = "PDF", required = true)]
        paths: Vec<PathBuf>,

        /// Disable the progress spinner
        #[arg(long)]
        no_progress: bool,
    },

    /// Ask a question about the processed documents
    #[command(
        about = "Answer a question from the indexed documents",
        after_help = "Examples:\n  pdfchat ask What is the capital of France?\n  pdfchat ask \"Summarize section 2\" --json"
    )]
    Ask {
        /// The question; multiple words are joined with spaces
        #[arg(value_name = "QUESTION", required = true)]
        question: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the active index
    #[command(about = "Show the model, size and age of the active index")]
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_ask_joins_words() {
        let cli = Cli::parse_from(["pdfchat", "ask", "What", "is", "it?", "--json"]);
        match cli.command {
            Commands::Ask { question, json } => {
                assert_eq!(question.join(" "), "What is it?");
                assert!(json);
            }
            _ => panic!("expected ask"),
        }
    }

    #[test]
    fn test_process_requires_files() {
        assert!(Cli::try_parse_from(["pdfchat", "process"]).is_err());
        let cli = Cli::parse_from(["pdfchat", "--config", "alt.toml", "process", "a.pdf", "b.pdf"]);
        assert_eq!(cli.config, Some(PathBuf::from("alt.toml")));
        match cli.command {
            Commands::Process { paths, no_progress } => {
                assert_eq!(paths.len(), 2);
                assert!(!no_progress);
            }
            _ => panic!("expected process"),
        }
    }
}
