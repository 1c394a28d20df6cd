//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "tamperscan",
    version,
    about = "Heuristic detection of tampering between document versions",
    long_about = "Tamperscan groups documents by the date they describe, compares every pair of \
                  versions within a group, checks each document for integrity problems and \
                  reports the discrepancies with severity and confidence."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/tamperscan/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Rule set file (overrides the config file and the built-in rules)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub rules: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze a JSON array of documents and print a tampering report
    Analyze {
        /// Path to the documents JSON file
        documents: PathBuf,

        /// Report format (defaults to the configured format)
        #[arg(short, long, value_parser = ["markdown", "json"])]
        format: Option<String>,

        /// Write the report to a file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Only list flags at or above this severity
        #[arg(long, value_name = "LEVEL", value_parser = ["low", "medium", "high", "critical"], default_value = "low")]
        min_severity: String,
    },

    /// Print the fingerprint extracted from a text file as JSON
    Fingerprint {
        /// Plain text file
        file: PathBuf,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration and rule set
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_analyze_args() {
        let cli = Cli::parse_from([
            "tamperscan",
            "analyze",
            "docs.json",
            "--format",
            "json",
            "--min-severity",
            "high",
        ]);
        match cli.command {
            Commands::Analyze {
                documents,
                format,
                output,
                min_severity,
            } => {
                assert_eq!(documents, PathBuf::from("docs.json"));
                assert_eq!(format.as_deref(), Some("json"));
                assert!(output.is_none());
                assert_eq!(min_severity, "high");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["tamperscan", "analyze", "d.json", "-f", "pdf"]).is_err());
    }
}
