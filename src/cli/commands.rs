//! CLI command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "annotask")]
#[command(about = "Schema-driven text annotation toolkit", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (default: $ANNOTASK_CONFIG, then ./annotask.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log decoding details to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Summarize the tag types declared in a schema
    Schema {
        /// Declaration file
        path: PathBuf,
    },

    /// List the tags of an annotated document
    Inspect {
        /// Declaration file of the task
        #[arg(short, long)]
        schema: PathBuf,

        /// Annotated document
        document: PathBuf,
    },

    /// Validate documents against a schema
    Check {
        /// Declaration file of the task
        #[arg(short, long)]
        schema: PathBuf,

        /// Documents or directories to scan
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Re-encode a document in canonical form
    Normalize {
        /// Declaration file of the task
        #[arg(short, long)]
        schema: PathBuf,

        /// Annotated document
        document: PathBuf,

        /// Where to write the result (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_check_with_global_flags() {
        let cli = Cli::try_parse_from([
            "annotask",
            "check",
            "--schema",
            "task.dtd",
            "a.xml",
            "docs",
            "--verbose",
            "--config",
            "custom.toml",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        match cli.command {
            Commands::Check { schema, paths } => {
                assert_eq!(schema, PathBuf::from("task.dtd"));
                assert_eq!(paths, vec![PathBuf::from("a.xml"), PathBuf::from("docs")]);
            }
            other => panic!("Expected check command, got {:?}", other),
        }
    }

    #[test]
    fn test_check_requires_paths() {
        assert!(Cli::try_parse_from(["annotask", "check", "--schema", "task.dtd"]).is_err());
    }
}
