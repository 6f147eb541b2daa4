//! Command-line surface for the `mindraxia` binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use mindraxia_core::model::author::AuthorRole;

/// mindraxia - a markdown blog engine with cross-post references
#[derive(Debug, Parser)]
#[command(name = "mindraxia")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to a configuration file (defaults to ./mindraxia.toml when present)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server
    Serve,

    /// Open the database and apply pending migrations
    Migrate,

    /// Render a markdown file without touching the database
    Render {
        /// Markdown source file
        file: PathBuf,

        /// Post slug used for anchor links
        #[arg(long)]
        slug: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = RenderFormat::Html)]
        format: RenderFormat,
    },

    /// Manage author accounts
    #[command(subcommand)]
    Author(AuthorCommand),

    /// Inspect configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Subcommand)]
pub enum AuthorCommand {
    /// Register an author and print their bearer token once
    Add {
        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        #[arg(long, value_enum, default_value_t = RoleArg::Editor)]
        role: RoleArg,
    },

    /// List registered authors
    List,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RenderFormat {
    Html,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RoleArg {
    Admin,
    Editor,
}

impl From<RoleArg> for AuthorRole {
    fn from(value: RoleArg) -> Self {
        match value {
            RoleArg::Admin => AuthorRole::Admin,
            RoleArg::Editor => AuthorRole::Editor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
        assert_eq!(Cli::command().get_name(), "mindraxia");
    }

    #[test]
    fn author_add_defaults_to_editor() {
        let cli = Cli::parse_from([
            "mindraxia",
            "author",
            "add",
            "--name",
            "Ada",
            "--email",
            "ada@example.org",
        ]);
        match cli.command {
            Command::Author(AuthorCommand::Add { name, role, .. }) => {
                assert_eq!(name, "Ada");
                assert_eq!(AuthorRole::from(role), AuthorRole::Editor);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::parse_from([
            "mindraxia",
            "render",
            "notes.md",
            "--config",
            "site.toml",
            "--format",
            "json",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("site.toml")));
        match cli.command {
            Command::Render { file, slug, format } => {
                assert_eq!(file, PathBuf::from("notes.md"));
                assert_eq!(slug, None);
                assert_eq!(format, RenderFormat::Json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
