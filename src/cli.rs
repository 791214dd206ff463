use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "pom-class-finder")]
#[command(about = "Resolve a Maven project's dependencies and show any Java class they contain")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Local Maven repository (default: settings.xml localRepository, then ~/.m2/repository)
    #[arg(long, value_name = "PATH", global = true)]
    pub m2: Option<PathBuf>,

    #[arg(long, value_name = "FILE", global = true)]
    pub db: Option<PathBuf>,

    /// Skip the persistent cache; in-process caches only.
    #[arg(long, global = true)]
    pub no_store: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Find a class among the dependencies of a project descriptor.
    Find {
        class_name: String,

        #[arg(long, value_name = "FILE")]
        pom: PathBuf,

        #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        #[arg(short = 'o', long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Print the resolved dependency list.
    Resolve {
        #[arg(long, value_name = "FILE")]
        pom: PathBuf,

        #[arg(long)]
        no_transitive: bool,

        /// Scopes to keep; repeatable (default: compile, runtime).
        #[arg(long = "scope", value_name = "SCOPE")]
        scopes: Vec<String>,

        #[arg(long, value_name = "N", default_value_t = 10)]
        max_depth: u32,
    },
    /// List classes in a jar matching a glob (`*`, `?`).
    Search {
        jar_path: PathBuf,
        pattern: String,
    },
    /// Extract one class from a jar, preferring a sources jar when given.
    Extract {
        class_name: String,

        #[arg(long, value_name = "FILE")]
        jar: PathBuf,

        #[arg(long, value_name = "FILE")]
        sources: Option<PathBuf>,

        #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
    /// Answer JSON-lines tool calls from stdin.
    Serve,
    Stats,
    Clear,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
    Code,
}
