use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "crepo",
    about = "crepo: versioned object and collection repository",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Client configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the create/version/delete walkthrough against a fresh repository
    Demo,
    /// Execute repository commands, one per line
    Shell(ShellArgs),
}

#[derive(Args)]
pub struct ShellArgs {
    /// Read commands from this file instead of stdin
    #[arg(long)]
    pub script: Option<PathBuf>,
}

/// One line of shell input.
#[derive(Parser, Debug)]
#[command(name = "crepo>", no_binary_name = true, disable_version_flag = true)]
pub struct ShellLine {
    #[command(subcommand)]
    pub command: ShellCommand,
}

#[derive(Subcommand, Debug)]
pub enum ShellCommand {
    /// Switch to a bucket, creating it with --create; list buckets without a name
    Bucket {
        name: Option<String>,
        #[arg(long)]
        create: bool,
    },
    /// Store a new version of an object, creating the key if needed
    Put(PutArgs),
    /// Store a new version of an existing object
    Version(PutArgs),
    /// Show object metadata by ordinal or tag (latest if neither)
    Get {
        key: String,
        number: Option<u32>,
        #[arg(long)]
        tag: Option<String>,
    },
    /// Print object content by ordinal (latest if omitted)
    Cat { key: String, number: Option<u32> },
    /// Show the newest live version of an object
    Latest { key: String },
    /// Show every version of an object, deleted ones included
    Versions { key: String },
    /// Soft-delete an object version (latest live one if no ordinal)
    Delete {
        key: String,
        number: Option<u32>,
        #[arg(long)]
        collection: bool,
    },
    /// List versions in the current bucket
    Ls(LsArgs),
    /// Store a new collection version over KEY or KEY#N members
    ///
    /// A trailing `#N` with N all digits pins ordinal N; a key that itself
    /// ends in `#<digits>` needs an explicit ordinal, as in `v#2#0`.
    Collect {
        key: String,
        members: Vec<String>,
        #[arg(long)]
        tag: Option<String>,
    },
    /// Show a collection version by ordinal (latest if omitted)
    Collection { key: String, number: Option<u32> },
    /// Show repository configuration and bucket counts
    Status,
}

#[derive(Args, Debug)]
pub struct PutArgs {
    pub key: String,
    /// Inline content, or a path with --file
    pub content: String,
    #[arg(long)]
    pub file: bool,
    #[arg(long = "type")]
    pub content_type: Option<String>,
    #[arg(long)]
    pub tag: Option<String>,
    #[arg(long)]
    pub meta: Option<String>,
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Args, Debug)]
pub struct LsArgs {
    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    pub offset: i64,
    #[arg(long, default_value = "20", allow_negative_numbers = true)]
    pub limit: i64,
    /// Include deleted versions
    #[arg(short, long)]
    pub all: bool,
    #[arg(long)]
    pub tag: Option<String>,
    /// List collections instead of objects
    #[arg(long)]
    pub collections: bool,
}
