use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "folio",
    about = "folio: hierarchical front-matter entry store",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Settings file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Entries root; overrides the settings file
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Disable the fetch cache for this invocation
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a new entry
    Create(CreateArgs),
    /// Merge fields into an existing entry
    Update(UpdateArgs),
    /// Delete an entry and its descendants
    Delete(IdArgs),
    /// Check whether an entry exists
    Has(IdArgs),
    /// Copy an entry subtree
    Copy(RelocateArgs),
    /// Move an entry subtree
    Move(RelocateArgs),
    /// Fetch an entry or its descendants
    Fetch(FetchArgs),
    /// Print the cache fingerprint of an entry
    CacheId(IdArgs),
    /// Print the effective settings as TOML
    Config,
}

#[derive(Args)]
pub struct IdArgs {
    pub id: String,
}

#[derive(Args)]
pub struct CreateArgs {
    pub id: String,
    /// Field as `key=value`; the value is read as a YAML scalar
    #[arg(short, long = "field", value_name = "KEY=VALUE")]
    pub fields: Vec<String>,
    /// Document body
    #[arg(long)]
    pub body: Option<String>,
}

#[derive(Args)]
pub struct UpdateArgs {
    pub id: String,
    #[arg(short, long = "field", value_name = "KEY=VALUE", required = true)]
    pub fields: Vec<String>,
}

#[derive(Args)]
pub struct RelocateArgs {
    pub id: String,
    pub new_id: String,
}

#[derive(Args)]
pub struct FetchArgs {
    pub id: String,
    /// Fetch descendant entries instead of the entry itself
    #[arg(long)]
    pub collection: bool,
    /// With --collection, include all descendants
    #[arg(long, requires = "collection")]
    pub recursive: bool,
    /// Order the collection by a dotted field path
    #[arg(long, value_name = "FIELD", requires = "collection")]
    pub sort_by: Option<String>,
    /// Reverse the collection order
    #[arg(long, requires = "collection")]
    pub desc: bool,
    /// Skip this many entries
    #[arg(long, requires = "collection")]
    pub offset: Option<usize>,
    /// Keep at most this many entries
    #[arg(long, requires = "collection")]
    pub limit: Option<usize>,
}
