use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use xgroup_sdk::{KeyMatch, MergePolicy};

#[derive(Parser)]
#[command(
    name = "xgroup",
    about = "Group and merge repeated XML records by key",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    #[value(name = "merge-append-all", alias = "append-all")]
    AppendAll,
    #[value(name = "merge-first-wins", alias = "first-wins")]
    FirstWins,
}

impl From<PolicyArg> for MergePolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::AppendAll => MergePolicy::AppendAll,
            PolicyArg::FirstWins => MergePolicy::FirstWins,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum KeyMatchArg {
    Exact,
    CaseInsensitive,
    Numeric,
}

impl From<KeyMatchArg> for KeyMatch {
    fn from(arg: KeyMatchArg) -> Self {
        match arg {
            KeyMatchArg::Exact => KeyMatch::Exact,
            KeyMatchArg::CaseInsensitive => KeyMatch::CaseInsensitive,
            KeyMatchArg::Numeric => KeyMatch::Numeric,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum PresetArg {
    EmployeeImport,
}

#[derive(Subcommand)]
pub enum Command {
    /// List tags that repeat under a common parent
    Tags(TagsArgs),
    /// List child fields of the first element with a tag
    Fields(FieldsArgs),
    /// List child tags found under every element with a tag
    Children(ChildrenArgs),
    /// Merge repeated elements that share a key
    Merge(MergeArgs),
    /// Remove elements without text or children
    Prune(PruneArgs),
}

#[derive(Args)]
pub struct TagsArgs {
    /// Input file, or `-` for stdin
    pub input: String,
    /// Show every parent a tag repeats under
    #[arg(long)]
    pub sites: bool,
}

#[derive(Args)]
pub struct FieldsArgs {
    pub input: String,
    #[arg(short, long)]
    pub tag: String,
    /// Only fields with text, with a sample value
    #[arg(long)]
    pub keys_only: bool,
}

#[derive(Args)]
pub struct ChildrenArgs {
    pub input: String,
    #[arg(short, long)]
    pub tag: String,
}

#[derive(Args)]
pub struct MergeArgs {
    pub input: String,
    /// Tag to merge; every repeating tag when omitted
    #[arg(short, long)]
    pub tag: Option<String>,
    /// Child tag holding the grouping key
    #[arg(short, long)]
    pub key: Option<String>,
    /// Donor child tag to carry over (repeatable)
    #[arg(long = "allow")]
    pub allow: Vec<String>,
    #[arg(long)]
    pub policy: Option<PolicyArg>,
    #[arg(long)]
    pub key_match: Option<KeyMatchArg>,
    /// TOML file with merge settings; flags override it
    #[arg(long, conflicts_with = "preset")]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub preset: Option<PresetArg>,
    /// Remove empty elements after merging
    #[arg(long)]
    pub prune: bool,
    #[arg(long)]
    pub compact: bool,
    #[arg(long)]
    pub no_declaration: bool,
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct PruneArgs {
    pub input: String,
    #[arg(long)]
    pub compact: bool,
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
