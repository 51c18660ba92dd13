use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use declarative::DesiredState;

use crate::config::{ConnectionConfig, ENV_API_KEY, ENV_API_SECRET, ENV_URL};

#[derive(Parser)]
#[command(name = "opnsync")]
#[command(version)]
#[command(about = "Declarative sync of firewall aliases, DNS-over-TLS forwards and shaper queues", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Manifest holding connection settings and groups
    #[arg(short, long, global = true, env = "OPNSYNC_MANIFEST")]
    pub manifest: Option<String>,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Reconcile every group of a manifest
    Sync(SyncArgs),

    /// Reconcile a single resource
    Apply(ApplyArgs),

    /// Print existing resources of a kind as JSON
    List(ListArgs),

    /// Show supported resource kinds and their fields
    Kinds,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Connection
// ============================================================================

#[derive(Args)]
pub struct ConnectionArgs {
    /// Firewall API base URL, e.g. https://fw.example/api
    #[arg(long, global = true, env = ENV_URL)]
    pub url: Option<String>,

    /// API key
    #[arg(long, global = true, env = ENV_API_KEY, hide_env_values = true)]
    pub api_key: Option<String>,

    /// API secret
    #[arg(long, global = true, env = ENV_API_SECRET, hide_env_values = true)]
    pub api_secret: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Skip TLS certificate verification
    #[arg(long, global = true)]
    pub insecure: bool,
}

impl ConnectionArgs {
    /// Command-line values as a config layer
    pub fn to_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            base_url: self.url.clone(),
            api_key: self.api_key.clone(),
            api_secret: self.api_secret.clone(),
            api_credential_file: None,
            timeout_secs: self.timeout,
            ssl_verify: self.insecure.then_some(false),
        }
    }
}

// ============================================================================
// Sync
// ============================================================================

#[derive(Args)]
pub struct SyncArgs {
    /// Manifest to sync (defaults to --manifest or ~/.config/opnsync/manifest.toml)
    #[arg(value_name = "MANIFEST")]
    pub path: Option<String>,

    /// Only sync a kind or one entry by exact name, e.g. "alias" or "alias.web_servers"
    #[arg(short, long)]
    pub only: Option<String>,

    /// Dry run - show what would be done
    #[arg(short, long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Log the full diff of every changed entry
    #[arg(long)]
    pub debug: bool,
}

// ============================================================================
// Apply
// ============================================================================

#[derive(Args)]
pub struct ApplyArgs {
    /// Resource kind
    #[arg(value_enum)]
    pub kind: KindArg,

    /// Field value as key=value; repeat a key to build a list
    #[arg(short, long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,

    /// Desired presence of the resource
    #[arg(long, value_enum, default_value = "present")]
    pub state: StateArg,

    /// Reload the service if anything changed
    #[arg(long)]
    pub reload: bool,

    /// Dry run - show what would be done
    #[arg(short, long)]
    pub dry_run: bool,

    /// Log the full diff when the resource changes
    #[arg(long)]
    pub debug: bool,
}

// ============================================================================
// List
// ============================================================================

#[derive(Args)]
pub struct ListArgs {
    /// Resource kind
    #[arg(value_enum)]
    pub kind: KindArg,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum KindArg {
    #[value(name = "alias")]
    Alias,
    #[value(name = "unbound_dot")]
    UnboundDot,
    #[value(name = "shaper_queue")]
    ShaperQueue,
}

impl KindArg {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Alias => "alias",
            Self::UnboundDot => "unbound_dot",
            Self::ShaperQueue => "shaper_queue",
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum StateArg {
    Present,
    Absent,
    Unset,
}

impl From<StateArg> for DesiredState {
    fn from(state: StateArg) -> Self {
        match state {
            StateArg::Present => Self::Present,
            StateArg::Absent => Self::Absent,
            StateArg::Unset => Self::Unset,
        }
    }
}
