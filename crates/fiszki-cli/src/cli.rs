use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use fiszki_core::SyncMode;

#[derive(Parser)]
#[command(name = "fiszki")]
#[command(about = "Local-first flashcards with optional cloud sync")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Optional directory for sync state (mode, queue, id mappings)
    #[arg(long, global = true, value_name = "DIR")]
    pub state_dir: Option<PathBuf>,

    /// CLI profile name
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage categories
    #[command(alias = "cat")]
    Category {
        #[command(subcommand)]
        command: CategoryCommands,
    },
    /// Manage word pairs
    Word {
        #[command(subcommand)]
        command: WordCommands,
    },
    /// Export a category with its words as JSON
    Export {
        /// Category ID, unique ID prefix or name
        category: String,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Import a category from an export file
    Import {
        /// Export file (stdin when omitted)
        path: Option<PathBuf>,
    },
    /// Show category and word totals
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Synchronize with the cloud (runs a full sync without a subcommand)
    Sync {
        #[command(subcommand)]
        command: Option<SyncCommands>,
    },
    /// Authenticate CLI profile with Supabase
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// Configure CLI profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum SyncModeArg {
    Auto,
    Manual,
    OfflineOnly,
}

impl From<SyncModeArg> for SyncMode {
    fn from(value: SyncModeArg) -> Self {
        match value {
            SyncModeArg::Auto => Self::Auto,
            SyncModeArg::Manual => Self::Manual,
            SyncModeArg::OfflineOnly => Self::OfflineOnly,
        }
    }
}

#[derive(Subcommand)]
pub enum CategoryCommands {
    /// Create a category
    #[command(alias = "new")]
    Add {
        /// Category name
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
        /// Name of the first language
        #[arg(long, value_name = "NAME")]
        lang1: Option<String>,
        /// Name of the second language
        #[arg(long, value_name = "NAME")]
        lang2: Option<String>,
    },
    /// List categories
    #[command(alias = "ls")]
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one category
    Show {
        /// Category ID, unique ID prefix or name
        category: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Rename or re-describe a category
    Update {
        /// Category ID, unique ID prefix or name
        category: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long, value_name = "NAME")]
        lang1: Option<String>,
        #[arg(long, value_name = "NAME")]
        lang2: Option<String>,
    },
    /// Delete a category and its words
    #[command(alias = "rm")]
    Delete {
        /// Category ID, unique ID prefix or name
        category: String,
    },
}

#[derive(Subcommand)]
pub enum WordCommands {
    /// Add a word pair to a category
    Add {
        /// Category ID, unique ID prefix or name
        category: String,
        /// Term in the first language
        word1: String,
        /// Term in the second language
        word2: String,
        #[arg(long, value_name = "TEXT", default_value = "")]
        pron1: String,
        #[arg(long, value_name = "TEXT", default_value = "")]
        pron2: String,
    },
    /// List the word pairs of a category
    #[command(alias = "ls")]
    List {
        /// Category ID, unique ID prefix or name
        category: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a word pair
    #[command(alias = "rm")]
    Delete {
        /// Word pair ID
        id: String,
    },
    /// Import word pairs from `word1 | word2` or `word1 | pron1 | word2 | pron2` lines
    Import {
        /// Category ID, unique ID prefix or name
        category: String,
        /// Input file (stdin when omitted)
        #[arg(short, long, value_name = "PATH")]
        file: Option<PathBuf>,
    },
    /// Delete every word pair of a category
    Clear {
        /// Category ID, unique ID prefix or name
        category: String,
    },
}

#[derive(Subcommand)]
pub enum SyncCommands {
    /// Drain pending operations and mirror the cloud data locally
    Run,
    /// Show connectivity, mode and queue length
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show or change the sync mode
    Mode {
        #[arg(value_enum)]
        mode: Option<SyncModeArg>,
    },
    /// Replay pending operations without the full resync
    Drain,
    /// List pending operations
    Queue {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Discard every pending operation
    ClearQueue,
    /// Keep syncing in the foreground until interrupted
    Watch {
        /// Seconds between sync passes (profile setting when omitted)
        #[arg(long, value_name = "SECS")]
        interval: Option<u64>,
    },
    /// Upload all local categories and words to the cloud
    Migrate,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update profile config
    Init {
        /// Profile name to initialize
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// Supabase project URL
        #[arg(long, value_name = "URL")]
        supabase_url: Option<String>,
        /// Supabase anon/public key
        #[arg(long, value_name = "KEY")]
        supabase_anon_key: Option<String>,
        /// Initial sync mode
        #[arg(long, value_enum)]
        sync_mode: Option<SyncModeArg>,
        /// Seconds between automatic sync passes
        #[arg(long, value_name = "SECS")]
        auto_sync_interval: Option<u64>,
        /// Keep current active profile instead of activating this one
        #[arg(long)]
        no_activate: bool,
    },
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Login with Supabase email/password and store session in keychain
    Login {
        /// Supabase account email
        #[arg(long, value_name = "EMAIL")]
        email: String,
        /// Supabase account password
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Create a Supabase account
    Signup {
        /// Account email
        #[arg(long, value_name = "EMAIL")]
        email: String,
        /// Account password
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Show auth status for profile
    Status,
    /// Logout profile and clear stored session
    Logout,
}
