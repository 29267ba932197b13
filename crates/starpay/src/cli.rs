//! Clap derive structures for the `starpay` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// starpay -- administer Starpay alerting from the command line
#[derive(Debug, Parser)]
#[command(
    name = "starpay",
    version,
    about = "Manage Starpay alert accounts, receivers, and alert history",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// API base URL (overrides config and STARPAY_BASE_URL)
    #[arg(long, short = 'u', global = true)]
    pub base_url: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "STARPAY_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Request timeout in milliseconds (overrides config)
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in and store the session
    Login(LoginArgs),

    /// Clear the stored session
    Logout,

    /// Show the current session
    Whoami,

    /// Manage operator accounts
    #[command(alias = "acc")]
    Accounts(AccountsArgs),

    /// Manage alert receivers
    #[command(alias = "recv")]
    Receivers(ReceiversArgs),

    /// Browse alert history
    #[command(alias = "history")]
    Alerts(AlertsArgs),

    /// Manage the configuration file
    Config(ConfigArgs),
}

// ── Session ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Username (prompted if omitted)
    #[arg(long, short = 'n')]
    pub username: Option<String>,

    /// Read the password from the first line of stdin
    #[arg(long)]
    pub password_stdin: bool,
}

// ── Paging ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Args)]
pub struct PageArgs {
    /// Page number (1-based)
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
    pub page: u32,

    /// Rows per page (defaults to the configured page size)
    #[arg(long, short = 'l', value_parser = clap::value_parser!(u32).range(1..))]
    pub limit: Option<u32>,
}

// ── Accounts ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct AccountsArgs {
    #[command(subcommand)]
    pub command: AccountsCommand,
}

#[derive(Debug, Subcommand)]
pub enum AccountsCommand {
    /// List accounts
    #[command(alias = "ls")]
    List(PageArgs),

    /// Create an account
    Create {
        /// Login name
        #[arg(long)]
        username: String,

        /// Role, e.g. admin or viewer
        #[arg(long)]
        role: String,

        /// Read the new password from the first line of stdin
        #[arg(long)]
        password_stdin: bool,
    },

    /// Update an account
    Update {
        /// Account ID
        id: String,

        #[arg(long)]
        username: String,

        #[arg(long)]
        role: String,

        /// Whether the account may sign in
        #[arg(long, action = clap::ArgAction::Set, default_value = "true")]
        active: bool,
    },

    /// Delete an account
    #[command(alias = "rm")]
    Delete {
        /// Account ID
        id: String,
    },
}

// ── Alert receivers ──────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ReceiversArgs {
    #[command(subcommand)]
    pub command: ReceiversCommand,
}

#[derive(Debug, Clone, Args)]
pub struct ReceiverFields {
    /// Notification email
    #[arg(long)]
    pub email: String,

    /// Notification phone number
    #[arg(long)]
    pub phone: String,

    /// Escalation level this receiver handles
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub level: u32,
}

#[derive(Debug, Subcommand)]
pub enum ReceiversCommand {
    /// List alert receivers
    #[command(alias = "ls")]
    List(PageArgs),

    /// Add an alert receiver
    Create(ReceiverFields),

    /// Update an alert receiver
    Update {
        /// Receiver ID
        id: String,

        #[command(flatten)]
        fields: ReceiverFields,
    },

    /// Remove an alert receiver
    #[command(alias = "rm")]
    Delete {
        /// Receiver ID
        id: String,
    },
}

// ── Alert history ────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct AlertsArgs {
    #[command(subcommand)]
    pub command: AlertsCommand,
}

#[derive(Debug, Subcommand)]
pub enum AlertsCommand {
    /// List fired alerts
    #[command(alias = "ls")]
    List(PageArgs),
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Interactive setup
    Init,

    /// Print the effective configuration
    Show,

    /// Print the config file location
    Path,

    /// Set a single value
    Set {
        /// One of: base_url, page_size, session_file, timeout_ms
        key: String,
        value: String,
    },
}
