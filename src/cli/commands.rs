use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "arbor", about = concat!("[>] arbor v", env!("CARGO_PKG_VERSION"), " - nested tasks, encrypted backups"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Data directory (default: $XDG_DATA_HOME/arbor)
    #[arg(long, global = true, env = "ARBOR_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage projects
    Project(ProjectCmd),
    /// Add a task to the current project
    Add(AddArgs),
    /// Add a subtask
    Sub(SubArgs),
    /// List tasks of the current project as a tree
    List(ListArgs),
    /// Show task details
    Show(IdArg),
    /// Set task status (todo, in-progress, done)
    Status(StatusArgs),
    /// Start a task (shortcut for status <ID> in-progress)
    Start(IdArg),
    /// Mark a task done (shortcut for status <ID> done)
    Done(IdArg),
    /// Mark every subtask of a task done
    CompleteAll(IdArg),
    /// Change task title
    Title(TitleArgs),
    /// Add or remove a task tag
    Tag(TagArgs),
    /// Delete a task and its subtasks
    Rm(IdArg),
    /// Delete root tasks by status (all, todo, in-progress, done)
    Clear(ClearArgs),
    /// Show tag usage in the current project
    Tags,
    /// Show or change the saved task filters
    Filter(FilterArgs),
    /// Write an encrypted backup
    Export(ExportArgs),
    /// Restore from an encrypted backup, replacing all data
    Import(ImportArgs),
    /// Read or change settings in config.toml
    Config(ConfigCmd),
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ProjectCmd {
    #[command(subcommand)]
    pub action: Option<ProjectAction>,
}

#[derive(Subcommand)]
pub enum ProjectAction {
    /// List projects (default)
    List(ProjectListArgs),
    /// Create a project and switch to it
    Add(ProjectAddArgs),
    /// Delete a project with all of its tasks
    Rm(ProjectIdArg),
    /// Switch the current project
    Use(ProjectIdArg),
    /// Edit project name, description or color
    Edit(ProjectEditArgs),
    /// Add or remove a project tag
    Tag(ProjectTagArgs),
    /// Show or change the current project's task tag vocabulary
    Vocab(VocabArgs),
}

#[derive(Args, Default)]
pub struct ProjectListArgs {
    /// Match name or description (case-insensitive)
    #[arg(long)]
    pub search: Option<String>,
    /// Only projects with any of these tags (repeatable)
    #[arg(long)]
    pub tag: Vec<String>,
    /// all, active or completed
    #[arg(long)]
    pub status: Option<String>,
    /// Save these filters for later listings
    #[arg(long)]
    pub save: bool,
    /// Clear saved project filters
    #[arg(long)]
    pub clear: bool,
}

#[derive(Args)]
pub struct ProjectAddArgs {
    /// Project name
    pub name: String,
    /// Short description
    #[arg(long)]
    pub description: Option<String>,
    /// Hex color (default: random from the palette)
    #[arg(long)]
    pub color: Option<String>,
    /// Project tag (repeatable)
    #[arg(long)]
    pub tag: Vec<String>,
}

#[derive(Args)]
pub struct ProjectIdArg {
    /// Project ID or unique prefix
    pub id: String,
}

#[derive(Args)]
pub struct ProjectEditArgs {
    /// Project ID or unique prefix
    pub id: String,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub color: Option<String>,
}

#[derive(Args)]
pub struct ProjectTagArgs {
    /// Action: "add" or "rm"
    pub action: String,
    /// Project ID or unique prefix
    pub id: String,
    /// Tag name
    pub tag: String,
}

#[derive(Args)]
pub struct VocabArgs {
    /// Action: "add" or "rm" (omit to list)
    pub action: Option<String>,
    /// Tag name
    pub tag: Option<String>,
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct AddArgs {
    /// Task title
    pub title: String,
    /// Tag (repeatable)
    #[arg(long)]
    pub tag: Vec<String>,
    /// Parent task ID or unique prefix
    #[arg(long)]
    pub parent: Option<String>,
}

#[derive(Args)]
pub struct SubArgs {
    /// Parent task ID
    pub id: String,
    /// Subtask title
    pub title: String,
    /// Tag (repeatable)
    #[arg(long)]
    pub tag: Vec<String>,
}

#[derive(Args, Default)]
pub struct ListArgs {
    /// Keep only these statuses (repeatable)
    #[arg(long)]
    pub status: Vec<String>,
    /// Keep tasks sharing any of these tags (repeatable)
    #[arg(long)]
    pub tag: Vec<String>,
    /// Keep tasks without tags
    #[arg(long)]
    pub no_tag: bool,
    /// Case-insensitive title search
    #[arg(long)]
    pub search: Option<String>,
}

#[derive(Args)]
pub struct IdArg {
    /// Task ID or unique prefix
    pub id: String,
}

#[derive(Args)]
pub struct StatusArgs {
    /// Task ID
    pub id: String,
    /// New status (todo, in-progress, done)
    pub status: String,
}

#[derive(Args)]
pub struct TitleArgs {
    /// Task ID
    pub id: String,
    /// New title
    pub title: String,
}

#[derive(Args)]
pub struct TagArgs {
    /// Action: "add" or "rm"
    pub action: String,
    /// Task ID
    pub id: String,
    /// Tag name
    pub tag: String,
}

#[derive(Args)]
pub struct ClearArgs {
    /// all, todo, in-progress or done
    pub scope: String,
    /// Skip the confirmation summary
    #[arg(long, short)]
    pub yes: bool,
}

#[derive(Args)]
pub struct FilterArgs {
    /// Statuses to show (repeatable)
    #[arg(long)]
    pub status: Vec<String>,
    /// Tags to show (repeatable)
    #[arg(long)]
    pub tag: Vec<String>,
    /// Include tasks without tags
    #[arg(long)]
    pub no_tag: bool,
    /// Title search
    #[arg(long)]
    pub search: Option<String>,
    /// Restore the default filters
    #[arg(long)]
    pub reset: bool,
}

// ---------------------------------------------------------------------------
// Backup
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ExportArgs {
    /// Output file (default: ./arbor-backup-<date>.encrypted)
    pub path: Option<PathBuf>,
    /// Backup password (at least 6 characters, a letter and a digit)
    #[arg(long, env = "ARBOR_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(Args)]
pub struct ImportArgs {
    /// Backup file to restore
    pub path: PathBuf,
    /// Backup password
    #[arg(long, env = "ARBOR_PASSWORD", hide_env_values = true)]
    pub password: String,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ConfigCmd {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print a setting (e.g. storage.debounce_ms)
    Get(ConfigGetArgs),
    /// Change a setting, keeping comments in config.toml
    Set(ConfigSetArgs),
}

#[derive(Args)]
pub struct ConfigGetArgs {
    pub key: String,
}

#[derive(Args)]
pub struct ConfigSetArgs {
    pub key: String,
    /// New value; lists are comma-separated
    pub value: String,
}
