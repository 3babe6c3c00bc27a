use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "planner")]
#[command(version)]
#[command(about = "Log notes and let an LLM turn them into actions, todos and curiosities")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a new note
    Write {
        /// Note text; words are joined with spaces
        #[arg(required = true, num_args = 1..)]
        words: Vec<String>,
    },

    /// Process queued notes
    Cycle(CycleArgs),

    /// Show stored records
    Read(ReadArgs),

    /// Delete all derived records and mark every note unprocessed
    Strip {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Write { .. } => "write",
            Self::Cycle(_) => "cycle",
            Self::Read(_) => "read",
            Self::Strip { .. } => "strip",
        }
    }
}

#[derive(Args, Debug, Default)]
pub struct CycleArgs {
    /// Process until no work is left
    #[arg(long, group = "mode")]
    pub all: bool,

    /// Keep polling for new work
    #[arg(long, group = "mode")]
    pub continuous: bool,

    /// Run exactly N cycles
    #[arg(long, value_name = "N", group = "mode")]
    pub iterations: Option<usize>,

    /// Delay between idle polls with --continuous
    #[arg(long, default_value_t = 5, requires = "continuous")]
    pub interval_secs: u64,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum RecordKind {
    Note,
    Todo,
    Action,
    Curiosity,
    /// Notes annotated as observations
    Observation,
}

#[derive(Args, Debug)]
pub struct ReadArgs {
    pub kind: RecordKind,

    /// Substring filter on the record text
    #[arg(short, long)]
    pub search: Option<String>,

    #[arg(short, long, default_value_t = 20)]
    pub limit: u32,

    /// Only records before this time (YYYY-MM-DD HH:MM:SS)
    #[arg(long)]
    pub before: Option<String>,

    /// Only records after this time (YYYY-MM-DD HH:MM:SS)
    #[arg(long)]
    pub after: Option<String>,

    /// Todos only: neither complete nor cancelled
    #[arg(long, group = "todo_status")]
    pub incomplete_only: bool,

    /// Todos only: complete
    #[arg(long, group = "todo_status")]
    pub complete_only: bool,

    /// Todos only: cancelled
    #[arg(long, group = "todo_status")]
    pub cancelled_only: bool,
}
