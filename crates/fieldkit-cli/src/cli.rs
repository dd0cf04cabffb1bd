use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use fieldkit_core::models::{ChecklistPhase, EvidenceKind, Severity};

#[derive(Parser)]
#[command(name = "fieldkit")]
#[command(about = "Capture audit fieldwork offline and sync it when a connection returns")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to the local data directory
    #[arg(long, global = true, value_name = "PATH")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Work a review's checklist offline
    Checklist {
        #[command(subcommand)]
        command: ChecklistCommands,
    },
    /// Capture and manage field evidence
    Evidence {
        #[command(subcommand)]
        command: EvidenceCommands,
    },
    /// Draft findings in the field
    Finding {
        #[command(subcommand)]
        command: FindingCommands,
    },
    /// Track offline working sessions
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },
    /// Push queued local changes to the remote authority
    Sync {
        #[command(subcommand)]
        command: Option<SyncCommands>,
    },
    /// Prefetch a review's reference data for offline reading
    Cache {
        /// Review to cache
        review: String,
    },
    /// List reviews with cached offline data
    Cached {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Evict a review's cached offline data
    Uncache {
        /// Review to evict
        review: String,
    },
    /// Delete already-synced records older than a cutoff
    Cleanup {
        /// Age threshold in days
        #[arg(long, default_value = "30")]
        older_than_days: u32,
    },
    /// Export one review's local data as a standalone JSON backup
    Export {
        /// Review to export
        review: String,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Check whether this device is ready to go offline
    Preflight {
        /// Review to check readiness for
        review: String,
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

#[derive(Subcommand)]
pub enum ChecklistCommands {
    /// Create a review's checklist from the cached template
    Init {
        /// Review to initialize
        review: String,
    },
    /// Mark a checklist item done
    Complete {
        /// Checklist item ID
        id: String,
        /// Reviewer completing the item
        #[arg(long, value_name = "USER")]
        user: String,
        /// Optional reviewer notes
        #[arg(long)]
        notes: Option<String>,
    },
    /// Replace the reviewer notes on a checklist item
    Annotate {
        /// Checklist item ID
        id: String,
        /// Note text
        notes: String,
    },
    /// List a review's checklist items
    List {
        /// Review to list
        #[arg(long, value_name = "ID")]
        review: String,
        /// Only items of this phase
        #[arg(long, value_enum)]
        phase: Option<PhaseArg>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum EvidenceCommands {
    /// Capture an evidence file against a checklist item
    Add(EvidenceAddArgs),
    /// Delete an evidence record locally and remotely
    Delete {
        /// Evidence ID
        id: String,
    },
    /// List a review's evidence records
    List {
        /// Review to list
        #[arg(long, value_name = "ID")]
        review: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
pub struct EvidenceAddArgs {
    /// File holding the captured artifact
    pub file: PathBuf,
    /// Checklist item the evidence supports
    #[arg(long, value_name = "ID")]
    pub item: String,
    /// Review the evidence belongs to
    #[arg(long, value_name = "ID")]
    pub review: String,
    /// Artifact kind (inferred from the MIME type when omitted)
    #[arg(long, value_enum)]
    pub kind: Option<EvidenceKindArg>,
    /// Content MIME type (guessed from the file extension when omitted)
    #[arg(long)]
    pub mime: Option<String>,
    /// Capture latitude
    #[arg(long, requires = "lon")]
    pub lat: Option<f64>,
    /// Capture longitude
    #[arg(long, requires = "lat")]
    pub lon: Option<f64>,
    /// GPS accuracy in meters
    #[arg(long, default_value = "25")]
    pub accuracy: f64,
    /// Skip photo thumbnail derivation
    #[arg(long)]
    pub no_thumbnail: bool,
}

#[derive(Subcommand)]
pub enum FindingCommands {
    /// Draft a new finding
    Add(FindingAddArgs),
    /// Discard a draft finding locally and remotely
    Discard {
        /// Finding ID
        id: String,
    },
    /// List a review's draft findings
    List {
        /// Review to list
        #[arg(long, value_name = "ID")]
        review: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
pub struct FindingAddArgs {
    /// Review the finding belongs to
    #[arg(long, value_name = "ID")]
    pub review: String,
    /// Short title
    #[arg(long)]
    pub title: String,
    /// Full description
    #[arg(long, alias = "desc")]
    pub description: String,
    /// Severity grading
    #[arg(long, value_enum)]
    pub severity: SeverityArg,
    /// Audit area code, e.g. HSE-3
    #[arg(long, value_name = "CODE")]
    pub area: String,
    /// Questionnaire question this finding answers
    #[arg(long, value_name = "ID")]
    pub question: Option<String>,
    /// Supporting evidence record IDs (repeatable)
    #[arg(long = "evidence", value_name = "ID")]
    pub evidence: Vec<String>,
    /// Drafting latitude
    #[arg(long, requires = "lon")]
    pub lat: Option<f64>,
    /// Drafting longitude
    #[arg(long, requires = "lat")]
    pub lon: Option<f64>,
    /// GPS accuracy in meters
    #[arg(long, default_value = "25")]
    pub accuracy: f64,
}

#[derive(Subcommand)]
pub enum SessionCommands {
    /// Open an offline working session
    Start {
        /// Review being worked on
        #[arg(long, value_name = "ID")]
        review: String,
        /// Reviewer working offline
        #[arg(long, value_name = "USER")]
        user: String,
        /// Device descriptor
        #[arg(long, default_value = "fieldkit-cli")]
        device: String,
    },
    /// Close an offline working session
    End {
        /// Session ID
        id: String,
    },
    /// List a review's sessions
    List {
        /// Review to list
        #[arg(long, value_name = "ID")]
        review: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum SyncCommands {
    /// Show queue tallies and the most recent error
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Give exhausted non-conflict entries a fresh retry budget
    Retry,
    /// Garbage-collect exhausted queue entries past their inspection TTL
    Gc,
    /// Watch connectivity and drain the queue whenever the backend is reachable
    Watch {
        /// Connectivity poll cadence in seconds
        #[arg(long, default_value = "30")]
        interval_secs: u64,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum PhaseArg {
    PreVisit,
    OnSite,
    PostVisit,
}

impl From<PhaseArg> for ChecklistPhase {
    fn from(phase: PhaseArg) -> Self {
        match phase {
            PhaseArg::PreVisit => Self::PreVisit,
            PhaseArg::OnSite => Self::OnSite,
            PhaseArg::PostVisit => Self::PostVisit,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum EvidenceKindArg {
    Photo,
    VoiceNote,
    Document,
}

impl From<EvidenceKindArg> for EvidenceKind {
    fn from(kind: EvidenceKindArg) -> Self {
        match kind {
            EvidenceKindArg::Photo => Self::Photo,
            EvidenceKindArg::VoiceNote => Self::VoiceNote,
            EvidenceKindArg::Document => Self::Document,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum SeverityArg {
    Critical,
    Major,
    Minor,
    Observation,
}

impl From<SeverityArg> for Severity {
    fn from(severity: SeverityArg) -> Self {
        match severity {
            SeverityArg::Critical => Self::Critical,
            SeverityArg::Major => Self::Major,
            SeverityArg::Minor => Self::Minor,
            SeverityArg::Observation => Self::Observation,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
