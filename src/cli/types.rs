//! CLI command definitions (§6).
//!
//! Clap command structures for the `hivemind` binary. These map almost
//! one-to-one onto [`crate::coordinator::Coordinator`]'s public methods;
//! the command handlers in [`crate::cli::commands`] do the translation.

use clap::{Parser, Subcommand, ValueEnum};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "hivemind")]
#[command(about = "Hive-mind swarm coordinator", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format.
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Bump the configured log level to debug (never downgrades `trace`).
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a starter `.hivemind/config.yaml` in the current directory.
    Init {
        /// Overwrite an existing config file.
        #[arg(short, long)]
        force: bool,
    },

    /// Submit the swarm's objective, spawning the Queen and initial
    /// worker mix.
    Spawn {
        /// Natural-language objective text.
        objective: String,

        /// Queen authority model over this swarm's agents.
        #[arg(long, value_enum)]
        queen_type: Option<QueenModeArg>,

        /// Upper bound on simultaneously live agents, overriding config.
        #[arg(long)]
        max_workers: Option<usize>,

        /// Topology override; normally chosen from objective keywords.
        #[arg(long, value_enum)]
        topology: Option<TopologyArg>,
    },

    /// Task management commands.
    #[command(subcommand)]
    Task(TaskCommands),

    /// Consensus proposal commands.
    #[command(subcommand)]
    Consensus(ConsensusCommands),

    /// Collective memory commands.
    #[command(subcommand)]
    Memory(MemoryCommands),

    /// Shows swarm/agent/task/memory/bus status.
    Status,

    /// Streams the swarm's event feed until interrupted.
    Metrics,

    /// Drains outstanding tasks and terminates the swarm.
    Shutdown,
}

/// Mirrors `domain::models::QueenMode` for clap's value parser.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum QueenModeArg {
    /// The queen makes all scheduling/consensus decisions directly.
    Centralized,
    /// Workers may negotiate assignments among themselves.
    Distributed,
    /// The queen sets policy; day-to-day dispatch is delegated.
    Strategic,
}

/// Mirrors `domain::models::Topology` for clap's value parser.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TopologyArg {
    /// Single queen, flat worker pool.
    Hierarchical,
    /// Worker-to-worker handoffs without central routing.
    Mesh,
    /// Agents hand off work in a fixed cycle.
    Ring,
    /// Queen routes every message.
    Star,
}

/// Mirrors `domain::models::TaskPriority` for clap's value parser.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TaskPriorityArg {
    /// Lowest priority.
    Low,
    /// Default priority.
    Normal,
    /// Above normal priority.
    High,
    /// Highest priority.
    Critical,
}

/// Mirrors `domain::models::ConsensusAlgorithm` for clap's value parser.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ConsensusAlgorithmArg {
    /// Plain majority of cast votes wins.
    Majority,
    /// The queen's vote counts three times.
    Weighted,
    /// Requires at least two-thirds agreement.
    Byzantine,
}

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Submits a new task to the scheduler.
    Submit {
        /// Task description.
        description: String,

        /// Task priority.
        #[arg(short, long, value_enum, default_value = "normal")]
        priority: TaskPriorityArg,

        /// Required capability tags (comma-separated).
        #[arg(short, long, value_delimiter = ',')]
        capabilities: Vec<String>,

        /// Task IDs this task depends on (comma-separated).
        #[arg(short = 'D', long, value_delimiter = ',')]
        dependencies: Vec<Uuid>,

        /// Maximum number of agents assigned concurrently.
        #[arg(short, long, default_value = "1")]
        max_agents: usize,

        /// Require a consensus vote before the task is considered
        /// complete.
        #[arg(long)]
        require_consensus: bool,
    },

    /// Lists tasks, optionally filtered by status.
    List {
        /// Filter by status (pending, assigned, in_progress, completed,
        /// failed, cancelled).
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Shows a single task's detail.
    Show {
        /// Task id.
        task_id: Uuid,
    },

    /// Cancels a task.
    Cancel {
        /// Task id.
        task_id: Uuid,
    },
}

#[derive(Subcommand)]
pub enum ConsensusCommands {
    /// Opens a proposal for a vote.
    Propose {
        /// Decision description.
        description: String,

        /// Candidate options (comma-separated).
        #[arg(short, long, value_delimiter = ',')]
        options: Vec<String>,

        /// Tallying algorithm.
        #[arg(short, long, value_enum, default_value = "majority")]
        algorithm: ConsensusAlgorithmArg,

        /// Voting window, in seconds from now.
        #[arg(short, long)]
        deadline_secs: Option<i64>,
    },

    /// Casts a vote on an open proposal.
    Vote {
        /// Proposal id.
        proposal_id: Uuid,

        /// Voting agent id.
        voter: Uuid,

        /// The chosen option.
        choice: String,
    },

    /// Shows a single proposal's detail, including tallied votes.
    Show {
        /// Proposal id.
        proposal_id: Uuid,
    },

    /// Lists proposals, optionally filtered by status.
    List {
        /// Filter by status (open, decided, timed_out).
        #[arg(short, long)]
        status: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum MemoryCommands {
    /// Stores a JSON value under a namespace/key.
    Store {
        /// Namespace.
        namespace: String,

        /// Key.
        key: String,

        /// JSON-encoded value.
        value: String,
    },

    /// Retrieves a value by namespace/key.
    Get {
        /// Namespace.
        namespace: String,

        /// Key.
        key: String,
    },

    /// Deletes an entry by namespace/key.
    Delete {
        /// Namespace.
        namespace: String,

        /// Key.
        key: String,
    },

    /// Lists entries in a namespace.
    List {
        /// Namespace.
        namespace: String,

        /// Maximum number of entries to display.
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },
}
