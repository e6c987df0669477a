//! Rollcall CLI
//!
//! Admin tools for a Rollcall authority journal.
//!
//! # Commands
//!
//! - `inspect` - Display collection counters and journal size
//! - `verify` - Replay the journal and report the first corruption
//! - `pull` - Print a pull response as JSON
//! - `push` - Apply a JSON array of records as an authority-side push
//! - `refresh-catalog` - Derive subject catalog entries from the timetable
//! - `name-subject` - Set a catalog entry's display name and type

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Rollcall authority journal tools.
#[derive(Parser)]
#[command(name = "rollcall")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the journal file
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display collection counters and journal size
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Replay the journal and report corruption
    Verify,

    /// Print changes of one collection as JSON
    Pull {
        /// Collection (students, slots, attendance)
        #[arg(short, long)]
        kind: String,

        /// Watermark to resume from
        #[arg(short, long)]
        since: Option<String>,

        /// Maximum number of records
        #[arg(short, long)]
        limit: Option<u32>,
    },

    /// Apply a JSON array of records
    Push {
        /// Collection (students, slots, attendance)
        #[arg(short, long)]
        kind: String,

        /// JSON file holding the records
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Derive missing subject catalog entries from the timetable
    RefreshCatalog,

    /// Set a subject's display name and type
    NameSubject {
        /// Subject code
        subject_id: String,

        /// Department code
        department: String,

        /// Semester label
        semester: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Class type (theory, lab, ...)
        #[arg(short = 't', long = "type")]
        subject_type: Option<String>,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Inspect { format } => {
            let path = cli.path.ok_or("Journal path required for inspect")?;
            commands::inspect::run(&path, &format)?;
        }
        Commands::Verify => {
            let path = cli.path.ok_or("Journal path required for verify")?;
            commands::verify::run(&path)?;
        }
        Commands::Pull { kind, since, limit } => {
            let path = cli.path.ok_or("Journal path required for pull")?;
            commands::pull::run(&path, &kind, since, limit)?;
        }
        Commands::Push { kind, file } => {
            let path = cli.path.ok_or("Journal path required for push")?;
            commands::push::run(&path, &kind, &file)?;
        }
        Commands::RefreshCatalog => {
            let path = cli.path.ok_or("Journal path required for refresh-catalog")?;
            commands::catalog::refresh(&path)?;
        }
        Commands::NameSubject {
            subject_id,
            department,
            semester,
            name,
            subject_type,
        } => {
            let path = cli.path.ok_or("Journal path required for name-subject")?;
            commands::catalog::name_subject(
                &path,
                &subject_id,
                &department,
                &semester,
                &name,
                subject_type.as_deref(),
            )?;
        }
        Commands::Version => {
            println!("Rollcall CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Rollcall Core v{}", rollcall_core::VERSION);
        }
    }

    Ok(())
}
