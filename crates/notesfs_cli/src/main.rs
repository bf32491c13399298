//! `notesfs` command-line entry point.
//!
//! # Responsibility
//! - Parse global options into an `FsConfig` and initialize logging once.
//! - Mount a note store through FUSE (`fuse` feature builds only).
//! - Offer `ls`, `cat` and `init` helpers that work without a mount.
//!
//! # Invariants
//! - Logging is initialized before any store is opened.
//! - `init` never overwrites an existing file.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use notesfs_core::db::create_store;
use notesfs_core::{
    default_log_level, init_logging, open_notes_fs, FsConfig, NoteCollection, ProjectionContext,
    SqliteNoteStore, TimestampEpoch,
};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Expose a SQLite note store as a directory of text files.
#[derive(Parser, Debug)]
#[command(name = "notesfs", version)]
struct Args {
    /// trace|debug|info|warn|error (defaults by build mode)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Absolute directory for rolling log files; stderr when omitted
    #[arg(long, global = true)]
    log_dir: Option<String>,

    /// Seconds cached note metadata may be served without a refresh
    #[arg(long, global = true, default_value_t = 10)]
    staleness_secs: u64,

    /// Epoch of the store's timestamp columns (unix|core-data)
    #[arg(long, global = true, default_value_t = TimestampEpoch::Unix)]
    timestamp_epoch: TimestampEpoch,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mount the store as a FUSE filesystem (blocks until unmounted)
    Mount {
        /// Note store file
        db: PathBuf,
        /// Directory to mount on
        mountpoint: PathBuf,
        /// Allow other users to access the mount
        #[arg(long)]
        allow_other: bool,
        /// Extra mount options passed through to FUSE
        #[arg(short = 'o', value_name = "OPT")]
        options: Vec<String>,
    },
    /// List the files the mount would show
    Ls {
        /// Note store file
        db: PathBuf,
        /// Print note summaries as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print one note body by its virtual path
    Cat {
        /// Note store file
        db: PathBuf,
        /// Virtual path, e.g. /0001-Groceries.txt
        path: String,
    },
    /// Create an empty note store
    Init {
        /// Note store file to create
        db: PathBuf,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| default_log_level().to_string());
    init_logging(&level, args.log_dir.as_deref()).map_err(anyhow::Error::msg)?;

    let config = FsConfig {
        staleness_window: Duration::from_secs(args.staleness_secs),
        timestamp_epoch: args.timestamp_epoch,
        ..FsConfig::default()
    };

    match args.command {
        Command::Mount {
            db,
            mountpoint,
            allow_other,
            options,
        } => mount(db, mountpoint, allow_other, options, &config),
        Command::Ls { db, json } => list(db, json, &config),
        Command::Cat { db, path } => cat(db, &path, &config),
        Command::Init { db } => init(db),
    }
}

#[cfg(feature = "fuse")]
fn mount(
    db: PathBuf,
    mountpoint: PathBuf,
    allow_other: bool,
    extra: Vec<String>,
    config: &FsConfig,
) -> Result<()> {
    use notesfs_core::fs::fuse::{self, MountOptions};

    let fs = open_notes_fs(&db, config)
        .with_context(|| format!("failed to open note store `{}`", db.display()))?;
    let options = MountOptions {
        allow_other,
        extra,
        ..MountOptions::default()
    };
    fuse::mount(fs, &mountpoint, options)
        .with_context(|| format!("failed to mount on `{}`", mountpoint.display()))?;
    info!("event=fuse_unmount module=cli status=ok");
    Ok(())
}

#[cfg(not(feature = "fuse"))]
fn mount(
    _db: PathBuf,
    _mountpoint: PathBuf,
    _allow_other: bool,
    _extra: Vec<String>,
    _config: &FsConfig,
) -> Result<()> {
    anyhow::bail!("notesfs was built without FUSE support; rebuild with `--features fuse`")
}

fn list(db: PathBuf, json: bool, config: &FsConfig) -> Result<()> {
    let store = SqliteNoteStore::open(&db, config)
        .with_context(|| format!("failed to open note store `{}`", db.display()))?;
    let mut notes = NoteCollection::new(ProjectionContext::with_system_clock(
        Arc::new(store),
        config,
    ));
    notes.synchronize()?;

    let summaries = notes.summaries();
    let mut stdout = std::io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut stdout, &summaries)?;
        writeln!(stdout)?;
    } else {
        for summary in &summaries {
            writeln!(stdout, "{:>8}  {}", summary.size, summary.filename)?;
        }
    }
    Ok(())
}

fn cat(db: PathBuf, path: &str, config: &FsConfig) -> Result<()> {
    let fs = open_notes_fs(&db, config)
        .with_context(|| format!("failed to open note store `{}`", db.display()))?;
    let size = fs.attributes(path)?.size;
    let body = fs.read(path, usize::try_from(size)?, 0)?;
    std::io::stdout().lock().write_all(&body)?;
    Ok(())
}

fn init(db: PathBuf) -> Result<()> {
    create_store(&db)?;
    info!("event=store_init module=cli status=ok");
    println!("initialized {}", db.display());
    Ok(())
}
