//! Mount a JSON tree description as a read-only filesystem.

mod logging;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use jsonfs_model::{parse_size, TreeDocument};
use jsonfs_vfs::{ContentMode, JsonFs, NormalizationForm, StatsReporter, VfsError, VfsOptions};

/// Exit code for document validation failures.
const EXIT_DOCUMENT: i32 = 1;
/// Exit code when the FUSE bridge refuses to attach.
const EXIT_MOUNT: i32 = 2;
/// Exit code for CLI misuse, including rejected option values.
const EXIT_USAGE: i32 = 64;

#[derive(Debug, Parser)]
#[command(
    name = "jsonfs",
    version,
    about = "Mount a JSON tree description as a read-only filesystem"
)]
struct Cli {
    /// Path to the JSON file describing the filesystem.
    tree_file: PathBuf,

    /// Mount point for the filesystem.
    mount_point: PathBuf,

    /// Diagnostic verbosity.
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Route diagnostics to the system log instead of standard output.
    #[arg(long)]
    log_to_syslog: bool,

    /// Minimum seconds between operations (e.g. 0.1 for a 100ms delay).
    #[arg(long, default_value_t = 0.0)]
    rate_limit: f64,

    /// Operations per second cap (e.g. 100 for 100 IOPS); 0 disables.
    #[arg(long, default_value_t = 0)]
    iop_limit: u32,

    /// Report IOPS and throughput once per second.
    #[arg(long)]
    report_stats: bool,

    /// Block size for semi-random generation (e.g. 128K, 1M).
    #[arg(long, default_value = "128K")]
    block_size: String,

    /// Number of pre-generated semi-random blocks.
    #[arg(long, default_value_t = 100)]
    pre_generated_blocks: usize,

    /// Seed for semi-random generation.
    #[arg(long, default_value_t = 4)]
    seed: u32,

    /// Character to fill read data with (default: NUL byte).
    #[arg(long, group = "content")]
    fill_char: Option<String>,

    /// Use semi-random data for file contents.
    #[arg(long, group = "content")]
    semi_random: bool,

    /// Do not add the macOS cache-suppression entries to the root.
    #[arg(long)]
    no_macos_cache_files: bool,

    /// Silence warnings about missing "._" companion files.
    #[arg(long)]
    ignore_appledouble: bool,

    /// Uniform owner uid (default: the invoking user).
    #[arg(long)]
    uid: Option<u32>,

    /// Uniform owner gid (default: the invoking group).
    #[arg(long)]
    gid: Option<u32>,

    /// Uniform modification time, YYYY-MM-DD or epoch seconds.
    #[arg(long, default_value = "2017-10-17")]
    mtime: String,

    /// Unicode normalization form for path comparison.
    #[arg(long, value_enum, default_value_t = UnicodeForm::Nfd)]
    unicode_normalization: UnicodeForm,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    #[value(name = "DEBUG")]
    Debug,
    #[value(name = "INFO")]
    Info,
    #[value(name = "WARNING")]
    Warning,
    #[value(name = "ERROR")]
    Error,
    #[value(name = "CRITICAL")]
    Critical,
}

impl LogLevel {
    /// Filter directive for the tracing subscriber.
    fn directive(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            // tracing has no level above ERROR.
            LogLevel::Error | LogLevel::Critical => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum UnicodeForm {
    #[value(name = "NFC")]
    Nfc,
    #[value(name = "NFD")]
    Nfd,
    #[value(name = "NFKC")]
    Nfkc,
    #[value(name = "NFKD")]
    Nfkd,
    #[value(name = "none")]
    None,
}

impl From<UnicodeForm> for NormalizationForm {
    fn from(form: UnicodeForm) -> Self {
        match form {
            UnicodeForm::Nfc => NormalizationForm::Nfc,
            UnicodeForm::Nfd => NormalizationForm::Nfd,
            UnicodeForm::Nfkc => NormalizationForm::Nfkc,
            UnicodeForm::Nfkd => NormalizationForm::Nfkd,
            UnicodeForm::None => NormalizationForm::None,
        }
    }
}

/// A fatal startup error with its process exit code.
struct Failure {
    code: i32,
    error: anyhow::Error,
}

impl Failure {
    fn usage(error: anyhow::Error) -> Self {
        Self {
            code: EXIT_USAGE,
            error,
        }
    }

    fn document(error: anyhow::Error) -> Self {
        Self {
            code: EXIT_DOCUMENT,
            error,
        }
    }

    fn mount(error: anyhow::Error) -> Self {
        Self {
            code: EXIT_MOUNT,
            error,
        }
    }
}

fn main() {
    let cli: Cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            use clap::error::ErrorKind;
            let code: i32 = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => EXIT_USAGE,
            };
            let _ = err.print();
            std::process::exit(code);
        }
    };

    if let Err(failure) = run(cli) {
        eprintln!("jsonfs: {:#}", failure.error);
        std::process::exit(failure.code);
    }
}

fn run(cli: Cli) -> Result<(), Failure> {
    logging::init(cli.log_level.directive(), cli.log_to_syslog);
    tracing::info!("starting jsonfs {}", env!("CARGO_PKG_VERSION"));

    let options: VfsOptions = build_options(&cli).map_err(Failure::usage)?;
    options
        .validate()
        .map_err(|e: VfsError| Failure::usage(e.into()))?;

    let json: String = std::fs::read_to_string(&cli.tree_file)
        .with_context(|| format!("cannot read {}", cli.tree_file.display()))
        .map_err(Failure::document)?;
    let doc: TreeDocument = TreeDocument::decode(&json)
        .with_context(|| format!("invalid tree document {}", cli.tree_file.display()))
        .map_err(Failure::document)?;

    let fs: JsonFs = JsonFs::new(&doc, options).map_err(|e: VfsError| match e {
        VfsError::InvalidConfig(_) => Failure::usage(e.into()),
        _ => Failure::document(e.into()),
    })?;
    let counters = fs.counters();

    let running: Arc<AtomicBool> = Arc::new(AtomicBool::new(true));
    let handler_flag: Arc<AtomicBool> = running.clone();
    ctrlc::set_handler(move || {
        tracing::info!("received SIGINT, unmounting");
        handler_flag.store(false, Ordering::SeqCst);
    })
    .context("cannot install signal handler")
    .map_err(Failure::mount)?;

    tracing::info!("mounting at {}", cli.mount_point.display());
    let session = jsonfs_vfs::spawn_mount(fs, &cli.mount_point)
        .map_err(|e: VfsError| Failure::mount(e.into()))?;

    let reporter: Option<thread::JoinHandle<()>> = cli
        .report_stats
        .then(|| StatsReporter::spawn(counters, running.clone()));

    while running.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(100));
    }

    drop(session);
    if let Some(handle) = reporter {
        let _ = handle.join();
    }
    tracing::info!("unmounted");

    Ok(())
}

/// Translate CLI values into mount options, rejecting bad ones.
fn build_options(cli: &Cli) -> anyhow::Result<VfsOptions> {
    let content: ContentMode = if cli.semi_random {
        ContentMode::SemiRandom
    } else {
        ContentMode::Fill(match &cli.fill_char {
            Some(s) => parse_fill_char(s)?,
            None => 0,
        })
    };

    let block_size: u64 = parse_size(&cli.block_size).context("invalid --block-size")?;
    let mtime: SystemTime = parse_mtime(&cli.mtime).context("invalid --mtime")?;

    let defaults: VfsOptions = VfsOptions::default();
    Ok(VfsOptions {
        content,
        rate_limit: cli.rate_limit,
        iop_limit: cli.iop_limit,
        block_size,
        block_count: cli.pre_generated_blocks,
        seed: cli.seed,
        uid: cli.uid.unwrap_or(defaults.uid),
        gid: cli.gid.unwrap_or(defaults.gid),
        mtime,
        normalization: cli.unicode_normalization.into(),
        macos_cache_files: !cli.no_macos_cache_files,
        ignore_appledouble: cli.ignore_appledouble,
    })
}

/// Parse the fill character; exactly one byte.
fn parse_fill_char(s: &str) -> anyhow::Result<u8> {
    match s.as_bytes() {
        [byte] => Ok(*byte),
        _ => anyhow::bail!("fill character must be exactly one character"),
    }
}

/// Parse a modification time as YYYY-MM-DD or epoch seconds.
fn parse_mtime(s: &str) -> anyhow::Result<SystemTime> {
    if !s.is_empty() && s.bytes().all(|b: u8| b.is_ascii_digit()) {
        let secs: u64 = s.parse().context("epoch timestamp out of range")?;
        return Ok(UNIX_EPOCH + Duration::from_secs(secs));
    }

    let date: chrono::NaiveDate = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .context("expected YYYY-MM-DD or epoch seconds")?;
    let secs: i64 = date
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always valid")
        .and_utc()
        .timestamp();
    if secs < 0 {
        anyhow::bail!("mtime before the epoch is not supported");
    }
    Ok(UNIX_EPOCH + Duration::from_secs(secs as u64))
}
