//! # vaudit CLI
//!
//! Audits consistency between the object catalog and the physical bytes
//! in storage vaults. One scan target per invocation: a resource, a vault
//! path, an object list, or everything hosted on this server.

use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Parser, ValueEnum};
use tracing::warn;

mod config;

use config::Config;
use vaudit_catalog::SnapshotCatalog;
use vaudit_engine::report::{create_sink, ReportFormat, ReportOptions};
use vaudit_engine::{ObjectListCheck, ResourceCheck, RunOptions, VaultCheck};

/// Check consistency between the object catalog and storage vaults.
#[derive(Parser)]
#[command(name = "vaudit")]
#[command(version, about, long_about = None)]
#[command(group(
    ArgGroup::new("scan")
        .required(true)
        .args(["resource", "vault", "object_list", "all_local_resources", "all_local_vaults"])
))]
struct Cli {
    /// Catalog snapshot export to audit against
    #[arg(long, value_name = "FILE")]
    catalog: Option<PathBuf>,

    /// FQDN of the server being audited
    #[arg(short, long)]
    fqdn: Option<String>,

    /// Name of the resource to check
    #[arg(short, long)]
    resource: Option<String>,

    /// Physical path of a resource vault to check
    #[arg(short, long)]
    vault: Option<PathBuf>,

    /// Check the local replicas of the objects listed in FILE (one
    /// logical path per line)
    #[arg(short = 'l', long = "object-list", value_name = "FILE")]
    object_list: Option<PathBuf>,

    /// Scan every storage resource hosted on this server
    #[arg(long)]
    all_local_resources: bool,

    /// Scan the vault of every filesystem storage resource on this server
    #[arg(long)]
    all_local_vaults: bool,

    /// Only check one collection and its subcollections
    #[arg(short = 's', long, conflicts_with = "object_list")]
    root_collection: Option<String>,

    /// Do not verify checksums; just check presence and size
    #[arg(long)]
    no_verify_checksum: bool,

    /// Output format
    #[arg(short = 'm', long, value_enum)]
    format: Option<OutputFormat>,

    /// Truncate output lines to the width of the console
    #[arg(short, long)]
    truncate: bool,

    /// Write output to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Maximum seconds to wait for storage server responses
    #[arg(short = 'T', long, default_value_t = 600, value_name = "SECONDS")]
    timeout: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Human,
    Csv,
}

impl From<OutputFormat> for ReportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Human => ReportFormat::Human,
            OutputFormat::Csv => ReportFormat::Csv,
        }
    }
}

fn main() -> Result<()> {
    #[cfg(unix)]
    unsafe {
        use nix::sys::signal::{signal, SigHandler, Signal};
        let _ = signal(Signal::SIGPIPE, SigHandler::SigDfl);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("VAUDIT_LOG")
                .or_else(|_| tracing_subscriber::EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = Config::load().unwrap_or_else(|err| {
        warn!(error = %err, "could not load config, using defaults");
        Config::default()
    });
    run(cli, config)
}

fn run(cli: Cli, config: Config) -> Result<()> {
    let fqdn = match cli.fqdn.or(config.fqdn) {
        Some(fqdn) => fqdn,
        None => system_fqdn()?,
    };

    let catalog_path = cli.catalog.or(config.catalog).context(
        "no catalog snapshot given; pass --catalog, set VAUDIT_CATALOG, \
         or add `catalog` to ~/.vaudit/config.toml",
    )?;
    let catalog = SnapshotCatalog::load(&catalog_path)
        .with_context(|| format!("loading catalog snapshot {}", catalog_path.display()))?;

    let root_collection = cli
        .root_collection
        .map(|c| c.trim_end_matches('/').to_string())
        .filter(|c| !c.is_empty());

    let options = RunOptions {
        fqdn,
        root_collection,
        verify_checksums: !cli.no_verify_checksum,
        operation_timeout: Duration::from_secs(cli.timeout),
    };

    let format = resolve_format(cli.format, config.format.as_deref())?;
    let out: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(io::BufWriter::new(
            File::create(path)
                .with_context(|| format!("creating output file {}", path.display()))?,
        )),
        None => Box::new(io::BufWriter::new(io::stdout())),
    };
    let mut sink = create_sink(format, out, &ReportOptions {
        truncate: cli.truncate,
    });

    let outcome = if let Some(name) = cli.resource {
        ResourceCheck::new(&catalog, options, Some(name))?.run(sink.as_mut())
    } else if cli.all_local_resources {
        ResourceCheck::new(&catalog, options, None)?.run(sink.as_mut())
    } else if let Some(path) = cli.vault {
        VaultCheck::new(&catalog, options, Some(path))?.run(sink.as_mut())
    } else if cli.all_local_vaults {
        VaultCheck::new(&catalog, options, None)?.run(sink.as_mut())
    } else if let Some(list_path) = cli.object_list {
        let list = File::open(&list_path)
            .with_context(|| format!("opening object list {}", list_path.display()))?;
        ObjectListCheck::new(&catalog, options)?.run(BufReader::new(list), sink.as_mut())
    } else {
        unreachable!("clap enforces exactly one scan target");
    };

    // Whatever was emitted before a mid-flight failure stays in the sink.
    let flushed = sink.flush();
    outcome?;
    flushed?;
    Ok(())
}

fn resolve_format(
    flag: Option<OutputFormat>,
    configured: Option<&str>,
) -> Result<ReportFormat> {
    if let Some(format) = flag {
        return Ok(format.into());
    }
    match configured {
        None => Ok(ReportFormat::Human),
        Some("human") => Ok(ReportFormat::Human),
        Some("csv") => Ok(ReportFormat::Csv),
        Some(other) => bail!("unknown format {other:?} in config (expected \"human\" or \"csv\")"),
    }
}

fn system_fqdn() -> Result<String> {
    let hostname = nix::unistd::gethostname().context("could not determine this server's FQDN")?;
    Ok(hostname.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_one_scan_target_is_required() {
        assert!(Cli::try_parse_from(["vaudit"]).is_err());
        assert!(Cli::try_parse_from(["vaudit", "-r", "demoResc"]).is_ok());
        assert!(Cli::try_parse_from(["vaudit", "--all-local-vaults"]).is_ok());
        assert!(Cli::try_parse_from(["vaudit", "-r", "demoResc", "-v", "/vault"]).is_err());
    }

    #[test]
    fn root_collection_conflicts_with_object_list() {
        assert!(Cli::try_parse_from([
            "vaudit",
            "-l",
            "objects.txt",
            "-s",
            "/tempZone/home/alice"
        ])
        .is_err());
        assert!(Cli::try_parse_from([
            "vaudit",
            "-r",
            "demoResc",
            "-s",
            "/tempZone/home/alice"
        ])
        .is_ok());
    }

    #[test]
    fn timeout_defaults_to_ten_minutes() {
        let cli = Cli::try_parse_from(["vaudit", "-r", "demoResc"]).unwrap();
        assert_eq!(cli.timeout, 600);
        let cli = Cli::try_parse_from(["vaudit", "-r", "demoResc", "-T", "30"]).unwrap();
        assert_eq!(cli.timeout, 30);
    }

    #[test]
    fn format_resolution_prefers_the_flag() {
        assert_eq!(
            resolve_format(Some(OutputFormat::Csv), Some("human")).unwrap(),
            ReportFormat::Csv
        );
        assert_eq!(resolve_format(None, None).unwrap(), ReportFormat::Human);
        assert_eq!(
            resolve_format(None, Some("csv")).unwrap(),
            ReportFormat::Csv
        );
        assert!(resolve_format(None, Some("xml")).is_err());
    }
}
