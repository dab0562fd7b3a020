use std::path::PathBuf;

use anyhow::{Context, Result};
use bazel_gopath_project::Config;
use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use itertools::Itertools;
use mimalloc::MiMalloc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Crates to include in the logging allowlist.
const CRATES: &[&str] = &[
    "bazel_gopath",
    "bazel_gopath_project",
    "bazel_gopath_schemas",
];

/// Build a GOPATH of symlinks mirroring the Go targets of a Bazel workspace,
/// so that editors and `go` tooling can find Bazel-managed packages.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,

    /// Location of the bazel binary
    #[arg(long, value_name = "PATH", default_value = "bazel")]
    bazel_bin: PathBuf,

    /// Location of the Bazel workspace
    #[arg(long, value_name = "PATH")]
    workspace: PathBuf,

    /// Root of the generated GOPATH [default: <workspace>/.gopath]
    #[arg(long, value_name = "PATH")]
    out_gopath: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr, next to Bazel's own output. Default to warn,
    // allowlist our crates.
    let level = cli.verbose.tracing_level_filter();
    let allowlist = CRATES.iter().map(|c| format!("{c}={level}")).join(",");
    let filter = EnvFilter::new(format!("warn,{allowlist}"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::new(cli.bazel_bin, &cli.workspace, cli.out_gopath)
        .context("invalid configuration")?;
    info!(gopath = %config.layout.gopath(), "gopath.target");

    let report = bazel_gopath_project::run(&config).with_context(|| {
        format!("failed to build GOPATH for {}", cli.workspace.display())
    })?;

    info!(
        projected = report.projected,
        skipped = report.skipped.len(),
        links_created = report.links_created,
        "done"
    );
    Ok(())
}
