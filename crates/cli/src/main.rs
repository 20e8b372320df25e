mod listing;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(
    name = "ljdec",
    about = "List the blocks and warps reconstructed from LuaJIT 2.0 bytecode dumps"
)]
struct Cli {
    /// Bytecode dumps produced by `luajit -b`.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Print the raw instruction listing instead of reconstructing.
    #[arg(long)]
    dump: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let mut failures = 0;
    for path in &cli.inputs {
        match process(path, cli.dump) {
            Ok(output) => print!("{}", output),
            Err(err) => {
                eprintln!("{}: {:#}", path.display(), err);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{} of {} files failed", failures, cli.inputs.len());
    }
    Ok(())
}

fn process(path: &Path, dump_only: bool) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let dump = ljdec::bytecode::read_dump(&bytes).context("failed to parse bytecode dump")?;
    info!(
        "{}: {} instructions in main chunk",
        path.display(),
        dump.main.instructions.len()
    );

    let mut out = String::new();
    out.push_str(&format!("-- {}\n", path.display()));
    if dump_only {
        listing::dump_prototype(&mut out, &dump.main, "main");
        return Ok(out);
    }

    let func = ljdec::decompile_dump(&dump).context("failed to reconstruct main chunk")?;
    let unreachable = listing::list_function(&mut out, &func, "main");
    if unreachable > 0 {
        warn!("{}: {} unreachable blocks", path.display(), unreachable);
    }
    Ok(out)
}
