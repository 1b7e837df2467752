use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use perfhash::{emit_c, find, HashFamily, KeyVec, SearchOpts};

#[derive(Debug, Parser)]
#[clap(name = "perfhash", version, about = "Generate perfect hash functions for key sets")]
struct Cli {
    /// General string hash to build on.
    #[clap(long = "hash", value_enum, default_value_t = HashFamily::Icke2, global = true)]
    hash: HashFamily,
    /// Override the initial bucket count (diagnostic use).
    #[clap(long = "buckets", global = true)]
    buckets: Option<usize>,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Build(Build),
    Print(Print),
    Perf(Perf),
}

impl Command {
    fn parse(self, hash: HashFamily, buckets: Option<usize>) -> Result<()> {
        match self {
            Self::Build(command) => command.parse(hash, buckets),
            Self::Print(command) => command.parse(hash),
            Self::Perf(command) => command.parse(hash),
        }
    }
}

/// Search for a perfect hash over the keys and emit C code on stdout.
#[derive(Debug, Parser)]
struct Build {
    /// Permit up to K keys per slot (K > 1 is best effort).
    #[clap(short = 'k', default_value_t = 1)]
    kmax: u32,
    /// Key file, one key per line; absent or `-` reads stdin.
    file: Option<PathBuf>,
}

impl Build {
    fn parse(self, hash: HashFamily, buckets: Option<usize>) -> Result<()> {
        if self.kmax < 1 {
            bail!("-k must be at least 1");
        }
        let keys = read_keys(self.file.as_deref())?;
        let opts = SearchOpts { kmax: self.kmax, buckets };
        let ph = find(&keys, hash, &opts)?;
        let stdout = io::stdout();
        emit_c(&ph, &mut stdout.lock()).context("cannot write generated code")?;
        Ok(())
    }
}

/// Print the raw unsalted hash of every key.
#[derive(Debug, Parser)]
struct Print {
    /// Mask the printed hashes to their low N bits.
    #[clap(long = "lower", default_value_t = 32)]
    lower: u32,
    /// Key file, one key per line; absent or `-` reads stdin.
    file: Option<PathBuf>,
}

impl Print {
    fn parse(self, hash: HashFamily) -> Result<()> {
        if self.lower == 0 {
            return Ok(());
        }
        let keys = read_keys(self.file.as_deref())?;
        let msk = if self.lower >= 32 { u32::MAX } else { (1u32 << self.lower) - 1 };
        let width = ((self.lower - 1) / 4 + 1) as usize;

        let stdout = io::stdout();
        let mut out = stdout.lock();
        for key in keys.iter() {
            let h = hash.hash(key, 0);
            writeln!(out, "{:0width$x}\t{}", h & msk, String::from_utf8_lossy(key), width = width)?;
        }
        Ok(())
    }
}

/// Hash every key a million times and print the running sum.
#[derive(Debug, Parser)]
struct Perf {
    /// Key file, one key per line; absent or `-` reads stdin.
    file: Option<PathBuf>,
}

impl Perf {
    fn parse(self, hash: HashFamily) -> Result<()> {
        let keys = read_keys(self.file.as_deref())?;
        let mut sum: u32 = 0x94;
        for _ in 0..1_000_000 {
            for key in keys.iter() {
                sum = sum.wrapping_add(hash.hash(key, sum));
            }
        }
        println!("sum {:x}", sum);
        Ok(())
    }
}

fn read_keys(file: Option<&Path>) -> Result<KeyVec> {
    match file {
        Some(path) if path != Path::new("-") => KeyVec::from_path(path)
            .with_context(|| format!("cannot read keys from `{}`", path.display())),
        _ => {
            let stdin = io::stdin();
            KeyVec::from_reader(stdin.lock()).context("cannot read keys from stdin")
        }
    }
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            err.print().ok();
            std::process::exit(if err.use_stderr() { 1 } else { 0 });
        }
    };
    cli.command.parse(cli.hash, cli.buckets)
}

#[cfg(test)]
mod tests {
    use super::*;

    // As per the official clap recommendation.
    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert()
    }
}
