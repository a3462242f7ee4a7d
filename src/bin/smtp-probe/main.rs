mod args;
mod output;

use std::io;

use anyhow::Result;
use clap::Parser;
use clap::error::ErrorKind;
use tracing_subscriber::EnvFilter;

use args::{Cli, EXAMPLE, Format, format_from_str};
use smtp_probe::probe_smtp;

fn main() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => {
            // usage errors exit with 1, not clap's default 2
            err.print()?;
            eprintln!("{EXAMPLE}");
            std::process::exit(1);
        }
    };

    init_tracing(cli.verbose);

    let format = format_from_str(&cli.format)?;
    output::ensure_supported(format)?;
    let target = cli.target()?;
    let options = cli.options()?;

    let report = match format {
        Format::Human => probe_smtp(&target, &options, &mut io::stdout().lock()),
        Format::Json => probe_smtp(&target, &options, &mut io::sink()),
    };
    output::write_report(&report, format)?;

    let code = output::exit_code(&report);
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "smtp_probe=debug" } else { "error" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}
