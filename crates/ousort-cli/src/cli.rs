//! Argument parsing and invocation dispatch.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use ousort_config::CONFIG_ENV_VAR;
use tracing::{error, info};

use crate::bootstrap::{self, RunMode};
use crate::error::AppResult;
use crate::output::render_cycle;

#[derive(Parser, Debug)]
#[command(
    name = "ousort",
    version,
    about = "Move newly created directory objects into their organizational units"
)]
pub(crate) struct Cli {
    /// Configuration file.
    #[arg(long, global = true, env = CONFIG_ENV_VAR)]
    config: Option<PathBuf>,
    /// Log intended moves without changing the directory or writing markers.
    #[arg(long, global = true)]
    simulate: bool,
    /// Poll interval in minutes; widens the lookback window to at least twice this.
    #[arg(long, global = true, value_parser = clap::value_parser!(u32).range(1..))]
    interval: Option<u32>,
    /// Summary format printed on stdout.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan every replica for objects created within the lookback window (default).
    Poll,
    /// Process the object named by an account-created audit record.
    Event(EventArgs),
}

#[derive(Args, Debug)]
struct EventArgs {
    /// JSON record file, or `-` for stdin.
    #[arg(long, default_value = "-")]
    record: PathBuf,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Parses arguments, runs one invocation and returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    match execute(cli).await {
        Ok(code) => code,
        Err(err) => {
            let message = err.display_message();
            error!(exit_code = err.exit_code(), "{message}");
            eprintln!("error: {message}");
            err.exit_code()
        }
    }
}

async fn execute(cli: Cli) -> AppResult<i32> {
    let loaded = bootstrap::load_config(cli.config.as_deref(), cli.interval)?;
    let logging = bootstrap::start_logging(&loaded.config)?;
    bootstrap::report_warnings(&loaded);
    if let Some(path) = logging.log_path() {
        info!(path = %path.display(), "logging to file");
    }
    if let Some(path) = logging.transcript_path() {
        info!(path = %path.display(), "transcript enabled");
    }

    let mode = match &cli.command {
        None | Some(Command::Poll) => RunMode::Poll,
        Some(Command::Event(args)) => RunMode::Event(bootstrap::read_notice(&args.record)?),
    };

    let result = bootstrap::run_invocation(&loaded, &mode, cli.simulate).await?;
    println!("{}", render_cycle(&result, cli.output)?.trim_end());
    let code = result.status().exit_code();
    info!(exit_code = code, "ousort finished");
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::error::Error;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn bare_invocation_polls() -> Result<(), Box<dyn Error>> {
        let cli = Cli::try_parse_from(["ousort", "--config", "/tmp/ousort.yaml", "--simulate"])?;
        assert!(cli.simulate);
        assert!(cli.command.is_none());
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/ousort.yaml")));
        assert_eq!(cli.output, OutputFormat::Text);
        Ok(())
    }

    #[test]
    fn event_subcommand_takes_record_and_global_flags() -> Result<(), Box<dyn Error>> {
        let cli = Cli::try_parse_from([
            "ousort",
            "event",
            "--record",
            "record.json",
            "--interval",
            "10",
            "--output",
            "json",
        ])?;
        assert_eq!(cli.interval, Some(10));
        assert_eq!(cli.output, OutputFormat::Json);
        assert!(matches!(
            cli.command,
            Some(Command::Event(EventArgs { ref record })) if record == &PathBuf::from("record.json")
        ));
        Ok(())
    }

    #[test]
    fn zero_interval_is_rejected() {
        assert!(Cli::try_parse_from(["ousort", "--interval", "0"]).is_err());
    }
}
