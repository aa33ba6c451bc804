use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "user-batch")]
#[command(about = "Loads a CSV file into the user table, then exports the table back to CSV")]
pub struct Cli {
    /// Path to a TOML configuration file; environment variables are used when omitted
    #[arg(short, long)]
    pub config: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Serve the HTTP trigger endpoint
    Serve,
    /// Execute one load-then-export run and exit
    Run,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_with_config() {
        let cli = Cli::parse_from(["user-batch", "--config", "batch.toml", "-v", "run"]);
        assert_eq!(cli.config.as_deref(), Some("batch.toml"));
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::Run));
    }

    #[test]
    fn test_subcommand_is_required() {
        assert!(Cli::try_parse_from(["user-batch"]).is_err());
        let cli = Cli::try_parse_from(["user-batch", "--log-json", "serve"]).unwrap();
        assert!(cli.log_json);
        assert!(matches!(cli.command, Command::Serve));
    }
}
