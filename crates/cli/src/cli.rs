use clap::Parser;

/// Submit alert task lists to the APM alerts service.
///
/// Reads one JSON message per line (`{"payload":{"taskList":[...]}}`),
/// submits each in turn, waits for the job to complete and prints one
/// output message per input on stdout.
#[derive(Parser, Debug)]
#[command(name = "apm-ingest", version, about = "Submit alerts to the APM alerts service")]
pub struct CliArgs {
    /// Path to a TOML config file (default: read APM_* environment variables)
    #[arg(long, env = "APM_CONFIG")]
    pub config: Option<String>,

    /// Config profile; APM_* keys are first looked up as {PROFILE}_APM_*
    #[arg(long)]
    pub profile: Option<String>,

    /// Read input messages from this file instead of stdin
    #[arg(long)]
    pub input: Option<String>,

    /// Print status transitions as JSON lines on stderr
    #[arg(long)]
    pub events: bool,

    /// Print the redacted configuration and exit
    #[arg(long)]
    pub print_config: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags() {
        let args = CliArgs::parse_from([
            "apm-ingest",
            "--config",
            "apm.toml",
            "--input",
            "alerts.jsonl",
            "--events",
        ]);
        assert_eq!(args.config.as_deref(), Some("apm.toml"));
        assert_eq!(args.input.as_deref(), Some("alerts.jsonl"));
        assert!(args.events);
        assert!(!args.print_config);
        assert!(args.profile.is_none());
    }
}
