//! CLI argument parsing

use clap::Parser;

/// Query and configure a running Yggdrasil router
#[derive(Parser, Debug)]
#[command(name = "yggctl")]
#[command(about = "Command-line client for the Yggdrasil admin API")]
#[command(version)]
pub struct Cli {
    /// Admin socket address (tcp://host:port, unix:///path or @alias)
    ///
    /// Falls back to the `endpoint` from ~/.config/yggctl/config.toml, then
    /// to tcp://localhost:9001.
    #[arg(long, short = 'e', env = "YGGCTL_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Give up after this many seconds
    #[arg(long, short = 't', value_name = "SECS")]
    pub timeout: Option<f64>,

    /// Print the payload on one line instead of pretty-printing it
    #[arg(long)]
    pub compact: bool,

    /// Log exchanges to stderr (overrides YGGCTL_LOG)
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// List the operations this client knows by name and exit
    #[arg(long, exclusive = true)]
    pub list: bool,

    /// Operation to invoke, e.g. getSelf or addPeer
    #[arg(required_unless_present = "list")]
    pub operation: Option<String>,

    /// Operation arguments as key=value; values are read as JSON when they
    /// parse, otherwise as strings
    #[arg(value_name = "KEY=VALUE")]
    pub arguments: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_operation_with_arguments() {
        let cli = Cli::try_parse_from([
            "yggctl",
            "--endpoint",
            "unix:///var/run/yggdrasil.sock",
            "--compact",
            "addPeer",
            "uri=tcp://10.0.0.1:12345",
        ])
        .unwrap();

        assert_eq!(cli.endpoint.as_deref(), Some("unix:///var/run/yggdrasil.sock"));
        assert!(cli.compact);
        assert_eq!(cli.operation.as_deref(), Some("addPeer"));
        assert_eq!(cli.arguments, vec!["uri=tcp://10.0.0.1:12345"]);
    }

    #[test]
    fn test_list_needs_no_operation() {
        let cli = Cli::try_parse_from(["yggctl", "--list"]).unwrap();
        assert!(cli.list);
        assert!(cli.operation.is_none());
    }

    #[test]
    fn test_operation_required() {
        assert!(Cli::try_parse_from(["yggctl"]).is_err());
    }

    #[test]
    fn test_timeout_parses_fractional_seconds() {
        let cli = Cli::try_parse_from(["yggctl", "-t", "2.5", "getSelf"]).unwrap();
        assert_eq!(cli.timeout, Some(2.5));
    }
}
