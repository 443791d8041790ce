//! CLI argument parsing

use clap::builder::FalseyValueParser;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "mk")]
#[command(author, version, about = "Run a command in an engine-managed container", long_about = None)]
pub struct Args {
    /// Run a single engine operation in-process (used by the engine itself)
    #[arg(long, hide = true)]
    pub engine: bool,

    /// Directory holding the engine state (`.docker`)
    #[arg(long, env = "MK_ROOT", default_value = ".")]
    pub root: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Enable debug logging
    #[arg(long, env = "DEBUG", value_parser = FalseyValueParser::new())]
    pub debug: bool,

    /// Container (or engine operation with --engine)
    pub command: String,

    /// Arguments passed through to the command
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_client_mode() {
        let args = Args::try_parse_from(["mk", "web", "ls", "-l"]).unwrap();
        assert!(!args.engine);
        assert_eq!(args.command, "web");
        assert_eq!(args.args, vec!["ls", "-l"]);
        assert_eq!(args.root, PathBuf::from("."));
    }

    #[test]
    fn test_parse_engine_mode() {
        let args = Args::try_parse_from(["mk", "--engine", "exec", "sh", "-c", "true"]).unwrap();
        assert!(args.engine);
        assert_eq!(args.command, "exec");
        assert_eq!(args.args, vec!["sh", "-c", "true"]);
    }

    #[test]
    fn test_parse_verbosity() {
        let args = Args::try_parse_from(["mk", "-vv", "--root", "/srv", "web"]).unwrap();
        assert_eq!(args.verbose, 2);
        assert_eq!(args.root, PathBuf::from("/srv"));
    }

    #[test]
    fn test_command_required() {
        assert!(Args::try_parse_from(["mk"]).is_err());
    }
}
