//! Runtime configuration

use std::path::PathBuf;

use crate::cli::Args;
use crate::error::Result;
use crate::logging::LogConfig;

/// Configuration the binary hands to the engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Directory of the root container
    pub root: PathBuf,
    /// Absolute path of the engine binary, used for self re-invocation
    pub program: PathBuf,
    pub log: LogConfig,
}

impl EngineConfig {
    pub fn from_args(args: &Args) -> Result<Self> {
        Ok(Self {
            root: args.root.clone(),
            program: std::env::current_exe()?,
            log: LogConfig::from_flags(args.verbose, args.debug),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tracing::level_filters::LevelFilter;

    #[test]
    fn test_from_args() {
        let args = Args::try_parse_from(["mk", "-v", "--root", "/srv/mk", "web"]).unwrap();
        let config = EngineConfig::from_args(&args).unwrap();
        assert_eq!(config.root, PathBuf::from("/srv/mk"));
        assert!(config.program.is_absolute());
        assert!(config.log.level >= LevelFilter::INFO);
    }
}
