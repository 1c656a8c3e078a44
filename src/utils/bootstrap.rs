//! Bootstrap utilities for expo-rewards binaries.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LOG_ENV_VAR;

/// Initialize tracing with the EXPO_REWARDS_LOG environment variable.
///
/// Defaults to "info" level if EXPO_REWARDS_LOG is not set. Safe to call more
/// than once; later calls leave the first subscriber in place.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env(LOG_ENV_VAR)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Config file path from `--config <path>` or `--config=<path>`, if given.
pub fn parse_config_path() -> Option<String> {
    config_path_from(std::env::args().skip(1))
}

fn config_path_from(args: impl IntoIterator<Item = String>) -> Option<String> {
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next();
        }
        if let Some(path) = arg.strip_prefix("--config=") {
            return Some(path.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_config_path_forms() {
        assert_eq!(
            config_path_from(args(&["--config", "fair.yaml"])).as_deref(),
            Some("fair.yaml")
        );
        assert_eq!(
            config_path_from(args(&["-v", "--config=fair.yaml"])).as_deref(),
            Some("fair.yaml")
        );
        assert_eq!(config_path_from(args(&["--config"])), None);
        assert_eq!(config_path_from(args(&[])), None);
    }
}
