use thiserror::Error;

/// Errors raised while loading or validating service configuration.
///
/// These are fatal at startup: the process logs the message and exits
/// non-zero. Per-rule configuration problems are not represented here;
/// they are handled (and survived) by the rule loader.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    Invalid { key: String, message: String },

    #[error("{0}")]
    Insecure(String),
}
