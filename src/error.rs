use thiserror::Error;

/// Failures while turning a raw register block into a measurement record.
///
/// Both are deterministic: decoding the same block again gives the same error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("malformed register block: need at least {expected} registers, got {actual}")]
    MalformedInput { expected: usize, actual: usize },

    #[error("register {register} holds {value}, which is not a known {kind}")]
    OutOfRangeEnum {
        kind: &'static str,
        register: usize,
        value: u16,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("error reading {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("error parsing configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("tristar.address cannot be empty")]
    MissingAddress,

    #[error("{0}.port must be between 1 and 65535")]
    InvalidPort(&'static str),

    #[error("{0} must be greater than zero")]
    InvalidInterval(&'static str),

    #[error("invalid {what} URL {url}: {source}")]
    InvalidUrl {
        what: &'static str,
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("influx.database cannot be empty")]
    MissingInfluxDatabase,
}

/// Creates an anyhow error with the current file and line number
#[macro_export]
macro_rules! file_error {
    ($($arg:tt)*) => {
        anyhow::anyhow!(
            "[{}:{}] {}",
            std::path::Path::new(file!())
                .file_name()
                .map(|name| name.to_string_lossy())
                .unwrap_or_default(),
            line!(),
            format!($($arg)*)
        )
    };
}

/// Creates an anyhow error with the current file and line number, and includes a source error
#[macro_export]
macro_rules! file_error_with_source {
    ($source:expr, $($arg:tt)*) => {
        anyhow::anyhow!(
            "[{}:{}] {}: {}",
            std::path::Path::new(file!())
                .file_name()
                .map(|name| name.to_string_lossy())
                .unwrap_or_default(),
            line!(),
            format!($($arg)*),
            $source
        )
    };
}
