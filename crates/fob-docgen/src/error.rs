use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias for per-file documentation operations.
pub type Result<T> = std::result::Result<T, DocgenError>;

fn format_not_found(search_root: &std::path::Path, requested: Option<&str>) -> String {
    match requested {
        Some(requested) => format!(
            "tsconfig.json not found: '{}' does not exist in {} or any parent directory. Please check the path given via the tsconfigPath option",
            requested,
            search_root.display()
        ),
        None => format!(
            "tsconfig.json not found in your root ({}). Please provide the path to the tsconfig.json file via the tsconfigPath option",
            search_root.display()
        ),
    }
}

/// Errors raised while setting up the plugin or its type-analysis session.
///
/// These are configuration failures: nothing downstream can work without the
/// program, so they cross the plugin boundary instead of being swallowed.
/// The type is `Clone` because one settled initialization result is shared by
/// every transform call.
#[derive(Debug, Clone, Error, Diagnostic)]
pub enum SessionError {
    /// No project configuration file could be located.
    #[error("{}", format_not_found(.search_root, .requested.as_deref()))]
    #[diagnostic(
        code(fob::docgen::tsconfig_not_found),
        help("Pass `tsconfigPath` (e.g. \"./tsconfig.app.json\") in the plugin options")
    )]
    TsconfigNotFound {
        /// Directory the upward search started from.
        search_root: PathBuf,
        /// Explicit override, when one was supplied.
        requested: Option<String>,
    },

    /// A configuration file in the `extends` chain could not be read.
    #[error("failed to read '{path}': {message}")]
    #[diagnostic(code(fob::docgen::tsconfig_io))]
    Io {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying I/O error message.
        message: String,
    },

    /// A configuration file is not valid JSON (after comment stripping).
    #[error("invalid tsconfig '{path}': {message}")]
    #[diagnostic(
        code(fob::docgen::invalid_tsconfig),
        help("tsconfig files may contain comments and trailing commas, but must otherwise be valid JSON")
    )]
    InvalidTsconfig {
        /// Path of the configuration file.
        path: PathBuf,
        /// Parser error message.
        message: String,
    },

    /// An include/exclude pattern is not a valid glob.
    #[error("invalid glob pattern '{pattern}': {message}")]
    #[diagnostic(code(fob::docgen::invalid_pattern))]
    InvalidPattern {
        /// Pattern as written in the options.
        pattern: String,
        /// Reason reported by the glob parser.
        message: String,
    },

    /// The background initialization task did not complete.
    #[error("type-analysis session initialization failed: {message}")]
    #[diagnostic(code(fob::docgen::initialization))]
    Initialization {
        /// Human-readable reason.
        message: String,
    },
}

impl SessionError {
    pub fn not_found(search_root: PathBuf, requested: Option<String>) -> Self {
        Self::TsconfigNotFound {
            search_root,
            requested,
        }
    }

    pub fn io(path: PathBuf, error: &std::io::Error) -> Self {
        Self::Io {
            path,
            message: error.to_string(),
        }
    }

    pub fn invalid(path: PathBuf, message: impl Into<String>) -> Self {
        Self::InvalidTsconfig {
            path,
            message: message.into(),
        }
    }
}

/// Error variants for per-file documentation extraction and generation.
///
/// Every variant is recoverable: the transform maps them to an unchanged
/// source instead of failing the build.
#[derive(Debug, Error, Diagnostic)]
pub enum DocgenError {
    /// Parsing the source file with OXC failed.
    #[error("failed to parse source '{path}': {message}")]
    #[diagnostic(code(fob::docgen::parse))]
    Parse {
        /// Path to the source file.
        path: PathBuf,
        /// Aggregated parser error message.
        message: String,
    },

    /// A component record could not be rendered into code.
    #[error("failed to generate docgen block for '{path}': {message}")]
    #[diagnostic(code(fob::docgen::generate))]
    Generate {
        /// Path to the source file.
        path: PathBuf,
        /// Reason reported by the generator.
        message: String,
    },

    /// Generic error variant.
    #[error("{message}")]
    Other {
        /// Human-readable error message.
        message: String,
    },
}

impl DocgenError {
    /// Helper to create a parse error from multiple diagnostic strings.
    pub fn parse_error(path: PathBuf, diagnostics: &[String]) -> Self {
        let message = diagnostics.join("; ");
        Self::Parse { path, message }
    }

    pub fn generate(path: PathBuf, message: impl Into<String>) -> Self {
        Self::Generate {
            path,
            message: message.into(),
        }
    }
}
