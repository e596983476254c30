//! Error types emitted by the Wayline CLI.
//!
//! Keep this error type reasonably small, as many CLI helpers return
//! `Result<_, CliError>`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use thiserror::Error;
use wayline_core::SessionError;

use crate::scenario::ScenarioError;

/// Errors emitted by the Wayline CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        /// Option name.
        field: &'static str,
        /// Environment variable that can supply it.
        env: &'static str,
    },
    /// A referenced input path does not exist on disk.
    #[error("{field} path {path:?} does not exist")]
    MissingSourceFile {
        /// Option name.
        field: &'static str,
        /// Path as given.
        path: Utf8PathBuf,
    },
    /// A referenced input path exists but is not a file.
    #[error("{field} path {path:?} exists but is not a file")]
    SourcePathNotFile {
        /// Option name.
        field: &'static str,
        /// Path as given.
        path: Utf8PathBuf,
    },
    /// A referenced input path could not be inspected due to an IO error.
    #[error("failed to inspect {field} path {path:?}: {source}")]
    InspectSourcePath {
        /// Option name.
        field: &'static str,
        /// Path as given.
        path: Utf8PathBuf,
        /// Underlying IO failure.
        #[source]
        source: std::io::Error,
    },
    /// Opening the scenario file failed.
    #[error("failed to open scenario at {path:?}: {source}")]
    OpenScenario {
        /// Scenario path.
        path: Utf8PathBuf,
        /// Underlying IO failure.
        #[source]
        source: std::io::Error,
    },
    /// Scenario JSON could not be decoded.
    #[error("failed to parse scenario JSON at {path:?}: {source}")]
    ParseScenario {
        /// Scenario path.
        path: Utf8PathBuf,
        /// Decoder failure.
        #[source]
        source: serde_json::Error,
    },
    /// The scenario route could not be built.
    #[error("scenario in {path:?} has an unusable route: {source}")]
    InvalidScenario {
        /// Scenario path.
        path: Utf8PathBuf,
        /// Validation failure.
        #[source]
        source: ScenarioError,
    },
    /// The routing session rejected a request.
    #[error(transparent)]
    Session(#[from] SessionError),
    /// Serialising a replay record failed.
    #[error("failed to serialise replay record: {0}")]
    SerialiseRecord(#[source] serde_json::Error),
    /// Writing the replay output failed.
    #[error("failed to write replay output: {0}")]
    WriteOutput(#[source] std::io::Error),
}
