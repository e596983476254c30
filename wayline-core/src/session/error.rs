use thiserror::Error;

use crate::DistanceFormatError;

/// Errors from [`crate::RoutingSession`] operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The operation needs a router and none has been installed.
    #[error("no router has been set")]
    RouterNotSet,
    /// A profile identifier could not be used as a file name.
    #[error("profile id '{profile_id}' is not a bare file name")]
    InvalidProfileId {
        /// Rejected identifier.
        profile_id: String,
    },
    /// The distance formatter broke the `"<value> <unit>"` contract.
    #[error(transparent)]
    Format(#[from] DistanceFormatError),
}
