use crate::{dhcp::AddressError, service::ServiceError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScopewardError {
    /// Rejected locally, before anything was sent to the server.
    #[error("{message} (Parameter '{argument}')")]
    OutOfRange {
        argument: &'static str,
        message: String,
    },

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("Invalid address: {0}")]
    Address(#[from] AddressError),
}
