//! The DHCP server management facility.
//!
//! Everything that touches server state goes through [`DhcpService`]. The
//! crate ships [`LocalDhcpService`], which keeps the state in memory and can
//! persist it to a JSON file.

pub mod local;

pub use local::{DnsRecord, LocalDhcpService};

use crate::dhcp::{AddressError, Client, ClientTypes, HardwareAddress, Reservation, Scope, Server};
use std::{error::Error as StdError, net::Ipv4Addr};
use thiserror::Error;

/// Errors reported by the management facility.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Scope {0} does not exist on the server")]
    ScopeNotFound(Ipv4Addr),

    #[error("No reservation for {address} in scope {scope}")]
    ReservationNotFound { scope: Ipv4Addr, address: Ipv4Addr },

    #[error("Scope {scope} already has an entry for {entry}")]
    DuplicateEntry { scope: Ipv4Addr, entry: String },

    #[error("Address {address} is not within the range of scope {scope}")]
    InvalidRange { scope: Ipv4Addr, address: Ipv4Addr },

    #[error("Invalid scope definition")]
    InvalidScope(#[from] AddressError),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("DHCP service unavailable")]
    Unavailable(#[source] Box<dyn StdError + Send + Sync>),
}

/// Operations offered by a DHCP server's management interface.
///
/// Every call is a single blocking round-trip; implementations own all
/// validation, consistency and persistence.
pub trait DhcpService {
    /// The server this facility manages.
    fn server(&self) -> Server;

    fn scopes(&self) -> Result<Vec<Scope>, ServiceError>;

    fn scope(&self, address: Ipv4Addr) -> Result<Scope, ServiceError>;

    fn clients(&self, scope: &Scope) -> Result<Vec<Client>, ServiceError>;

    fn reservations(&self, scope: &Scope) -> Result<Vec<Reservation>, ServiceError>;

    fn create_reservation(
        &self,
        scope: &Scope,
        address: Ipv4Addr,
        hardware_address: &HardwareAddress,
        allowed_client_types: ClientTypes,
    ) -> Result<Reservation, ServiceError>;

    fn delete_reservation(&self, reservation: &Reservation) -> Result<(), ServiceError>;

    fn delete_scope(&self, scope: &Scope, retain_client_dns_records: bool)
        -> Result<(), ServiceError>;
}
