//! # Scopeward - DHCP Scope Reservation Management
//!
//! Scopeward lists and creates the address reservations of a DHCP scope and
//! deletes scopes, by calling into a DHCP server's management facility. The
//! facility is abstracted as [`DhcpService`]; [`LocalDhcpService`] keeps the
//! server state in process and can persist it as JSON.
//!
//! ## Features
//!
//! - Enumerate reservations, freshly queried on every call
//! - Reserve an address from an existing client lease, with a scope range check
//! - Reserve explicit address / hardware address pairs, optionally limited to
//!   DHCP or BOOTP clients
//! - Delete scopes, optionally keeping the clients' DNS records for failover
//!
//! ## Example
//!
//! ```rust
//! use scopeward::{Client, IpRange, LocalDhcpService, Server};
//! use std::net::Ipv4Addr;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = LocalDhcpService::in_memory(Server::new("dhcp01", Ipv4Addr::new(10, 0, 0, 2)));
//!     let range = IpRange::new(Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 254))?;
//!     let scope = service.create_scope(
//!         Ipv4Addr::new(10, 0, 0, 0),
//!         Ipv4Addr::new(255, 255, 255, 0),
//!         "office",
//!         range,
//!     )?;
//!
//!     let client = Client::new(Ipv4Addr::new(10, 0, 0, 50), "AA:BB:CC:DD:EE:FF".parse()?);
//!     let reservation = scope.reservations(&service).add_reservation_from_client(&client)?;
//!     println!("Reserved: {}", reservation);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dhcp;
pub mod error;
pub mod reservations;
pub mod service;

pub use config::{Args, ServiceConfig};
pub use dhcp::{Client, ClientTypes, HardwareAddress, IpRange, Reservation, Scope, Server};
pub use error::ScopewardError;
pub use reservations::{ReservationCollection, Reservations};
pub use service::{DhcpService, LocalDhcpService, ServiceError};
