//! DHCP management data model
//!
//! This module contains the values exchanged with a DHCP server's
//! management facility:
//! - Hardware addresses and IPv4 ranges
//! - Servers, scopes and clients
//! - Reservations and their allowed client types

pub mod address;
pub mod entities;


pub use address::{AddressError, HardwareAddress, IpRange};
pub use entities::{Client, ClientTypes, ParseClientTypesError, Reservation, Scope, Server};
