//! Servers, scopes, clients and reservations as seen through the management
//! facility.

use super::address::{AddressError, HardwareAddress, IpRange};
use crate::{
    reservations::ReservationCollection,
    service::{DhcpService, ServiceError},
};
use serde::{Deserialize, Serialize};
use std::{fmt, net::Ipv4Addr, str::FromStr};
use thiserror::Error;

/// Descriptor of the DHCP server that owns a scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    pub name: String,
    pub address: Ipv4Addr,
}

impl Server {
    pub fn new(name: impl Into<String>, address: Ipv4Addr) -> Self {
        Self {
            name: name.into(),
            address,
        }
    }
}

/// Protocol classes allowed to use a reservation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientTypes {
    Dhcp,
    Bootp,
    #[default]
    Both,
}

impl ClientTypes {
    /// Whether a client speaking `protocol` may use a reservation with these types.
    pub fn allows(self, protocol: ClientTypes) -> bool {
        match self {
            ClientTypes::Both => true,
            other => other == protocol,
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Unknown client type '{0}', expected one of: dhcp, bootp, both")]
pub struct ParseClientTypesError(String);

impl FromStr for ClientTypes {
    type Err = ParseClientTypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dhcp" => Ok(ClientTypes::Dhcp),
            "bootp" => Ok(ClientTypes::Bootp),
            "both" => Ok(ClientTypes::Both),
            _ => Err(ParseClientTypesError(s.to_string())),
        }
    }
}

impl fmt::Display for ClientTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClientTypes::Dhcp => "dhcp",
            ClientTypes::Bootp => "bootp",
            ClientTypes::Both => "both",
        };
        f.write_str(name)
    }
}

/// A DHCP scope: a subnet on one server plus the range of addresses it hands out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    server: Server,
    address: Ipv4Addr,
    mask: Ipv4Addr,
    name: String,
    ip_range: IpRange,
}

impl Scope {
    /// Builds a scope, normalizing `address` to the network id of `address/mask`.
    ///
    /// Fails when `ip_range` reaches outside that subnet.
    pub fn new(
        server: Server,
        address: Ipv4Addr,
        mask: Ipv4Addr,
        name: impl Into<String>,
        ip_range: IpRange,
    ) -> Result<Self, AddressError> {
        let address = Ipv4Addr::from(u32::from(address) & u32::from(mask));
        if !ip_range.within_subnet(address, mask) {
            return Err(AddressError::RangeOutsideSubnet {
                start: ip_range.start(),
                end: ip_range.end(),
                address,
                mask,
            });
        }
        Ok(Self {
            server,
            address,
            mask,
            name: name.into(),
            ip_range,
        })
    }

    pub fn server(&self) -> &Server {
        &self.server
    }

    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    pub fn mask(&self) -> Ipv4Addr {
        self.mask
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ip_range(&self) -> &IpRange {
        &self.ip_range
    }

    pub fn contains(&self, address: Ipv4Addr) -> bool {
        self.ip_range.contains(address)
    }

    /// Reservation view of this scope backed by `service`.
    pub fn reservations<'a, S>(&'a self, service: &'a S) -> ReservationCollection<'a, S>
    where
        S: DhcpService + ?Sized,
    {
        ReservationCollection::new(self, service)
    }

    /// Clients currently holding a lease in this scope.
    pub fn clients<S>(&self, service: &S) -> Result<Vec<Client>, ServiceError>
    where
        S: DhcpService + ?Sized,
    {
        service.clients(self)
    }

    /// Deletes this scope on the server.
    ///
    /// With `retain_client_dns_records` set, the DNS records registered on
    /// behalf of the scope's clients are left in place (failover handoff).
    pub fn delete<S>(&self, service: &S, retain_client_dns_records: bool) -> Result<(), ServiceError>
    where
        S: DhcpService + ?Sized,
    {
        tracing::info!(
            "Deleting scope {} on {} (retain DNS records: {})",
            self.address,
            self.server.name,
            retain_client_dns_records
        );
        service.delete_scope(self, retain_client_dns_records)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.address, self.ip_range, self.name)
    }
}

/// A device holding a lease.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub ip_address: Ipv4Addr,
    pub hardware_address: HardwareAddress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Client {
    pub fn new(ip_address: Ipv4Addr, hardware_address: HardwareAddress) -> Self {
        Self {
            ip_address,
            hardware_address,
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A fixed binding of one address to one hardware address inside a scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub scope: Ipv4Addr,
    pub ip_address: Ipv4Addr,
    pub hardware_address: HardwareAddress,
    #[serde(default)]
    pub allowed_client_types: ClientTypes,
}

impl Reservation {
    /// Queries the server for the reservations of `scope`.
    pub fn list<S>(service: &S, scope: &Scope) -> Result<Vec<Reservation>, ServiceError>
    where
        S: DhcpService + ?Sized,
    {
        service.reservations(scope)
    }

    /// Creates a reservation on the server and returns it as confirmed by the server.
    pub fn create<S>(
        service: &S,
        scope: &Scope,
        address: Ipv4Addr,
        hardware_address: &HardwareAddress,
        allowed_client_types: ClientTypes,
    ) -> Result<Reservation, ServiceError>
    where
        S: DhcpService + ?Sized,
    {
        service.create_reservation(scope, address, hardware_address, allowed_client_types)
    }

    /// Removes this reservation from the server.
    pub fn delete<S>(&self, service: &S) -> Result<(), ServiceError>
    where
        S: DhcpService + ?Sized,
    {
        service.delete_reservation(self)
    }

    pub fn allows(&self, protocol: ClientTypes) -> bool {
        self.allowed_client_types.allows(protocol)
    }
}

impl fmt::Display for Reservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} ({})",
            self.ip_address, self.hardware_address, self.allowed_client_types
        )
    }
}
