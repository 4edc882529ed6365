//! Reservation access for a single scope
//!
//! [`ReservationCollection`] lists and creates the reservations of one scope
//! and can hand scope deletion off to [`Scope::delete`]. It holds no state of
//! its own: every call is one round-trip to the [`DhcpService`].

use crate::{
    dhcp::{Client, ClientTypes, HardwareAddress, Reservation, Scope, Server},
    error::ScopewardError,
    service::DhcpService,
};
use std::net::Ipv4Addr;

/// The reservations of one scope.
///
/// Obtained through [`Scope::reservations`]. Borrows both the scope and the
/// service; neither is owned.
pub struct ReservationCollection<'a, S: ?Sized> {
    scope: &'a Scope,
    service: &'a S,
}

impl<'a, S> ReservationCollection<'a, S>
where
    S: DhcpService + ?Sized,
{
    pub(crate) fn new(scope: &'a Scope, service: &'a S) -> Self {
        Self { scope, service }
    }

    pub fn server(&self) -> &'a Server {
        self.scope.server()
    }

    pub fn scope(&self) -> &'a Scope {
        self.scope
    }

    /// Queries the server for the scope's current reservations.
    ///
    /// Nothing is cached: each call issues a new query, so changes made
    /// elsewhere since the previous call are visible.
    pub fn iter(&self) -> Result<Reservations, ScopewardError> {
        tracing::debug!("Listing reservations of scope {}", self.scope.address());
        let reservations = Reservation::list(self.service, self.scope)?;
        Ok(Reservations {
            inner: reservations.into_iter(),
        })
    }

    /// Converts a client lease into a reservation.
    ///
    /// The client's address must lie in the scope's range; otherwise nothing
    /// is sent to the server.
    pub fn add_reservation_from_client(
        &self,
        client: &Client,
    ) -> Result<Reservation, ScopewardError> {
        if !self.scope.contains(client.ip_address) {
            tracing::warn!(
                "Client address {} is outside scope range {}",
                client.ip_address,
                self.scope.ip_range()
            );
            return Err(ScopewardError::OutOfRange {
                argument: "client",
                message: "The client address is not within the IP range of the scope".to_string(),
            });
        }

        self.add_reservation(client.ip_address, &client.hardware_address)
    }

    /// Reserves `address` for `hardware_address`, usable by DHCP and BOOTP clients.
    pub fn add_reservation(
        &self,
        address: Ipv4Addr,
        hardware_address: &HardwareAddress,
    ) -> Result<Reservation, ScopewardError> {
        self.add_reservation_with_types(address, hardware_address, ClientTypes::default())
    }

    /// Reserves `address` for `hardware_address`, limited to `allowed_client_types`.
    pub fn add_reservation_with_types(
        &self,
        address: Ipv4Addr,
        hardware_address: &HardwareAddress,
        allowed_client_types: ClientTypes,
    ) -> Result<Reservation, ScopewardError> {
        tracing::debug!(
            "Adding reservation {} -> {} ({}) to scope {}",
            address,
            hardware_address,
            allowed_client_types,
            self.scope.address()
        );
        Ok(Reservation::create(
            self.service,
            self.scope,
            address,
            hardware_address,
            allowed_client_types,
        )?)
    }

    /// Deletes `scope`, removing its clients' DNS records.
    pub fn remove_scope(&self, scope: &Scope) -> Result<(), ScopewardError> {
        self.remove_scope_with(scope, false)
    }

    /// Deletes `scope`. With `retain_client_dns_records` set the DNS records
    /// of its clients survive, which is what a failover partner expects.
    pub fn remove_scope_with(
        &self,
        scope: &Scope,
        retain_client_dns_records: bool,
    ) -> Result<(), ScopewardError> {
        Ok(scope.delete(self.service, retain_client_dns_records)?)
    }
}

/// Reservations returned by one [`ReservationCollection::iter`] call.
#[derive(Debug)]
pub struct Reservations {
    inner: std::vec::IntoIter<Reservation>,
}

impl Iterator for Reservations {
    type Item = Reservation;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Reservations {}
