//! In-process DHCP server state with optional JSON persistence.

use super::{DhcpService, ServiceError};
use crate::{
    config::ServiceConfig,
    dhcp::{Client, ClientTypes, HardwareAddress, IpRange, Reservation, Scope, Server},
};
use serde::{Deserialize, Serialize};
use std::{
    net::Ipv4Addr,
    path::Path,
    sync::{Mutex, MutexGuard, PoisonError},
};

/// A DNS A record registered by the server on behalf of a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    pub name: String,
    pub address: Ipv4Addr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScopeRecord {
    address: Ipv4Addr,
    mask: Ipv4Addr,
    #[serde(default)]
    name: String,
    range: IpRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ClientRecord {
    scope: Ipv4Addr,
    #[serde(flatten)]
    client: Client,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ServerState {
    server: Server,
    #[serde(default)]
    scopes: Vec<ScopeRecord>,
    #[serde(default)]
    reservations: Vec<Reservation>,
    #[serde(default)]
    clients: Vec<ClientRecord>,
    #[serde(default)]
    dns_records: Vec<DnsRecord>,
}

impl ServerState {
    fn new(server: Server) -> Self {
        Self {
            server,
            scopes: Vec::new(),
            reservations: Vec::new(),
            clients: Vec::new(),
            dns_records: Vec::new(),
        }
    }

    fn scope_record(&self, address: Ipv4Addr) -> Result<&ScopeRecord, ServiceError> {
        self.scopes
            .iter()
            .find(|record| record.address == address)
            .ok_or(ServiceError::ScopeNotFound(address))
    }

    fn to_scope(&self, record: &ScopeRecord) -> Result<Scope, ServiceError> {
        Ok(Scope::new(
            self.server.clone(),
            record.address,
            record.mask,
            record.name.clone(),
            record.range,
        )?)
    }
}

/// A [`DhcpService`] whose server state lives in this process.
///
/// Mutations are applied to a copy of the state, persisted when a state file
/// is configured, and only then made visible.
pub struct LocalDhcpService {
    config: ServiceConfig,
    state: Mutex<ServerState>,
}

impl LocalDhcpService {
    /// Opens the service, loading the state file when one is configured and present.
    pub fn open(config: ServiceConfig) -> Result<Self, ServiceError> {
        let state = match &config.state_file {
            Some(path) if path.exists() => load_state(path)?,
            _ => ServerState::new(config.server.clone()),
        };
        tracing::debug!(
            "Opened DHCP service for {} with {} scope(s)",
            state.server.name,
            state.scopes.len()
        );
        Ok(Self {
            config,
            state: Mutex::new(state),
        })
    }

    /// A writable service that never touches the filesystem.
    pub fn in_memory(server: Server) -> Self {
        Self {
            state: Mutex::new(ServerState::new(server.clone())),
            config: ServiceConfig::new(server),
        }
    }

    pub fn create_scope(
        &self,
        address: Ipv4Addr,
        mask: Ipv4Addr,
        name: impl Into<String>,
        range: IpRange,
    ) -> Result<Scope, ServiceError> {
        let name = name.into();
        self.mutate("create scope", |state| {
            let scope = Scope::new(state.server.clone(), address, mask, name, range)?;
            if state.scopes.iter().any(|record| record.address == scope.address()) {
                return Err(ServiceError::DuplicateEntry {
                    scope: scope.address(),
                    entry: "scope".to_string(),
                });
            }
            let overlapping = state.scopes.iter().find(|record| {
                record.range.contains(range.start()) || range.contains(record.range.start())
            });
            if let Some(other) = overlapping {
                return Err(ServiceError::DuplicateEntry {
                    scope: scope.address(),
                    entry: format!("range overlapping scope {}", other.address),
                });
            }
            state.scopes.push(ScopeRecord {
                address: scope.address(),
                mask: scope.mask(),
                name: scope.name().to_string(),
                range: *scope.ip_range(),
            });
            tracing::info!("Created scope {}", scope);
            Ok(scope)
        })
    }

    /// Records a lease held by `client` in `scope`, registering its DNS name if it has one.
    pub fn add_client(&self, scope: &Scope, client: Client) -> Result<(), ServiceError> {
        self.mutate("add client", |state| {
            let record = state.scope_record(scope.address())?;
            let (scope, range) = (record.address, record.range);
            if !range.contains(client.ip_address) {
                return Err(ServiceError::InvalidRange {
                    scope,
                    address: client.ip_address,
                });
            }
            if state
                .clients
                .iter()
                .any(|c| c.scope == scope && c.client.ip_address == client.ip_address)
            {
                return Err(ServiceError::DuplicateEntry {
                    scope,
                    entry: client.ip_address.to_string(),
                });
            }
            if let Some(name) = &client.name {
                state.dns_records.push(DnsRecord {
                    name: name.clone(),
                    address: client.ip_address,
                });
            }
            tracing::debug!(
                "Client {} leased {} in scope {}",
                client.hardware_address,
                client.ip_address,
                scope
            );
            state.clients.push(ClientRecord { scope, client });
            Ok(())
        })
    }

    pub fn dns_records(&self) -> Vec<DnsRecord> {
        self.lock().dns_records.clone()
    }

    fn lock(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn mutate<T>(
        &self,
        operation: &str,
        apply: impl FnOnce(&mut ServerState) -> Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        if self.config.read_only {
            tracing::warn!("Rejected '{}' on read-only service", operation);
            return Err(ServiceError::AccessDenied(format!(
                "{operation} is not permitted on a read-only server"
            )));
        }

        let mut guard = self.lock();
        let mut next = guard.clone();
        let value = apply(&mut next)?;
        if let Some(path) = &self.config.state_file {
            save_state(path, &next)?;
        }
        *guard = next;
        Ok(value)
    }
}

fn load_state(path: &Path) -> Result<ServerState, ServiceError> {
    let content =
        std::fs::read_to_string(path).map_err(|e| ServiceError::Unavailable(Box::new(e)))?;
    serde_json::from_str(&content).map_err(|e| ServiceError::Unavailable(Box::new(e)))
}

fn save_state(path: &Path, state: &ServerState) -> Result<(), ServiceError> {
    let content =
        serde_json::to_string_pretty(state).map_err(|e| ServiceError::Unavailable(Box::new(e)))?;
    std::fs::write(path, content).map_err(|e| {
        tracing::error!("Failed to write state file {}: {}", path.display(), e);
        ServiceError::Unavailable(Box::new(e))
    })
}

impl DhcpService for LocalDhcpService {
    fn server(&self) -> Server {
        self.lock().server.clone()
    }

    fn scopes(&self) -> Result<Vec<Scope>, ServiceError> {
        let state = self.lock();
        state
            .scopes
            .iter()
            .map(|record| state.to_scope(record))
            .collect()
    }

    fn scope(&self, address: Ipv4Addr) -> Result<Scope, ServiceError> {
        let state = self.lock();
        let record = state.scope_record(address)?;
        state.to_scope(record)
    }

    fn clients(&self, scope: &Scope) -> Result<Vec<Client>, ServiceError> {
        let state = self.lock();
        let record = state.scope_record(scope.address())?;
        Ok(state
            .clients
            .iter()
            .filter(|c| c.scope == record.address)
            .map(|c| c.client.clone())
            .collect())
    }

    fn reservations(&self, scope: &Scope) -> Result<Vec<Reservation>, ServiceError> {
        let state = self.lock();
        let record = state.scope_record(scope.address())?;
        Ok(state
            .reservations
            .iter()
            .filter(|r| r.scope == record.address)
            .cloned()
            .collect())
    }

    fn create_reservation(
        &self,
        scope: &Scope,
        address: Ipv4Addr,
        hardware_address: &HardwareAddress,
        allowed_client_types: ClientTypes,
    ) -> Result<Reservation, ServiceError> {
        self.mutate("create reservation", |state| {
            let record = state.scope_record(scope.address())?;
            let scope = record.address;
            if !record.range.contains(address) {
                return Err(ServiceError::InvalidRange { scope, address });
            }

            let existing = state.reservations.iter().filter(|r| r.scope == scope);
            for reservation in existing {
                if reservation.ip_address == address {
                    return Err(ServiceError::DuplicateEntry {
                        scope,
                        entry: address.to_string(),
                    });
                }
                if reservation.hardware_address == *hardware_address {
                    return Err(ServiceError::DuplicateEntry {
                        scope,
                        entry: hardware_address.to_string(),
                    });
                }
            }

            let reservation = Reservation {
                scope,
                ip_address: address,
                hardware_address: hardware_address.clone(),
                allowed_client_types,
            };
            tracing::info!("Reserved {} in scope {}", reservation, scope);
            state.reservations.push(reservation.clone());
            Ok(reservation)
        })
    }

    fn delete_reservation(&self, reservation: &Reservation) -> Result<(), ServiceError> {
        self.mutate("delete reservation", |state| {
            let index = state
                .reservations
                .iter()
                .position(|r| {
                    r.scope == reservation.scope
                        && r.ip_address == reservation.ip_address
                        && r.hardware_address == reservation.hardware_address
                })
                .ok_or(ServiceError::ReservationNotFound {
                    scope: reservation.scope,
                    address: reservation.ip_address,
                })?;
            let removed = state.reservations.remove(index);
            tracing::info!("Removed reservation {} from scope {}", removed, removed.scope);
            Ok(())
        })
    }

    fn delete_scope(
        &self,
        scope: &Scope,
        retain_client_dns_records: bool,
    ) -> Result<(), ServiceError> {
        self.mutate("delete scope", |state| {
            let address = state.scope_record(scope.address())?.address;

            let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut state.clients)
                .into_iter()
                .partition(|c| c.scope == address);
            state.clients = kept;
            state.reservations.retain(|r| r.scope != address);
            state.scopes.retain(|record| record.address != address);

            if !retain_client_dns_records {
                let before = state.dns_records.len();
                state
                    .dns_records
                    .retain(|dns| !removed.iter().any(|c| c.client.ip_address == dns.address));
                tracing::debug!(
                    "Purged {} DNS record(s) of scope {}",
                    before - state.dns_records.len(),
                    address
                );
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn server() -> Server {
        Server::new("dhcp01", Ipv4Addr::new(10, 0, 0, 2))
    }

    fn range(start: [u8; 4], end: [u8; 4]) -> IpRange {
        IpRange::new(Ipv4Addr::from(start), Ipv4Addr::from(end)).unwrap()
    }

    fn mac(s: &str) -> HardwareAddress {
        s.parse().unwrap()
    }

    fn service_with_scope() -> (LocalDhcpService, Scope) {
        let service = LocalDhcpService::in_memory(server());
        let scope = service
            .create_scope(
                Ipv4Addr::new(10, 0, 0, 0),
                Ipv4Addr::new(255, 255, 255, 0),
                "office",
                range([10, 0, 0, 1], [10, 0, 0, 254]),
            )
            .unwrap();
        (service, scope)
    }

    #[test]
    fn test_create_and_list_reservation() {
        let (service, scope) = service_with_scope();
        let created = service
            .create_reservation(
                &scope,
                Ipv4Addr::new(10, 0, 0, 50),
                &mac("aa:bb:cc:dd:ee:ff"),
                ClientTypes::Dhcp,
            )
            .unwrap();

        assert_eq!(created.scope, scope.address());
        assert_eq!(service.reservations(&scope).unwrap(), vec![created]);
    }

    #[test]
    fn test_duplicate_address_rejected() {
        let (service, scope) = service_with_scope();
        let ip = Ipv4Addr::new(10, 0, 0, 50);
        service
            .create_reservation(&scope, ip, &mac("aa:bb:cc:dd:ee:01"), ClientTypes::Both)
            .unwrap();

        let result =
            service.create_reservation(&scope, ip, &mac("aa:bb:cc:dd:ee:02"), ClientTypes::Both);
        assert!(matches!(result, Err(ServiceError::DuplicateEntry { .. })));
    }

    #[test]
    fn test_duplicate_hardware_address_rejected() {
        let (service, scope) = service_with_scope();
        let hw = mac("aa:bb:cc:dd:ee:01");
        service
            .create_reservation(&scope, Ipv4Addr::new(10, 0, 0, 50), &hw, ClientTypes::Both)
            .unwrap();

        let result =
            service.create_reservation(&scope, Ipv4Addr::new(10, 0, 0, 51), &hw, ClientTypes::Both);
        assert!(matches!(result, Err(ServiceError::DuplicateEntry { .. })));
    }

    #[test]
    fn test_reservation_outside_scope_rejected() {
        let (service, scope) = service_with_scope();
        let result = service.create_reservation(
            &scope,
            Ipv4Addr::new(10, 0, 1, 5),
            &mac("aa:bb:cc:dd:ee:ff"),
            ClientTypes::Both,
        );
        assert!(matches!(result, Err(ServiceError::InvalidRange { .. })));
    }

    #[test]
    fn test_unknown_scope() {
        let (service, scope) = service_with_scope();
        service.delete_scope(&scope, false).unwrap();

        assert!(matches!(
            service.reservations(&scope),
            Err(ServiceError::ScopeNotFound(addr)) if addr == scope.address()
        ));
        assert!(matches!(
            service.delete_scope(&scope, false),
            Err(ServiceError::ScopeNotFound(_))
        ));
    }

    #[test]
    fn test_overlapping_scope_rejected() {
        let (service, _scope) = service_with_scope();
        let result = service.create_scope(
            Ipv4Addr::new(10, 0, 0, 0),
            Ipv4Addr::new(255, 255, 0, 0),
            "wide",
            range([10, 0, 0, 100], [10, 0, 3, 0]),
        );
        assert!(matches!(result, Err(ServiceError::DuplicateEntry { .. })));
    }

    #[test]
    fn test_delete_reservation() {
        let (service, scope) = service_with_scope();
        let reservation = service
            .create_reservation(
                &scope,
                Ipv4Addr::new(10, 0, 0, 50),
                &mac("aa:bb:cc:dd:ee:ff"),
                ClientTypes::Both,
            )
            .unwrap();

        service.delete_reservation(&reservation).unwrap();
        assert!(service.reservations(&scope).unwrap().is_empty());
        assert!(matches!(
            service.delete_reservation(&reservation),
            Err(ServiceError::ReservationNotFound { .. })
        ));
    }

    #[test]
    fn test_stale_reservation_does_not_delete_newer_binding() {
        let (service, scope) = service_with_scope();
        let ip = Ipv4Addr::new(10, 0, 0, 5);
        let old = service
            .create_reservation(&scope, ip, &mac("aa:aa:aa:aa:aa:aa"), ClientTypes::Both)
            .unwrap();
        service.delete_reservation(&old).unwrap();
        let current = service
            .create_reservation(&scope, ip, &mac("bb:bb:bb:bb:bb:bb"), ClientTypes::Dhcp)
            .unwrap();

        assert!(matches!(
            old.delete(&service),
            Err(ServiceError::ReservationNotFound { .. })
        ));
        assert_eq!(service.reservations(&scope).unwrap(), vec![current]);
    }

    #[test]
    fn test_delete_scope_purges_dns_records() {
        let (service, scope) = service_with_scope();
        let client = Client::new(Ipv4Addr::new(10, 0, 0, 20), mac("00:0c:29:a8:92:f4"))
            .with_name("printer");
        service.add_client(&scope, client).unwrap();
        assert_eq!(service.dns_records().len(), 1);

        service.delete_scope(&scope, false).unwrap();
        assert!(service.dns_records().is_empty());
        assert!(service.scopes().unwrap().is_empty());
    }

    #[test]
    fn test_delete_scope_retains_dns_records() {
        let (service, scope) = service_with_scope();
        let client = Client::new(Ipv4Addr::new(10, 0, 0, 20), mac("00:0c:29:a8:92:f4"))
            .with_name("printer");
        service.add_client(&scope, client).unwrap();

        service.delete_scope(&scope, true).unwrap();
        assert_eq!(
            service.dns_records(),
            vec![DnsRecord {
                name: "printer".to_string(),
                address: Ipv4Addr::new(10, 0, 0, 20),
            }]
        );
    }

    #[test]
    fn test_read_only_rejects_changes() {
        let config = ServiceConfig::new(server()).read_only(true);
        let service = LocalDhcpService::open(config).unwrap();
        let result = service.create_scope(
            Ipv4Addr::new(10, 0, 0, 0),
            Ipv4Addr::new(255, 255, 255, 0),
            "office",
            range([10, 0, 0, 1], [10, 0, 0, 254]),
        );
        assert!(matches!(result, Err(ServiceError::AccessDenied(_))));
    }

    #[test]
    fn test_state_persists_across_open() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        let config = ServiceConfig::new(server()).with_state_file(&path);

        {
            let service = LocalDhcpService::open(config.clone()).unwrap();
            let scope = service
                .create_scope(
                    Ipv4Addr::new(192, 168, 1, 0),
                    Ipv4Addr::new(255, 255, 255, 0),
                    "lab",
                    range([192, 168, 1, 100], [192, 168, 1, 200]),
                )
                .unwrap();
            service
                .create_reservation(
                    &scope,
                    Ipv4Addr::new(192, 168, 1, 150),
                    &mac("aa-bb-cc-dd-ee-ff"),
                    ClientTypes::Bootp,
                )
                .unwrap();
            let client = Client::new(Ipv4Addr::new(192, 168, 1, 120), mac("00:0c:29:a8:92:f4"))
                .with_name("build-agent");
            service.add_client(&scope, client).unwrap();
        }

        let reopened = LocalDhcpService::open(config).unwrap();
        let scope = reopened.scope(Ipv4Addr::new(192, 168, 1, 0)).unwrap();
        assert_eq!(scope.name(), "lab");
        let reservations = reopened.reservations(&scope).unwrap();
        assert_eq!(reservations.len(), 1);
        assert_eq!(reservations[0].hardware_address.to_string(), "AA:BB:CC:DD:EE:FF");
        assert_eq!(reservations[0].allowed_client_types, ClientTypes::Bootp);

        let clients = reopened.clients(&scope).unwrap();
        assert_eq!(clients.len(), 1);
        assert_eq!(clients[0].ip_address, Ipv4Addr::new(192, 168, 1, 120));
        assert_eq!(clients[0].hardware_address.to_string(), "00:0C:29:A8:92:F4");
        assert_eq!(clients[0].name.as_deref(), Some("build-agent"));
        assert_eq!(
            reopened.dns_records(),
            vec![DnsRecord {
                name: "build-agent".to_string(),
                address: Ipv4Addr::new(192, 168, 1, 120),
            }]
        );
    }

    #[test]
    fn test_failed_save_leaves_state_untouched() {
        let dir = TempDir::new().unwrap();
        let state_dir = dir.path().join("state");
        std::fs::create_dir(&state_dir).unwrap();
        let config = ServiceConfig::new(server()).with_state_file(state_dir.join("state.json"));
        let service = LocalDhcpService::open(config).unwrap();
        let scope = service
            .create_scope(
                Ipv4Addr::new(10, 0, 0, 0),
                Ipv4Addr::new(255, 255, 255, 0),
                "office",
                range([10, 0, 0, 1], [10, 0, 0, 254]),
            )
            .unwrap();

        std::fs::remove_dir_all(&state_dir).unwrap();
        let result = service.create_reservation(
            &scope,
            Ipv4Addr::new(10, 0, 0, 50),
            &mac("aa:bb:cc:dd:ee:ff"),
            ClientTypes::Both,
        );

        assert!(matches!(result, Err(ServiceError::Unavailable(_))));
        assert!(service.reservations(&scope).unwrap().is_empty());
        assert_eq!(service.scopes().unwrap().len(), 1);
    }

    #[test]
    fn test_rejected_reservation_leaves_state_untouched() {
        let (service, scope) = service_with_scope();
        let result = service.create_reservation(
            &scope,
            Ipv4Addr::new(10, 0, 9, 9),
            &mac("aa:bb:cc:dd:ee:ff"),
            ClientTypes::Both,
        );
        assert!(result.is_err());
        assert!(service.reservations(&scope).unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_state_file_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "not json").unwrap();

        let result = LocalDhcpService::open(ServiceConfig::new(server()).with_state_file(&path));
        assert!(matches!(result, Err(ServiceError::Unavailable(_))));
    }
}
