use crate::dhcp::{ClientTypes, Server};
use clap::{Parser, Subcommand};
use std::{net::Ipv4Addr, path::PathBuf};

#[derive(Parser, Debug)]
#[command(version, about = "Manage DHCP scope reservations", long_about = None)]
pub struct Args {
    /// JSON file holding the server state
    #[arg(short, long, default_value = "dhcp-state.json")]
    pub state: PathBuf,

    /// Log filter used when RUST_LOG is not set
    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    /// Reject every change to the server state
    #[arg(long)]
    pub read_only: bool,

    /// Server name recorded when a new state file is created
    #[arg(long, default_value = "localhost")]
    pub server_name: String,

    /// Server address recorded when a new state file is created
    #[arg(long, default_value = "127.0.0.1")]
    pub server_address: Ipv4Addr,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the scopes on the server
    Scopes,
    /// Create a scope
    AddScope {
        address: Ipv4Addr,
        mask: Ipv4Addr,
        start: Ipv4Addr,
        end: Ipv4Addr,
        #[arg(short, long, default_value = "")]
        name: String,
    },
    /// List the clients leasing in a scope
    Clients { scope: Ipv4Addr },
    /// Record a client lease in a scope
    AddClient {
        scope: Ipv4Addr,
        ip: Ipv4Addr,
        mac: String,
        #[arg(short, long)]
        name: Option<String>,
    },
    /// List the reservations of a scope
    Reservations { scope: Ipv4Addr },
    /// Reserve an address for a hardware address
    Reserve {
        scope: Ipv4Addr,
        ip: Ipv4Addr,
        mac: String,
        /// dhcp, bootp or both
        #[arg(short, long)]
        types: Option<ClientTypes>,
    },
    /// Turn an existing client lease into a reservation
    ReserveClient { scope: Ipv4Addr, ip: Ipv4Addr },
    /// Remove a reservation
    Unreserve { scope: Ipv4Addr, ip: Ipv4Addr },
    /// Delete a scope with its reservations and leases
    DeleteScope {
        scope: Ipv4Addr,
        /// Keep the DNS records registered for the scope's clients
        #[arg(long)]
        retain_dns: bool,
    },
}

impl Args {
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig::new(Server::new(self.server_name.clone(), self.server_address))
            .with_state_file(self.state.clone())
            .read_only(self.read_only)
    }
}

/// Settings for a [`LocalDhcpService`](crate::service::LocalDhcpService).
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub server: Server,
    pub state_file: Option<PathBuf>,
    pub read_only: bool,
}

impl ServiceConfig {
    /// In-memory, writable configuration for `server`.
    pub fn new(server: Server) -> Self {
        Self {
            server,
            state_file: None,
            read_only: false,
        }
    }

    pub fn with_state_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_file = Some(path.into());
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }
}
