use clap::Parser;
use scopeward::{
    config::{Args, Command},
    Client, DhcpService, HardwareAddress, IpRange, LocalDhcpService,
};
use std::error::Error as StdError;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn StdError>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .init();

    let service = LocalDhcpService::open(args.service_config())?;
    tracing::debug!("Using state file {}", args.state.display());

    match args.command {
        Command::Scopes => {
            let scopes = service.scopes()?;
            if scopes.is_empty() {
                println!("No scopes.");
                return Ok(());
            }
            println!("{:<16} {:<16} {:<33} {}", "Scope", "Mask", "Range", "Name");
            println!("{}", "-".repeat(76));
            for scope in scopes {
                println!(
                    "{:<16} {:<16} {:<33} {}",
                    scope.address(),
                    scope.mask(),
                    scope.ip_range(),
                    scope.name()
                );
            }
        }
        Command::AddScope {
            address,
            mask,
            start,
            end,
            name,
        } => {
            let scope = service.create_scope(address, mask, name, IpRange::new(start, end)?)?;
            println!("Created scope {}", scope);
        }
        Command::Clients { scope } => {
            let scope = service.scope(scope)?;
            let clients = scope.clients(&service)?;
            if clients.is_empty() {
                println!("No clients in scope {}.", scope.address());
                return Ok(());
            }
            println!("{:<16} {:<24} {}", "IP Address", "Hardware Address", "Name");
            println!("{}", "-".repeat(56));
            for client in clients {
                println!(
                    "{:<16} {:<24} {}",
                    client.ip_address,
                    client.hardware_address,
                    client.name.as_deref().unwrap_or("")
                );
            }
        }
        Command::AddClient {
            scope,
            ip,
            mac,
            name,
        } => {
            let scope = service.scope(scope)?;
            let mut client = Client::new(ip, mac.parse::<HardwareAddress>()?);
            client.name = name;
            service.add_client(&scope, client)?;
            println!("Recorded lease of {} in scope {}", ip, scope.address());
        }
        Command::Reservations { scope } => {
            let scope = service.scope(scope)?;
            let reservations = scope.reservations(&service).iter()?;
            if reservations.len() == 0 {
                println!("No reservations in scope {}.", scope.address());
                return Ok(());
            }
            println!("{:<16} {:<24} {}", "IP Address", "Hardware Address", "Types");
            println!("{}", "-".repeat(48));
            for reservation in reservations {
                println!(
                    "{:<16} {:<24} {}",
                    reservation.ip_address,
                    reservation.hardware_address,
                    reservation.allowed_client_types
                );
            }
        }
        Command::Reserve {
            scope,
            ip,
            mac,
            types,
        } => {
            let scope = service.scope(scope)?;
            let hardware_address: HardwareAddress = mac.parse()?;
            let collection = scope.reservations(&service);
            let reservation = match types {
                Some(types) => collection.add_reservation_with_types(ip, &hardware_address, types)?,
                None => collection.add_reservation(ip, &hardware_address)?,
            };
            println!("Reserved {}", reservation);
        }
        Command::ReserveClient { scope, ip } => {
            let scope = service.scope(scope)?;
            let client = scope
                .clients(&service)?
                .into_iter()
                .find(|client| client.ip_address == ip)
                .ok_or_else(|| format!("No client holds {} in scope {}", ip, scope.address()))?;
            let reservation = scope
                .reservations(&service)
                .add_reservation_from_client(&client)?;
            println!("Reserved {}", reservation);
        }
        Command::Unreserve { scope, ip } => {
            let scope = service.scope(scope)?;
            let reservation = scope
                .reservations(&service)
                .iter()?
                .find(|reservation| reservation.ip_address == ip)
                .ok_or_else(|| format!("No reservation for {} in scope {}", ip, scope.address()))?;
            reservation.delete(&service)?;
            println!("Removed reservation {}", reservation);
        }
        Command::DeleteScope { scope, retain_dns } => {
            let scope = service.scope(scope)?;
            let collection = scope.reservations(&service);
            if retain_dns {
                collection.remove_scope_with(&scope, true)?;
            } else {
                collection.remove_scope(&scope)?;
            }
            tracing::info!("Scope {} deleted", scope.address());
            println!("Deleted scope {}", scope.address());
        }
    }

    Ok(())
}
