//! Address types shared by scopes, clients and reservations.

use bytes::{BufMut as _, Bytes, BytesMut};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, net::Ipv4Addr, str::FromStr};
use thiserror::Error;

/// Longest hardware address a DHCP message can carry (`chaddr`).
pub const MAX_HARDWARE_ADDRESS_LEN: usize = 16;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AddressError {
    #[error("Hardware address is empty")]
    EmptyHardwareAddress,

    #[error("Hardware address '{0}' is not valid hexadecimal")]
    InvalidHardwareAddress(String),

    #[error("Hardware address is {0} bytes long, at most 16 are allowed")]
    HardwareAddressTooLong(usize),

    #[error("Range start {start} is greater than range end {end}")]
    InvalidRange { start: Ipv4Addr, end: Ipv4Addr },

    #[error("Range {start}-{end} is not inside subnet {address}/{mask}")]
    RangeOutsideSubnet {
        start: Ipv4Addr,
        end: Ipv4Addr,
        address: Ipv4Addr,
        mask: Ipv4Addr,
    },
}

/// A client hardware (MAC) address.
///
/// Displayed as upper-case, colon separated hex (`AA:BB:CC:DD:EE:FF`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HardwareAddress(Bytes);

impl HardwareAddress {
    pub fn new(bytes: Bytes) -> Result<Self, AddressError> {
        if bytes.is_empty() {
            return Err(AddressError::EmptyHardwareAddress);
        }
        if bytes.len() > MAX_HARDWARE_ADDRESS_LEN {
            return Err(AddressError::HardwareAddressTooLong(bytes.len()));
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for HardwareAddress {
    type Err = AddressError;

    /// Accepts `aa:bb:cc:dd:ee:ff`, `aa-bb-cc-dd-ee-ff` and `aabbccddeeff`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = || AddressError::InvalidHardwareAddress(trimmed.to_string());

        let digits: String = if trimmed.contains([':', '-']) {
            let mut joined = String::with_capacity(trimmed.len());
            for part in trimmed.split([':', '-']) {
                match part.len() {
                    1 => joined.push('0'),
                    2 => {}
                    _ => return Err(invalid()),
                }
                joined.push_str(part);
            }
            joined
        } else {
            trimmed.to_string()
        };

        if digits.is_empty() {
            return Err(AddressError::EmptyHardwareAddress);
        }
        if digits.len() % 2 != 0 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let mut bytes = BytesMut::with_capacity(digits.len() / 2);
        for pair in digits.as_bytes().chunks(2) {
            let pair = std::str::from_utf8(pair).map_err(|_| invalid())?;
            let byte = u8::from_str_radix(pair, 16).map_err(|_| invalid())?;
            bytes.put_u8(byte);
        }
        Self::new(bytes.freeze())
    }
}

impl fmt::Display for HardwareAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}

impl Serialize for HardwareAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for HardwareAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// An inclusive range of IPv4 addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRange")]
pub struct IpRange {
    start: Ipv4Addr,
    end: Ipv4Addr,
}

#[derive(Deserialize)]
struct RawRange {
    start: Ipv4Addr,
    end: Ipv4Addr,
}

impl TryFrom<RawRange> for IpRange {
    type Error = AddressError;

    fn try_from(raw: RawRange) -> Result<Self, Self::Error> {
        IpRange::new(raw.start, raw.end)
    }
}

impl IpRange {
    pub fn new(start: Ipv4Addr, end: Ipv4Addr) -> Result<Self, AddressError> {
        if u32::from(start) > u32::from(end) {
            return Err(AddressError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> Ipv4Addr {
        self.start
    }

    pub fn end(&self) -> Ipv4Addr {
        self.end
    }

    pub fn contains(&self, address: Ipv4Addr) -> bool {
        let addr = u32::from(address);
        addr >= u32::from(self.start) && addr <= u32::from(self.end)
    }

    /// Number of addresses in the range, `start` and `end` included.
    pub fn size(&self) -> u64 {
        u64::from(u32::from(self.end) - u32::from(self.start)) + 1
    }

    /// Whether the whole range falls inside the subnet `address/mask`.
    pub fn within_subnet(&self, address: Ipv4Addr, mask: Ipv4Addr) -> bool {
        let mask = u32::from(mask);
        let network = u32::from(address) & mask;
        u32::from(self.start) & mask == network && u32::from(self.end) & mask == network
    }
}

impl fmt::Display for IpRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}
