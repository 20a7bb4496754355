//! Sink address records
//!
//! The collector publishes its TCP endpoint as a small fixed-size binary
//! record in a well-known file. Forwarders re-read the file on every
//! reconnect attempt, so the collector can move to a new host or port
//! without forwarder restarts.

use std::fmt;
use std::fs;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::Path;

use crate::error::{Error, Result};

/// Length of the on-disk address record in bytes
pub const ADDRESS_RECORD_LEN: usize = 19;

/// A collector endpoint as stored in the address file
///
/// Wire layout: one family byte (4 or 6), two port bytes big-endian,
/// sixteen address bytes. An IPv4 address occupies the first four address
/// bytes and the rest are zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkAddress(SocketAddr);

impl SinkAddress {
    pub fn new(addr: SocketAddr) -> Self {
        Self(addr)
    }

    pub fn socket_addr(&self) -> SocketAddr {
        self.0
    }

    /// Encode as a fixed-size address record
    pub fn encode(&self) -> [u8; ADDRESS_RECORD_LEN] {
        let mut record = [0u8; ADDRESS_RECORD_LEN];
        record[1..3].copy_from_slice(&self.0.port().to_be_bytes());
        match self.0.ip() {
            IpAddr::V4(ip) => {
                record[0] = 4;
                record[3..7].copy_from_slice(&ip.octets());
            }
            IpAddr::V6(ip) => {
                record[0] = 6;
                record[3..19].copy_from_slice(&ip.octets());
            }
        }
        record
    }

    /// Decode a fixed-size address record
    pub fn decode(record: &[u8]) -> Result<Self> {
        if record.len() != ADDRESS_RECORD_LEN {
            return Err(Error::address(format!(
                "record is {} bytes, expected {}",
                record.len(),
                ADDRESS_RECORD_LEN
            )));
        }
        let port = u16::from_be_bytes([record[1], record[2]]);
        let ip = match record[0] {
            4 => {
                let mut octets = [0u8; 4];
                octets.copy_from_slice(&record[3..7]);
                IpAddr::V4(Ipv4Addr::from(octets))
            }
            6 => {
                let mut octets = [0u8; 16];
                octets.copy_from_slice(&record[3..19]);
                IpAddr::V6(Ipv6Addr::from(octets))
            }
            family => {
                return Err(Error::address(format!("unknown address family {}", family)));
            }
        };
        Ok(Self(SocketAddr::new(ip, port)))
    }

    /// Read the record from an address file
    pub fn read_from(path: &Path) -> Result<Self> {
        let data = fs::read(path)?;
        Self::decode(&data)
    }

    /// Publish the record to an address file, creating parent directories
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.encode())?;
        Ok(())
    }
}

impl From<SocketAddr> for SinkAddress {
    fn from(addr: SocketAddr) -> Self {
        Self(addr)
    }
}

impl fmt::Display for SinkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
