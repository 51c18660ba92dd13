//! Resource kinds managed by opnsync
//!
//! Each kind is a unit struct implementing [`declarative::ResourceKind`]:
//! - API endpoint and response layout
//! - Field schema (defaults, required fields, choice lists)
//! - Identity and change-check fields
//! - Kind-specific validation

pub mod alias;
pub mod shaper_queue;
pub mod unbound_dot;

use anyhow::{Result, bail};
use declarative::ResourceKind;
use regex::Regex;
use std::net::IpAddr;
use std::sync::LazyLock;

pub use alias::Alias;
pub use shaper_queue::ShaperQueue;
pub use unbound_dot::DnsOverTls;

/// Every supported kind, in listing order
pub static KINDS: [&dyn ResourceKind; 3] = [&Alias, &DnsOverTls, &ShaperQueue];

/// RFC 1123 hostname, optionally fully qualified
static HOSTNAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?\.)*[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?\.?$")
        .expect("Invalid hostname regex")
});

/// Find a kind by name
pub fn lookup(name: &str) -> Result<&'static dyn ResourceKind> {
    match KINDS.iter().find(|kind| kind.name() == name) {
        Some(kind) => Ok(*kind),
        None => bail!(
            "Unknown resource kind '{}' (expected one of: {})",
            name,
            names().join(", ")
        ),
    }
}

/// Names of all supported kinds
pub fn names() -> Vec<&'static str> {
    KINDS.iter().map(|kind| kind.name()).collect()
}

pub fn is_ip(value: &str) -> bool {
    value.parse::<IpAddr>().is_ok()
}

pub fn is_hostname(value: &str) -> bool {
    value.len() <= 253 && HOSTNAME_REGEX.is_match(value)
}

/// Check a TCP/UDP port number
pub fn validate_port(port: i64) -> std::result::Result<(), String> {
    if (1..=65535).contains(&port) {
        Ok(())
    } else {
        Err(format!("port {port} is outside 1-65535"))
    }
}
