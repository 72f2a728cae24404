//! Member descriptor model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque identity of a cluster member.
///
/// Equality on the address defines "same member". The long hyphenated UUID
/// form is what ends up in storage keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberAddress(Uuid);

impl MemberAddress {
    /// Generate a fresh random address
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Long form used as the member segment of a storage key
    pub fn to_long_string(&self) -> String {
        self.0.hyphenated().to_string()
    }

    /// Last 8 characters, handy for log fields
    pub fn short(&self) -> String {
        let long = self.to_long_string();
        long[long.len() - 8..].to_string()
    }
}

impl fmt::Display for MemberAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for MemberAddress {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for MemberAddress {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// One member's published record.
///
/// `is_coordinator` is the publisher's own belief about its role and is never
/// authoritative; agreement on membership happens in the collaborating layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberDescriptor {
    /// Member identity
    pub address: MemberAddress,
    /// Human-readable label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logical_name: Option<String>,
    /// Transport-level contact info, e.g. `10.0.0.4:7800`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_address: Option<String>,
    /// Coordinator hint
    #[serde(default)]
    pub is_coordinator: bool,
}

impl MemberDescriptor {
    pub fn new(address: MemberAddress) -> Self {
        Self {
            address,
            logical_name: None,
            physical_address: None,
            is_coordinator: false,
        }
    }

    pub fn with_logical_name(mut self, name: impl Into<String>) -> Self {
        self.logical_name = Some(name.into());
        self
    }

    pub fn with_physical_address(mut self, addr: impl Into<String>) -> Self {
        self.physical_address = Some(addr.into());
        self
    }

    pub fn with_coordinator(mut self, is_coordinator: bool) -> Self {
        self.is_coordinator = is_coordinator;
        self
    }

    /// Logical name if set, otherwise the short address
    pub fn display_name(&self) -> String {
        self.logical_name
            .clone()
            .unwrap_or_else(|| self.address.short())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_roundtrips_through_string() {
        let addr = MemberAddress::random();
        let parsed: MemberAddress = addr.to_long_string().parse().unwrap();
        assert_eq!(addr, parsed);
    }

    #[test]
    fn test_address_short_is_suffix() {
        let addr = MemberAddress::random();
        assert_eq!(addr.short().len(), 8);
        assert!(addr.to_long_string().ends_with(&addr.short()));
    }

    #[test]
    fn test_descriptor_builder() {
        let addr = MemberAddress::random();
        let d = MemberDescriptor::new(addr)
            .with_logical_name("n1")
            .with_physical_address("10.0.0.1:7800")
            .with_coordinator(true);
        assert_eq!(d.address, addr);
        assert_eq!(d.logical_name.as_deref(), Some("n1"));
        assert_eq!(d.physical_address.as_deref(), Some("10.0.0.1:7800"));
        assert!(d.is_coordinator);
        assert_eq!(d.display_name(), "n1");
    }

    #[test]
    fn test_descriptor_missing_optional_fields_deserialize() {
        let json = r#"{"address":"6f1c2a3e-0b5d-4c7e-9a8b-1d2e3f4a5b6c"}"#;
        let d: MemberDescriptor = serde_json::from_str(json).unwrap();
        assert!(d.logical_name.is_none());
        assert!(d.physical_address.is_none());
        assert!(!d.is_coordinator);
    }
}
