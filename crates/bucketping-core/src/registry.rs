//! Protocol Registry
//!
//! Maps numeric protocol identifiers to protocol names. Registration is an
//! explicit call made once during process startup.

use std::collections::BTreeMap;
use thiserror::Error;

/// Numeric identifier of the bucket discovery protocol
pub const BUCKET_PING_ID: u16 = 2018;

/// Registered name of the bucket discovery protocol
pub const BUCKET_PING_NAME: &str = "BUCKET_PING";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("protocol id {id} already registered as {existing}")]
    DuplicateId { id: u16, existing: &'static str },
}

/// Process-wide table of known protocols
#[derive(Debug, Default)]
pub struct ProtocolRegistry {
    protocols: BTreeMap<u16, &'static str>,
}

impl ProtocolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a protocol id. Re-registering the same id and name is a no-op.
    pub fn register(&mut self, id: u16, name: &'static str) -> Result<(), RegistryError> {
        match self.protocols.get(&id) {
            Some(existing) if *existing == name => Ok(()),
            Some(existing) => Err(RegistryError::DuplicateId {
                id,
                existing,
            }),
            None => {
                self.protocols.insert(id, name);
                Ok(())
            }
        }
    }

    /// Register the bucket discovery protocol under its well-known id
    pub fn register_bucket_ping(&mut self) -> Result<(), RegistryError> {
        self.register(BUCKET_PING_ID, BUCKET_PING_NAME)
    }

    pub fn name_of(&self, id: u16) -> Option<&'static str> {
        self.protocols.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.protocols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.protocols.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_bucket_ping() {
        let mut registry = ProtocolRegistry::new();
        registry.register_bucket_ping().unwrap();
        assert_eq!(registry.name_of(BUCKET_PING_ID), Some(BUCKET_PING_NAME));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_reregister_same_name_is_noop() {
        let mut registry = ProtocolRegistry::new();
        registry.register_bucket_ping().unwrap();
        registry.register_bucket_ping().unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut registry = ProtocolRegistry::new();
        registry.register(BUCKET_PING_ID, "OTHER").unwrap();
        let err = registry.register_bucket_ping().unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateId {
                id: BUCKET_PING_ID,
                existing: "OTHER"
            }
        );
    }
}
