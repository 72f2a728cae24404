//! Discovery responses
//!
//! A [`ResponseSet`] is built fresh for every discovery round and never
//! persisted. Membership layers that keep their own structure implement
//! [`ResponseCollector`] and pass it to `discover_into`.

use bucketping_core::{MemberAddress, MemberDescriptor};
use std::collections::HashSet;

/// Sink for descriptors found during a discovery round
pub trait ResponseCollector: Send {
    fn add_response(&mut self, descriptor: MemberDescriptor, is_coordinator: bool);
}

/// One discovered descriptor plus the publisher's coordinator hint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub descriptor: MemberDescriptor,
    pub is_coordinator: bool,
}

/// Responses of a single discovery round, keyed by member address.
///
/// A later response for an address already present replaces the earlier one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseSet {
    responses: Vec<Response>,
}

impl ResponseSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Response> {
        self.responses.iter()
    }

    pub fn get(&self, address: &MemberAddress) -> Option<&Response> {
        self.responses
            .iter()
            .find(|r| r.descriptor.address == *address)
    }

    pub fn contains(&self, address: &MemberAddress) -> bool {
        self.get(address).is_some()
    }

    pub fn addresses(&self) -> HashSet<MemberAddress> {
        self.responses.iter().map(|r| r.descriptor.address).collect()
    }

    /// Whether any publisher claims to be coordinator
    pub fn has_coordinator(&self) -> bool {
        self.responses.iter().any(|r| r.is_coordinator)
    }

    /// Responses from members other than `local`
    pub fn peers_excluding<'a>(
        &'a self,
        local: &'a MemberAddress,
    ) -> impl Iterator<Item = &'a Response> + 'a {
        self.responses
            .iter()
            .filter(move |r| r.descriptor.address != *local)
    }

    pub fn descriptors(&self) -> Vec<MemberDescriptor> {
        self.responses.iter().map(|r| r.descriptor.clone()).collect()
    }
}

impl ResponseCollector for ResponseSet {
    fn add_response(&mut self, descriptor: MemberDescriptor, is_coordinator: bool) {
        let response = Response {
            descriptor,
            is_coordinator,
        };
        match self
            .responses
            .iter_mut()
            .find(|r| r.descriptor.address == response.descriptor.address)
        {
            Some(existing) => *existing = response,
            None => self.responses.push(response),
        }
    }
}

impl IntoIterator for ResponseSet {
    type Item = Response;
    type IntoIter = std::vec::IntoIter<Response>;

    fn into_iter(self) -> Self::IntoIter {
        self.responses.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_replace() {
        let addr = MemberAddress::random();
        let mut set = ResponseSet::new();
        set.add_response(MemberDescriptor::new(addr).with_logical_name("old"), false);
        set.add_response(MemberDescriptor::new(addr).with_logical_name("new"), true);

        assert_eq!(set.len(), 1);
        let r = set.get(&addr).unwrap();
        assert_eq!(r.descriptor.logical_name.as_deref(), Some("new"));
        assert!(r.is_coordinator);
        assert!(set.has_coordinator());
    }

    #[test]
    fn test_peers_excluding_local() {
        let local = MemberAddress::random();
        let peer = MemberAddress::random();
        let mut set = ResponseSet::new();
        set.add_response(MemberDescriptor::new(local), false);
        set.add_response(MemberDescriptor::new(peer), false);

        let peers: Vec<_> = set.peers_excluding(&local).collect();
        assert_eq!(peers.len(), 1);
        assert_eq!(peers[0].descriptor.address, peer);
        assert_eq!(set.addresses().len(), 2);
    }

    #[test]
    fn test_empty() {
        let set = ResponseSet::new();
        assert!(set.is_empty());
        assert!(!set.has_coordinator());
        assert!(set.descriptors().is_empty());
    }
}
