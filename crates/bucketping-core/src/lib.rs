//! Core shared types and utilities for bucketping
//!
//! This crate contains the descriptor model, storage-key sanitization, the
//! descriptor-list codec and the protocol registry shared by the discovery
//! server and any membership layer that consumes its results.

pub mod codec;
pub mod descriptor;
pub mod key;
pub mod registry;

pub use codec::{decode_descriptors, encode_descriptors, CodecError};
pub use descriptor::{MemberAddress, MemberDescriptor};
pub use key::{cluster_prefix, member_key, sanitize, storage_key, SUFFIX};
pub use registry::{ProtocolRegistry, RegistryError, BUCKET_PING_ID, BUCKET_PING_NAME};
