//! Descriptor list codec
//!
//! A published object holds the full list of descriptors the publisher wants
//! visible, encoded as a JSON array.

use crate::descriptor::MemberDescriptor;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to encode descriptor list: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to decode descriptor list: {0}")]
    Decode(#[source] serde_json::Error),
}

pub fn encode_descriptors(descriptors: &[MemberDescriptor]) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(descriptors).map_err(CodecError::Encode)
}

pub fn decode_descriptors(bytes: &[u8]) -> Result<Vec<MemberDescriptor>, CodecError> {
    serde_json::from_slice(bytes).map_err(CodecError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::MemberAddress;

    #[test]
    fn test_encode_decode_list() {
        let list = vec![
            MemberDescriptor::new(MemberAddress::random())
                .with_logical_name("n1")
                .with_coordinator(true),
            MemberDescriptor::new(MemberAddress::random()).with_physical_address("10.0.0.2:7800"),
        ];
        let bytes = encode_descriptors(&list).unwrap();
        assert_eq!(decode_descriptors(&bytes).unwrap(), list);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let err = decode_descriptors(b"\x00\x01not json").unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));
    }

    #[test]
    fn test_decode_empty_array() {
        assert!(decode_descriptors(b"[]").unwrap().is_empty());
    }
}
