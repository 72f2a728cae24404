//! Discovery error types
//!
//! Namespace failures are fatal at startup. Write, read and delete failures
//! are returned as values so the caller can log and count them and carry on
//! with the next timer tick.

use crate::store::StoreError;
use bucketping_core::CodecError;
use std::fmt;
use thiserror::Error;

/// Why a namespace cannot be used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceUnavailableReason {
    /// Namespace does not exist and auto-create is disabled
    Missing,
    /// Namespace exists but the caller may not access it
    AccessDenied,
    /// Creation failed because the name is owned by someone else
    CreateConflict,
    /// Backend failed while looking up or creating the namespace
    Backend,
}

impl fmt::Display for NamespaceUnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "missing"),
            Self::AccessDenied => write!(f, "access_denied"),
            Self::CreateConflict => write!(f, "create_conflict"),
            Self::Backend => write!(f, "backend"),
        }
    }
}

/// Coarse error category for matching without inspecting payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NamespaceUnavailable,
    Write,
    Read,
    Delete,
    NotInitialized,
    InvalidArgument,
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("namespace {namespace} unavailable ({reason}): {message}")]
    NamespaceUnavailable {
        namespace: String,
        reason: NamespaceUnavailableReason,
        message: String,
    },

    #[error("failed to encode descriptors for {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: CodecError,
    },

    #[error("failed to write {key}: {source}")]
    Write {
        key: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to list {prefix}: {source}")]
    List {
        prefix: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to read {key}: {source}")]
    Fetch {
        key: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to decode {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: CodecError,
    },

    #[error("failed to delete {key}: {source}")]
    Delete {
        key: String,
        #[source]
        source: StoreError,
    },

    #[error("namespace not initialized; call ensure_namespace first")]
    NotInitialized,

    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
}

impl DiscoveryError {
    pub fn namespace_unavailable(
        namespace: impl Into<String>,
        reason: NamespaceUnavailableReason,
        message: impl Into<String>,
    ) -> Self {
        Self::NamespaceUnavailable {
            namespace: namespace.into(),
            reason,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NamespaceUnavailable { .. } => ErrorKind::NamespaceUnavailable,
            Self::Encode { .. } | Self::Write { .. } => ErrorKind::Write,
            Self::List { .. } | Self::Fetch { .. } | Self::Decode { .. } => ErrorKind::Read,
            Self::Delete { .. } => ErrorKind::Delete,
            Self::NotInitialized => ErrorKind::NotInitialized,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
        }
    }

    /// Fatal errors must stop the process from proceeding with discovery
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::NamespaceUnavailable { .. })
    }

    /// Short label used for metrics
    pub fn label(&self) -> &'static str {
        match self {
            Self::NamespaceUnavailable { .. } => "namespace_unavailable",
            Self::Encode { .. } => "encode",
            Self::Write { .. } => "write",
            Self::List { .. } => "list",
            Self::Fetch { .. } => "fetch",
            Self::Decode { .. } => "decode",
            Self::Delete { .. } => "delete",
            Self::NotInitialized => "not_initialized",
            Self::InvalidArgument(_) => "invalid_argument",
        }
    }
}

pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        let ns = DiscoveryError::namespace_unavailable(
            "demo",
            NamespaceUnavailableReason::Missing,
            "does not exist",
        );
        assert_eq!(ns.kind(), ErrorKind::NamespaceUnavailable);
        assert!(ns.is_fatal());

        let write = DiscoveryError::Write {
            key: "grid/a.list".into(),
            source: StoreError::Backend("boom".into()),
        };
        assert_eq!(write.kind(), ErrorKind::Write);
        assert!(!write.is_fatal());
        assert_eq!(write.label(), "write");

        let delete = DiscoveryError::Delete {
            key: "grid/a.list".into(),
            source: StoreError::Backend("boom".into()),
        };
        assert_eq!(delete.kind(), ErrorKind::Delete);
    }

    #[test]
    fn test_namespace_message_names_reason() {
        let err = DiscoveryError::namespace_unavailable(
            "demo",
            NamespaceUnavailableReason::AccessDenied,
            "403",
        );
        let msg = err.to_string();
        assert!(msg.contains("demo"));
        assert!(msg.contains("access_denied"));
    }
}
