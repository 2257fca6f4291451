// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use std::fmt;

pub use anyhow::Error as AnyhowError;

/// Boxed error used to carry the concrete cause reported by a store backend.
pub type GenericError = Box<dyn std::error::Error + Send + Sync>;

/// Classification of a failed primitive store call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    NotFound,
    PermissionDenied,
    /// Retryable by the caller, the core never retries on its own. Timeouts
    /// of individual calls land here as well.
    TransientNetwork,
    Other,
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotFound => "not found",
            Self::PermissionDenied => "permission denied",
            Self::TransientNetwork => "transient network error",
            Self::Other => "store error",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{kind}, key:{key}, err:{source}")]
pub struct StoreError {
    pub kind: StoreErrorKind,
    pub key: String,
    #[source]
    pub source: GenericError,
}

impl StoreError {
    pub fn new(kind: StoreErrorKind, key: impl Into<String>, source: impl Into<GenericError>) -> Self {
        Self {
            kind,
            key: key.into(),
            source: source.into(),
        }
    }

    pub fn not_found(key: impl Into<String>) -> Self {
        let key = key.into();
        let msg = format!("no object under {key}");
        Self::new(StoreErrorKind::NotFound, key, msg)
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == StoreErrorKind::NotFound
    }
}

impl From<(String, object_store::Error)> for StoreError {
    fn from((key, err): (String, object_store::Error)) -> Self {
        let kind = match &err {
            object_store::Error::NotFound { .. } => StoreErrorKind::NotFound,
            object_store::Error::PermissionDenied { .. }
            | object_store::Error::Unauthenticated { .. } => StoreErrorKind::PermissionDenied,
            object_store::Error::Generic { .. } | object_store::Error::JoinError { .. } => {
                StoreErrorKind::TransientNetwork
            }
            _ => StoreErrorKind::Other,
        };
        Self::new(kind, key, err)
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// The step of a composite operation that was running when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    List,
    Download,
    Upload,
    Copy,
    Delete,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::List => "list",
            Self::Download => "download",
            Self::Upload => "upload",
            Self::Copy => "copy",
            Self::Delete => "delete",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid input, reason:{reason}")]
    Validation { reason: String },

    /// Failed before anything in the store was changed.
    #[error("Failed to {stage}, err:{source}")]
    Store {
        stage: Stage,
        #[source]
        source: StoreError,
    },

    /// Aborted after some keys were already written or deleted. Nothing is
    /// rolled back, the store is left in a mixed state.
    #[error("Partially applied, failed to {stage} after {mutated} keys changed, err:{source}")]
    PartialFailure {
        stage: Stage,
        mutated: usize,
        #[source]
        source: StoreError,
    },

    /// Rename or move copied everything but could not remove the source, so
    /// both `from` and `to` are live.
    #[error("Copied {from} to {to} but failed to remove the source, err:{source}")]
    CopySucceededDeleteFailed {
        from: String,
        to: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Cancelled before {stage} after {mutated} keys changed")]
    Cancelled { stage: Stage, mutated: usize },

    #[error(transparent)]
    Internal(#[from] AnyhowError),
}

impl Error {
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    /// Kind of the underlying store failure, if the error came from the store.
    pub fn store_kind(&self) -> Option<StoreErrorKind> {
        match self {
            Self::Store { source, .. } | Self::PartialFailure { source, .. } => Some(source.kind),
            Self::CopySucceededDeleteFailed { source, .. } => source.store_kind(),
            Self::Validation { .. } | Self::Cancelled { .. } | Self::Internal(_) => None,
        }
    }

    /// Whether the store may now hold a mix of old and new state.
    pub fn is_inconsistent(&self) -> bool {
        match self {
            Self::PartialFailure { .. } | Self::CopySucceededDeleteFailed { .. } => true,
            Self::Cancelled { mutated, .. } => *mutated > 0,
            Self::Validation { .. } | Self::Store { .. } | Self::Internal(_) => false,
        }
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Store { stage, .. }
            | Self::PartialFailure { stage, .. }
            | Self::Cancelled { stage, .. } => Some(*stage),
            Self::CopySucceededDeleteFailed { .. } => Some(Stage::Delete),
            Self::Validation { .. } | Self::Internal(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_store_error_kind() {
        let not_found = object_store::Error::NotFound {
            path: "a/b".to_string(),
            source: "missing".into(),
        };
        let err = StoreError::from(("a/b".to_string(), not_found));
        assert!(err.is_not_found());
        assert_eq!(err.key, "a/b");

        let denied = object_store::Error::PermissionDenied {
            path: "a".to_string(),
            source: "denied".into(),
        };
        let err = StoreError::from(("a".to_string(), denied));
        assert_eq!(err.kind, StoreErrorKind::PermissionDenied);

        let generic = object_store::Error::Generic {
            store: "S3",
            source: "connection reset".into(),
        };
        let err = StoreError::from(("a".to_string(), generic));
        assert_eq!(err.kind, StoreErrorKind::TransientNetwork);
    }

    #[test]
    fn test_inconsistency_classification() {
        let clean = Error::Store {
            stage: Stage::List,
            source: StoreError::not_found("a"),
        };
        assert!(!clean.is_inconsistent());
        assert_eq!(clean.store_kind(), Some(StoreErrorKind::NotFound));

        let duplicated = Error::CopySucceededDeleteFailed {
            from: "a".to_string(),
            to: "b".to_string(),
            source: Box::new(clean),
        };
        assert!(duplicated.is_inconsistent());
        assert_eq!(duplicated.stage(), Some(Stage::Delete));
        assert_eq!(duplicated.store_kind(), Some(StoreErrorKind::NotFound));

        let cancelled = Error::Cancelled {
            stage: Stage::Copy,
            mutated: 0,
        };
        assert!(!cancelled.is_inconsistent());
    }
}
