//! # Types
//!
//! Errors produced by a reconcile pass.

use crate::ingress::ResourceKey;
use std::fmt;
use thiserror::Error;

/// Every error collected during one pass, in the order they occurred
#[derive(Debug, Default)]
pub struct AggregateError(Vec<anyhow::Error>);

impl AggregateError {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: anyhow::Error) {
        self.0.push(error);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `Ok` when nothing was collected
    pub fn into_result(self) -> Result<(), AggregateError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [] => write!(f, "no errors"),
            [single] => write!(f, "{single:#}"),
            errors => {
                write!(f, "[")?;
                for (i, error) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{error:#}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl std::error::Error for AggregateError {}

#[derive(Debug, Error)]
pub enum ReconcilerError {
    /// The ingress no longer exists; the key is dropped without retry
    #[error("ingress {0} no longer exists")]
    StaleKey(ResourceKey),

    /// A collaborator failed for this key; the key is retried
    #[error("transient failure for {key}: {source:#}")]
    Transient {
        key: ResourceKey,
        #[source]
        source: anyhow::Error,
    },

    /// One or more providers or TLS declarations failed
    #[error("{0}")]
    Aggregate(#[from] AggregateError),
}

impl ReconcilerError {
    /// Whether the key should be requeued with backoff
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ReconcilerError::StaleKey(_))
    }
}
