//! Error types shared by the orchestration primitives

use std::any::Any;
use std::fmt;

use thiserror::Error;

/// A panic caught while running a caller-supplied closure or future.
///
/// Every primitive converts caught panics into the caller's error type via
/// `E: From<Panicked>`, so a panicking worker fails like any other worker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("panicked: {message}")]
pub struct Panicked {
    pub message: String,
}

impl Panicked {
    /// Build from a payload returned by `catch_unwind`
    pub fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_string()
        };
        Self { message }
    }
}

/// Several failures collected at a join point.
///
/// Errors are kept in the positional order of the operations that produced
/// them, never in completion order. Always holds at least one error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateError<E> {
    errors: Vec<E>,
}

impl<E> AggregateError<E> {
    /// Returns `None` when there is nothing to aggregate
    pub fn new(errors: Vec<E>) -> Option<Self> {
        if errors.is_empty() { None } else { Some(Self { errors }) }
    }

    pub fn errors(&self) -> &[E] {
        &self.errors
    }

    /// The earliest failure by position
    pub fn first(&self) -> &E {
        &self.errors[0]
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn into_errors(self) -> Vec<E> {
        self.errors
    }

    /// Collect ordered outcomes into all values, or every error in order
    pub fn from_results<T, I>(results: I) -> Result<Vec<T>, Self>
    where
        I: IntoIterator<Item = Result<T, E>>,
    {
        let mut values = Vec::new();
        let mut errors = Vec::new();
        for result in results {
            match result {
                Ok(value) => values.push(value),
                Err(err) => errors.push(err),
            }
        }
        match Self::new(errors) {
            Some(aggregate) => Err(aggregate),
            None => Ok(values),
        }
    }
}

impl<E: fmt::Display> fmt::Display for AggregateError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.first())?;
        let rest = self.errors.len() - 1;
        if rest > 0 {
            write!(f, " (and {} more error{})", rest, if rest == 1 { "" } else { "s" })?;
        }
        Ok(())
    }
}

impl<E> std::error::Error for AggregateError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.first())
    }
}
