//! # Execution-time logging
//!
//! Wraps a call, measures its wall-clock duration and emits one `tracing`
//! event describing it. The wrapped result is handed back untouched: values
//! are not altered and errors are neither swallowed nor rewrapped.
//!
//! Both outcomes are timed. A successful call is logged at `INFO`, a failed
//! one at `WARN` together with the error's `Display` output.
//!
//! # Labels
//!
//! - [`LogExecution::method`] derives a `Type.method` identifier and logs
//!   `Method Type.method executed in N ms`
//! - [`LogExecution::labeled`] uses a caller-supplied message and logs
//!   `message - Execution time: N ms`
//!
//! # Example
//!
//! ```
//! use log_execution::LogExecution;
//!
//! struct Billing;
//!
//! # async fn example() -> Result<u32, std::io::Error> {
//! let total = LogExecution::method::<Billing>("total")
//!     .run(async { Ok::<_, std::io::Error>(42) })
//!     .await?;
//! assert_eq!(total, 42);
//! # Ok(total)
//! # }
//! ```

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

/// How a timed call is named in the log line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Label {
    /// Defaulted `Type.method` identifier
    Method(String),

    /// Caller-supplied message
    Custom(Cow<'static, str>),
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Method(name) => f.write_str(name),
            Label::Custom(message) => f.write_str(message),
        }
    }
}

/// Timing wrapper composed around a single call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogExecution {
    label: Label,
}

impl LogExecution {
    /// Names the call `Type.method`, using the last path segment of `T`
    pub fn method<T: ?Sized>(method: &str) -> Self {
        Self {
            label: Label::Method(format!("{}.{}", short_type_name::<T>(), method)),
        }
    }

    /// Names the call with a caller-supplied message
    pub fn labeled(message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            label: Label::Custom(message.into()),
        }
    }

    /// Label this wrapper logs under
    pub fn label(&self) -> &Label {
        &self.label
    }

    /// Awaits `future`, logs its duration and returns its result unchanged
    pub async fn run<F, T, E>(self, future: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let started = Instant::now();
        let result = future.await;
        self.record(started.elapsed(), result.as_ref().err());
        result
    }

    /// Synchronous counterpart of [`LogExecution::run`]
    pub fn call<F, T, E>(self, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: fmt::Display,
    {
        let started = Instant::now();
        let result = f();
        self.record(started.elapsed(), result.as_ref().err());
        result
    }

    fn record<E: fmt::Display>(&self, elapsed: Duration, error: Option<&E>) {
        let elapsed_ms = elapsed.as_millis() as u64;

        match (&self.label, error) {
            (Label::Method(name), None) => {
                tracing::info!(method = %name, elapsed_ms, "Method {} executed in {} ms", name, elapsed_ms);
            }
            (Label::Custom(message), None) => {
                tracing::info!(elapsed_ms, "{} - Execution time: {} ms", message, elapsed_ms);
            }
            (Label::Method(name), Some(error)) => {
                tracing::warn!(
                    method = %name,
                    elapsed_ms,
                    error = %error,
                    "Method {} failed after {} ms",
                    name,
                    elapsed_ms
                );
            }
            (Label::Custom(message), Some(error)) => {
                tracing::warn!(
                    elapsed_ms,
                    error = %error,
                    "{} - Failed after {} ms",
                    message,
                    elapsed_ms
                );
            }
        }
    }
}

/// Last path segment of a type name, without generic arguments
fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let without_generics = full.split('<').next().unwrap_or(full);
    without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics)
}
