//! Terminology lookups for coded values.
//!
//! # Architecture
//!
//! - [`TerminologyService`] is the seam validators depend on. It answers a
//!   single question, "is this code valid?", with a plain boolean.
//! - [`SnowstormClient`] answers it remotely over HTTP using whichever
//!   [`LookupMode`](crate::core::LookupMode) the deployment configured.
//! - [`InMemoryTerminologyService`] answers it from a fixed code list and
//!   records every lookup, for tests and offline runs.
//!
//! Implementations fail closed: an unreachable server, a timeout, an
//! unexpected status or an unparseable body all mean "not valid". A code
//! that cannot be confirmed must never pass validation.

pub mod snowstorm;

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;

pub use snowstorm::{SnowstormClient, TerminologyError, TerminologyResult};

/// Trait for terminology validation services.
#[async_trait]
pub trait TerminologyService: Send + Sync {
    /// Whether the terminology authority positively confirms `code`.
    ///
    /// Returns `false` for invalid codes and for every failure to obtain an
    /// answer; implementations never surface errors to the caller.
    async fn is_valid(&self, code: &str) -> bool;
}

/// A simple in-memory terminology service.
///
/// Only codes added with [`add_code`](Self::add_code) are valid. Every call to
/// [`is_valid`](TerminologyService::is_valid) is recorded in call order.
#[derive(Debug, Default)]
pub struct InMemoryTerminologyService {
    valid_codes: HashSet<String>,
    lookups: Mutex<Vec<String>>,
}

impl InMemoryTerminologyService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_codes<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut service = Self::new();
        for code in codes {
            service.add_code(code);
        }
        service
    }

    pub fn add_code(&mut self, code: impl Into<String>) {
        self.valid_codes.insert(code.into());
    }

    /// Codes looked up so far, in call order.
    pub fn lookups(&self) -> Vec<String> {
        self.lookups
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.lock().map(|guard| guard.len()).unwrap_or_default()
    }
}

#[async_trait]
impl TerminologyService for InMemoryTerminologyService {
    async fn is_valid(&self, code: &str) -> bool {
        if let Ok(mut guard) = self.lookups.lock() {
            guard.push(code.to_string());
        }
        self.valid_codes.contains(code)
    }
}
