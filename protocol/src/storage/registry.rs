//! # Driver Registry
//!
//! The ordered set of storage drivers a router routes across. Registration
//! order matters: it is the default trial order for every get and put, so
//! register the fastest / most authoritative backend first.
//!
//! The registry is an explicitly owned object, not process-global state.
//! Construct one, register drivers into it, and hand it (via `Arc`) to a
//! [`StorageRouter`](crate::storage::StorageRouter). Tests get isolated
//! driver sets for free.
//!
//! Registration is expected to finish before concurrent traffic starts;
//! the interior lock makes late registration safe, but the ordering of a
//! registration racing a fan-out is unspecified.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use super::driver::{Capability, StorageDriver};

/// An ordered, name-deduplicated collection of storage drivers.
#[derive(Default)]
pub struct DriverRegistry {
    drivers: RwLock<Vec<Arc<dyn StorageDriver>>>,
}

impl DriverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a driver.
    ///
    /// Idempotent by name: registering the same name twice leaves the
    /// first registration in place and keeps its position in the trial
    /// order. A driver with missing capabilities is still accepted; each
    /// gap is logged as a warning so misconfigured deployments are visible
    /// without being fatal.
    pub fn register(&self, driver: Arc<dyn StorageDriver>) {
        let mut drivers = self.drivers.write();
        if drivers.iter().any(|d| d.name() == driver.name()) {
            debug!(driver = driver.name(), "driver already registered");
            return;
        }

        for cap in Capability::ALL {
            if !driver.capabilities().contains(&cap) {
                warn!(
                    driver = driver.name(),
                    method = cap.method_name(),
                    "storage driver is missing a method"
                );
            }
        }

        debug!(driver = driver.name(), "registered storage driver");
        drivers.push(driver);
    }

    /// All registered drivers, in registration order.
    pub fn list(&self) -> Vec<Arc<dyn StorageDriver>> {
        self.drivers.read().clone()
    }

    /// Look up a driver by name.
    pub fn find(&self, name: &str) -> Option<Arc<dyn StorageDriver>> {
        self.drivers.read().iter().find(|d| d.name() == name).cloned()
    }

    /// The drivers that claim to serve the given URL.
    ///
    /// Drivers without the `handles_url` capability are skipped, not
    /// treated as non-matching.
    pub fn drivers_for_url(&self, url: &str) -> Vec<Arc<dyn StorageDriver>> {
        self.list()
            .into_iter()
            .filter(|d| d.handles_url(url).unwrap_or(false))
            .collect()
    }

    /// All URLs under which registered drivers would serve a mutable
    /// datum. `use_only`, when non-empty, restricts which drivers are
    /// asked. Drivers that cannot make URLs are skipped.
    pub fn mutable_urls_for(&self, fq_data_id: &str, use_only: &[String]) -> Vec<String> {
        let mut urls = Vec::new();
        for driver in self.list() {
            if !use_only.is_empty() && !use_only.iter().any(|n| n == driver.name()) {
                continue;
            }
            match driver.make_mutable_url(fq_data_id) {
                Ok(url) => urls.push(url),
                Err(err) => {
                    debug!(driver = driver.name(), %err, "cannot make mutable URL");
                }
            }
        }
        urls
    }

    /// Number of registered drivers.
    pub fn len(&self) -> usize {
        self.drivers.read().len()
    }

    /// Whether the registry holds no drivers.
    pub fn is_empty(&self) -> bool {
        self.drivers.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::MemoryDriver;

    #[test]
    fn registration_is_idempotent_and_ordered() {
        let registry = DriverRegistry::new();
        registry.register(Arc::new(MemoryDriver::new("alpha")));
        registry.register(Arc::new(MemoryDriver::new("beta")));
        registry.register(Arc::new(MemoryDriver::new("alpha")));

        let names: Vec<_> = registry.list().iter().map(|d| d.name().to_string()).collect();
        assert_eq!(names, vec!["alpha", "beta"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn find_by_name() {
        let registry = DriverRegistry::new();
        assert!(registry.is_empty());
        registry.register(Arc::new(MemoryDriver::new("alpha")));

        assert_eq!(registry.find("alpha").unwrap().name(), "alpha");
        assert!(registry.find("missing").is_none());
    }

    #[test]
    fn drivers_for_url_filters_by_claim() {
        let registry = DriverRegistry::new();
        registry.register(Arc::new(MemoryDriver::new("alpha")));
        registry.register(Arc::new(MemoryDriver::new("beta")));

        let matches = registry.drivers_for_url("memory://alpha/alice.id:profile");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].name(), "alpha");

        assert!(registry.drivers_for_url("ftp://nowhere").is_empty());
    }

    #[test]
    fn capability_gaps_are_accepted() {
        let registry = DriverRegistry::new();
        let partial =
            MemoryDriver::with_capabilities("partial", &[Capability::GetImmutable]);
        registry.register(Arc::new(partial));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn mutable_urls_for_respects_use_only() {
        let registry = DriverRegistry::new();
        registry.register(Arc::new(MemoryDriver::new("alpha")));
        registry.register(Arc::new(MemoryDriver::new("beta")));

        let all = registry.mutable_urls_for("alice.id:profile", &[]);
        assert_eq!(all.len(), 2);

        let only = registry.mutable_urls_for("alice.id:profile", &["beta".to_string()]);
        assert_eq!(only, vec!["memory://beta/alice.id:profile"]);
    }
}
