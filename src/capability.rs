// Copyright (c) 2016 Anatoly Ikorsky
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

use lru::LruCache;
use mysql_common::constants::CapabilityFlags;

use std::num::NonZeroUsize;

use crate::error::ProbeError;

/// Each [`CapabilityCache`] keeps up to this number of probe results by default.
pub const DEFAULT_CAPABILITY_CACHE_SIZE: usize = 16;

/// Optional driver features the dialect may negotiate.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
#[non_exhaustive]
pub enum DriverCapability {
    /// Driver can ask the server for matched rows instead of changed rows
    /// (`CLIENT_FOUND_ROWS`), which makes affected row counts reliable.
    FoundRows,
}

impl DriverCapability {
    pub fn name(&self) -> &'static str {
        match self {
            DriverCapability::FoundRows => "CLIENT_FOUND_ROWS",
        }
    }
}

/// Outcome of a capability probe.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Capability {
    Supported,
    Unsupported,
    /// The probe itself failed. Treated as [`Capability::Unsupported`] by every consumer.
    ProbeFailed(ProbeError),
}

impl Capability {
    pub fn is_supported(&self) -> bool {
        matches!(self, Capability::Supported)
    }
}

impl From<Result<bool, ProbeError>> for Capability {
    fn from(result: Result<bool, ProbeError>) -> Self {
        match result {
            Ok(true) => Capability::Supported,
            Ok(false) => Capability::Unsupported,
            Err(err) => Capability::ProbeFailed(err),
        }
    }
}

/// Best-effort lookup of optional driver features.
pub trait CapabilityProbe {
    /// Version of the driver being probed. Probe results are cached per version.
    fn driver_version(&self) -> &str;

    /// Returns whether the driver exposes `capability`.
    fn probe(&self, capability: DriverCapability) -> Result<bool, ProbeError>;
}

/// Probe that answers from the capability flags a driver advertises.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FlagsProbe {
    driver_version: String,
    flags: CapabilityFlags,
}

impl FlagsProbe {
    pub fn new<T: Into<String>>(driver_version: T, flags: CapabilityFlags) -> Self {
        FlagsProbe {
            driver_version: driver_version.into(),
            flags,
        }
    }
}

impl CapabilityProbe for FlagsProbe {
    fn driver_version(&self) -> &str {
        &self.driver_version
    }

    fn probe(&self, capability: DriverCapability) -> Result<bool, ProbeError> {
        match capability {
            DriverCapability::FoundRows => Ok(self.flags.contains(CapabilityFlags::CLIENT_FOUND_ROWS)),
        }
    }
}

/// Caches probe results per driver version.
#[derive(Debug)]
pub struct CapabilityCache {
    cache: LruCache<(String, DriverCapability), Capability>,
}

impl CapabilityCache {
    pub fn new(cap: usize) -> CapabilityCache {
        let cap = NonZeroUsize::new(cap).unwrap_or(NonZeroUsize::MIN);
        CapabilityCache {
            cache: LruCache::new(cap),
        }
    }

    /// Returns the cached result for `capability`, probing the driver on a miss.
    ///
    /// Failed probes are cached too, so a broken probe is asked once per driver version.
    pub fn capability<P>(&mut self, probe: &P, capability: DriverCapability) -> Capability
    where
        P: CapabilityProbe + ?Sized,
    {
        let key = (probe.driver_version().to_owned(), capability);
        if let Some(cached) = self.cache.get(&key) {
            return cached.clone();
        }

        let result = Capability::from(probe.probe(capability));

        #[cfg(feature = "tracing")]
        match &result {
            Capability::ProbeFailed(err) => tracing::warn!(
                capability = capability.name(),
                driver_version = probe.driver_version(),
                error = %err,
                "capability probe failed, assuming the capability is absent"
            ),
            _ => tracing::debug!(
                capability = capability.name(),
                driver_version = probe.driver_version(),
                supported = result.is_supported(),
                "capability probed"
            ),
        }

        self.cache.put(key, result.clone());
        result
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

impl Default for CapabilityCache {
    fn default() -> Self {
        CapabilityCache::new(DEFAULT_CAPABILITY_CACHE_SIZE)
    }
}
