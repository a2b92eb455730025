//! Location capability and place-proximity resolution.

mod proximity;

pub use proximity::{closest, distance_m};

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::store::LatLon;

/// Source of single location fixes.
///
/// `current_fix` may suspend for an OS-defined interval. Implementations
/// must release any provider subscription when the returned future is
/// dropped; abandoning a pending lookup must not keep the provider
/// running.
#[async_trait]
pub trait LocationSource: Send + Sync {
    /// Obtain one fix, or fail with `LocationUnavailable` /
    /// `PermissionDenied`.
    async fn current_fix(&self) -> Result<LatLon>;
}

/// A location source that always reports the same configured fix.
///
/// Stands in for a platform provider on the desktop; built from the
/// optional `[location]` section of the configuration.
pub struct FixedLocationSource {
    fix: Option<LatLon>,
}

impl FixedLocationSource {
    pub fn new(fix: LatLon) -> Self {
        Self { fix: Some(fix) }
    }

    /// A source with no fix; every lookup fails.
    pub fn unavailable() -> Self {
        Self { fix: None }
    }
}

#[async_trait]
impl LocationSource for FixedLocationSource {
    async fn current_fix(&self) -> Result<LatLon> {
        self.fix
            .ok_or_else(|| Error::LocationUnavailable("no fix configured".into()))
    }
}
