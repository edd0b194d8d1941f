//! Non-remappable region ledger.
//!
//! Records, per method version, the body regions whose mapping to the
//! running code has become a constant line offset. The ledger lives for a
//! whole debugging session and only ever grows.
//!
//! # Thread Safety
//!
//! The mapping is immutable and shared through `ArcSwap`: readers take a
//! snapshot, a commit replaces the whole mapping in one pointer swap.

use arc_swap::ArcSwap;
use log::{debug, info};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::debugger::ManagedMethodId;
use crate::error::{EncError, EncResult};
use crate::text::LinePositionSpan;

/// A region of an earlier method version, still valid at a line offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NonRemappableRegion {
    /// Span as compiled into the method version the region is keyed by.
    pub original_span: LinePositionSpan,
    /// Lines to add to `original_span` to get the running position.
    pub line_delta: i32,
    pub is_exception_region: bool,
}

impl NonRemappableRegion {
    pub fn new(original_span: LinePositionSpan, line_delta: i32, is_exception_region: bool) -> Self {
        Self {
            original_span,
            line_delta,
            is_exception_region,
        }
    }

    /// Where the region sits in the running code.
    pub fn new_span(&self) -> LinePositionSpan {
        self.original_span.add_line_delta(self.line_delta)
    }
}

/// Immutable method-to-regions mapping.
///
/// Keyed by exact method version; lookups never fall back to other
/// versions of the same method.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NonRemappableRegions {
    regions: BTreeMap<ManagedMethodId, Vec<NonRemappableRegion>>,
}

impl NonRemappableRegions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Regions recorded for exactly this method version.
    pub fn get(&self, method: &ManagedMethodId) -> &[NonRemappableRegion] {
        self.regions.get(method).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains_method(&self, method: &ManagedMethodId) -> bool {
        self.regions.contains_key(method)
    }

    /// Methods in ascending (module, token, version) order.
    pub fn iter(&self) -> impl Iterator<Item = (&ManagedMethodId, &[NonRemappableRegion])> {
        self.regions
            .iter()
            .map(|(method, regions)| (method, regions.as_slice()))
    }

    /// Number of methods with regions.
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Total number of regions across all methods.
    pub fn region_count(&self) -> usize {
        self.regions.values().map(Vec::len).sum()
    }

    /// A copy of this mapping with `additions` appended after any regions
    /// already recorded for the same method.
    pub fn with_appended<I>(&self, additions: I) -> Self
    where
        I: IntoIterator<Item = (ManagedMethodId, NonRemappableRegion)>,
    {
        let mut regions = self.regions.clone();
        for (method, region) in additions {
            regions.entry(method).or_default().push(region);
        }
        Self { regions }
    }
}

impl Serialize for NonRemappableRegions {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeSeq;
        let mut seq = serializer.serialize_seq(Some(self.regions.len()))?;
        for (method, regions) in &self.regions {
            seq.serialize_element(&MethodRegions { method, regions })?;
        }
        seq.end()
    }
}

#[derive(Serialize)]
struct MethodRegions<'a> {
    method: &'a ManagedMethodId,
    regions: &'a [NonRemappableRegion],
}

/// Session-wide holder of the current [`NonRemappableRegions`].
pub struct NonRemappableRegionLedger {
    current: ArcSwap<NonRemappableRegions>,
}

impl std::fmt::Debug for NonRemappableRegionLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NonRemappableRegionLedger")
            .field("methods", &self.current.load().len())
            .finish()
    }
}

impl Default for NonRemappableRegionLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl NonRemappableRegionLedger {
    pub fn new() -> Self {
        Self {
            current: ArcSwap::new(Arc::new(NonRemappableRegions::new())),
        }
    }

    /// The mapping as of now. Later commits don't affect the snapshot.
    pub fn snapshot(&self) -> Arc<NonRemappableRegions> {
        self.current.load_full()
    }

    /// Replace `base` with `updated`.
    ///
    /// Fails with [`EncError::StaleUpdate`] and leaves the ledger untouched
    /// if another commit landed after `base` was taken.
    pub fn commit(
        &self,
        base: &Arc<NonRemappableRegions>,
        updated: Arc<NonRemappableRegions>,
    ) -> EncResult<()> {
        let methods = updated.len();
        let previous = self.current.compare_and_swap(base, updated);
        if !Arc::ptr_eq(&*previous, base) {
            return Err(EncError::StaleUpdate);
        }
        debug!(
            target: "enc_remap::ledger",
            "Committed non-remappable regions for {} methods",
            methods
        );
        Ok(())
    }

    /// Regions recorded for exactly this method version.
    pub fn regions_for(&self, method: &ManagedMethodId) -> Vec<NonRemappableRegion> {
        self.current.load().get(method).to_vec()
    }

    /// Drop everything; called when the debugging session ends.
    pub fn clear(&self) {
        let previous = self.current.swap(Arc::new(NonRemappableRegions::new()));
        info!(
            target: "enc_remap::ledger",
            "Cleared non-remappable regions of {} methods",
            previous.len()
        );
    }
}
