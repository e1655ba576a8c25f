//! Shared curve handles.

use super::{Curve, CurveKind, CurveState};
use crate::types::CalibrationError;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_CURVE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a curve handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CurveId(u64);

impl CurveId {
    fn next() -> Self {
        Self(NEXT_CURVE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw identifier.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CurveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Reference to an externally owned curve.
///
/// Clones share the same curve. Name and kind are cached on the handle since
/// a curve cannot change either after construction. Locks are meant to be
/// held for a single read or mutation, never across a pricer evaluation.
///
/// Equality and hashing use the [`CurveId`].
#[derive(Clone)]
pub struct CurveHandle {
    id: CurveId,
    name: Arc<str>,
    kind: CurveKind,
    inner: Arc<RwLock<Curve>>,
}

impl CurveHandle {
    /// Wraps a curve in a new handle with a fresh identity.
    pub fn new(curve: Curve) -> Self {
        Self {
            id: CurveId::next(),
            name: Arc::from(curve.name()),
            kind: curve.kind(),
            inner: Arc::new(RwLock::new(curve)),
        }
    }

    /// Identity of the curve.
    #[inline]
    pub fn id(&self) -> CurveId {
        self.id
    }

    /// Curve name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Curve kind.
    #[inline]
    pub fn kind(&self) -> CurveKind {
        self.kind
    }

    /// Shared read access.
    pub fn read(&self) -> RwLockReadGuard<'_, Curve> {
        self.inner.read()
    }

    /// Exclusive write access.
    pub fn write(&self) -> RwLockWriteGuard<'_, Curve> {
        self.inner.write()
    }

    /// Prerequisite handles of the curve.
    pub fn prerequisites(&self) -> Vec<CurveHandle> {
        self.read().prerequisites().to_vec()
    }

    /// Snapshot of the curve state.
    pub fn snapshot(&self) -> CurveState {
        self.read().snapshot()
    }

    /// Restores a snapshot.
    pub fn restore(&self, state: CurveState) {
        self.write().restore(state);
    }

    /// Refits the curve from its quotes.
    pub fn refit(&self) -> Result<(), CalibrationError> {
        self.write().refit()
    }

    /// True when both handles refer to the same curve.
    pub fn ptr_eq(&self, other: &CurveHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for CurveHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for CurveHandle {}

impl Hash for CurveHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for CurveHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CurveHandle")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

impl fmt::Display for CurveHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::curves::CurveTenor;

    fn handle(name: &str) -> CurveHandle {
        CurveHandle::new(
            Curve::new(name, CurveKind::Discount, vec![CurveTenor::rate("1Y", 1.0, 0.01)]).unwrap(),
        )
    }

    #[test]
    fn test_ids_are_unique() {
        let a = handle("A");
        let b = handle("A");
        assert_ne!(a.id(), b.id());
        assert_ne!(a, b);
    }

    #[test]
    fn test_clone_shares_curve() {
        let a = handle("A");
        let b = a.clone();
        b.write().set_quote(0, 0.05).unwrap();
        assert_eq!(a.read().tenors()[0].quote(), 0.05);
        assert!(a.ptr_eq(&b));
        assert_eq!(a, b);
    }

    #[test]
    fn test_snapshot_restore_through_handle() {
        let a = handle("A");
        let state = a.snapshot();
        a.write().set_quote(0, 0.07).unwrap();
        a.refit().unwrap();
        a.restore(state.clone());
        assert!(a.snapshot().same_bits(&state));
    }

    #[test]
    fn test_debug_does_not_lock() {
        let a = handle("USD-OIS");
        let _guard = a.write();
        let text = format!("{:?}", a);
        assert!(text.contains("USD-OIS"));
    }
}
