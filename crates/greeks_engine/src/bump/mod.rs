//! Transactional curve bumping.
//!
//! A [`BumpTransaction`] moves the quotes of one [`TenorSelection`], refits
//! the affected curves in dependency order and puts everything back when it
//! is restored or dropped:
//!
//! ```text
//! snapshot(touched + dependents) ─► set quotes ─► refit (topological)
//!          ▲                                            │
//!          └───────────── restore (reverse order) ◄─────┘
//! ```
//!
//! Restoration reinstates the snapshots rather than refitting again, so the
//! curves come back bit-for-bit identical.
//!
//! [`TenorSelection`]: crate::selection::TenorSelection

mod transaction;

pub(crate) use transaction::refits_dependent;
pub use transaction::{BumpResult, BumpTransaction};
