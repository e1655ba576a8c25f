//! Quote-bearing curves.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ CurveHandle  (id, name, kind)                │
//! │   └─ Arc<RwLock<Curve>>                      │
//! │        ├─ tenors: Vec<CurveTenor>  (quotes)  │
//! │        ├─ calibrator: quotes ──► ordinates   │
//! │        ├─ prerequisites: Vec<CurveHandle>    │
//! │        └─ ordinates ──► value(t)             │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Components
//!
//! - [`CurveTenor`], [`QuoteConvention`], [`HedgeInstrument`]: quote points
//! - [`Curve`], [`CurveState`], [`Ordinate`]: the curve and its snapshot
//! - [`CurveHandle`], [`CurveId`]: shared references with stable identity
//! - [`TermStructure`]: discount factor and forward views
//! - [`calibrators`]: reference calibrators

pub mod calibrators;
mod curve;
mod handle;
mod kind;
mod tenor;
mod term_structure;

pub use curve::{Curve, CurveState, Ordinate};
pub use handle::{CurveHandle, CurveId};
pub use kind::{CurveInterpolation, CurveKind};
pub use tenor::{CurveTenor, HedgeInstrument, QuoteConvention};
pub use term_structure::TermStructure;
