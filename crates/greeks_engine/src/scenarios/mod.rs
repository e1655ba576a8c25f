//! Scenario analysis: heterogeneous market shifts applied and unwound as a unit.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────┐
//! │                 Scenario Composer                 │
//! ├───────────────────────────────────────────────────┤
//! │  ScenarioShift    - save / shift / refit / restore│
//! │  Scenario         - Named, ordered list of shifts │
//! │  ScenarioComposer - Execution & P&L               │
//! └───────────────────────────────────────────────────┘
//! ```
//!
//! Shifts see the cumulative effect of the shifts before them, so a
//! correlation shift placed after a default event applies to the defaulted
//! market.

mod composer;
mod shift;
mod shifts;

pub use composer::{Scenario, ScenarioComposer};
pub use shift::{ScenarioContext, ScenarioShift, ShiftOutcome};
pub use shifts::{CurveQuoteShift, DateRollShift, DefaultEventShift, TermChangeShift};
