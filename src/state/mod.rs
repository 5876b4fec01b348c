//! State modules - per-node runtime behavior driven by timers and events.
//!
//! - [`animate`] - Animation phase chains
//! - [`outside_click`] - Shared outside-click dispatch
//! - [`focus`] - Focus, caret placement, and scroll-into-view

pub mod animate;
pub mod focus;
pub mod outside_click;

pub use animate::{AnimPhase, AnimState, GotoFn, GotoIndex, PhaseFn};
