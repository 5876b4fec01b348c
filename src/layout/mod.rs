//! Layout Module
//!
//! Block layout of the host tree using Taffy, for element geometry and
//! scrolling.
//!
//! # Architecture
//!
//! The layout module uses [Taffy](https://github.com/DioxusLabs/taffy) for
//! W3C-compliant flexbox computation. The bridge:
//!
//! 1. Mirrors the connected host tree into a Taffy tree
//! 2. Reads `width`/`height`/`display` from inline styles
//! 3. Measures text runs with a fixed character cell
//! 4. Sums parent-relative locations into document coordinates
//!
//! Layout is computed on demand; nothing is cached between calls.
//!
//! # Example
//!
//! ```ignore
//! use lighter::layout::{bounding_rect, scroll_into_view};
//! use lighter::ScrollIntoViewOptions;
//!
//! let rect = bounding_rect(el)?;
//! scroll_into_view(el, ScrollIntoViewOptions::smooth())?;
//! ```

mod taffy_bridge;
mod types;

pub use taffy_bridge::{bounding_rect, scroll_into_view, CHAR_WIDTH, LINE_HEIGHT};
pub use types::*;
