//! Node primitives - handles, props, and their lifecycle.
//!
//! - [`Cmp`] - live node handle with the targeted mutators
//! - [`Props`] - declarative node configuration
//! - [`add`] / [`add_wrapped`] - node creation
//!
//! # Architecture
//!
//! Creating a node runs a fixed pipeline:
//! 1. Build the element from props (markup, tag, text, attributes, classes, styles)
//! 2. Attach listeners (capture phase, one per binding)
//! 3. Attach as root when requested
//! 4. Register the node by id
//! 5. Swap embedded `<cmp id="...">` placeholders for the live child elements
//!
//! # Embedding children
//!
//! A `Cmp` displays as its placeholder, so markup functions embed children
//! with plain formatting:
//!
//! ```ignore
//! let icon = add(Props::new().tag("i").class("icon-save"))?;
//! let button = root.add(Props::new().html_fn(move |_| {
//!     format!("<button>{icon} Save</button>")
//! }))?;
//! ```

mod builder;
mod cmp;
mod lifecycle;
mod listeners;
mod template;
mod types;

pub use builder::DEFAULT_TAG;
pub use cmp::{placeholder, Child, Cmp, WeakCmp, PLACEHOLDER_TAG};
pub use lifecycle::{add, add_wrapped};
pub use types::*;
