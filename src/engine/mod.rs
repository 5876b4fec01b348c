//! Engine - node registry and global settings.
//!
//! The engine holds the process-wide state every node operation consults:
//! - Registry: identifier to live node mapping, root slot, identifier minting
//! - Settings: sanitizer and attachment policy applied at root attachment
//!
//! Both are thread-local singletons behind a narrow free-function API. All
//! mutation happens synchronously on the thread that owns the host tree.

mod registry;
mod settings;

pub use registry::*;
pub use settings::*;
