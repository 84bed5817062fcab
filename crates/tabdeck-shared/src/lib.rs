//! Helpers shared by every tabdeck crate: the opt-in diagnostics trace and
//! the data directory layout.

pub mod diagnostics;
pub mod paths;
