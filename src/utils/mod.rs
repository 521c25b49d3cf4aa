//! Internal utilities.

pub mod path;
