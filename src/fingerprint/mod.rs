//! Device fingerprinting.

pub mod collect;
pub mod compose;
