//! Wire format of the validation service.

pub mod extract;
pub mod models;
