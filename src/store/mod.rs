//! At-rest persistence of sealed credentials.

pub mod file;
