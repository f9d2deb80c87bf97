//! Outbound HTTP: the transport capability and the public address lookup.

pub mod address;
pub mod http;
