//! Concrete provider implementations.

pub mod eodhd;
