//! Controller-level services: CSV encoding and decoding.

pub mod export;
pub mod import;
