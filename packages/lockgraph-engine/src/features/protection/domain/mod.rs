//! Domain models for protection analysis

pub mod protection_map;

pub use protection_map::ProtectionMap;
