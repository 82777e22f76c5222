// Re-export all types from herald-types
pub use herald_types::*;
