//! Shared types for the herald reminder engine.
//!
//! These types describe reminder tasks as they live in the task store and
//! can be used by any tool that needs to inspect or report on them.
//!
//! # Features
//!
//! - `sqlx`: Enables `sqlx::FromRow` derive for database integration.

pub mod ids;
pub mod kind;
pub mod task;

pub use ids::*;
pub use kind::*;
pub use task::*;
