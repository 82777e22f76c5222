pub mod dispatch;
pub mod executor;
pub mod planner;
pub mod subjects;
pub mod supersession;
pub mod sweep;

pub use dispatch::*;
pub use executor::*;
pub use planner::*;
pub use subjects::*;
pub use supersession::*;
pub use sweep::*;
