//! Photo organization module.
//!
//! Moves photos and videos into a `<year>/<month>` folder structure dated
//! by embedded capture time, or modification time when there is none.
//! Planning is a dry run; nothing moves until a plan is applied.

mod executor;
mod planner;
mod types;

pub use executor::OrganizeExecutor;
pub use planner::OrganizePlanner;
pub use types::*;
