//! Plan input model and loading.
//!
//! The analysis core consumes [`PlanData`]; [`PlanLoader`] produces it from
//! Terraform's JSON plan representation.

mod loader;
mod types;

pub use loader::PlanLoader;
pub use types::{provider_short_name, Action, PlanData, ResourceChangeInput};
