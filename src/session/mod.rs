//! Process-wide session state and the route guard that reads it.

mod controller;
pub mod guard;

pub use controller::SessionController;
pub use guard::{allows, check, dashboard_for, navigate, GuardDecision, Navigation, Route};
