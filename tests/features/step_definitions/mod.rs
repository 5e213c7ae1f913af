//! Step definitions for Cucumber scenarios

pub mod common_steps;
pub mod invite_steps;
pub mod registration_steps;
