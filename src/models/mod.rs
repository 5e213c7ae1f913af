//! Data models

mod audit;
mod identity;
mod invite;
mod membership;
mod organization;
mod registration;

pub use audit::*;
pub use identity::*;
pub use invite::*;
pub use membership::*;
pub use organization::*;
pub use registration::*;
