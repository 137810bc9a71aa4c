//! Auth service models

pub mod trial;
pub mod user;

// Re-export for convenience
pub use trial::TrialCode;
pub use user::{NewUser, User, UserView};
