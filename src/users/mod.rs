// User administration module
// Profile edits for the caller, role changes and removal for admins

pub mod handlers;
pub mod service;

pub use handlers::*;
pub use service::UserService;
