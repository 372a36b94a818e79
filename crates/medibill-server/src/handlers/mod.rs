//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod auth;
pub mod results;
pub mod upload;

// Re-export all handlers for use in router
pub use auth::*;
pub use results::*;
pub use upload::*;
