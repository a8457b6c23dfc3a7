//! Single source of truth for the data model shared across the resolver,
//! customization engine, cache, and working-directory builder.
//!
//! All other modules import types from here to ensure consistency.

pub mod condition;
pub mod customization;
pub mod library;
pub mod manifest;
pub mod source;
pub mod template;

pub use condition::*;
pub use customization::*;
pub use library::*;
pub use manifest::*;
pub use source::*;
pub use template::*;
