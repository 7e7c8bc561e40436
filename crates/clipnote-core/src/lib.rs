//! # clipnote-core
//!
//! Core types, traits, and abstractions for the clipnote library.
//!
//! This crate provides the foundational data structures and trait definitions
//! that other clipnote crates depend on: task and batch records, clip
//! results, the template data model, and the collaborator interfaces (page
//! renderer, article store, text analyzer).

pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod template;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use template::{Template, TemplateProperty, GENERAL_TEMPLATE_NAME};
pub use traits::*;
