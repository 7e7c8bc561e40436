//! Template extraction engine.
//!
//! Turns a live page plus a clip template into a rendered note. The pieces:
//!
//! - [`expression`]: parses `{{source | filter:arg,arg}}` tokens
//! - [`source`]: resolves source identifiers against a page
//! - [`filters`]: the value-transforming filter set
//! - [`render`]: token substitution, frontmatter, note assembly
//! - [`select`]: picks a template for a URL by glob trigger
//! - [`settings`]: loads templates from the settings document
//!
//! The engine is deliberately total: parse errors, missing selectors, and
//! unknown filters all degrade to empty or passthrough values, so a clip
//! always produces a note.

pub mod expression;
pub mod filters;
pub mod render;
pub mod select;
pub mod settings;
pub mod source;
pub mod value;

pub use expression::{Expression, FilterInvocation};
pub use render::{render_note, sanitize_note_name};
pub use select::TemplateSelector;
pub use settings::{load_templates, load_templates_str};
pub use source::{extract_content, ExtractionContext};
pub use value::Value;
