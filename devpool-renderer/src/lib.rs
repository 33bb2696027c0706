//! # devpool-renderer
//!
//! Tera-based rendering of the text the sync engine writes on the remote side:
//! mirror issue bodies and new-issue announcements.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use devpool_renderer::{IssueContext, Renderer};
//!
//! fn body(ctx: &IssueContext) -> Option<String> {
//!     let renderer = Renderer::new().ok()?;
//!     renderer.render_mirror_body(ctx).ok()
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;

pub use context::IssueContext;
pub use engine::{Renderer, TemplateEngine, TemplateKind, ANNOUNCEMENT_LIMIT};
pub use error::RenderError;
