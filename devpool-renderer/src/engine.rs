//! Tera rendering engine: [`TemplateKind`] enum and [`Renderer`].
//!
//! | Kind          | Template name            | Used for                         |
//! |---------------|--------------------------|----------------------------------|
//! | MirrorBody    | `mirror_body.md.tera`    | body of every mirror issue       |
//! | Announcement  | `announcement.txt.tera`  | text sent for a new mirror       |
//!
//! A user template directory may override either file by name.

use std::path::{Path, PathBuf};

use tera::Tera;

use crate::context::IssueContext;
use crate::error::RenderError;

/// Announcements are cut to this many characters.
pub const ANNOUNCEMENT_LIMIT: usize = 280;

fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RenderError {
    RenderError::Io {
        path: path.into(),
        source,
    }
}

/// Source of `kind`: `<dir>/<template name>` when present, else the
/// embedded default.
fn template_source(kind: TemplateKind, dir: Option<&Path>) -> Result<String, RenderError> {
    if let Some(path) = dir.map(|d| d.join(kind.template_name())) {
        if path.is_file() {
            return std::fs::read_to_string(&path).map_err(|e| io_err(&path, e));
        }
    }
    Ok(kind.embedded().to_string())
}

fn build_tera(user_template_dir: Option<&Path>) -> Result<Tera, RenderError> {
    let mut tera = Tera::default();
    // Issue titles and URLs are plain text, not HTML.
    tera.autoescape_on(vec![]);
    for kind in TemplateKind::all() {
        let source = template_source(*kind, user_template_dir)?;
        tera.add_raw_template(kind.template_name(), &source)
            .map_err(|e| RenderError::Template {
                name: kind.template_name(),
                source: e,
            })?;
    }
    Ok(tera)
}

// ---------------------------------------------------------------------------
// TemplateKind
// ---------------------------------------------------------------------------

/// Every piece of text the engine renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    MirrorBody,
    Announcement,
}

impl TemplateKind {
    pub fn all() -> &'static [TemplateKind] {
        &[TemplateKind::MirrorBody, TemplateKind::Announcement]
    }

    pub fn template_name(&self) -> &'static str {
        match self {
            TemplateKind::MirrorBody => "mirror_body.md.tera",
            TemplateKind::Announcement => "announcement.txt.tera",
        }
    }

    fn embedded(&self) -> &'static str {
        match self {
            TemplateKind::MirrorBody => include_str!("templates/mirror_body.md.tera"),
            TemplateKind::Announcement => include_str!("templates/announcement.txt.tera"),
        }
    }
}

// ---------------------------------------------------------------------------
// TemplateEngine
// ---------------------------------------------------------------------------

/// Compiled templates: embedded defaults, each optionally replaced by a file
/// of the same name in the user template directory. Other files there are
/// ignored.
pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    pub fn new(user_template_dir: Option<&Path>) -> Result<Self, RenderError> {
        let tera = build_tera(user_template_dir)?;
        Ok(TemplateEngine { tera })
    }

    /// Render one template. Line endings are normalised to LF and trailing
    /// whitespace is dropped so repeated renders compare equal to what the
    /// tracker stores.
    pub fn render(&self, ctx: &IssueContext, kind: TemplateKind) -> Result<String, RenderError> {
        let name = kind.template_name();
        let content = ctx
            .to_tera_context()
            .and_then(|tera_ctx| self.tera.render(name, &tera_ctx))
            .map_err(|e| RenderError::Template { name, source: e })?;
        Ok(content.replace("\r\n", "\n").trim_end().to_string())
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Renderer used by the sync engine. Create once and reuse for the whole pass.
pub struct Renderer {
    engine: TemplateEngine,
}

impl Renderer {
    /// Construct a [`Renderer`] with embedded templates only.
    pub fn new() -> Result<Self, RenderError> {
        Self::with_overrides(None)
    }

    /// Construct a [`Renderer`] whose templates may be overridden from `dir`.
    pub fn with_overrides(dir: Option<&Path>) -> Result<Self, RenderError> {
        Ok(Renderer {
            engine: TemplateEngine::new(dir)?,
        })
    }

    pub fn render_mirror_body(&self, ctx: &IssueContext) -> Result<String, RenderError> {
        self.engine.render(ctx, TemplateKind::MirrorBody)
    }

    /// Announcement text, cut to [`ANNOUNCEMENT_LIMIT`] characters.
    pub fn render_announcement(&self, ctx: &IssueContext) -> Result<String, RenderError> {
        let text = self.engine.render(ctx, TemplateKind::Announcement)?;
        Ok(truncate_chars(&text, ANNOUNCEMENT_LIMIT))
    }
}

fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
