use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    /// A template failed to compile or render.
    #[error("template '{name}': {source}")]
    Template {
        name: &'static str,
        #[source]
        source: tera::Error,
    },

    #[error("cannot read template override {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
}
