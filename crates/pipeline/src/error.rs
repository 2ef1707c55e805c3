use ripple_store::StoreError;

/// All errors that can abort a dispatch.
///
/// Template and query-decode failures indicate a misconfigured rule
/// set; store failures carry the underlying cause. No partial message
/// sequence is ever returned alongside an error.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A rule template failed to parse.
    #[error("template parse failed: {0}")]
    TemplateParse(#[from] handlebars::TemplateError),

    /// A rule template referenced an undefined context field or
    /// otherwise failed to render.
    #[error("template render failed: {0}")]
    TemplateRender(#[from] handlebars::RenderError),

    /// A rendered `objectOwner` condition was not valid object query
    /// options JSON.
    #[error("recipient query decode failed: {0}")]
    QueryDecode(#[from] serde_json::Error),

    /// An underlying store call failed; includes missing required
    /// entities (`StoreError::NotFound`).
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The caller's cancellation token fired.
    #[error("dispatch cancelled")]
    Cancelled,
}

impl PipelineError {
    /// Indicates whether the dispatch failed on a missing required
    /// entity.
    pub fn is_not_found(&self) -> bool {
        matches!(self, PipelineError::Store(err) if err.is_not_found())
    }
}
