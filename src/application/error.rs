use std::error::Error as StdError;

use thiserror::Error;

use crate::{
    application::{frontmatter::FrontMatterError, render::RenderError, site::BuildError},
    config::LoadError,
    domain::error::DomainError,
    infra::error::InfraError,
    presentation::views::TemplateRenderError,
};

/// Flattened view of an error and its source chain, for logging.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self { source, messages }
    }

    /// Messages joined outermost first, skipping consecutive repeats that
    /// `#[error(transparent)]` wrappers produce.
    pub fn chain(&self) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(self.messages.len());
        for message in &self.messages {
            if parts.last() != Some(&message.as_str()) {
                parts.push(message);
            }
        }
        parts.join(": ")
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("failed to load configuration: {0}")]
    Config(#[from] LoadError),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    FrontMatter(#[from] FrontMatterError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Template(#[from] TemplateRenderError),
    #[error("{0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Process exit status for the error: `2` for invalid invocations or
    /// configuration, `1` for everything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Config(_)
            | AppError::Validation(_)
            | AppError::Infra(InfraError::Configuration { .. }) => 2,
            _ => 1,
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport::from_error("application::error::AppError", self)
    }
}
