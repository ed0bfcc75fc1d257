//! HTML→Markdown conversion backends.
//!
//! The [`MarkdownBackend`] trait is the only thing the rest of the crate sees;
//! the variant is picked once per run from the [`Method`]:
//!
//! | Method | Backend | How |
//! |---|---|---|
//! | `pandoc` | [`PandocBackend`] | external `pandoc -r html -w markdown` over stdin/stdout |
//! | `godown` | [`LibraryBackend`] | in-process [`htmd`](https://docs.rs/htmd) |
//!
//! Both render the sanitized fragment the same way (node by node, skipping
//! nodes that fail to render), so swapping backends changes only the
//! Markdown dialect, not which content reaches it.

pub mod library;
pub mod pandoc;

pub use library::LibraryBackend;
pub use pandoc::PandocBackend;

use crate::config::ConvertConfig;
use crate::html::Fragment;
use crate::types::Method;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    /// Spawning, piping to, reading from, or waiting on the external filter.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
    /// The in-process converter rejected its input.
    #[error("Conversion failed: {0}")]
    Conversion(String),
}

impl BackendError {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        BackendError::Io {
            context: context.into(),
            source,
        }
    }

    /// Whether this error came from the per-file time limit.
    pub fn is_timeout(&self) -> bool {
        matches!(self, BackendError::Io { source, .. } if source.kind() == io::ErrorKind::TimedOut)
    }
}

/// Turns a sanitized content fragment into raw (unnormalized) Markdown.
///
/// Implementations must consume the whole fragment before returning and keep
/// no per-call state, so one instance can serve every worker thread.
pub trait MarkdownBackend: Sync {
    fn convert(&self, fragment: &Fragment) -> Result<String, BackendError>;
}

/// Build the backend for `method` from the run configuration.
pub fn for_method(method: Method, config: &ConvertConfig) -> Box<dyn MarkdownBackend> {
    match method {
        Method::Pandoc => Box::new(PandocBackend::from_config(&config.pandoc)),
        Method::Godown => Box::new(LibraryBackend::new()),
    }
}
