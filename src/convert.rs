//! One HTML file in, one Markdown file out.
//!
//! ```text
//! source.html ─▶ parse ─▶ extract #main-content > * ─▶ sanitize
//!             ─▶ backend.convert ─▶ normalize ─▶ dest.md
//! ```
//!
//! A [`Pipeline`] is built once per run and shared by every worker. Each
//! [`Pipeline::convert_file`] call owns its document from parse to write, so
//! concurrent calls on distinct paths never touch the same state.

use crate::backend::{self, BackendError, MarkdownBackend};
use crate::config::ConvertConfig;
use crate::html;
use crate::normalize::{RuleSet, normalize};
use crate::types::Method;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Failed to read {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// What one conversion produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileReport {
    /// Elements found under the content container. Zero means the page had
    /// no container and an empty document was written.
    pub nodes: usize,
    pub bytes: usize,
}

impl FileReport {
    pub fn is_empty(&self) -> bool {
        self.nodes == 0
    }
}

/// Backend plus rule set for one conversion method.
pub struct Pipeline {
    method: Method,
    backend: Box<dyn MarkdownBackend>,
    rules: RuleSet,
}

impl Pipeline {
    pub fn from_config(config: &ConvertConfig) -> Self {
        Self::with_backend(
            config.method,
            backend::for_method(config.method, config),
            RuleSet::from_config(&config.normalize),
        )
    }

    /// Pipeline around an explicit backend (allows testing with mock).
    pub fn with_backend(method: Method, backend: Box<dyn MarkdownBackend>, rules: RuleSet) -> Self {
        Self {
            method,
            backend,
            rules,
        }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// Convert `source` into `dest`, creating or overwriting it.
    ///
    /// The parent directory of `dest` must already exist.
    pub fn convert_file(&self, source: &Path, dest: &Path) -> Result<FileReport, ConvertError> {
        let parse_error = |source_err| ConvertError::Parse {
            path: source.to_path_buf(),
            source: source_err,
        };
        let dom = {
            let file = File::open(source).map_err(parse_error)?;
            html::parse_document(&mut BufReader::new(file)).map_err(parse_error)?
        };

        let fragment = html::extract(&dom);
        for node in fragment.nodes() {
            html::sanitize(node);
        }
        if fragment.is_empty() {
            log::debug!(
                "{}: no #{} element, writing empty document",
                source.display(),
                html::CONTENT_ID
            );
        }

        let raw = self.backend.convert(&fragment)?;
        let markdown = normalize(&raw, self.method, &self.rules);

        std::fs::write(dest, &markdown).map_err(|e| ConvertError::Write {
            path: dest.to_path_buf(),
            source: e,
        })?;

        Ok(FileReport {
            nodes: fragment.len(),
            bytes: markdown.len(),
        })
    }
}
