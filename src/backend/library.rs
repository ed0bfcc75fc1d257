//! In-process backend built on [`htmd`](https://docs.rs/htmd) with its
//! default options. No external tools; used by the `godown` method.

use super::{BackendError, MarkdownBackend};
use crate::html::{Fragment, render_fragment};

#[derive(Debug, Default, Clone, Copy)]
pub struct LibraryBackend;

impl LibraryBackend {
    pub fn new() -> Self {
        Self
    }
}

impl MarkdownBackend for LibraryBackend {
    fn convert(&self, fragment: &Fragment) -> Result<String, BackendError> {
        let html = render_fragment(fragment);
        htmd::convert(&html).map_err(|e| BackendError::Conversion(e.to_string()))
    }
}
