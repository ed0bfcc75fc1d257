//! Source tree discovery.
//!
//! Walks an exported site and lists what a conversion run will touch:
//!
//! ```text
//! export/                     markdown/
//! ├── index.html        ─▶    ├── index.md
//! ├── Guides/                 ├── Guides/
//! │   └── Setup.HTML    ─▶    │   └── Setup.md
//! ├── notes.txt               │
//! └── attachments/      ─▶    └── attachments/   (copied as-is)
//!     └── logo.png                └── logo.png
//! ```
//!
//! - A **page** is any regular file whose extension is `html`, compared
//!   case-insensitively. Its output path is the same relative path with the
//!   extension replaced by `md`.
//! - **Attachments** are the `attachments/` directory directly under the
//!   root, if there is one.
//! - Symlinks are not followed. Everything else is ignored.
//!
//! Pages are sorted by relative path so that runs are reproducible.

use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Name of the attachments directory under the source and output roots.
pub const ATTACHMENTS_DIR: &str = "attachments";

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Failed to walk source tree: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Source directory not found: {0}")]
    MissingRoot(PathBuf),
}

/// Everything a conversion run will read.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub root: PathBuf,
    pub pages: Vec<PageEntry>,
    pub attachments: Option<AttachmentDir>,
}

/// One HTML page and where its Markdown goes, both relative to their roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageEntry {
    pub source: PathBuf,
    pub output: PathBuf,
}

impl PageEntry {
    pub fn new(source: PathBuf) -> Self {
        let output = markdown_path(&source);
        Self { source, output }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentDir {
    /// Relative to the source root.
    pub path: PathBuf,
    pub files: usize,
}

/// Whether `path` names an HTML page. A file called just `.html` counts.
pub fn is_page(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("html"))
        || is_bare_suffix(path)
}

/// `dir/page.html` → `dir/page.md`, and `dir/.html` → `dir/.md`.
pub fn markdown_path(page: &Path) -> PathBuf {
    if is_bare_suffix(page) {
        return page.with_file_name(".md");
    }
    page.with_extension("md")
}

/// `Path::extension` sees no extension in a file named `.html`.
fn is_bare_suffix(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.eq_ignore_ascii_case(".html"))
}

pub fn scan(root: &Path) -> Result<Manifest, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::MissingRoot(root.to_path_buf()));
    }

    let mut pages = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry?;
        if !entry.file_type().is_file() || !is_page(entry.path()) {
            continue;
        }
        // Every walked path lives under the root.
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        pages.push(PageEntry::new(relative.to_path_buf()));
    }
    pages.sort_by(|a, b| a.source.cmp(&b.source));

    let attachments_root = root.join(ATTACHMENTS_DIR);
    let attachments = if attachments_root.is_dir() {
        Some(AttachmentDir {
            path: PathBuf::from(ATTACHMENTS_DIR),
            files: count_files(&attachments_root)?,
        })
    } else {
        None
    };

    Ok(Manifest {
        root: root.to_path_buf(),
        pages,
        attachments,
    })
}

fn count_files(dir: &Path) -> Result<usize, ScanError> {
    let mut files = 0;
    for entry in WalkDir::new(dir).follow_links(false) {
        if entry?.file_type().is_file() {
            files += 1;
        }
    }
    Ok(files)
}
