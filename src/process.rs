//! Batch conversion of a scanned source tree.
//!
//! Takes the [`Manifest`] from the scan stage and converts every page in
//! parallel, then copies the attachments directory.
//!
//! ## Failure model
//!
//! | What fails | Effect |
//! |---|---|
//! | source or output root missing | [`ProcessError::MissingRoot`], nothing converted |
//! | one page (read, backend, write) | [`ProcessEvent::Failed`], batch continues |
//! | page without a content container | empty `.md` written, reported as empty |
//! | attachment copy | [`ProcessError::Attachments`], run aborts |
//!
//! ## Parallel Processing
//!
//! Pages are converted with [rayon](https://docs.rs/rayon) on the global pool
//! (see `processing.max_processes`). Each page is an independent
//! [`Pipeline::convert_file`] call; progress is streamed as [`ProcessEvent`]s
//! to whoever holds the receiving end, in completion order.

use crate::convert::{ConvertError, FileReport, Pipeline};
use crate::scan::{ATTACHMENTS_DIR, Manifest, PageEntry};
use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Directory not found: {0}")]
    MissingRoot(PathBuf),
    #[error("Failed to copy attachments at {path}: {source}")]
    Attachments {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Progress reported while a batch runs.
#[derive(Debug)]
pub enum ProcessEvent {
    Converted { page: PageEntry, report: FileReport },
    Failed { page: PageEntry, error: ConvertError },
    AttachmentsCopied { path: PathBuf, files: usize },
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProcessSummary {
    /// Pages written, empty ones included.
    pub converted: usize,
    /// Pages written empty because they had no content container.
    pub empty: usize,
    pub failed: usize,
    pub attachments: usize,
}

impl ProcessSummary {
    pub fn total(&self) -> usize {
        self.converted + self.failed
    }
}

/// Convert every page in `manifest` into `output_root` and copy attachments.
pub fn process(
    manifest: &Manifest,
    output_root: &Path,
    pipeline: &Pipeline,
    events: Option<Sender<ProcessEvent>>,
) -> Result<ProcessSummary, ProcessError> {
    for root in [manifest.root.as_path(), output_root] {
        if !root.is_dir() {
            return Err(ProcessError::MissingRoot(root.to_path_buf()));
        }
    }

    let outcomes: Vec<Option<FileReport>> = manifest
        .pages
        .par_iter()
        .map(|page| {
            let result = convert_page(&manifest.root, output_root, page, pipeline);
            let (outcome, event) = match result {
                Ok(report) => (
                    Some(report),
                    ProcessEvent::Converted {
                        page: page.clone(),
                        report,
                    },
                ),
                Err(error) => (
                    None,
                    ProcessEvent::Failed {
                        page: page.clone(),
                        error,
                    },
                ),
            };
            if let Some(tx) = &events {
                // Printer gone means nobody is listening; keep converting.
                let _ = tx.send(event);
            }
            outcome
        })
        .collect();

    let mut summary = ProcessSummary::default();
    for outcome in &outcomes {
        match outcome {
            Some(report) => {
                summary.converted += 1;
                if report.is_empty() {
                    summary.empty += 1;
                }
            }
            None => summary.failed += 1,
        }
    }

    if let Some(attachments) = &manifest.attachments {
        let from = manifest.root.join(&attachments.path);
        let to = output_root.join(ATTACHMENTS_DIR);
        summary.attachments = copy_attachments(&from, &to)?;
        if let Some(tx) = &events {
            let _ = tx.send(ProcessEvent::AttachmentsCopied {
                path: attachments.path.clone(),
                files: summary.attachments,
            });
        }
    }

    Ok(summary)
}

fn convert_page(
    source_root: &Path,
    output_root: &Path,
    page: &PageEntry,
    pipeline: &Pipeline,
) -> Result<FileReport, ConvertError> {
    let dest = output_root.join(&page.output);
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| ConvertError::Write {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    pipeline.convert_file(&source_root.join(&page.source), &dest)
}

/// Copy `from` recursively into `to`, byte for byte. Returns the number of
/// files copied. Existing files in `to` are overwritten.
pub fn copy_attachments(from: &Path, to: &Path) -> Result<usize, ProcessError> {
    let fail = |path: &Path, source: io::Error| ProcessError::Attachments {
        path: path.to_path_buf(),
        source,
    };

    let mut files = 0;
    for entry in WalkDir::new(from).follow_links(false) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(from).to_path_buf();
            fail(&path, e.into())
        })?;
        let relative = entry
            .path()
            .strip_prefix(from)
            .map_err(|_| fail(entry.path(), io::Error::other("path outside attachments")))?;
        let target = to.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| fail(&target, e))?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &target).map_err(|e| fail(entry.path(), e))?;
            files += 1;
        } else {
            log::warn!("skipping non-regular attachment {}", entry.path().display());
        }
    }
    Ok(files)
}
