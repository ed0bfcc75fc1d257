//! # wikidown
//!
//! Converts an exported wiki (a tree of HTML pages) into a tree of Markdown
//! documents with the same layout, copying attachments unchanged.
//!
//! Each page keeps only its content region, the children of
//! `#main-content`. Presentation attributes are stripped and links between
//! pages lose their `.html` suffix so they resolve against the new `.md` tree.
//!
//! # Architecture: Scan, then Convert
//!
//! ```text
//! 1. Scan      export/   →  Manifest        (which pages, where they go)
//! 2. Convert   Manifest  →  markdown/       (parallel, one Pipeline per run)
//! ```
//!
//! Inside the convert stage every page goes through the same [`convert::Pipeline`]:
//!
//! ```text
//! parse → extract → sanitize → backend → normalize → write
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Stage 1: walks the source tree, pairs each page with its output path |
//! | [`process`] | Stage 2: converts every page in parallel, copies attachments |
//! | [`convert`] | One file in, one file out: the per-page pipeline |
//! | [`html`] | Parsing, `#main-content` extraction, attribute sanitizing, rendering |
//! | [`backend`] | HTML→Markdown engines: external `pandoc` or in-process `htmd` |
//! | [`normalize`] | Ordered regex cleanup of backend output |
//! | [`config`] | `wikidown.toml` loading, layering, and validation |
//! | [`types`] | The conversion [`types::Method`] |
//! | [`output`] | CLI output formatting for scan and convert |
//!
//! # Design Decisions
//!
//! ## Two Interchangeable Backends
//!
//! `pandoc` produces the richer Markdown but needs an external binary; the
//! in-process backend works anywhere. Both receive the same sanitized HTML and
//! sit behind [`backend::MarkdownBackend`], so the method only changes the
//! dialect of the output and which normalization rules apply.
//!
//! ## Streaming into pandoc
//!
//! Content nodes are rendered straight into pandoc's stdin while a dedicated
//! thread drains its stdout. Neither side buffers the whole page, and large
//! pages cannot deadlock on full pipe buffers.
//!
//! ## Best-Effort Batches
//!
//! A page that fails to convert is reported and skipped; the rest of the run
//! continues. Only problems that make the whole run meaningless (missing
//! roots, an attachments copy that cannot complete) stop it.

pub mod backend;
pub mod config;
pub mod convert;
pub mod html;
pub mod normalize;
pub mod output;
pub mod process;
pub mod scan;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
