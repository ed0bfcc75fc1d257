//! Shared types used across the conversion pipeline.
//!
//! [`Method`] is chosen once per run (config file or `--method`) and decides
//! both the backend variant and the normalizer rule set.

use serde::{Deserialize, Serialize};
use std::fmt;

/// HTML→Markdown conversion method.
///
/// - `pandoc`: pipe each page through an external `pandoc -r html -w markdown`.
/// - `godown`: convert in-process with the `htmd` crate.
///
/// The names match the ones exported wiki users already pass on the command
/// line, so `godown` is kept even though no Go code is involved.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    #[default]
    Pandoc,
    Godown,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Pandoc => "pandoc",
            Method::Godown => "godown",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
