//! HTML parsing, content extraction, sanitizing, and fragment rendering.
//!
//! | Step | Function |
//! |---|---|
//! | **Parse** | [`parse_document`]: html5ever into an `RcDom` |
//! | **Extract** | [`extract`]: direct children of `#main-content` |
//! | **Sanitize** | [`sanitize`]: drop presentation attributes, fix links |
//! | **Render** | [`write_fragment`]: serialize nodes back to HTML for a backend |
//!
//! DOM handles are `Rc`-based: a parsed document lives and dies on the thread
//! that parsed it. Only rendered bytes ever cross a thread boundary.

mod extract;
mod sanitize;

pub use extract::{CONTENT_ID, Fragment, extract};
pub use sanitize::{sanitize, strip_html_suffix};

use html5ever::parse_document as html5ever_parse;
use html5ever::serialize::{SerializeOpts, TraversalScope, serialize};
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};
use std::io::{self, Read, Write};

/// Parse an HTML document from a reader.
///
/// html5ever recovers from malformed markup the way browsers do, so the only
/// failures here are read errors. Invalid UTF-8 is replaced, not rejected.
pub fn parse_document<R: Read>(reader: &mut R) -> io::Result<RcDom> {
    html5ever_parse(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(reader)
}

/// Parse an in-memory HTML string. Mostly useful in tests.
pub fn parse_str(html: &str) -> RcDom {
    html5ever_parse(RcDom::default(), Default::default()).one(html)
}

/// Serialize one node, including its own tag, as HTML.
pub fn render_node<W: Write>(out: W, node: &Handle) -> io::Result<()> {
    let opts = SerializeOpts {
        traversal_scope: TraversalScope::IncludeNode,
        ..Default::default()
    };
    serialize(out, &SerializableHandle::from(node.clone()), opts)
}

/// Render every node of `fragment` into `out`, in order.
///
/// A node that fails to render is logged and skipped; the rest still go out.
/// Returns the number of nodes that failed.
pub fn write_fragment<W: Write>(fragment: &Fragment, out: &mut W) -> usize {
    let mut failures = 0;
    for node in fragment.nodes() {
        if let Err(err) = render_node(&mut *out, node) {
            failures += 1;
            log::warn!(
                "failed to render <{}> element, is it malformed? {err}",
                tag_name(node).unwrap_or("?")
            );
        }
    }
    failures
}

/// Render a whole fragment to an HTML string with [`write_fragment`]'s
/// tolerance for broken nodes.
pub fn render_fragment(fragment: &Fragment) -> String {
    let mut buf = Vec::new();
    write_fragment(fragment, &mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

/// Local tag name of an element node, `None` for anything else.
pub fn tag_name(node: &Handle) -> Option<&str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.as_ref()),
        _ => None,
    }
}
