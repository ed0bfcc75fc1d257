//! Attribute sanitizing for extracted content.
//!
//! Rules, per attribute, on every node of the subtree:
//!
//! | Attribute | Action |
//! |---|---|
//! | `id`, `class`, `style` | dropped |
//! | `href` starting with `http://` / `https://` | kept byte-identical |
//! | other `href` ending in `.html` | trailing `.html` removed (`page.html` → `page`) |
//! | anything else | kept |
//!
//! Stripping the suffix turns links between exported pages into
//! extension-less references that resolve against the converted `.md` tree.

use html5ever::tendril::StrTendril;
use markup5ever_rcdom::{Handle, NodeData};

/// Sanitize `node` and all of its descendants in place.
pub fn sanitize(node: &Handle) {
    let mut stack = vec![node.clone()];
    while let Some(current) = stack.pop() {
        if let NodeData::Element { attrs, .. } = &current.data {
            let mut attrs = attrs.borrow_mut();
            attrs.retain(|attr| !is_dropped(&attr.name.local));
            for attr in attrs.iter_mut() {
                if &*attr.name.local != "href" {
                    continue;
                }
                let rewritten = strip_html_suffix(&attr.value).map(StrTendril::from_slice);
                if let Some(value) = rewritten {
                    attr.value = value;
                }
            }
        }
        stack.extend(current.children.borrow().iter().cloned());
    }
}

fn is_dropped(name: &str) -> bool {
    matches!(name, "id" | "class" | "style")
}

/// The rewritten `href` value, or `None` when it stays as-is.
pub fn strip_html_suffix(href: &str) -> Option<&str> {
    if href.starts_with("http://") || href.starts_with("https://") {
        return None;
    }
    href.strip_suffix(".html")
}
