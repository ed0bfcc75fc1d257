//! Content extraction: the `#main-content > *` selection.
//!
//! Exported wiki pages wrap their body in a `<div id="main-content">`
//! surrounded by navigation, breadcrumbs, and footers. Only the direct element
//! children of each such container are kept; everything around it is dropped.

use markup5ever_rcdom::{Handle, NodeData, RcDom};

/// `id` of the element whose children form the page body.
pub const CONTENT_ID: &str = "main-content";

/// Ordered sibling nodes selected as a page's body.
///
/// Owned by one conversion call; the handles keep the parsed document alive
/// until the fragment is dropped.
#[derive(Debug, Default, Clone)]
pub struct Fragment {
    nodes: Vec<Handle>,
}

impl Fragment {
    pub fn new(nodes: Vec<Handle>) -> Self {
        Self { nodes }
    }

    pub fn nodes(&self) -> &[Handle] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Select the immediate element children of every content container.
///
/// Containers are the elements with `id="main-content"`; exports that repeat
/// the id get the children of each one, in document order. Without any the
/// fragment is empty, which callers treat as "nothing to convert" rather than
/// an error. Nested containers are not flattened: an inner `main-content`
/// comes back as a single node of its outer one.
pub fn extract(dom: &RcDom) -> Fragment {
    let nodes = find_containers(&dom.document, CONTENT_ID)
        .iter()
        .flat_map(|container| {
            container
                .children
                .borrow()
                .iter()
                .filter(|child| matches!(child.data, NodeData::Element { .. }))
                .cloned()
                .collect::<Vec<_>>()
        })
        .collect();
    Fragment::new(nodes)
}

/// Depth-first, document-order search for elements with `id`. The search
/// does not descend into a match.
fn find_containers(root: &Handle, id: &str) -> Vec<Handle> {
    let mut found = Vec::new();
    let mut stack = vec![root.clone()];
    while let Some(node) = stack.pop() {
        if has_id(&node, id) {
            found.push(node);
            continue;
        }
        // Reverse so the leftmost child is popped first.
        stack.extend(node.children.borrow().iter().rev().cloned());
    }
    found
}

fn has_id(node: &Handle, id: &str) -> bool {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .any(|attr| attr.name.local.as_ref() == "id" && &*attr.value == id),
        _ => false,
    }
}
