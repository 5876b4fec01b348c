//! Markup parsing.
//!
//! Markup is parsed as an HTML fragment in a `<template>` context, so any
//! content a template may hold (table rows and cells, `<style>`, bare text)
//! parses as written. html5ever's RcDom output is then converted into the
//! host arena. The result is a detached fragment: the top-level nodes, with
//! no parent in the document.

use html5ever::tendril::TendrilSink;
use html5ever::{local_name, ns, parse_fragment as parse_html_fragment, QualName};
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};

use super::dom::{Document, ElementId};
use crate::error::{Error, Result};

/// Parse markup into detached top-level nodes (text runs included).
pub fn parse_fragment(doc: &mut Document, markup: &str) -> Result<Vec<ElementId>> {
    let context = QualName::new(None, ns!(html), local_name!("template"));
    let dom = parse_html_fragment(RcDom::default(), Default::default(), context, Vec::new(), false)
        .one(markup);

    // Fragment parsing puts the top-level nodes under a single html root.
    let root = dom.document.children.borrow().first().cloned();
    let Some(root) = root else {
        return Err(Error::InvalidMarkup {
            reason: "parser produced no fragment root".to_string(),
        });
    };

    let mut top_level = Vec::new();
    for child in root.children.borrow().iter() {
        if let Some(id) = convert_node(doc, child) {
            top_level.push(id);
        }
    }
    tracing::trace!(nodes = top_level.len(), "parsed markup fragment");
    Ok(top_level)
}

/// Parse markup and return its first top-level element.
///
/// The remaining top-level nodes are freed.
pub fn parse_first_element(doc: &mut Document, markup: &str) -> Result<ElementId> {
    let nodes = parse_fragment(doc, markup)?;
    let first = nodes.iter().copied().find(|id| doc.is_element(*id));
    for id in nodes {
        if Some(id) != first {
            doc.free_subtree(id, &|_| false);
        }
    }
    first.ok_or_else(|| Error::InvalidMarkup {
        reason: format!("markup contains no element: {markup:?}"),
    })
}

/// Convert an RcDom node (and its subtree) into the arena.
fn convert_node(doc: &mut Document, handle: &Handle) -> Option<ElementId> {
    match &handle.data {
        RcNodeData::Text { contents } => {
            let text = contents.borrow().to_string();
            Some(doc.create_text(&text))
        }
        RcNodeData::Element { name, attrs, .. } => {
            let id = doc.create_element(&name.local);
            for attr in attrs.borrow().iter() {
                doc.set_attribute(id, &attr.name.local, &attr.value);
            }
            for child in handle.children.borrow().iter() {
                if let Some(child_id) = convert_node(doc, child) {
                    doc.append_child(id, child_id);
                }
            }
            Some(id)
        }
        // Comments, doctypes, and processing instructions have no place in a
        // component tree.
        _ => None,
    }
}
