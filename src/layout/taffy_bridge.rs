//! Taffy Bridge - block layout of the host tree.
//!
//! Mirrors the connected host tree into a Taffy tree (every element a column
//! flex container, text runs as measured leaves), computes layout against the
//! viewport width, and reads back absolute rectangles.

use std::collections::HashMap;

use taffy::{
    AvailableSpace, Dimension, Display, FlexDirection, NodeId, Size, Style, TaffyTree,
};

use crate::error::{Error, Result};
use crate::host::{self, Document, ElementId};
use crate::types::{ScrollBlock, ScrollIntoViewOptions};

use super::types::BoundingRect;

/// Width of one character of text, in pixels.
pub const CHAR_WIDTH: f32 = 8.0;
/// Height of one line of text, in pixels.
pub const LINE_HEIGHT: f32 = 16.0;

// =============================================================================
// STYLE CONVERSION
// =============================================================================

/// `"120px"` or `"120"` -> 120.0. Anything else is treated as auto.
fn parse_px(value: &str) -> Option<f32> {
    value.trim().trim_end_matches("px").trim().parse::<f32>().ok()
}

fn to_dimension(value: Option<String>) -> Dimension {
    match value.as_deref().and_then(parse_px) {
        Some(px) => Dimension::Length(px),
        None => Dimension::Auto,
    }
}

fn build_style(doc: &Document, id: ElementId) -> Style {
    let hidden = doc.get_attribute(id, "hidden").is_some()
        || doc.get_style(id, "display").as_deref() == Some("none");
    Style {
        display: if hidden { Display::None } else { Display::Flex },
        flex_direction: FlexDirection::Column,
        size: Size {
            width: to_dimension(doc.get_style(id, "width")),
            height: to_dimension(doc.get_style(id, "height")),
        },
        min_size: Size {
            width: Dimension::Auto,
            height: to_dimension(doc.get_style(id, "min-height")),
        },
        max_size: Size {
            width: Dimension::Auto,
            height: to_dimension(doc.get_style(id, "max-height")),
        },
        ..Default::default()
    }
}

/// Text runs wrap at the available width.
fn measure_text(
    chars: usize,
    known_dimensions: Size<Option<f32>>,
    available_space: Size<AvailableSpace>,
) -> Size<f32> {
    if chars == 0 {
        return Size::ZERO;
    }
    let natural = chars as f32 * CHAR_WIDTH;
    let avail = match available_space.width {
        AvailableSpace::Definite(w) => w.max(CHAR_WIDTH),
        AvailableSpace::MinContent => CHAR_WIDTH,
        AvailableSpace::MaxContent => f32::MAX,
    };
    let width = natural.min(avail);
    let per_line = (width / CHAR_WIDTH).floor().max(1.0) as usize;
    let lines = chars.div_ceil(per_line);
    Size {
        width: known_dimensions.width.unwrap_or(width),
        height: known_dimensions.height.unwrap_or(lines as f32 * LINE_HEIGHT),
    }
}

// =============================================================================
// TREE MIRROR
// =============================================================================

struct Mirror {
    tree: TaffyTree<usize>,
    nodes: HashMap<ElementId, NodeId>,
}

fn layout_error(err: taffy::TaffyError) -> Error {
    Error::Layout {
        reason: err.to_string(),
    }
}

fn mirror_node(doc: &Document, mirror: &mut Mirror, id: ElementId) -> Result<NodeId> {
    let node = if doc.is_element(id) {
        let mut kids = Vec::new();
        for child in doc.child_nodes(id) {
            kids.push(mirror_node(doc, mirror, child)?);
        }
        mirror
            .tree
            .new_with_children(build_style(doc, id), &kids)
            .map_err(layout_error)?
    } else {
        let chars = doc.text_content(id).chars().count();
        mirror
            .tree
            .new_leaf_with_context(Style::default(), chars)
            .map_err(layout_error)?
    };
    mirror.nodes.insert(id, node);
    Ok(node)
}

fn compute(doc: &Document) -> Result<Mirror> {
    let mut mirror = Mirror {
        tree: TaffyTree::new(),
        nodes: HashMap::new(),
    };
    let root = mirror_node(doc, &mut mirror, doc.body())?;

    // The body spans the viewport; an auto-width flex root would shrink to
    // its content.
    let (width, _) = doc.viewport();
    let mut root_style = build_style(doc, doc.body());
    root_style.size.width = Dimension::Length(width);
    mirror.tree.set_style(root, root_style).map_err(layout_error)?;

    let available = Size {
        width: AvailableSpace::Definite(width),
        height: AvailableSpace::MaxContent,
    };
    mirror
        .tree
        .compute_layout_with_measure(
            root,
            available,
            |known_dimensions, available_space, _node_id, context: Option<&mut usize>, _style| {
                match context {
                    Some(chars) => measure_text(*chars, known_dimensions, available_space),
                    None => Size::ZERO,
                }
            },
        )
        .map_err(layout_error)?;
    Ok(mirror)
}

// =============================================================================
// PUBLIC API
// =============================================================================

/// Document-relative rectangle of a connected element.
///
/// `None` when the element is detached from the document.
pub fn bounding_rect(id: ElementId) -> Result<Option<BoundingRect>> {
    host::with_document(|doc| {
        if !doc.is_connected(id) {
            return Ok(None);
        }
        let mirror = compute(doc)?;

        // Taffy locations are parent-relative; sum them up the chain.
        let mut x = 0.0;
        let mut y = 0.0;
        for el in doc.ancestors(id) {
            let Some(&node) = mirror.nodes.get(&el) else { continue };
            let layout = mirror.tree.layout(node).map_err(layout_error)?;
            x += layout.location.x;
            y += layout.location.y;
        }
        let Some(&node) = mirror.nodes.get(&id) else {
            return Ok(None);
        };
        let layout = mirror.tree.layout(node).map_err(layout_error)?;
        Ok(Some(BoundingRect {
            x,
            y,
            width: layout.size.width,
            height: layout.size.height,
        }))
    })
}

/// Vertical scroll offset that brings `rect` into view.
fn scroll_target(rect: BoundingRect, block: ScrollBlock, current: f32, viewport: f32) -> f32 {
    let target = match block {
        ScrollBlock::Start => rect.y,
        ScrollBlock::Center => rect.y + rect.height / 2.0 - viewport / 2.0,
        ScrollBlock::End => rect.y + rect.height - viewport,
        ScrollBlock::Nearest => {
            if rect.y >= current && rect.y + rect.height <= current + viewport {
                current
            } else if rect.y < current {
                rect.y
            } else {
                rect.y + rect.height - viewport
            }
        }
    };
    target.max(0.0)
}

/// Scroll the document so `id` is visible. Returns the new scroll offset, or
/// `None` when the element is detached.
pub fn scroll_into_view(id: ElementId, options: ScrollIntoViewOptions) -> Result<Option<f32>> {
    let Some(rect) = bounding_rect(id)? else {
        return Ok(None);
    };
    let current = host::scroll_top();
    let (_, viewport_height) = host::viewport();
    let top = scroll_target(rect, options.block, current, viewport_height);
    host::set_scroll(top, options.behavior);
    tracing::trace!(?id, top, "scrolled into view");
    Ok(Some(top))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ScrollBehavior;

    fn setup() {
        host::reset();
    }

    fn block(height: &str) -> ElementId {
        let el = host::create_element("div");
        host::set_style(el, "height", height);
        host::append_child(host::body(), el);
        el
    }

    #[test]
    fn test_stacked_blocks() {
        setup();
        let a = block("100px");
        let b = block("50px");
        let rect_a = bounding_rect(a).unwrap().unwrap();
        let rect_b = bounding_rect(b).unwrap().unwrap();
        assert_eq!(rect_a.y, 0.0);
        assert_eq!(rect_a.height, 100.0);
        assert_eq!(rect_b.y, 100.0);
        assert_eq!(rect_b.width, 1024.0);
    }

    #[test]
    fn test_detached_has_no_rect() {
        setup();
        let el = host::create_element("div");
        assert_eq!(bounding_rect(el).unwrap(), None);
    }

    #[test]
    fn test_text_wraps() {
        setup();
        host::set_viewport(80.0, 100.0);
        let p = host::create_element("p");
        host::set_text_content(p, "twenty characters!!!");
        host::append_child(host::body(), p);
        let rect = bounding_rect(p).unwrap().unwrap();
        assert_eq!(rect.height, 2.0 * LINE_HEIGHT);
    }

    #[test]
    fn test_scroll_into_view_start() {
        setup();
        block("1000px");
        let target = block("20px");
        let top = scroll_into_view(target, ScrollIntoViewOptions::smooth()).unwrap();
        assert_eq!(top, Some(1000.0));
        assert_eq!(host::scroll_top(), 1000.0);
        assert_eq!(host::scroll_behavior(), ScrollBehavior::Smooth);
    }

    #[test]
    fn test_scroll_nearest_keeps_visible_position() {
        setup();
        let first = block("20px");
        block("2000px");
        let options = ScrollIntoViewOptions {
            block: ScrollBlock::Nearest,
            ..Default::default()
        };
        assert_eq!(scroll_into_view(first, options).unwrap(), Some(0.0));
    }
}
