//! Element Builder - platform element from props.
//!
//! Resolution order:
//! 1. Content: markup (function or literal, sanitized when requested) parsed
//!    to its first element, else a bare element of `tag` (default `div`)
//! 2. A markup root that is the placeholder of a live node adopts that
//!    node's element
//! 3. Literal text overwrites markup content
//! 4. Attributes, then the forced `id` attribute
//! 5. Classes
//! 6. Inline styles (`None` removes the rule)

use crate::engine::{self, sanitize};
use crate::error::{Error, Result};
use crate::host::{self, ElementId};
use crate::types::CmpFlags;

use super::cmp::{Cmp, PLACEHOLDER_TAG};
use super::template::canonical_placeholder_id;
use super::types::{Html, Props};

/// Tag used when props name neither markup nor a tag.
pub const DEFAULT_TAG: &str = "div";

pub(crate) fn build(cmp: &Cmp, props: &Props) -> Result<ElementId> {
    let elem = match &props.html {
        Some(html) => build_from_markup(cmp, html, props.sanitize.unwrap_or(false))?,
        None => host::create_element(props.tag.as_deref().unwrap_or(DEFAULT_TAG)),
    };

    if let Some(text) = &props.text {
        host::set_text_content(elem, text);
    }

    if let Some(attrs) = &props.attr {
        for (key, value) in attrs.iter() {
            host::set_attribute(elem, key, value);
        }
    }
    if props.id_attr == Some(true) {
        host::set_attribute(elem, "id", &cmp.id());
    }

    if let Some(classes) = &props.class {
        for class in classes.iter() {
            host::add_class(elem, class);
        }
    }

    if let Some(style) = &props.style {
        for (prop, value) in style.iter() {
            match value {
                Some(value) => host::set_style(elem, prop, value),
                None => host::remove_style(elem, prop),
            }
        }
    }

    Ok(elem)
}

fn build_from_markup(cmp: &Cmp, html: &Html, sanitize_requested: bool) -> Result<ElementId> {
    let raw = match html {
        Html::Markup(markup) => {
            if markup.contains(&format!("</{PLACEHOLDER_TAG}>")) {
                return Err(Error::MixedMarkupChildDeclaration { id: cmp.id() });
            }
            markup.clone()
        }
        Html::Render(render) => render(cmp),
    };
    let markup = sanitize(&raw, sanitize_requested);
    let mut elem = host::parse_first_element(&markup)?;

    // A root placeholder stands for a whole existing node.
    if let Some(id) = canonical_placeholder_id(elem) {
        if id != cmp.id() {
            let Some(child) = engine::get_cmp_by_id(&id) else {
                host::release(elem, |_| false);
                return Err(Error::DanglingPlaceholder {
                    parent: cmp.id(),
                    id,
                });
            };
            host::release(elem, |_| false);
            elem = child.elem();
            adopt(cmp, &child);
        }
    }

    let tag = host::tag(elem);
    cmp.borrow_mut().props.tag = tag;
    Ok(elem)
}

fn adopt(parent: &Cmp, child: &Cmp) {
    {
        let mut data = child.borrow_mut();
        data.parent = Some(parent.downgrade());
        data.flags.insert(CmpFlags::TEMPLATE_CHILD);
    }
    let mut data = parent.borrow_mut();
    if !data.children.contains(child) {
        data.children.push(child.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{apply_settings, Settings};
    use crate::primitives::add;
    use crate::types::StyleMap;

    fn setup() {
        crate::reset_all();
    }

    #[test]
    fn test_default_tag_and_text() {
        setup();
        let cmp = add(Props::new().text("hi")).unwrap();
        assert_eq!(host::outer_html(cmp.elem()), "<div>hi</div>");
    }

    #[test]
    fn test_text_overwrites_markup_content() {
        setup();
        let cmp = add(Props::new().html("<p><b>bold</b></p>").text("plain")).unwrap();
        assert_eq!(host::outer_html(cmp.elem()), "<p>plain</p>");
        assert_eq!(cmp.props().tag.as_deref(), Some("p"));
    }

    #[test]
    fn test_attrs_id_attr_classes_styles() {
        setup();
        let cmp = add(
            Props::new()
                .id("field")
                .tag("input")
                .id_attr(true)
                .attr([("type", "text")])
                .class(vec!["a", " b "])
                .style(StyleMap::new().with("width", "10px").without("color")),
        )
        .unwrap();
        assert_eq!(
            host::outer_html(cmp.elem()),
            r#"<input type="text" id="field" class="a b" style="width: 10px;">"#
        );
    }

    #[test]
    fn test_literal_markup_with_placeholder_is_rejected() {
        setup();
        let err = add(Props::new().id("p").html(r#"<div><cmp id="c"></cmp></div>"#)).unwrap_err();
        assert_eq!(err, Error::MixedMarkupChildDeclaration { id: "p".into() });
        assert!(!engine::is_registered("p"));
    }

    #[test]
    fn test_sanitizer_applies_when_requested() {
        setup();
        apply_settings(&Settings::new().sanitizer(|m| m.replace(" onclick=\"x()\"", "")));
        let raw = r#"<a onclick="x()">go</a>"#;
        let unsafe_cmp = add(Props::new().html(raw)).unwrap();
        assert!(host::get_attribute(unsafe_cmp.elem(), "onclick").is_some());
        let safe_cmp = add(Props::new().html(raw).sanitize(true)).unwrap();
        assert!(host::get_attribute(safe_cmp.elem(), "onclick").is_none());
    }

    #[test]
    fn test_root_placeholder_adopts_existing_node() {
        setup();
        let inner = add(Props::new().id("inner").tag("span").text("x")).unwrap();
        let outer = add(Props::new().html_fn(move |_| inner.to_string())).unwrap();
        let inner = engine::get_cmp_by_id("inner").unwrap();
        assert_eq!(outer.elem(), inner.elem());
        assert_eq!(outer.children(), vec![inner.clone()]);
        assert_eq!(inner.parent(), Some(outer.clone()));
        assert_eq!(outer.props().tag.as_deref(), Some("span"));
    }

    #[test]
    fn test_unregistered_root_placeholder_is_dangling() {
        setup();
        let before = host::element_count();
        let err = add(Props::new().id("card").html_fn(|_| crate::primitives::placeholder("missing")))
            .unwrap_err();
        assert_eq!(
            err,
            Error::DanglingPlaceholder {
                parent: "card".into(),
                id: "missing".into()
            }
        );
        assert!(!engine::is_registered("card"));
        assert_eq!(host::element_count(), before);
    }

    #[test]
    fn test_update_to_dangling_root_placeholder_restores_node() {
        setup();
        let cmp = add(Props::new().id("card").text("ok")).unwrap();
        let err = cmp
            .update(Props::new().html_fn(|_| crate::primitives::placeholder("missing")))
            .unwrap_err();
        assert!(matches!(err, Error::DanglingPlaceholder { .. }));
        assert_eq!(host::text_content(cmp.elem()), "ok");
        assert!(cmp.props().html.is_none());
    }
}
