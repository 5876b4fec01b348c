//! Child Attachment Resolver - placeholder substitution.
//!
//! Markup embeds children as empty placeholder tags (`<cmp id="ID"></cmp>`).
//! After the parent's element is built, each placeholder whose serialized
//! form is exactly the canonical one is swapped for the live element of the
//! registered node with that id.

use crate::engine;
use crate::error::{Error, Result};
use crate::host::{self, ElementId};
use crate::state::{animate, focus};
use crate::types::CmpFlags;

use super::cmp::{placeholder, Cmp, PLACEHOLDER_TAG};
use super::lifecycle::{detach_from_parent, fire_on_create};

/// The id named by `el` when it serializes exactly as a placeholder.
pub(crate) fn canonical_placeholder_id(el: ElementId) -> Option<String> {
    if host::tag(el).as_deref() != Some(PLACEHOLDER_TAG) {
        return None;
    }
    let id = host::get_attribute(el, "id")?;
    (host::outer_html(el) == placeholder(&id)).then_some(id)
}

/// Ids of canonical placeholders under `elem`, in document order.
pub(crate) fn placeholder_ids(elem: ElementId) -> Vec<String> {
    host::query_all(elem, PLACEHOLDER_TAG)
        .into_iter()
        .filter_map(canonical_placeholder_id)
        .collect()
}

/// Substitute every canonical placeholder under the node's element.
///
/// Fails with [`Error::DanglingPlaceholder`] when a placeholder names a node
/// that is not registered.
pub(crate) fn resolve_template_children(cmp: &Cmp) -> Result<()> {
    let parent_id = cmp.id();
    let mut focus_target: Option<Cmp> = None;

    for el in host::query_all(cmp.elem(), PLACEHOLDER_TAG) {
        let Some(id) = canonical_placeholder_id(el) else { continue };
        let Some(child) = engine::get_cmp_by_id(&id) else {
            return Err(Error::DanglingPlaceholder {
                parent: parent_id,
                id,
            });
        };
        if child == *cmp {
            tracing::warn!(id = %parent_id, "node embeds its own placeholder; skipped");
            continue;
        }

        detach_from_parent(&child);
        host::replace_with(el, child.elem());
        host::release(el, |_| false);
        {
            let mut data = child.borrow_mut();
            data.flags.insert(CmpFlags::TEMPLATE_CHILD);
            data.parent = Some(cmp.downgrade());
        }
        cmp.borrow_mut().children.push(child.clone());
        tracing::debug!(parent = %parent_id, child = %id, "resolved template child");

        if child.borrow().props.focus == Some(true) {
            focus_target = Some(child.clone());
        }
        animate::run_anims(&child);
        fire_on_create(&child);
    }

    // Focus once the surrounding build has finished.
    if let Some(target) = focus_target {
        let weak = target.downgrade();
        host::set_timeout(0, move || match weak.upgrade() {
            Some(cmp) if !cmp.is_removed() => focus::focus_cmp(&cmp, None),
            _ => tracing::warn!("deferred focus found its node removed"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{add, Props};

    fn setup() {
        crate::reset_all();
    }

    #[test]
    fn test_resolves_placeholder_once_with_parent_link() {
        setup();
        let child = add(Props::new().id("icon").tag("i").text("*")).unwrap();
        let c = child.clone();
        let parent = add(Props::new().id("btn").html_fn(move |_| format!("<button>Go {c}</button>"))).unwrap();

        assert_eq!(parent.children(), vec![child.clone()]);
        assert_eq!(child.parent(), Some(parent.clone()));
        assert!(child.is_template_child());
        assert_eq!(host::outer_html(parent.elem()), "<button>Go <i>*</i></button>");
    }

    #[test]
    fn test_dangling_placeholder_fails_and_rolls_back() {
        setup();
        let err = add(
            Props::new()
                .id("btn")
                .html_fn(|_| r#"<button><cmp id="ghost"></cmp></button>"#.to_string()),
        )
        .unwrap_err();
        assert_eq!(
            err,
            Error::DanglingPlaceholder {
                parent: "btn".into(),
                id: "ghost".into()
            }
        );
        assert!(engine::get_cmp_by_id("btn").is_none());
    }

    #[test]
    fn test_non_canonical_placeholder_is_left_alone() {
        setup();
        let parent = add(
            Props::new().html_fn(|_| r#"<div><cmp id="ghost" class="x"></cmp></div>"#.to_string()),
        )
        .unwrap();
        assert!(parent.children().is_empty());
        assert_eq!(placeholder_ids(parent.elem()), Vec::<String>::new());
    }

    #[test]
    fn test_focus_is_deferred() {
        setup();
        let mount = host::create_element("main");
        host::append_child(host::body(), mount);
        let input = add(Props::new().tag("input").focus(true)).unwrap();
        let i = input.clone();
        add(Props::new().attach(mount).html_fn(move |_| format!("<form>{i}</form>"))).unwrap();

        assert!(!host::is_focused(input.elem()));
        host::run_pending();
        assert!(host::is_focused(input.elem()));
    }
}
