//! Lifecycle Orchestrator - create, update, and remove nodes.
//!
//! Composes the builder, listener manager, template resolver, and animation
//! interpreter:
//!
//! - `create`: build element -> attach listeners -> root attach -> register ->
//!   resolve template children
//! - `update`: wrapper nodes are rebuilt wholesale by their stored factory;
//!   other nodes rebuild their element in place and keep their explicit
//!   children
//! - `remove`: children first, then timers, listeners, element, registry entry,
//!   and finally the removal hook
//!
//! A `create` that fails after registration tears the partial node down
//! before returning the error.

use std::rc::Rc;

use crate::engine::{self, apply_settings, settings};
use crate::error::{Error, Result};
use crate::host::{self, ElementId};
use crate::state::{animate, focus, outside_click};
use crate::types::CmpFlags;

use super::builder::build;
use super::cmp::{Child, Cmp, Wrapper, PLACEHOLDER_TAG};
use super::listeners::{attach_listeners, detach_all};
use super::template::{placeholder_ids, resolve_template_children};
use super::types::Props;

/// Tag of the transient element holding a wrapper node's place while it
/// is rebuilt.
const WRAPPER_PLACEHOLDER_TAG: &str = "cmpw";

// =============================================================================
// PUBLIC API
// =============================================================================

/// Create a node from props.
///
/// Without `attach` the node is built detached; insert it with [`Cmp::add`]
/// or embed it in a parent's markup. With `attach` it becomes the root,
/// replacing (or appended to) the given element.
///
/// # Example
///
/// ```ignore
/// use lighter::{add, host, Props};
///
/// let mount = host::create_element("main");
/// host::append_child(host::body(), mount);
///
/// let app = add(Props::new().id("app").attach(mount))?;
/// let title = app.add(Props::new().tag("h1").text("Hello"))?;
/// ```
pub fn add(props: Props) -> Result<Cmp> {
    create(props)
}

/// Create a node through a factory and keep the factory for updates.
///
/// `update` on the returned node merges its props into `props` and calls
/// `rebuild` again, replacing the node with the result under the same id.
///
/// ```ignore
/// fn badge(props: Props) -> Result<Cmp> {
///     let count = props.text.clone().unwrap_or_default();
///     add(Props::new().tag("span").class("badge").text(count).merge(props))
/// }
///
/// let b = add_wrapped(Props::new().id("badge").text("1"), badge)?;
/// let b = b.update(Props::new().text("2"))?;
/// ```
pub fn add_wrapped<F>(props: Props, rebuild: F) -> Result<Cmp>
where
    F: Fn(Props) -> Result<Cmp> + 'static,
{
    let rebuild: Rc<dyn Fn(Props) -> Result<Cmp>> = Rc::new(rebuild);
    let cmp = rebuild(props.clone())?;
    if let Some(id) = &props.id {
        if let Err(err) = rekey(&cmp, id) {
            remove(&cmp, false);
            return Err(err);
        }
    }
    cmp.borrow_mut().wrapper = Some(Wrapper {
        rebuild,
        baseline: props,
    });
    Ok(cmp)
}

// =============================================================================
// CREATE
// =============================================================================

fn create(props: Props) -> Result<Cmp> {
    let id = props.id.clone().unwrap_or_else(engine::mint_identifier);
    if engine::is_registered(&id) {
        return Err(Error::DuplicateIdentifier { id });
    }
    if props.attach.is_some() {
        engine::check_root_free(&id)?;
    }

    let shell = host::create_element(PLACEHOLDER_TAG);
    let cmp = Cmp::new(id.clone(), shell, props.clone());

    let built = build(&cmp, &props);
    host::release(shell, |_| false);
    let elem = built?;
    cmp.borrow_mut().elem = elem;
    attach_listeners(&cmp);

    if let Some(target) = props.attach {
        if let Some(overrides) = &props.settings {
            apply_settings(overrides);
        }
        if settings().replace_root_dom {
            if host::parent(target).is_none() {
                tracing::warn!(id = %id, "root target is detached; node left unattached");
            }
            host::replace_with(target, elem);
        } else {
            host::append_child(target, elem);
        }
        if let Err(err) = engine::claim_root(&id) {
            rollback(&cmp);
            return Err(err);
        }
        cmp.set_flag(CmpFlags::ROOT, true);
    }

    if let Err(err) = engine::register(&cmp) {
        rollback(&cmp);
        return Err(err);
    }
    if let Err(err) = resolve_template_children(&cmp) {
        rollback(&cmp);
        return Err(err);
    }

    if cmp.is_root() {
        if props.focus == Some(true) {
            focus::focus_cmp(&cmp, None);
        }
        animate::run_anims(&cmp);
        fire_on_create(&cmp);
    }

    tracing::debug!(id = %id, root = cmp.is_root(), "node created");
    Ok(cmp)
}

/// Undo a partially created node. Resolved children are detached, not
/// destroyed: they were live before this node existed.
fn rollback(cmp: &Cmp) {
    let id = cmp.id();
    let elem = cmp.elem();

    let children = std::mem::take(&mut cmp.borrow_mut().children);
    for child in children {
        host::remove(child.elem());
        let mut data = child.borrow_mut();
        data.parent = None;
        data.flags.remove(CmpFlags::TEMPLATE_CHILD);
    }

    animate::cancel_anim(cmp);
    detach_all(cmp);
    outside_click::unregister(&id);

    if cmp.is_root() {
        engine::release_root(&id);
        if let Some(target) = cmp.borrow().props.attach {
            if settings().replace_root_dom {
                host::replace_with(elem, target);
            }
        }
    }
    if engine::get_cmp_by_id(&id).is_some_and(|c| c == *cmp) {
        engine::unregister(&id);
    }
    host::remove(elem);
    release_elem(elem);

    cmp.borrow_mut().flags = CmpFlags::REMOVED;
    tracing::debug!(id = %id, "node creation rolled back");
}

// =============================================================================
// CHILDREN
// =============================================================================

/// Append a child to `parent`, building it first when given props.
pub(crate) fn add_child(parent: &Cmp, child: Child) -> Result<Cmp> {
    let child = match child {
        Child::Empty => create(Props::new())?,
        Child::Props(props) => create(props)?,
        Child::Cmp(cmp) => cmp,
    };

    if child == *parent || host::contains(child.elem(), parent.elem()) {
        tracing::warn!(parent = %parent.id(), child = %child.id(), "refusing to add an ancestor as a child");
        return Ok(child);
    }
    if child.is_removed() {
        tracing::warn!(id = %child.id(), "cannot add a removed node");
        return Ok(child);
    }

    detach_from_parent(&child);
    host::append_child(parent.elem(), child.elem());
    {
        let mut data = child.borrow_mut();
        data.parent = Some(parent.downgrade());
        data.flags.remove(CmpFlags::TEMPLATE_CHILD);
    }
    parent.borrow_mut().children.push(child.clone());

    if child.borrow().props.focus == Some(true) {
        focus::focus_cmp(&child, None);
    }
    animate::run_anims(&child);
    fire_on_create(&child);
    Ok(child)
}

/// Drop `child` from its parent's child list and clear its parent link.
pub(crate) fn detach_from_parent(child: &Cmp) {
    let parent = child.borrow_mut().parent.take();
    if let Some(parent) = parent.and_then(|p| p.upgrade()) {
        parent.borrow_mut().children.retain(|c| c != child);
    }
}

/// Free a detached element, sparing elements still held by live nodes.
pub(crate) fn release_elem(elem: ElementId) {
    let live = engine::live_elements();
    host::release(elem, |el| live.contains(&el));
}

pub(crate) fn fire_on_create(cmp: &Cmp) {
    let hook = cmp.borrow().props.on_create_cmp.clone();
    if let Some(hook) = hook {
        hook(cmp);
    }
}

// =============================================================================
// REMOVE
// =============================================================================

/// Tear a node and its subtree down. Idempotent.
///
/// `keep_elem` leaves the element where it is (used while a wrapper node is
/// swapped for its rebuilt replacement).
pub(crate) fn remove(cmp: &Cmp, keep_elem: bool) {
    if cmp.is_removed() {
        return;
    }
    cmp.set_flag(CmpFlags::REMOVED, true);
    let id = cmp.id();
    let elem = cmp.elem();

    let children = std::mem::take(&mut cmp.borrow_mut().children);
    for child in &children {
        remove(child, false);
    }

    animate::cancel_anim(cmp);
    focus::cancel_scroll(cmp);
    detach_all(cmp);
    outside_click::unregister(&id);

    if !keep_elem {
        host::remove(elem);
    }
    detach_from_parent(cmp);

    if cmp.is_root() {
        engine::release_root(&id);
        cmp.set_flag(CmpFlags::ROOT, false);
    }
    // A rebuilt wrapper may already hold this id.
    if engine::get_cmp_by_id(&id).is_some_and(|c| c == *cmp) {
        engine::unregister(&id);
    }

    let hook = cmp.borrow().props.on_remove_cmp.clone();
    if let Some(hook) = hook {
        hook(cmp);
    }
    if !keep_elem {
        release_elem(elem);
    }
    tracing::debug!(id = %id, children = children.len(), "node removed");
}

// =============================================================================
// UPDATE
// =============================================================================

pub(crate) fn update(
    cmp: &Cmp,
    props: Props,
    callback: Option<Box<dyn FnOnce(&Cmp)>>,
) -> Result<Cmp> {
    if cmp.is_removed() {
        tracing::warn!(id = %cmp.id(), "update on a removed node ignored");
        return Ok(cmp.clone());
    }

    let wrapper = cmp.borrow().wrapper.clone();
    let live = match wrapper {
        Some(wrapper) => rebuild_wrapper(cmp, wrapper, props)?,
        None => {
            update_in_place(cmp, props)?;
            cmp.clone()
        }
    };

    if let Some(callback) = callback {
        callback(&live);
    }
    Ok(live)
}

fn update_in_place(cmp: &Cmp, props: Props) -> Result<()> {
    let id = cmp.id();
    let old_elem = cmp.elem();

    animate::cancel_anim(cmp);
    detach_all(cmp);

    let previous_children = std::mem::take(&mut cmp.borrow_mut().children);
    let old_props = cmp.props();
    let mut merged = old_props.clone().merge(props);
    merged.id = old_props.id.clone();
    merged.attach = old_props.attach;
    cmp.borrow_mut().props = merged.clone();

    let new_elem = match build(cmp, &merged) {
        Ok(elem) => elem,
        Err(err) => {
            {
                let mut data = cmp.borrow_mut();
                data.children = previous_children;
                data.props = old_props;
            }
            attach_listeners(cmp);
            animate::run_anims(cmp);
            return Err(err);
        }
    };
    host::replace_with(old_elem, new_elem);
    cmp.borrow_mut().elem = new_elem;
    if old_elem != new_elem {
        // Children still owned by live nodes are detached, not freed.
        release_elem(old_elem);
    }

    // Template children survive only when the new markup embeds them again.
    let referenced = placeholder_ids(new_elem);
    let (templates, explicit): (Vec<Cmp>, Vec<Cmp>) = previous_children
        .into_iter()
        .partition(Cmp::is_template_child);
    for child in templates {
        let adopted = cmp.borrow().children.contains(&child);
        if !adopted && !referenced.contains(&child.id()) {
            remove(&child, false);
        }
    }
    for child in explicit {
        child.borrow_mut().parent = None;
        add_child(cmp, Child::Cmp(child))?;
    }

    attach_listeners(cmp);
    resolve_template_children(cmp)?;

    animate::run_anims(cmp);
    if merged.focus == Some(true) {
        focus::focus_cmp(cmp, None);
    }
    fire_on_create(cmp);

    tracing::debug!(id = %id, children = cmp.borrow().children.len(), "node updated in place");
    Ok(())
}

fn rebuild_wrapper(old: &Cmp, wrapper: Wrapper, props: Props) -> Result<Cmp> {
    let id = old.id();
    let merged = wrapper.baseline.clone().merge(props);

    let old_elem = old.elem();
    let slot = host::create_element(WRAPPER_PLACEHOLDER_TAG);
    host::replace_with(old_elem, slot);

    let was_root = old.is_root();
    let was_template = old.is_template_child();
    let parent = old.parent();
    let index = parent
        .as_ref()
        .and_then(|p| p.borrow().children.iter().position(|c| c == old));

    remove(old, true);

    let mut build_props = merged.clone();
    build_props.attach = None;
    let cmp = match (wrapper.rebuild)(build_props) {
        Ok(cmp) => cmp,
        Err(err) => {
            discard_wrapper_slot(slot, old_elem);
            return Err(err);
        }
    };
    if let Err(err) = rekey(&cmp, &id) {
        remove(&cmp, false);
        discard_wrapper_slot(slot, old_elem);
        return Err(err);
    }

    if was_root {
        engine::claim_root(&id)?;
        cmp.set_flag(CmpFlags::ROOT, true);
    }
    if let Some(parent) = &parent {
        detach_from_parent(&cmp);
        {
            let mut data = cmp.borrow_mut();
            data.parent = Some(parent.downgrade());
            data.flags.set(CmpFlags::TEMPLATE_CHILD, was_template);
        }
        let mut data = parent.borrow_mut();
        let at = index.unwrap_or(data.children.len()).min(data.children.len());
        data.children.insert(at, cmp.clone());
    }
    cmp.borrow_mut().wrapper = Some(Wrapper {
        rebuild: wrapper.rebuild,
        baseline: merged,
    });
    host::replace_with(slot, cmp.elem());
    discard_wrapper_slot(slot, old_elem);

    animate::run_anims(&cmp);
    if cmp.borrow().props.focus == Some(true) {
        focus::focus_cmp(&cmp, None);
    }
    fire_on_create(&cmp);

    tracing::debug!(id = %id, "wrapper node rebuilt");
    Ok(cmp)
}

/// Free the transient slot and the replaced node's element.
fn discard_wrapper_slot(slot: ElementId, old_elem: ElementId) {
    host::remove(slot);
    host::release(slot, |_| false);
    release_elem(old_elem);
}

/// Move a live node to identifier `id`.
fn rekey(cmp: &Cmp, id: &str) -> Result<()> {
    let current = cmp.id();
    if current == id {
        return Ok(());
    }
    if engine::is_registered(id) {
        return Err(Error::DuplicateIdentifier { id: id.to_string() });
    }

    outside_click::unregister(&current);
    if engine::get_cmp_by_id(&current).is_some_and(|c| c == *cmp) {
        engine::unregister(&current);
    }
    let root = engine::get_root_id().as_deref() == Some(current.as_str());
    if root {
        engine::release_root(&current);
    }

    {
        let mut data = cmp.borrow_mut();
        data.id = id.to_string();
        data.props.id = Some(id.to_string());
    }
    engine::register(cmp)?;
    if root {
        engine::claim_root(id)?;
    }
    if cmp.borrow().props.id_attr == Some(true) {
        host::set_attribute(cmp.elem(), "id", id);
    }
    attach_listeners(cmp);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use crate::engine::Settings;

    fn setup() -> (Cmp, host::ElementId) {
        crate::reset_all();
        let mount = host::create_element("main");
        host::append_child(host::body(), mount);
        let root = add(Props::new().id("root").attach(mount)).unwrap();
        (root, mount)
    }

    fn log() -> Rc<RefCell<Vec<String>>> {
        Rc::new(RefCell::new(Vec::new()))
    }

    #[test]
    fn test_root_replaces_mount() {
        let (root, mount) = setup();
        assert!(root.is_root());
        assert!(host::is_connected(root.elem()));
        assert!(!host::is_connected(mount));
        assert_eq!(engine::get_root_id().as_deref(), Some("root"));
    }

    #[test]
    fn test_root_appends_when_configured() {
        crate::reset_all();
        let mount = host::create_element("main");
        host::append_child(host::body(), mount);
        let root = add(
            Props::new()
                .attach(mount)
                .settings(Settings::new().replace_root_dom(false)),
        )
        .unwrap();
        assert_eq!(host::parent(root.elem()), Some(mount));
        assert!(!settings().replace_root_dom);
    }

    #[test]
    fn test_second_root_is_rejected() {
        let (_root, _) = setup();
        let other = host::create_element("section");
        host::append_child(host::body(), other);
        let err = add(Props::new().id("two").attach(other)).unwrap_err();
        assert_eq!(err, Error::RootAlreadyAttached { id: "root".into() });
        assert!(!engine::is_registered("two"));
        assert!(host::is_connected(other));
    }

    #[test]
    fn test_root_slot_frees_on_remove() {
        let (root, _) = setup();
        root.remove();
        assert_eq!(engine::get_root_id(), None);
        let mount = host::create_element("main");
        host::append_child(host::body(), mount);
        assert!(add(Props::new().attach(mount)).is_ok());
    }

    #[test]
    fn test_add_child_variants() {
        let (root, _) = setup();
        let empty = root.add(()).unwrap();
        let built = root.add(Props::new().tag("p")).unwrap();
        let loose = add(Props::new().tag("span")).unwrap();
        root.add(&loose).unwrap();

        assert_eq!(root.children(), vec![empty.clone(), built, loose.clone()]);
        assert_eq!(host::children(root.elem()).len(), 3);
        assert_eq!(loose.parent(), Some(root.clone()));
        assert!(host::is_connected(empty.elem()));
    }

    #[test]
    fn test_moving_child_between_parents() {
        let (root, _) = setup();
        let a = root.add(()).unwrap();
        let b = root.add(()).unwrap();
        let child = a.add(()).unwrap();
        b.add(&child).unwrap();
        assert!(a.children().is_empty());
        assert_eq!(b.children(), vec![child.clone()]);
        assert_eq!(host::parent(child.elem()), Some(b.elem()));
    }

    #[test]
    fn test_add_fires_hook_and_focus() {
        let (root, _) = setup();
        let seen = log();
        let s = seen.clone();
        let input = root
            .add(
                Props::new()
                    .id("q")
                    .tag("input")
                    .focus(true)
                    .on_create_cmp(move |cmp| s.borrow_mut().push(cmp.id())),
            )
            .unwrap();
        assert_eq!(*seen.borrow(), vec!["q".to_string()]);
        assert!(host::is_focused(input.elem()));
    }

    #[test]
    fn test_remove_is_depth_first_and_idempotent() {
        let (root, _) = setup();
        let order = log();
        let hook = |order: &Rc<RefCell<Vec<String>>>| {
            let o = order.clone();
            move |cmp: &Cmp| o.borrow_mut().push(cmp.id())
        };
        let parent = root.add(Props::new().id("p").on_remove_cmp(hook(&order))).unwrap();
        let child = parent.add(Props::new().id("c").on_remove_cmp(hook(&order))).unwrap();
        child.add(Props::new().id("g").on_remove_cmp(hook(&order))).unwrap();

        parent.remove();
        parent.remove();
        assert_eq!(*order.borrow(), vec!["g", "c", "p"]);
        assert!(root.children().is_empty());
        for id in ["p", "c", "g"] {
            assert!(!engine::is_registered(id));
        }
        assert!(!host::is_connected(parent.elem()));
    }

    #[test]
    fn test_remove_clears_listeners_and_outside_click() {
        let (root, _) = setup();
        let cmp = root
            .add(Props::new().on_click(|_, _| {}).on_click_outside(|_, _| {}))
            .unwrap();
        assert!(outside_click::is_active());
        cmp.remove();
        assert!(cmp.listener_kinds().is_empty());
        assert!(!outside_click::is_active());
        assert_eq!(host::listener_count(cmp.elem()), 0);
    }

    #[test]
    fn test_update_in_place_keeps_explicit_children() {
        let (root, _) = setup();
        let list = root.add(Props::new().tag("ul")).unwrap();
        let item = list.add(Props::new().tag("li").text("one")).unwrap();

        list.update(Props::new().class("open")).unwrap();
        assert_eq!(list.children(), vec![item.clone()]);
        assert_eq!(host::parent(item.elem()), Some(list.elem()));
        assert_eq!(host::outer_html(list.elem()), r#"<ul class="open"><li>one</li></ul>"#);
        assert!(host::is_connected(list.elem()));
    }

    #[test]
    fn test_update_destroys_unreferenced_template_children() {
        let (root, _) = setup();
        let kept = add(Props::new().id("kept").tag("b")).unwrap();
        let dropped = add(Props::new().id("dropped").tag("i")).unwrap();
        let k = kept.clone();
        let d = dropped.clone();
        let card = root
            .add(Props::new().html_fn(move |_| format!("<div>{k}{d}</div>")))
            .unwrap();
        assert_eq!(card.children().len(), 2);

        let k = kept.clone();
        card.update(Props::new().html_fn(move |_| format!("<div>{k}</div>")))
            .unwrap();
        assert_eq!(card.children(), vec![kept.clone()]);
        assert!(engine::is_registered("kept"));
        assert!(!engine::is_registered("dropped"));
        assert!(dropped.is_removed());
        assert_eq!(host::outer_html(card.elem()), "<div><b></b></div>");
    }

    #[test]
    fn test_update_rebinds_listeners_and_runs_callback() {
        let (root, _) = setup();
        let hits = log();
        let h = hits.clone();
        let button = root
            .add(Props::new().tag("button").on_click(move |_, _| h.borrow_mut().push("old".into())))
            .unwrap();
        let h = hits.clone();
        let called = log();
        let c = called.clone();
        button
            .update_with(
                Props::new().on_click(move |_, _| h.borrow_mut().push("new".into())),
                move |cmp| c.borrow_mut().push(cmp.id()),
            )
            .unwrap();

        host::click(button.elem());
        assert_eq!(*hits.borrow(), vec!["new".to_string()]);
        assert_eq!(button.listener_count("click"), 1);
        assert_eq!(*called.borrow(), vec![button.id()]);
    }

    #[test]
    fn test_wrapper_update_rebuilds_under_same_id() {
        let (root, _) = setup();
        let builds = Rc::new(RefCell::new(0));
        let b = builds.clone();
        let badge = add_wrapped(Props::new().id("badge").text("1"), move |props| {
            *b.borrow_mut() += 1;
            add(Props::new().tag("span").class("badge").merge(props))
        })
        .unwrap();
        root.add(Props::new()).unwrap();
        root.add(&badge).unwrap();

        let fresh = badge.update(Props::new().text("2")).unwrap();
        assert_ne!(fresh, badge);
        assert!(badge.is_removed());
        assert!(fresh.is_wrapper());
        assert_eq!(fresh.id(), "badge");
        assert_eq!(engine::get_cmp_by_id("badge"), Some(fresh.clone()));
        assert_eq!(*builds.borrow(), 2);

        assert_eq!(root.children()[1], fresh);
        assert_eq!(fresh.parent(), Some(root.clone()));
        assert_eq!(host::children(root.elem())[1], fresh.elem());
        assert_eq!(host::outer_html(fresh.elem()), r#"<span class="badge">2</span>"#);
    }

    #[test]
    fn test_wrapper_without_id_keeps_minted_id() {
        let (root, _) = setup();
        let node = add_wrapped(Props::new().text("a"), |props| add(Props::new().merge(props))).unwrap();
        root.add(&node).unwrap();
        let id = node.id();
        let fresh = node.update(Props::new().text("b")).unwrap();
        assert_eq!(fresh.id(), id);
        assert_eq!(host::text_content(fresh.elem()), "b");
        assert_eq!(engine::node_count(), 2);
    }

    #[test]
    fn test_wrapper_root_keeps_root_slot() {
        crate::reset_all();
        let mount = host::create_element("main");
        host::append_child(host::body(), mount);
        let app = add_wrapped(Props::new().id("app").attach(mount), |props| add(props)).unwrap();
        assert!(app.is_root());

        let fresh = app.update(Props::new().text("v2")).unwrap();
        assert!(fresh.is_root());
        assert_eq!(engine::get_root_id().as_deref(), Some("app"));
        assert_eq!(host::parent(fresh.elem()), Some(host::body()));
    }

    #[test]
    fn test_update_on_removed_node_is_ignored() {
        let (root, _) = setup();
        let cmp = root.add(Props::new().text("a")).unwrap();
        cmp.remove();
        let same = cmp.update(Props::new().text("b")).unwrap();
        assert_eq!(same, cmp);
        assert!(!engine::is_registered(&cmp.id()));
    }

    #[test]
    fn test_failed_update_restores_node() {
        let (root, _) = setup();
        let cmp = root.add(Props::new().id("x").text("ok")).unwrap();
        let err = cmp
            .update(Props::new().html(r#"<p><cmp id="y"></cmp></p>"#))
            .unwrap_err();
        assert_eq!(err, Error::MixedMarkupChildDeclaration { id: "x".into() });
        assert_eq!(host::text_content(cmp.elem()), "ok");
        assert!(cmp.props().html.is_none());
    }
}
