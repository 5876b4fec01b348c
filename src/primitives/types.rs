//! Primitive types - Props and callbacks.
//!
//! Props describe a node's desired content, attributes, styling, listeners,
//! and behavior. Every field is optional; unset fields fall back to the values
//! already stored on the node when props are merged during an update, unless
//! they are named in [`Props::clear`].

use std::fmt;
use std::rc::Rc;

use crate::engine::Settings;
use crate::host::{ElementId, Event};
use crate::state::AnimPhase;
use crate::types::{Attrs, ClassList, ListenerOptions, StyleMap};

use super::cmp::Cmp;

// =============================================================================
// Callback Types
// =============================================================================

/// Event callback: receives the node and the native event.
///
/// Rc so the same callback can be cloned into each (re)attached host listener.
pub type Listener = Rc<dyn Fn(&Cmp, &Event)>;

/// Lifecycle hook (creation / removal).
pub type Hook = Rc<dyn Fn(&Cmp)>;

/// Markup produced from the node being built.
pub type HtmlFn = Rc<dyn Fn(&Cmp) -> String>;

// =============================================================================
// Content Source
// =============================================================================

/// Markup content: a literal string, or a function of the node.
///
/// Markup that embeds child placeholders must use the function form so each
/// render can mint fresh child instances.
#[derive(Clone)]
pub enum Html {
    Markup(String),
    Render(HtmlFn),
}

impl fmt::Debug for Html {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Html::Markup(markup) => f.debug_tuple("Markup").field(markup).finish(),
            Html::Render(_) => f.write_str("Render(..)"),
        }
    }
}

impl From<&str> for Html {
    fn from(value: &str) -> Self {
        Html::Markup(value.to_string())
    }
}

impl From<String> for Html {
    fn from(value: String) -> Self {
        Html::Markup(value)
    }
}

// =============================================================================
// Custom Listener
// =============================================================================

/// A listener for an arbitrary event kind.
#[derive(Clone)]
pub struct CustomListener {
    pub kind: String,
    pub callback: Listener,
    /// Capture is always added on attach.
    pub options: ListenerOptions,
}

impl CustomListener {
    pub fn new<F>(kind: &str, callback: F) -> Self
    where
        F: Fn(&Cmp, &Event) + 'static,
    {
        Self {
            kind: kind.to_string(),
            callback: Rc::new(callback),
            options: ListenerOptions::empty(),
        }
    }

    pub fn options(mut self, options: ListenerOptions) -> Self {
        self.options = options;
        self
    }
}

impl fmt::Debug for CustomListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomListener")
            .field("kind", &self.kind)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Clear Markers
// =============================================================================

bitflags::bitflags! {
    /// Props fields an update resets to unset instead of keeping.
    ///
    /// A field both cleared and set in the same props takes the new value.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PropKeys: u32 {
        const SETTINGS = 1 << 0;
        const ID_ATTR = 1 << 1;
        const TEXT = 1 << 2;
        const TAG = 1 << 3;
        const HTML = 1 << 4;
        const SANITIZE = 1 << 5;
        const CLASS = 1 << 6;
        const ATTR = 1 << 7;
        const STYLE = 1 << 8;
        const ANIM = 1 << 9;
        const ON_CLICK = 1 << 10;
        const ON_CLICK_OUTSIDE = 1 << 11;
        const ON_HOVER = 1 << 12;
        const ON_FOCUS = 1 << 13;
        const ON_BLUR = 1 << 14;
        const ON_INPUT = 1 << 15;
        const ON_CHANGE = 1 << 16;
        const ON_CREATE_CMP = 1 << 17;
        const ON_REMOVE_CMP = 1 << 18;
        const LISTENERS = 1 << 19;
        const FOCUS = 1 << 20;
    }
}

// =============================================================================
// Props
// =============================================================================

/// Configuration applied to a node at creation and update.
///
/// # Example
///
/// ```ignore
/// use lighter::{add, Props, ClassAction};
///
/// let label = add(Props::new().id("label").text("Hello").class("big bold"))?;
///
/// let button = add(Props {
///     tag: Some("button".into()),
///     text: Some("Save".into()),
///     on_click: Some(Rc::new(|cmp, _event| {
///         cmp.update_class("pressed", ClassAction::Toggle);
///     })),
///     ..Default::default()
/// })?;
/// ```
#[derive(Clone, Default)]
pub struct Props {
    /// Global settings overrides, applied when this node attaches as root.
    pub settings: Option<Settings>,
    pub id: Option<String>,
    /// Write the node id into the element's `id` attribute.
    pub id_attr: Option<bool>,
    /// Attach as root: the element to replace (or append to).
    pub attach: Option<ElementId>,
    /// Literal text; applied after markup, so it overwrites markup content.
    pub text: Option<String>,
    /// Element tag when no markup is given. Defaults to `div`.
    pub tag: Option<String>,
    pub html: Option<Html>,
    /// Run the configured sanitizer over this node's markup.
    pub sanitize: Option<bool>,
    pub class: Option<ClassList>,
    pub attr: Option<Attrs>,
    pub style: Option<StyleMap>,
    pub anim: Option<Vec<AnimPhase>>,
    pub on_click: Option<Listener>,
    pub on_click_outside: Option<Listener>,
    pub on_hover: Option<Listener>,
    pub on_focus: Option<Listener>,
    pub on_blur: Option<Listener>,
    pub on_input: Option<Listener>,
    pub on_change: Option<Listener>,
    pub on_create_cmp: Option<Hook>,
    pub on_remove_cmp: Option<Hook>,
    pub listeners: Option<Vec<CustomListener>>,
    /// Focus the element whenever it is (re)inserted.
    pub focus: Option<bool>,
    /// Fields to reset when these props are merged over older ones.
    pub clear: PropKeys,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    /// Field-wise merge: every field set in `newer` wins, fields named in
    /// `newer.clear` are reset, and the rest keep their older value.
    pub fn merge(self, newer: Props) -> Props {
        let clear = newer.clear;
        Props {
            settings: pick(clear, PropKeys::SETTINGS, newer.settings, self.settings),
            id: newer.id.or(self.id),
            id_attr: pick(clear, PropKeys::ID_ATTR, newer.id_attr, self.id_attr),
            attach: newer.attach.or(self.attach),
            text: pick(clear, PropKeys::TEXT, newer.text, self.text),
            tag: pick(clear, PropKeys::TAG, newer.tag, self.tag),
            html: pick(clear, PropKeys::HTML, newer.html, self.html),
            sanitize: pick(clear, PropKeys::SANITIZE, newer.sanitize, self.sanitize),
            class: pick(clear, PropKeys::CLASS, newer.class, self.class),
            attr: pick(clear, PropKeys::ATTR, newer.attr, self.attr),
            style: pick(clear, PropKeys::STYLE, newer.style, self.style),
            anim: pick(clear, PropKeys::ANIM, newer.anim, self.anim),
            on_click: pick(clear, PropKeys::ON_CLICK, newer.on_click, self.on_click),
            on_click_outside: pick(clear, PropKeys::ON_CLICK_OUTSIDE, newer.on_click_outside, self.on_click_outside),
            on_hover: pick(clear, PropKeys::ON_HOVER, newer.on_hover, self.on_hover),
            on_focus: pick(clear, PropKeys::ON_FOCUS, newer.on_focus, self.on_focus),
            on_blur: pick(clear, PropKeys::ON_BLUR, newer.on_blur, self.on_blur),
            on_input: pick(clear, PropKeys::ON_INPUT, newer.on_input, self.on_input),
            on_change: pick(clear, PropKeys::ON_CHANGE, newer.on_change, self.on_change),
            on_create_cmp: pick(clear, PropKeys::ON_CREATE_CMP, newer.on_create_cmp, self.on_create_cmp),
            on_remove_cmp: pick(clear, PropKeys::ON_REMOVE_CMP, newer.on_remove_cmp, self.on_remove_cmp),
            listeners: pick(clear, PropKeys::LISTENERS, newer.listeners, self.listeners),
            focus: pick(clear, PropKeys::FOCUS, newer.focus, self.focus),
            clear: PropKeys::empty(),
        }
    }

    // -------------------------------------------------------------------------
    // Builders
    // -------------------------------------------------------------------------

    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn id_attr(mut self, value: bool) -> Self {
        self.id_attr = Some(value);
        self
    }

    pub fn attach(mut self, target: ElementId) -> Self {
        self.attach = Some(target);
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.tag = Some(tag.to_string());
        self
    }

    pub fn html(mut self, html: impl Into<Html>) -> Self {
        self.html = Some(html.into());
        self
    }

    pub fn html_fn<F>(mut self, render: F) -> Self
    where
        F: Fn(&Cmp) -> String + 'static,
    {
        self.html = Some(Html::Render(Rc::new(render)));
        self
    }

    pub fn sanitize(mut self, value: bool) -> Self {
        self.sanitize = Some(value);
        self
    }

    pub fn class(mut self, class: impl Into<ClassList>) -> Self {
        self.class = Some(class.into());
        self
    }

    pub fn attr(mut self, attr: impl Into<Attrs>) -> Self {
        self.attr = Some(attr.into());
        self
    }

    pub fn style(mut self, style: impl Into<StyleMap>) -> Self {
        self.style = Some(style.into());
        self
    }

    pub fn anim(mut self, chain: Vec<AnimPhase>) -> Self {
        self.anim = Some(chain);
        self
    }

    pub fn on_click<F>(mut self, f: F) -> Self
    where
        F: Fn(&Cmp, &Event) + 'static,
    {
        self.on_click = Some(Rc::new(f));
        self
    }

    pub fn on_click_outside<F>(mut self, f: F) -> Self
    where
        F: Fn(&Cmp, &Event) + 'static,
    {
        self.on_click_outside = Some(Rc::new(f));
        self
    }

    pub fn on_hover<F>(mut self, f: F) -> Self
    where
        F: Fn(&Cmp, &Event) + 'static,
    {
        self.on_hover = Some(Rc::new(f));
        self
    }

    pub fn on_focus<F>(mut self, f: F) -> Self
    where
        F: Fn(&Cmp, &Event) + 'static,
    {
        self.on_focus = Some(Rc::new(f));
        self
    }

    pub fn on_blur<F>(mut self, f: F) -> Self
    where
        F: Fn(&Cmp, &Event) + 'static,
    {
        self.on_blur = Some(Rc::new(f));
        self
    }

    pub fn on_input<F>(mut self, f: F) -> Self
    where
        F: Fn(&Cmp, &Event) + 'static,
    {
        self.on_input = Some(Rc::new(f));
        self
    }

    pub fn on_change<F>(mut self, f: F) -> Self
    where
        F: Fn(&Cmp, &Event) + 'static,
    {
        self.on_change = Some(Rc::new(f));
        self
    }

    pub fn on_create_cmp<F>(mut self, f: F) -> Self
    where
        F: Fn(&Cmp) + 'static,
    {
        self.on_create_cmp = Some(Rc::new(f));
        self
    }

    pub fn on_remove_cmp<F>(mut self, f: F) -> Self
    where
        F: Fn(&Cmp) + 'static,
    {
        self.on_remove_cmp = Some(Rc::new(f));
        self
    }

    /// Append a custom listener.
    pub fn listener(mut self, listener: CustomListener) -> Self {
        self.listeners.get_or_insert_with(Vec::new).push(listener);
        self
    }

    pub fn focus(mut self, value: bool) -> Self {
        self.focus = Some(value);
        self
    }

    /// Reset `keys` on merge, e.g. `Props::new().clear(PropKeys::ON_CLICK)`.
    pub fn clear(mut self, keys: PropKeys) -> Self {
        self.clear |= keys;
        self
    }
}

fn pick<T>(clear: PropKeys, key: PropKeys, newer: Option<T>, older: Option<T>) -> Option<T> {
    if clear.contains(key) {
        newer
    } else {
        newer.or(older)
    }
}

impl fmt::Debug for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Props")
            .field("id", &self.id)
            .field("tag", &self.tag)
            .field("text", &self.text)
            .field("html", &self.html)
            .field("class", &self.class)
            .field("attr", &self.attr)
            .field("style", &self.style)
            .field("focus", &self.focus)
            .field("clear", &self.clear)
            .finish_non_exhaustive()
    }
}
