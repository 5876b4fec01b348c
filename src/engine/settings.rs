//! Global settings.
//!
//! Process-wide configuration, written once from the root node's props at the
//! moment it attaches to the host surface.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Markup sanitizer: raw markup in, safe markup out.
pub type Sanitizer = Rc<dyn Fn(&str) -> String>;

/// Settings overrides carried by props. Unset fields leave the global value
/// untouched.
#[derive(Clone, Default)]
pub struct Settings {
    pub sanitizer: Option<Sanitizer>,
    pub sanitize_all: Option<bool>,
    pub do_check_is_in_dom: Option<bool>,
    pub replace_root_dom: Option<bool>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sanitizer<F>(mut self, sanitizer: F) -> Self
    where
        F: Fn(&str) -> String + 'static,
    {
        self.sanitizer = Some(Rc::new(sanitizer));
        self
    }

    pub fn sanitize_all(mut self, value: bool) -> Self {
        self.sanitize_all = Some(value);
        self
    }

    pub fn do_check_is_in_dom(mut self, value: bool) -> Self {
        self.do_check_is_in_dom = Some(value);
        self
    }

    pub fn replace_root_dom(mut self, value: bool) -> Self {
        self.replace_root_dom = Some(value);
        self
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("sanitizer", &self.sanitizer.is_some())
            .field("sanitize_all", &self.sanitize_all)
            .field("do_check_is_in_dom", &self.do_check_is_in_dom)
            .field("replace_root_dom", &self.replace_root_dom)
            .finish()
    }
}

/// The resolved global settings.
#[derive(Clone)]
pub struct GlobalSettings {
    pub sanitizer: Option<Sanitizer>,
    /// Sanitize every markup source, not only those with `sanitize: true`.
    pub sanitize_all: bool,
    /// Skip mutators, focus, blur and scrolling on detached elements.
    pub do_check_is_in_dom: bool,
    /// Root attachment replaces the target element instead of appending to it.
    pub replace_root_dom: bool,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            sanitizer: None,
            sanitize_all: false,
            do_check_is_in_dom: false,
            replace_root_dom: true,
        }
    }
}

impl fmt::Debug for GlobalSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalSettings")
            .field("sanitizer", &self.sanitizer.is_some())
            .field("sanitize_all", &self.sanitize_all)
            .field("do_check_is_in_dom", &self.do_check_is_in_dom)
            .field("replace_root_dom", &self.replace_root_dom)
            .finish()
    }
}

thread_local! {
    static SETTINGS: RefCell<GlobalSettings> = RefCell::new(GlobalSettings::default());
}

/// Snapshot of the current settings.
pub fn settings() -> GlobalSettings {
    SETTINGS.with(|s| s.borrow().clone())
}

/// Apply every set field of `overrides`.
pub fn apply_settings(overrides: &Settings) {
    SETTINGS.with(|s| {
        let mut s = s.borrow_mut();
        if let Some(sanitizer) = &overrides.sanitizer {
            s.sanitizer = Some(Rc::clone(sanitizer));
        }
        if let Some(value) = overrides.sanitize_all {
            s.sanitize_all = value;
        }
        if let Some(value) = overrides.do_check_is_in_dom {
            s.do_check_is_in_dom = value;
        }
        if let Some(value) = overrides.replace_root_dom {
            s.replace_root_dom = value;
        }
    });
    tracing::debug!(?overrides, "applied global settings");
}

/// Run the configured sanitizer over `markup` when sanitizing is requested
/// for this call or globally. Without a sanitizer the markup is unchanged.
pub fn sanitize(markup: &str, requested: bool) -> String {
    let current = settings();
    match current.sanitizer {
        Some(sanitizer) if requested || current.sanitize_all => sanitizer(markup),
        _ => markup.to_string(),
    }
}

pub fn reset_settings() {
    SETTINGS.with(|s| *s.borrow_mut() = GlobalSettings::default());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() {
        reset_settings();
    }

    #[test]
    fn test_defaults() {
        setup();
        let s = settings();
        assert!(s.sanitizer.is_none());
        assert!(!s.sanitize_all);
        assert!(!s.do_check_is_in_dom);
        assert!(s.replace_root_dom);
    }

    #[test]
    fn test_partial_override() {
        setup();
        apply_settings(&Settings::new().replace_root_dom(false));
        apply_settings(&Settings::new().do_check_is_in_dom(true));
        let s = settings();
        assert!(!s.replace_root_dom);
        assert!(s.do_check_is_in_dom);
    }

    #[test]
    fn test_sanitize_only_when_requested() {
        setup();
        apply_settings(&Settings::new().sanitizer(|m| m.replace("<script>", "")));
        assert_eq!(sanitize("<script>x", false), "<script>x");
        assert_eq!(sanitize("<script>x", true), "x");

        apply_settings(&Settings::new().sanitize_all(true));
        assert_eq!(sanitize("<script>x", false), "x");
    }
}
