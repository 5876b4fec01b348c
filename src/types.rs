//! Core value types shared by the host tree and the engine.

// =============================================================================
// Class Lists
// =============================================================================

/// How a class mutation combines with the classes already on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClassAction {
    /// Append to the existing classes.
    Add,
    /// Remove the given classes.
    Remove,
    /// Drop every existing class, then apply the given ones.
    #[default]
    Replace,
    /// Flip each given class on or off.
    Toggle,
}

/// An ordered list of class names.
///
/// Built from either a space-joined string (split on whitespace) or an
/// explicit list of names.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClassList(Vec<String>);

impl ClassList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, class: &str) -> bool {
        self.0.iter().any(|c| c == class)
    }

    /// Append a class unless it is already listed.
    pub fn push(&mut self, class: &str) {
        if !class.is_empty() && !self.contains(class) {
            self.0.push(class.to_string());
        }
    }

    /// Remove every occurrence of a class.
    pub fn remove(&mut self, class: &str) {
        self.0.retain(|c| c != class);
    }

    /// Space-joined form, as it appears in a `class` attribute.
    pub fn joined(&self) -> String {
        self.0.join(" ")
    }
}

impl From<&str> for ClassList {
    fn from(value: &str) -> Self {
        let mut list = ClassList::new();
        for class in value.split_whitespace() {
            list.push(class);
        }
        list
    }
}

impl From<String> for ClassList {
    fn from(value: String) -> Self {
        ClassList::from(value.as_str())
    }
}

impl From<Vec<&str>> for ClassList {
    fn from(value: Vec<&str>) -> Self {
        value.into_iter().collect()
    }
}

impl From<Vec<String>> for ClassList {
    fn from(value: Vec<String>) -> Self {
        value.iter().map(String::as_str).collect()
    }
}

impl<const N: usize> From<[&str; N]> for ClassList {
    fn from(value: [&str; N]) -> Self {
        value.into_iter().collect()
    }
}

impl<'a> FromIterator<&'a str> for ClassList {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut list = ClassList::new();
        for class in iter {
            list.push(class.trim());
        }
        list
    }
}

// =============================================================================
// Attributes
// =============================================================================

/// Ordered attribute map. Setting an existing key replaces it in place.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Attrs(Vec<(String, String)>);

impl Attrs {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Builder form of [`Attrs::set`].
    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl ToString) {
        let value = value.to_string();
        match self.0.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key.to_string(), value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn remove(&mut self, key: &str) {
        self.0.retain(|(k, _)| k != key);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: AsRef<str>, V: ToString, const N: usize> From<[(K, V); N]> for Attrs {
    fn from(value: [(K, V); N]) -> Self {
        value.into_iter().collect()
    }
}

impl<K: AsRef<str>, V: ToString> FromIterator<(K, V)> for Attrs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attrs = Attrs::new();
        for (key, value) in iter {
            attrs.set(key.as_ref(), value);
        }
        attrs
    }
}

/// One or more attribute names, for removal.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AttrKeys(Vec<String>);

impl AttrKeys {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl From<&str> for AttrKeys {
    fn from(value: &str) -> Self {
        Self(vec![value.to_string()])
    }
}

impl From<Vec<&str>> for AttrKeys {
    fn from(value: Vec<&str>) -> Self {
        Self(value.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for AttrKeys {
    fn from(value: [&str; N]) -> Self {
        Self(value.into_iter().map(str::to_string).collect())
    }
}

// =============================================================================
// Inline Styles
// =============================================================================

/// Ordered inline style map.
///
/// A `None` value is the removal sentinel: applying it removes the rule from
/// the element instead of writing a literal value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StyleMap(Vec<(String, Option<String>)>);

impl StyleMap {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Builder: set a property.
    pub fn with(mut self, prop: &str, value: impl ToString) -> Self {
        self.set(prop, Some(value.to_string()));
        self
    }

    /// Builder: mark a property for removal.
    pub fn without(mut self, prop: &str) -> Self {
        self.set(prop, None);
        self
    }

    pub fn set(&mut self, prop: &str, value: Option<String>) {
        match self.0.iter_mut().find(|(k, _)| k == prop) {
            Some(entry) => entry.1 = value,
            None => self.0.push((prop.to_string(), value)),
        }
    }

    pub fn get(&self, prop: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == prop)
            .and_then(|(_, v)| v.as_deref())
    }

    pub fn remove(&mut self, prop: &str) {
        self.0.retain(|(k, _)| k != prop);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<V: ToString, const N: usize> From<[(&str, V); N]> for StyleMap {
    fn from(value: [(&str, V); N]) -> Self {
        let mut style = StyleMap::new();
        for (prop, v) in value {
            style.set(prop, Some(v.to_string()));
        }
        style
    }
}

// =============================================================================
// Flags (bitflags)
// =============================================================================

bitflags::bitflags! {
    /// Native listener options.
    ///
    /// Engine-managed listeners always carry `CAPTURE` so they run top-down
    /// before bubble-phase listeners.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ListenerOptions: u8 {
        const CAPTURE = 1 << 0;
        const ONCE = 1 << 1;
        const PASSIVE = 1 << 2;
    }
}

bitflags::bitflags! {
    /// Node state flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CmpFlags: u8 {
        /// Attached directly to the host surface.
        const ROOT = 1 << 0;
        /// Resolved through a placeholder rather than an explicit `add`.
        const TEMPLATE_CHILD = 1 << 1;
        /// Torn down; further removals are no-ops.
        const REMOVED = 1 << 2;
    }
}

// =============================================================================
// Scrolling
// =============================================================================

/// Scroll animation hint recorded by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollBehavior {
    #[default]
    Auto,
    Smooth,
}

/// Which edge of the element is aligned with the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollBlock {
    #[default]
    Start,
    Center,
    End,
    Nearest,
}

/// Options for scrolling an element into view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrollIntoViewOptions {
    pub behavior: ScrollBehavior,
    pub block: ScrollBlock,
}

impl ScrollIntoViewOptions {
    pub fn smooth() -> Self {
        Self {
            behavior: ScrollBehavior::Smooth,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_list_splits_on_whitespace() {
        let list = ClassList::from("  big   red\tbold ");
        assert_eq!(list.iter().collect::<Vec<_>>(), vec!["big", "red", "bold"]);
        assert_eq!(list.joined(), "big red bold");
    }

    #[test]
    fn test_class_list_dedupes() {
        let list = ClassList::from(vec!["a", "b", "a"]);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_attrs_replace_in_place() {
        let mut attrs = Attrs::from([("type", "text"), ("name", "q")]);
        attrs.set("type", "number");
        assert_eq!(attrs.iter().collect::<Vec<_>>(), vec![("type", "number"), ("name", "q")]);
        attrs.remove("type");
        assert_eq!(attrs.get("type"), None);
    }

    #[test]
    fn test_style_removal_sentinel() {
        let style = StyleMap::new().with("color", "red").without("background");
        assert_eq!(style.get("color"), Some("red"));
        assert_eq!(style.get("background"), None);
        assert_eq!(style.iter().count(), 2);
    }
}
