//! Host-facing element handle and the backend trait behind it.

use std::fmt::Debug;
use std::hash::{Hash, Hasher};

use serde_json::Value;

/// Backend interface a host implements to expose its UI tree.
///
/// Handles are cheap snapshots: navigation returns fresh handles and
/// `object_id` ties handles for the same underlying element together.
pub trait ElementImpl: Send + Sync + Debug {
    /// Stable identity of the underlying element, shared by all handles to it.
    fn object_id(&self) -> usize;

    /// Current value of a property, or `None` when the element does not
    /// provide it. Property names are canonical (`Name`, `ControlType`, ...).
    fn property(&self, name: &str) -> Option<Value>;

    fn parent(&self) -> Option<UiElement>;
    fn first_child(&self) -> Option<UiElement>;
    fn next_sibling(&self) -> Option<UiElement>;
    fn previous_sibling(&self) -> Option<UiElement>;

    fn clone_box(&self) -> Box<dyn ElementImpl>;
}

/// A handle to a UI element in the host's tree.
#[derive(Debug)]
pub struct UiElement {
    inner: Box<dyn ElementImpl>,
}

impl UiElement {
    /// Wrap a backend handle.
    pub fn new(inner: Box<dyn ElementImpl>) -> Self {
        Self { inner }
    }

    /// Stable identity of the underlying element.
    pub fn object_id(&self) -> usize {
        self.inner.object_id()
    }

    /// Current value of a property by canonical name.
    pub fn property(&self, name: &str) -> Option<Value> {
        self.inner.property(name)
    }

    fn string_property(&self, name: &str) -> Option<String> {
        match self.inner.property(name) {
            Some(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    /// The element's `Name` property, when it is a string.
    pub fn name(&self) -> Option<String> {
        self.string_property(crate::properties::NAME)
    }

    /// The element's `ControlType` property, when it is a string.
    pub fn control_type(&self) -> Option<String> {
        self.string_property(crate::properties::CONTROL_TYPE)
    }

    /// The element's `AutomationId` property, when it is a string.
    pub fn automation_id(&self) -> Option<String> {
        self.string_property(crate::properties::AUTOMATION_ID)
    }

    pub fn parent(&self) -> Option<UiElement> {
        self.inner.parent()
    }

    pub fn first_child(&self) -> Option<UiElement> {
        self.inner.first_child()
    }

    pub fn next_sibling(&self) -> Option<UiElement> {
        self.inner.next_sibling()
    }

    pub fn previous_sibling(&self) -> Option<UiElement> {
        self.inner.previous_sibling()
    }

    /// Children in tree order, produced lazily via sibling navigation.
    pub fn children(&self) -> impl Iterator<Item = UiElement> {
        std::iter::successors(self.first_child(), |child| child.next_sibling())
    }

    /// True when the element has no parent.
    pub fn is_root(&self) -> bool {
        self.inner.parent().is_none()
    }
}

impl PartialEq for UiElement {
    fn eq(&self, other: &Self) -> bool {
        self.object_id() == other.object_id()
    }
}

impl Eq for UiElement {}

impl Hash for UiElement {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.object_id().hash(state);
    }
}

impl Clone for UiElement {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone_box(),
        }
    }
}
