//! Static registries for UI Automation property and control-type names.
//!
//! The platform exposes a fixed, known set of properties and control types,
//! so identifier resolution is a compile-time table. Lookup tries an exact
//! match, then ASCII-case-insensitive, then with `-`/`_`/space stripped, and
//! always returns the canonical spelling.

use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Property holding the control-type name of an element.
pub const CONTROL_TYPE: &str = "ControlType";
/// Property holding the human-readable name of an element.
pub const NAME: &str = "Name";
/// Property holding the automation id of an element.
pub const AUTOMATION_ID: &str = "AutomationId";

/// Canonical property names accepted in descriptions.
pub static PROPERTY_NAMES: &[&str] = &[
    "AcceleratorKey",
    "AccessKey",
    "AutomationId",
    "BoundingRectangle",
    "ClassName",
    "ControlType",
    "FrameworkId",
    "HasKeyboardFocus",
    "HelpText",
    "IsContentElement",
    "IsControlElement",
    "IsEnabled",
    "IsKeyboardFocusable",
    "IsOffscreen",
    "IsPassword",
    "ItemStatus",
    "ItemType",
    "LocalizedControlType",
    "Name",
    "NativeWindowHandle",
    "Orientation",
    "ProcessId",
    "RuntimeId",
    "Text",
    "Value",
];

/// Canonical control-type names accepted in descriptions.
pub static CONTROL_TYPE_NAMES: &[&str] = &[
    "AppBar",
    "Button",
    "Calendar",
    "CheckBox",
    "ComboBox",
    "Custom",
    "DataGrid",
    "DataItem",
    "Document",
    "Edit",
    "Group",
    "Header",
    "HeaderItem",
    "Hyperlink",
    "Image",
    "List",
    "ListItem",
    "Menu",
    "MenuBar",
    "MenuItem",
    "Pane",
    "ProgressBar",
    "RadioButton",
    "ScrollBar",
    "SemanticZoom",
    "Separator",
    "Slider",
    "Spinner",
    "SplitButton",
    "StatusBar",
    "Tab",
    "TabItem",
    "Table",
    "Text",
    "Thumb",
    "TitleBar",
    "ToolBar",
    "ToolTip",
    "Tree",
    "TreeItem",
    "Window",
];

static PROPERTY_LOOKUP: Lazy<HashMap<String, &'static str>> =
    Lazy::new(|| lookup_table(PROPERTY_NAMES));
static CONTROL_TYPE_LOOKUP: Lazy<HashMap<String, &'static str>> =
    Lazy::new(|| lookup_table(CONTROL_TYPE_NAMES));

fn lookup_table(names: &'static [&'static str]) -> HashMap<String, &'static str> {
    names
        .iter()
        .map(|name| (name.to_ascii_lowercase(), *name))
        .collect()
}

fn stripped(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, '-' | '_' | ' '))
        .collect::<String>()
        .to_ascii_lowercase()
}

fn resolve(
    raw: &str,
    names: &'static [&'static str],
    table: &HashMap<String, &'static str>,
) -> Option<&'static str> {
    if let Some(exact) = names.iter().copied().find(|name| *name == raw) {
        return Some(exact);
    }
    if let Some(canonical) = table.get(&raw.to_ascii_lowercase()) {
        return Some(canonical);
    }
    table.get(stripped(raw).as_str()).copied()
}

/// Resolve a property identifier to its canonical name.
pub fn resolve_property(raw: &str) -> Option<&'static str> {
    resolve(raw, PROPERTY_NAMES, &PROPERTY_LOOKUP)
}

/// Resolve a control-type identifier to its canonical name.
pub fn resolve_control_type(raw: &str) -> Option<&'static str> {
    resolve(raw, CONTROL_TYPE_NAMES, &CONTROL_TYPE_LOOKUP)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_exact_and_case_insensitive() {
        assert_eq!(resolve_control_type("CheckBox"), Some("CheckBox"));
        assert_eq!(resolve_control_type("checkbox"), Some("CheckBox"));
        assert_eq!(resolve_property("automationid"), Some("AutomationId"));
    }

    #[test]
    fn resolves_hyphen_stripped() {
        assert_eq!(resolve_control_type("check-box"), Some("CheckBox"));
        assert_eq!(resolve_control_type("list_item"), Some("ListItem"));
        assert_eq!(resolve_property("automation-id"), Some("AutomationId"));
    }

    #[test]
    fn unknown_names_fail() {
        assert_eq!(resolve_control_type("Wibble"), None);
        assert_eq!(resolve_property("colour"), None);
    }
}
