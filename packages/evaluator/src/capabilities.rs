//! Capability Registry: the widgets a document may reference without
//! declaring them.
//!
//! Widgets are registered on a mutable [`CapabilityRegistry`] and then
//! resolved into an immutable [`CapabilitySet`], which is what every compile
//! and render call receives. Sessions and tests can hold independent sets;
//! there is no global registry.

use crate::builtins;
use crate::render::{Props, RenderNode};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WidgetError {
    #[error("missing required prop '{prop}'")]
    MissingProp { prop: String },

    #[error("prop '{prop}' {message}")]
    InvalidProp { prop: String, message: String },

    #[error("{0}")]
    Render(String),
}

impl WidgetError {
    pub fn invalid(prop: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidProp {
            prop: prop.into(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("widget '{0}' is already registered")]
    Duplicate(String),

    #[error("invalid widget name '{0}': names start with an uppercase ASCII letter")]
    InvalidName(String),
}

/// A renderable implementation referenced from markup as `<Name ... />`
pub trait Widget: Send + Sync {
    /// Name used in markup
    fn name(&self) -> &str;

    /// One-line description for listings
    fn describe(&self) -> &str;

    /// Markup inserted by the toolbar's widget command
    fn template(&self) -> String;

    /// Check props at compile time
    fn validate(&self, _props: &Props) -> Result<(), WidgetError> {
        Ok(())
    }

    /// Produce the rendered subtree. `children` are the already rendered
    /// body blocks.
    fn render(&self, props: &Props, children: Vec<RenderNode>) -> Result<RenderNode, WidgetError>;
}

/// Mutable builder for a [`CapabilitySet`]
#[derive(Default)]
pub struct CapabilityRegistry {
    widgets: BTreeMap<String, Arc<dyn Widget>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the stock widgets
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for widget in builtins::all() {
            registry.widgets.insert(widget.name().to_string(), widget);
        }
        registry
    }

    pub fn register(&mut self, widget: impl Widget + 'static) -> Result<(), RegistryError> {
        self.register_arc(Arc::new(widget))
    }

    pub fn register_arc(&mut self, widget: Arc<dyn Widget>) -> Result<(), RegistryError> {
        let name = widget.name().to_string();
        if !name.starts_with(|c: char| c.is_ascii_uppercase()) {
            return Err(RegistryError::InvalidName(name));
        }
        if self.widgets.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        self.widgets.insert(name, widget);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    /// Freeze the current registrations. Later registrations do not affect
    /// sets already resolved.
    pub fn resolve(&self) -> CapabilitySet {
        CapabilitySet {
            widgets: Arc::new(self.widgets.clone()),
        }
    }
}

/// Immutable widget lookup passed to every compile. Cloning is cheap.
#[derive(Clone, Default)]
pub struct CapabilitySet {
    widgets: Arc<BTreeMap<String, Arc<dyn Widget>>>,
}

impl CapabilitySet {
    /// Set with no widgets
    pub fn empty() -> Self {
        Self::default()
    }

    /// The stock widgets
    pub fn builtins() -> Self {
        CapabilityRegistry::with_builtins().resolve()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Widget>> {
        self.widgets.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.widgets.contains_key(name)
    }

    /// Widget names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.widgets.keys().map(String::as_str)
    }

    pub fn template(&self, name: &str) -> Option<String> {
        self.get(name).map(|w| w.template())
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }
}

impl fmt::Debug for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

/// Optional string prop
pub fn string_prop<'p>(props: &'p Props, name: &str) -> Result<Option<&'p str>, WidgetError> {
    match props.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(WidgetError::invalid(name, "must be a string")),
    }
}

/// Required string prop
pub fn required_string<'p>(props: &'p Props, name: &str) -> Result<&'p str, WidgetError> {
    string_prop(props, name)?.ok_or_else(|| WidgetError::MissingProp {
        prop: name.to_string(),
    })
}

/// Boolean prop; bare flags evaluate to `true`
pub fn bool_prop(props: &Props, name: &str, default: bool) -> Result<bool, WidgetError> {
    match props.get(name) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(b)) => Ok(*b),
        Some(_) => Err(WidgetError::invalid(name, "must be true or false")),
    }
}

/// Optional numeric prop
pub fn number_prop(props: &Props, name: &str) -> Result<Option<f64>, WidgetError> {
    match props.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(_) => Err(WidgetError::invalid(name, "must be a number")),
    }
}

/// String prop restricted to a fixed set of values
pub fn choice_prop<'p>(
    props: &'p Props,
    name: &str,
    choices: &[&'static str],
    default: &'static str,
) -> Result<&'p str, WidgetError> {
    match string_prop(props, name)? {
        None => Ok(default),
        Some(value) if choices.contains(&value) => Ok(value),
        Some(value) => Err(WidgetError::invalid(
            name,
            format!("must be one of {} (got \"{}\")", choices.join(", "), value),
        )),
    }
}
