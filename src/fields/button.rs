//! fields::button
//!
//! Button templates and the buttons declared in documents.
//!
//! # Lookup
//!
//! A button id resolves to a template first, then to a button declared in
//! the same document. Templates are global and must have unique ids.
//!
//! # Lifetime
//!
//! Document buttons are reference counted: every block declaring a button
//! holds a [`ButtonGuard`], and the button goes away when the last guard
//! is dropped.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::core::errors::{BindError, ErrorCollection, ErrorLevel};
use crate::reactive::{RefGuard, RefRegistry};

/// Errors from the button registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ButtonError {
    #[error("button '{label}' has no id")]
    MissingId { label: String },

    /// A document button reuses a template id.
    #[error("button id '{0}' is already used by a button template")]
    TemplateConflict(String),
}

/// A button definition.
///
/// Actions are kept as raw values; running them is up to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ButtonConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub actions: Vec<Value>,
}

impl ButtonConfig {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            label: label.into(),
            tooltip: None,
            hidden: false,
            actions: Vec::new(),
        }
    }

    /// The id, if present and non-empty.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }
}

type ButtonKey = (String, String);
type LoadCallback = Rc<dyn Fn(&ButtonConfig)>;

#[derive(Default)]
struct Buttons {
    templates: RefCell<HashMap<String, ButtonConfig>>,
    declared: RefRegistry<ButtonKey, ButtonConfig>,
    listeners: RefCell<HashMap<ButtonKey, Vec<(u64, LoadCallback)>>>,
    next_listener: Cell<u64>,
}

/// The button registry. Clones share the same registry.
#[derive(Clone, Default)]
pub struct ButtonManager {
    inner: Rc<Buttons>,
}

impl fmt::Debug for ButtonManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ButtonManager")
            .field("templates", &self.inner.templates.borrow().len())
            .field("declared", &self.inner.declared.len())
            .finish()
    }
}

/// Keeps a declared button alive.
pub type ButtonGuard = RefGuard<ButtonKey, ButtonConfig>;

/// Removes its load listener when dropped.
pub struct LoadListenerHandle {
    key: ButtonKey,
    id: u64,
    buttons: Weak<Buttons>,
}

impl Drop for LoadListenerHandle {
    fn drop(&mut self) {
        let Some(buttons) = self.buttons.upgrade() else {
            return;
        };
        let Ok(mut listeners) = buttons.listeners.try_borrow_mut() else {
            return;
        };
        if let Some(entries) = listeners.get_mut(&self.key) {
            entries.retain(|(id, _)| *id != self.id);
            if entries.is_empty() {
                listeners.remove(&self.key);
            }
        }
    }
}

impl ButtonManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all templates.
    ///
    /// If any template lacks an id or reuses one, no templates are kept and
    /// the returned collection holds every problem.
    pub fn set_templates(&self, templates: Vec<ButtonConfig>) -> ErrorCollection {
        let mut errors = ErrorCollection::new("button templates");
        let mut accepted: HashMap<String, ButtonConfig> = HashMap::new();

        for template in templates {
            let Some(id) = template.id().map(str::to_string) else {
                errors.add(BindError::validation(
                    ErrorLevel::Error,
                    format!(
                        "button with label '{}' has no id, but button templates must have an id",
                        template.label
                    ),
                    None,
                ));
                continue;
            };
            if accepted.contains_key(&id) {
                errors.add(BindError::validation(
                    ErrorLevel::Error,
                    format!("button id '{id}' is used by more than one template"),
                    None,
                ));
                continue;
            }
            accepted.insert(id, template);
        }

        if errors.has_errors() {
            accepted.clear();
        }
        debug!(count = accepted.len(), "button templates set");
        *self.inner.templates.borrow_mut() = accepted;
        errors
    }

    pub fn template_count(&self) -> usize {
        self.inner.templates.borrow().len()
    }

    /// Declare a button in a document.
    ///
    /// A redeclaration replaces the config and adds a reference. Load
    /// listeners for the button are notified.
    pub fn add_button(&self, file_path: &str, button: ButtonConfig) -> Result<ButtonGuard, ButtonError> {
        let Some(id) = button.id().map(str::to_string) else {
            return Err(ButtonError::MissingId {
                label: button.label,
            });
        };
        if self.inner.templates.borrow().contains_key(&id) {
            return Err(ButtonError::TemplateConflict(id));
        }

        let key = (file_path.to_string(), id);
        let guard = self.inner.declared.checkout(key.clone(), || button.clone());
        self.inner.declared.replace(&key, button);
        self.notify(&key);
        Ok(guard)
    }

    /// Resolve a button id as seen from a document.
    pub fn get_button(&self, file_path: &str, id: &str) -> Option<ButtonConfig> {
        if let Some(template) = self.inner.templates.borrow().get(id) {
            return Some(template.clone());
        }
        self.inner
            .declared
            .get(&(file_path.to_string(), id.to_string()))
    }

    /// Call `callback` whenever the button is declared in the document,
    /// and right away if it already resolves.
    pub fn on_button_loaded(
        &self,
        file_path: &str,
        id: &str,
        callback: impl Fn(&ButtonConfig) + 'static,
    ) -> LoadListenerHandle {
        let key = (file_path.to_string(), id.to_string());
        let listener_id = self.inner.next_listener.get();
        self.inner.next_listener.set(listener_id + 1);

        if let Some(config) = self.get_button(file_path, id) {
            callback(&config);
        }
        self.inner
            .listeners
            .borrow_mut()
            .entry(key.clone())
            .or_default()
            .push((listener_id, Rc::new(callback)));

        LoadListenerHandle {
            key,
            id: listener_id,
            buttons: Rc::downgrade(&self.inner),
        }
    }

    fn notify(&self, key: &ButtonKey) {
        let Some(config) = self.get_button(&key.0, &key.1) else {
            return;
        };
        let callbacks: Vec<LoadCallback> = self
            .inner
            .listeners
            .borrow()
            .get(key)
            .map(|entries| entries.iter().map(|(_, cb)| Rc::clone(cb)).collect())
            .unwrap_or_default();
        for callback in callbacks {
            callback(&config);
        }
    }
}
