//! Per-session form state and the input events that mutate it.

use serde::{Deserialize, Serialize};

/// One control of the viewer form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Path,
    Key,
    X,
    Y,
    Z,
    Defer,
}

/// A change of one form control, as sent by the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "lowercase")]
pub enum InputEvent {
    Path(String),
    Key(String),
    X(String),
    Y(String),
    Z(String),
    Defer(bool),
}

impl InputEvent {
    pub fn field(&self) -> Field {
        match self {
            Self::Path(_) => Field::Path,
            Self::Key(_) => Field::Key,
            Self::X(_) => Field::X,
            Self::Y(_) => Field::Y,
            Self::Z(_) => Field::Z,
            Self::Defer(_) => Field::Defer,
        }
    }
}

/// Current value of every form control. Empty strings mean "nothing selected".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState {
    pub path: String,
    pub key: String,
    pub x: String,
    pub y: String,
    pub z: String,
    /// Hold the chart back until the axes are chosen explicitly
    pub defer: bool,
}

impl SelectionState {
    pub fn new(path: impl Into<String>, defer: bool) -> Self {
        Self {
            path: path.into(),
            defer,
            ..Self::default()
        }
    }

    /// Apply an input event. Returns true if the stored value changed.
    pub fn apply(&mut self, event: InputEvent) -> bool {
        match event {
            InputEvent::Path(v) => replace(&mut self.path, v),
            InputEvent::Key(v) => replace(&mut self.key, v),
            InputEvent::X(v) => replace(&mut self.x, v),
            InputEvent::Y(v) => replace(&mut self.y, v),
            InputEvent::Z(v) => replace(&mut self.z, v),
            InputEvent::Defer(v) => replace(&mut self.defer, v),
        }
    }

    /// Set all three axis selections at once, returning the fields that changed.
    pub fn set_axes(&mut self, value: &str) -> Vec<Field> {
        let mut changed = Vec::new();
        for (field, slot) in [
            (Field::X, &mut self.x),
            (Field::Y, &mut self.y),
            (Field::Z, &mut self.z),
        ] {
            if replace(slot, value.to_string()) {
                changed.push(field);
            }
        }
        changed
    }

    /// Optional grouping column
    pub fn group(&self) -> Option<&str> {
        (!self.z.is_empty()).then_some(self.z.as_str())
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}
