//! Persona identity and roster management.
//!
//! Personas carry no behavior of their own: a persona is a plain data record
//! (display name, behavioral directive, optional icon) keyed by an opaque id.
//! The [`Roster`] holds the full mapping plus the subset that is currently
//! *active*, i.e. addressable by the model in the next turn. The active set
//! may only change between turns; the session layer enforces that.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Opaque identifier for a persona.
///
/// Ids are matched case-sensitively and exactly; `"Sage"` and `"sage"` are
/// different personas.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonaId(String);

impl PersonaId {
    /// Creates a persona id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PersonaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PersonaId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PersonaId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A single persona: display metadata plus the directive text injected into
/// the system instruction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    /// Stable id used in wire markers and note attribution.
    pub id: PersonaId,

    /// Human-facing display name.
    pub name: String,

    /// Behavioral directive rendered into the system instruction.
    pub directive: String,

    /// Optional visual icon/emoji for the rendering layer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl Persona {
    /// Creates a persona without an icon.
    pub fn new(
        id: impl Into<PersonaId>,
        name: impl Into<String>,
        directive: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            directive: directive.into(),
            icon: None,
        }
    }

    /// Sets the icon.
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }
}

/// The persona roster: all known personas and the currently active subset.
///
/// Active order is preserved; it determines the order personas are listed in
/// the system instruction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Roster {
    personas: BTreeMap<PersonaId, Persona>,
    active: Vec<PersonaId>,
}

impl Roster {
    /// Creates an empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a persona and activates it. Builder-style.
    pub fn with_persona(mut self, persona: Persona) -> Self {
        self.add(persona);
        self
    }

    /// Adds a persona and activates it. Re-adding an id replaces its record
    /// without duplicating the active entry.
    pub fn add(&mut self, persona: Persona) {
        let id = persona.id.clone();
        self.personas.insert(id.clone(), persona);
        if !self.active.contains(&id) {
            self.active.push(id);
        }
    }

    /// Activates a known persona. Returns `false` for unknown ids.
    pub fn activate(&mut self, id: &PersonaId) -> bool {
        if !self.personas.contains_key(id) {
            return false;
        }
        if !self.active.contains(id) {
            self.active.push(id.clone());
        }
        true
    }

    /// Deactivates a persona; it stays in the roster but is no longer
    /// addressable by the model.
    pub fn deactivate(&mut self, id: &PersonaId) {
        self.active.retain(|a| a != id);
    }

    /// Looks up a persona record by id.
    pub fn get(&self, id: &PersonaId) -> Option<&Persona> {
        self.personas.get(id)
    }

    /// Returns true if the given id names a currently active persona.
    ///
    /// Takes a string slice so the parser can check candidate ids straight
    /// out of the raw buffer without allocating.
    pub fn is_active(&self, id: &str) -> bool {
        self.active.iter().any(|a| a.as_str() == id)
    }

    /// Returns the active personas in activation order.
    pub fn active_personas(&self) -> Vec<&Persona> {
        self.active
            .iter()
            .filter_map(|id| self.personas.get(id))
            .collect()
    }

    /// Returns the active ids in activation order.
    pub fn active_ids(&self) -> &[PersonaId] {
        &self.active
    }

    /// Returns the display name for an id, falling back to the raw id when
    /// the persona is not in the roster.
    pub fn display_name<'a>(&'a self, id: &'a PersonaId) -> &'a str {
        self.personas.get(id).map_or(id.as_str(), |p| p.name.as_str())
    }
}
