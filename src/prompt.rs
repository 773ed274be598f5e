//! System-instruction assembly for the model-call service.
//!
//! The instruction encodes three things the upstream model needs for a turn:
//! the active personas (name + behavioral directive), the exact wire
//! micro-format it must emit, and the list of ids that are valid this turn.

use crate::persona::Roster;
use crate::stream::grammar::{CLOSE_MARKER, opening_marker};
use minijinja::Environment;
use serde::Serialize;
use thiserror::Error;

/// Errors raised while assembling the system instruction.
#[derive(Debug, Error)]
pub enum PromptError {
    /// The instruction template failed to compile or render.
    #[error("failed to render system instruction: {0}")]
    Render(#[from] minijinja::Error),

    /// The active roster is empty; the model would have no valid speaker.
    #[error("cannot build a system instruction for an empty active roster")]
    EmptyRoster,
}

const SYSTEM_INSTRUCTION_TEMPLATE: &str = "\
You are hosting a group conversation carried by several personas. All of them
share one reply stream; you speak as each of them in turn.

# Personas
{% for persona in personas %}
## {{ persona.name }} (id: {{ persona.id }})
{{ persona.directive }}
{% endfor %}

# Output format
Every piece of your reply must belong to exactly one persona. Start a
persona's contribution with its opening marker and finish it with the closing
marker, like this:

{{ example_open }}the contribution text{{ close_marker }}

Rules:
- Valid ids for this turn: {{ ids | join(\", \") }}. Use them exactly as
  written; ids are case-sensitive.
- Never put text outside the markers; unmarked text is discarded.
- A persona may contribute more than once; each contribution gets its own
  marker pair.
";

#[derive(Serialize)]
struct PersonaContext<'a> {
    id: &'a str,
    name: &'a str,
    directive: &'a str,
}

#[derive(Serialize)]
struct InstructionContext<'a> {
    personas: Vec<PersonaContext<'a>>,
    ids: Vec<&'a str>,
    example_open: String,
    close_marker: &'static str,
}

/// Renders the system instruction for the current active roster.
pub fn system_instruction(roster: &Roster) -> Result<String, PromptError> {
    let personas = roster.active_personas();
    if personas.is_empty() {
        return Err(PromptError::EmptyRoster);
    }

    let context = InstructionContext {
        personas: personas
            .iter()
            .map(|p| PersonaContext {
                id: p.id.as_str(),
                name: &p.name,
                directive: &p.directive,
            })
            .collect(),
        ids: personas.iter().map(|p| p.id.as_str()).collect(),
        example_open: opening_marker(personas[0].id.as_str()),
        close_marker: CLOSE_MARKER,
    };

    let mut env = Environment::new();
    env.add_template("system_instruction", SYSTEM_INSTRUCTION_TEMPLATE)?;
    let template = env.get_template("system_instruction")?;
    Ok(template.render(&context)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persona::Persona;

    #[test]
    fn test_instruction_lists_personas_and_ids() {
        let roster = Roster::new()
            .with_persona(Persona::new("sage", "Sage", "Answer with care."))
            .with_persona(Persona::new("spark", "Spark", "Be quick and playful."));

        let instruction = system_instruction(&roster).unwrap();

        assert!(instruction.contains("Sage"));
        assert!(instruction.contains("Answer with care."));
        assert!(instruction.contains("Spark"));
        assert!(instruction.contains("sage, spark"));
    }

    #[test]
    fn test_instruction_carries_wire_markers() {
        let roster = Roster::new().with_persona(Persona::new("sage", "Sage", "Directive."));

        let instruction = system_instruction(&roster).unwrap();

        assert!(instruction.contains("[START:sage]"));
        assert!(instruction.contains("[END]"));
    }

    #[test]
    fn test_empty_active_roster_is_rejected() {
        let mut roster = Roster::new().with_persona(Persona::new("sage", "Sage", "Directive."));
        roster.deactivate(&"sage".into());

        assert!(matches!(
            system_instruction(&roster),
            Err(PromptError::EmptyRoster)
        ));
    }
}
