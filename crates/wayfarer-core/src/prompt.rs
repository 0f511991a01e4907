//! Prompt rendering via `minijinja`.
//!
//! Two prompts exist: the decision prompt (persona, self state, neighbours,
//! recent events and the four-shape JSON contract) and the stricter
//! chat-reply prompt. Built-in templates are compiled in; operators can
//! override any of them by dropping a file with the same name into a
//! templates directory, which is picked up by [`PromptEncoder::with_overrides`].
//!
//! Prompt size is bounded: objects are capped per resource type and only the
//! most recent event-log lines are included.

use std::collections::HashMap;
use std::path::Path;

use minijinja::Environment;
use serde::Serialize;
use wayfarer_types::{EntityId, Observation, Vec3};

use crate::config::PromptConfig;

/// Errors raised while loading or rendering prompt templates.
#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    /// A template failed to compile or render.
    #[error("template error: {0}")]
    Template(String),

    /// A template override could not be read.
    #[error("failed to read template {path}: {source}")]
    Io {
        /// Path of the template file.
        path: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

/// The complete rendered prompt ready to send to an oracle backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt {
    /// System message establishing who the agent is and the answer format.
    pub system: String,
    /// User message carrying the situation.
    pub user: String,
}

/// Inputs of a decision prompt.
#[derive(Debug, Clone, Copy)]
pub struct DecisionContext<'a> {
    /// Static character flavor text.
    pub persona: &'a str,
    /// The agent's current observation.
    pub observation: &'a Observation,
    /// Event-log lines, oldest first. Only the newest are rendered.
    pub events: &'a [String],
    /// Locale for `message` and `intent` text.
    pub locale: &'a str,
}

/// Inputs of a chat-reply prompt.
#[derive(Debug, Clone, Copy)]
pub struct ChatReplyContext<'a> {
    /// Static character flavor text.
    pub persona: &'a str,
    /// The agent's current observation.
    pub observation: &'a Observation,
    /// Who spoke to the agent.
    pub speaker: &'a EntityId,
    /// What they said.
    pub heard: &'a str,
    /// Event-log lines, oldest first. Only the newest are rendered.
    pub events: &'a [String],
    /// Locale for `message` and `intent` text.
    pub locale: &'a str,
}

const DECISION_SYSTEM: &str = "decision_system.j2";
const DECISION_USER: &str = "decision_user.j2";
const CHAT_SYSTEM: &str = "chat_system.j2";
const CHAT_USER: &str = "chat_user.j2";

const BUILTIN_TEMPLATES: [(&str, &str); 4] = [
    (
        DECISION_SYSTEM,
        "You are {{ name }}, a character living in a small village world. {{ persona }}\n\
You decide what to do next. Answer with exactly one JSON object and nothing else.\n\
Write \"message\" and \"intent\" in {{ language }}.",
    ),
    (
        DECISION_USER,
        "## You
Health: {{ health }}
Current action: {{ current_action }}
Inventory: {% if inventory %}{{ inventory | join(\", \") }}{% else %}empty{% endif %}

## Characters nearby
{% for c in characters %}- {{ c.id }} (health {{ c.health }}, {{ c.distance }}m away, {{ c.action }}){% if c.dead %} [dead]{% endif %}
{% else %}- nobody
{% endfor %}
## Animals nearby
{% for a in animals %}- {{ a.id }}: {{ a.species }} (health {{ a.health }}, {{ a.distance }}m away{% if a.aggressive %}, aggressive{% endif %}){% if a.dead %} [dead]{% endif %}
{% else %}- none
{% endfor %}
## Objects nearby
{% for o in objects %}- {{ o.id }}: {{ o.kind }} ({{ o.distance }}m away)
{% else %}- nothing
{% endfor %}
## Recent events
{% for e in events %}- {{ e }}
{% else %}- nothing happened yet
{% endfor %}
## Response format
Respond with exactly one JSON object in one of these shapes:
{\"action\":\"attack\",\"target_id\":\"<id>\",\"intent\":\"<short intent>\"}
{\"action\":\"chat\",\"target_id\":\"<id>\",\"message\":\"<what you say>\",\"intent\":\"<short intent>\"}
{\"action\":\"trade\",\"target_id\":\"<id>\",\"give_items\":[{\"id\":\"<item>\",\"count\":1}],\"receive_items\":[{\"id\":\"<item>\",\"count\":1}],\"intent\":\"<short intent>\"}
{\"action\":\"follow\",\"target_id\":\"<id>\",\"intent\":\"<short intent>\"}
\"target_id\" must be one of the ids listed above. \"intent\" is at most {{ intent_max_words }} words.",
    ),
    (
        CHAT_SYSTEM,
        "You are {{ name }}. {{ persona }}\n\
{{ speaker }} just spoke to you. Reply in character.\n\
Answer with exactly one JSON object and nothing else. Write \"message\" and \"intent\" in {{ language }}.",
    ),
    (
        CHAT_USER,
        "{{ speaker }} said: \"{{ heard }}\"

## Recent events
{% for e in events %}- {{ e }}
{% else %}- nothing happened yet
{% endfor %}
## Response format
{\"action\":\"chat\",\"target_id\":\"{{ speaker }}\",\"message\":\"<your reply>\",\"intent\":\"<short intent>\"}
\"message\" is at most {{ reply_max_words }} words. \"intent\" is at most {{ intent_max_words }} words.",
    ),
];

/// Renders decision and chat-reply prompts.
pub struct PromptEncoder {
    env: Environment<'static>,
    limits: PromptConfig,
}

impl std::fmt::Debug for PromptEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptEncoder")
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl PromptEncoder {
    /// Create an encoder using the built-in templates.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::Template`] if a built-in template fails to
    /// compile.
    pub fn new(limits: PromptConfig) -> Result<Self, PromptError> {
        let mut env = Environment::new();
        for (name, source) in BUILTIN_TEMPLATES {
            env.add_template(name, source)
                .map_err(|e| PromptError::Template(format!("failed to add {name}: {e}")))?;
        }
        Ok(Self { env, limits })
    }

    /// Create an encoder whose built-in templates are replaced by any
    /// same-named file found in `dir` (`decision_system.j2`,
    /// `decision_user.j2`, `chat_system.j2`, `chat_user.j2`).
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::Io`] if an existing override cannot be read,
    /// or [`PromptError::Template`] if a template fails to compile.
    pub fn with_overrides(limits: PromptConfig, dir: &Path) -> Result<Self, PromptError> {
        let mut encoder = Self::new(limits)?;
        for (name, _) in BUILTIN_TEMPLATES {
            if let Some(source) = load_template(dir, name)? {
                tracing::debug!(template = name, dir = %dir.display(), "using template override");
                encoder
                    .env
                    .add_template_owned(name, source)
                    .map_err(|e| PromptError::Template(format!("failed to add {name}: {e}")))?;
            }
        }
        Ok(encoder)
    }

    /// Prompt limits in effect.
    pub const fn limits(&self) -> &PromptConfig {
        &self.limits
    }

    /// Render the decision prompt.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::Template`] if rendering fails.
    pub fn decision_prompt(&self, ctx: &DecisionContext<'_>) -> Result<RenderedPrompt, PromptError> {
        let obs = ctx.observation;
        let origin = obs.self_state.position;
        let vars = DecisionVars {
            name: obs.self_state.id.as_str(),
            persona: ctx.persona,
            language: language_name(ctx.locale),
            health: format_health(obs.self_state.health),
            current_action: &obs.self_state.current_action,
            inventory: obs
                .self_state
                .inventory
                .iter()
                .flatten()
                .map(|slot| format!("{} ({})", slot.id, slot.count))
                .collect(),
            characters: obs
                .nearby_characters
                .iter()
                .map(|c| CharacterLine {
                    id: c.id.as_str(),
                    health: format_health(c.health),
                    distance: format_distance(origin, c.position),
                    action: &c.current_action,
                    dead: c.dead,
                })
                .collect(),
            animals: obs
                .nearby_animals
                .iter()
                .map(|a| AnimalLine {
                    id: a.id.as_str(),
                    species: &a.species,
                    health: format_health(a.health),
                    distance: format_distance(origin, a.position),
                    aggressive: a.aggressive,
                    dead: a.dead,
                })
                .collect(),
            objects: self.object_lines(obs),
            events: newest(ctx.events, self.limits.decision_event_lines()),
            intent_max_words: self.limits.intent_max_words,
        };

        Ok(RenderedPrompt {
            system: self.render(DECISION_SYSTEM, &vars)?,
            user: self.render(DECISION_USER, &vars)?,
        })
    }

    /// Render the chat-reply prompt.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::Template`] if rendering fails.
    pub fn chat_reply_prompt(
        &self,
        ctx: &ChatReplyContext<'_>,
    ) -> Result<RenderedPrompt, PromptError> {
        let vars = ChatVars {
            name: ctx.observation.self_state.id.as_str(),
            persona: ctx.persona,
            language: language_name(ctx.locale),
            speaker: ctx.speaker.as_str(),
            heard: ctx.heard,
            events: newest(ctx.events, self.limits.chat_event_history),
            intent_max_words: self.limits.intent_max_words,
            reply_max_words: self.limits.chat_reply_max_words,
        };

        Ok(RenderedPrompt {
            system: self.render(CHAT_SYSTEM, &vars)?,
            user: self.render(CHAT_USER, &vars)?,
        })
    }

    /// Objects in nearest-first order, at most `objects_per_type` of each
    /// resource type.
    fn object_lines<'a>(&self, obs: &'a Observation) -> Vec<ObjectLine<'a>> {
        let origin = obs.self_state.position;
        let mut per_type: HashMap<&str, usize> = HashMap::new();
        let mut lines = Vec::new();
        for object in &obs.nearby_objects {
            let kind = object.resource.as_deref().unwrap_or(&object.object_type);
            let count = per_type.entry(kind).or_insert(0);
            if *count >= self.limits.objects_per_type {
                continue;
            }
            *count = count.saturating_add(1);
            lines.push(ObjectLine {
                id: object.id.as_str(),
                kind,
                distance: format_distance(origin, object.position),
            });
        }
        lines
    }

    fn render<S: Serialize>(&self, name: &str, vars: &S) -> Result<String, PromptError> {
        self.env
            .get_template(name)
            .map_err(|e| PromptError::Template(format!("missing {name}: {e}")))?
            .render(vars)
            .map_err(|e| PromptError::Template(format!("{name} render failed: {e}")))
    }
}

#[derive(Serialize)]
struct DecisionVars<'a> {
    name: &'a str,
    persona: &'a str,
    language: &'a str,
    health: String,
    current_action: &'a str,
    inventory: Vec<String>,
    characters: Vec<CharacterLine<'a>>,
    animals: Vec<AnimalLine<'a>>,
    objects: Vec<ObjectLine<'a>>,
    events: &'a [String],
    intent_max_words: usize,
}

#[derive(Serialize)]
struct CharacterLine<'a> {
    id: &'a str,
    health: String,
    distance: String,
    action: &'a str,
    dead: bool,
}

#[derive(Serialize)]
struct AnimalLine<'a> {
    id: &'a str,
    species: &'a str,
    health: String,
    distance: String,
    aggressive: bool,
    dead: bool,
}

#[derive(Serialize)]
struct ObjectLine<'a> {
    id: &'a str,
    kind: &'a str,
    distance: String,
}

#[derive(Serialize)]
struct ChatVars<'a> {
    name: &'a str,
    persona: &'a str,
    language: &'a str,
    speaker: &'a str,
    heard: &'a str,
    events: &'a [String],
    intent_max_words: usize,
    reply_max_words: usize,
}

/// The last `n` lines of `events`.
fn newest(events: &[String], n: usize) -> &[String] {
    let skip = events.len().saturating_sub(n);
    events.get(skip..).unwrap_or_default()
}

fn format_health(health: f32) -> String {
    format!("{health:.0}")
}

fn format_distance(from: Vec3, to: Vec3) -> String {
    format!("{:.1}", from.horizontal_distance(to))
}

/// Human-readable language name for a locale tag such as `de` or `en-US`.
fn language_name(locale: &str) -> &str {
    let primary = locale.split(['-', '_']).next().unwrap_or(locale);
    match primary.to_ascii_lowercase().as_str() {
        "en" => "English",
        "de" => "German",
        "fr" => "French",
        "es" => "Spanish",
        "it" => "Italian",
        "pt" => "Portuguese",
        "nl" => "Dutch",
        _ => locale,
    }
}

/// Read a template override from disk. A missing file is not an error.
fn load_template(dir: &Path, filename: &str) -> Result<Option<String>, PromptError> {
    let path = dir.join(filename);
    match std::fs::read_to_string(&path) {
        Ok(source) => Ok(Some(source)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(PromptError::Io {
            path: path.display().to_string(),
            source,
        }),
    }
}
