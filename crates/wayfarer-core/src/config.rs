//! Behavior configuration and its YAML loader.
//!
//! Tuning values for agents, animals and prompt sizes live in a YAML file
//! (`behavior.yaml` by convention). This module defines strongly-typed structs
//! mirroring that file. Every field has a default, so an empty document is a
//! valid configuration.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is out of range.
    #[error("invalid config value: {reason}")]
    Invalid {
        /// What is wrong.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level behavior configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BehaviorConfig {
    /// Humanoid agent tuning.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Prompt size limits and locale.
    #[serde(default)]
    pub prompt: PromptConfig,

    /// Animal tuning.
    #[serde(default)]
    pub animal: AnimalConfig,
}

impl BehaviorConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints the type system cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let a = &self.agent;
        if a.decision_interval_min_ms > a.decision_interval_max_ms {
            return Err(invalid("agent.decision_interval_min_ms exceeds decision_interval_max_ms"));
        }
        check_distance("agent.search_radius", a.search_radius, false)?;
        check_distance("agent.roam_radius", a.roam_radius, true)?;
        check_distance("agent.attack_range", a.attack_range, false)?;
        check_distance("agent.interaction_range", a.interaction_range, false)?;
        let an = &self.animal;
        if an.perception_interval_min_ms > an.perception_interval_max_ms {
            return Err(invalid("animal.perception_interval_min_ms exceeds perception_interval_max_ms"));
        }
        if an.idle_min_ms > an.idle_max_ms {
            return Err(invalid("animal.idle_min_ms exceeds idle_max_ms"));
        }
        check_distance("animal.detection_radius", an.detection_radius, false)?;
        check_distance("animal.roam_radius", an.roam_radius, true)?;
        check_distance("animal.attack_range", an.attack_range, false)?;
        Ok(())
    }
}

/// Largest accepted radius or range, in world units.
const MAX_DISTANCE: f32 = 1_000.0;

/// Distances must be finite, within [`MAX_DISTANCE`], and positive unless
/// `allow_zero`.
fn check_distance(name: &str, value: f32, allow_zero: bool) -> Result<(), ConfigError> {
    let lower_ok = if allow_zero { value >= 0.0 } else { value > 0.0 };
    if value.is_finite() && lower_ok && value <= MAX_DISTANCE {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            reason: format!("{name} must be within 0..={MAX_DISTANCE}, got {value}"),
        })
    }
}

fn invalid(reason: &str) -> ConfigError {
    ConfigError::Invalid {
        reason: reason.to_owned(),
    }
}

/// Humanoid agent tuning.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AgentConfig {
    /// Radius for observation and target re-acquisition.
    #[serde(default = "default_search_radius")]
    pub search_radius: f32,

    /// Maximum distance from home for fallback roam destinations.
    #[serde(default = "default_roam_radius")]
    pub roam_radius: f32,

    /// Distance at which an attack can land.
    #[serde(default = "default_attack_range")]
    pub attack_range: f32,

    /// Distance at which chat, trade and follow count as "arrived".
    #[serde(default = "default_interaction_range")]
    pub interaction_range: f32,

    /// Distance at which a roam destination counts as reached.
    #[serde(default = "default_arrival_tolerance")]
    pub arrival_tolerance: f32,

    /// Beyond this distance to an attack target the agent sprints.
    #[serde(default = "default_sprint_distance")]
    pub sprint_distance: f32,

    /// Lower bound of the jittered interval between decisions.
    #[serde(default = "default_decision_interval_min_ms")]
    pub decision_interval_min_ms: u64,

    /// Upper bound of the jittered interval between decisions.
    #[serde(default = "default_decision_interval_max_ms")]
    pub decision_interval_max_ms: u64,

    /// Minimum time between two oracle invocations for one agent.
    #[serde(default = "default_decision_cooldown_ms")]
    pub decision_cooldown_ms: u64,

    /// Minimum time between two reactive (damage) interrupts.
    #[serde(default = "default_reactive_cooldown_ms")]
    pub reactive_cooldown_ms: u64,

    /// Delay of the debounced decision scheduled after a chat.
    #[serde(default = "default_chat_followup_delay_ms")]
    pub chat_followup_delay_ms: u64,

    /// Time an agent waits in `deciding` before falling back locally.
    #[serde(default = "default_decision_deadline_ms")]
    pub decision_deadline_ms: u64,

    /// How long a follow decision keeps the agent near its target.
    #[serde(default = "default_follow_duration_ms")]
    pub follow_duration_ms: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            search_radius: default_search_radius(),
            roam_radius: default_roam_radius(),
            attack_range: default_attack_range(),
            interaction_range: default_interaction_range(),
            arrival_tolerance: default_arrival_tolerance(),
            sprint_distance: default_sprint_distance(),
            decision_interval_min_ms: default_decision_interval_min_ms(),
            decision_interval_max_ms: default_decision_interval_max_ms(),
            decision_cooldown_ms: default_decision_cooldown_ms(),
            reactive_cooldown_ms: default_reactive_cooldown_ms(),
            chat_followup_delay_ms: default_chat_followup_delay_ms(),
            decision_deadline_ms: default_decision_deadline_ms(),
            follow_duration_ms: default_follow_duration_ms(),
        }
    }
}

impl AgentConfig {
    /// Minimum time between two oracle invocations.
    pub const fn decision_cooldown(&self) -> Duration {
        Duration::from_millis(self.decision_cooldown_ms)
    }

    /// Minimum time between two reactive interrupts.
    pub const fn reactive_cooldown(&self) -> Duration {
        Duration::from_millis(self.reactive_cooldown_ms)
    }

    /// Delay of the post-chat follow-up decision.
    pub const fn chat_followup_delay(&self) -> Duration {
        Duration::from_millis(self.chat_followup_delay_ms)
    }

    /// Local deadline for an in-flight decision.
    pub const fn decision_deadline(&self) -> Duration {
        Duration::from_millis(self.decision_deadline_ms)
    }

    /// Duration of a follow decision.
    pub const fn follow_duration(&self) -> Duration {
        Duration::from_millis(self.follow_duration_ms)
    }
}

/// Prompt size limits and locale.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PromptConfig {
    /// Event-log lines included in decision prompts (clamped to 7..=10).
    #[serde(default = "default_event_history")]
    pub event_history: usize,

    /// Event-log lines included in chat-reply prompts.
    #[serde(default = "default_chat_event_history")]
    pub chat_event_history: usize,

    /// Objects listed per resource type.
    #[serde(default = "default_objects_per_type")]
    pub objects_per_type: usize,

    /// Characters kept in an observation.
    #[serde(default = "default_max_characters")]
    pub max_characters: usize,

    /// Animals kept in an observation.
    #[serde(default = "default_max_animals")]
    pub max_animals: usize,

    /// Objects kept in an observation.
    #[serde(default = "default_max_objects")]
    pub max_objects: usize,

    /// Word limit for the display intent.
    #[serde(default = "default_intent_max_words")]
    pub intent_max_words: usize,

    /// Word limit for chat replies.
    #[serde(default = "default_chat_reply_max_words")]
    pub chat_reply_max_words: usize,

    /// Language for `message` and `intent` text (`"en"`, `"de"`).
    #[serde(default = "default_locale")]
    pub locale: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            event_history: default_event_history(),
            chat_event_history: default_chat_event_history(),
            objects_per_type: default_objects_per_type(),
            max_characters: default_max_characters(),
            max_animals: default_max_animals(),
            max_objects: default_max_objects(),
            intent_max_words: default_intent_max_words(),
            chat_reply_max_words: default_chat_reply_max_words(),
            locale: default_locale(),
        }
    }
}

impl PromptConfig {
    /// Event-log lines for decision prompts, clamped to the 7..=10 band.
    pub fn decision_event_lines(&self) -> usize {
        self.event_history.clamp(7, 10)
    }
}

/// Animal tuning.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnimalConfig {
    /// Radius in which an animal notices characters.
    #[serde(default = "default_detection_radius")]
    pub detection_radius: f32,

    /// Distance at which an animal bite lands.
    #[serde(default = "default_animal_attack_range")]
    pub attack_range: f32,

    /// Maximum wander distance from home.
    #[serde(default = "default_animal_roam_radius")]
    pub roam_radius: f32,

    /// Distance at which a roam destination counts as reached.
    #[serde(default = "default_arrival_tolerance")]
    pub arrival_tolerance: f32,

    /// Target is dropped beyond `detection_radius * lose_target_factor`.
    #[serde(default = "default_lose_target_factor")]
    pub lose_target_factor: f32,

    /// Lower bound of the jittered perception interval.
    #[serde(default = "default_perception_interval_min_ms")]
    pub perception_interval_min_ms: u64,

    /// Upper bound of the jittered perception interval.
    #[serde(default = "default_perception_interval_max_ms")]
    pub perception_interval_max_ms: u64,

    /// Lower bound of the idle pause before wandering again.
    #[serde(default = "default_idle_min_ms")]
    pub idle_min_ms: u64,

    /// Upper bound of the idle pause before wandering again.
    #[serde(default = "default_idle_max_ms")]
    pub idle_max_ms: u64,
}

impl Default for AnimalConfig {
    fn default() -> Self {
        Self {
            detection_radius: default_detection_radius(),
            attack_range: default_animal_attack_range(),
            roam_radius: default_animal_roam_radius(),
            arrival_tolerance: default_arrival_tolerance(),
            lose_target_factor: default_lose_target_factor(),
            perception_interval_min_ms: default_perception_interval_min_ms(),
            perception_interval_max_ms: default_perception_interval_max_ms(),
            idle_min_ms: default_idle_min_ms(),
            idle_max_ms: default_idle_max_ms(),
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

const fn default_search_radius() -> f32 {
    30.0
}

const fn default_roam_radius() -> f32 {
    15.0
}

const fn default_attack_range() -> f32 {
    2.0
}

const fn default_interaction_range() -> f32 {
    3.0
}

const fn default_arrival_tolerance() -> f32 {
    1.0
}

const fn default_sprint_distance() -> f32 {
    10.0
}

const fn default_decision_interval_min_ms() -> u64 {
    8_000
}

const fn default_decision_interval_max_ms() -> u64 {
    15_000
}

const fn default_decision_cooldown_ms() -> u64 {
    10_000
}

const fn default_reactive_cooldown_ms() -> u64 {
    7_000
}

const fn default_chat_followup_delay_ms() -> u64 {
    3_000
}

const fn default_decision_deadline_ms() -> u64 {
    12_000
}

const fn default_follow_duration_ms() -> u64 {
    30_000
}

const fn default_event_history() -> usize {
    8
}

const fn default_chat_event_history() -> usize {
    5
}

const fn default_objects_per_type() -> usize {
    3
}

const fn default_max_characters() -> usize {
    10
}

const fn default_max_animals() -> usize {
    10
}

const fn default_max_objects() -> usize {
    30
}

const fn default_intent_max_words() -> usize {
    10
}

const fn default_chat_reply_max_words() -> usize {
    20
}

fn default_locale() -> String {
    "en".to_owned()
}

const fn default_detection_radius() -> f32 {
    12.0
}

const fn default_animal_attack_range() -> f32 {
    1.5
}

const fn default_animal_roam_radius() -> f32 {
    10.0
}

const fn default_lose_target_factor() -> f32 {
    1.5
}

const fn default_perception_interval_min_ms() -> u64 {
    500
}

const fn default_perception_interval_max_ms() -> u64 {
    1_000
}

const fn default_idle_min_ms() -> u64 {
    2_000
}

const fn default_idle_max_ms() -> u64 {
    6_000
}
