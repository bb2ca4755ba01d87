//! Engine configuration.
//!
//! One [`Config`] is shared by every view model of a program. The defaults
//! match the conventional template syntax: `v-` directives with `:` and `@`
//! shorthands, and `data-v-*` bookkeeping attributes.

/// Template syntax and runtime options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Reserved directive prefix (`v-for`, `v-bind:href`, ...).
    pub prefix: String,
    /// Prefix of the attributes the engine writes for its own use.
    pub marker: String,
    /// Native event type that drives two-way binding.
    pub model_event: String,
    /// HTML-escape double-mustache output.
    pub escape_text: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prefix: "v-".to_string(),
            marker: "data-v".to_string(),
            model_event: "input".to_string(),
            escape_text: false,
        }
    }
}

impl Config {
    /// Attribute holding the method bound to `event_type` (`data-v-on-click`).
    pub fn on_attr(&self, event_type: &str) -> String {
        format!("{}-on-{}", self.marker, event_type)
    }

    /// Attribute holding the key filter for `event_type` (`data-v-keys-keyup`).
    pub fn keys_attr(&self, event_type: &str) -> String {
        format!("{}-keys-{}", self.marker, event_type)
    }

    /// Attribute naming the field a two-way bound input writes to.
    pub fn model_attr(&self) -> String {
        format!("{}-model", self.marker)
    }
}
