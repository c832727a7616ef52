//! Defines configuration as read from the environment.

use serde::Deserialize;

/// Default `match_event` value.
fn default_match_event() -> Option<String> {
    Some(String::from("ObjectCreated:*"))
}

/// Default `log_level` value.
fn default_log_level() -> String {
    String::from("info")
}

/// The handler logs every object-creation record it receives. The
/// configuration must be given as environment variables, and every
/// variable is optional.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Defines a filter to select only matching keys. The star (*)
    /// can be used as a wildcard matching any number of non-slash
    /// characters. E.g. to match any file in a folder, use
    /// `"release/*"`. Omitting this, or leaving it empty, will make it
    /// match any key, since the trigger prefix is already enforced
    /// upstream.
    #[serde(default)]
    pub match_key: Option<String>,

    /// Defines a filter over the record's event name, using the same
    /// wildcard syntax as `match_key`. Records that don't carry an
    /// event name are never filtered out. An empty value disables the
    /// filter.
    #[serde(default = "default_match_event")]
    pub match_event: Option<String>,

    /// The maximum level of the emitted logs.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            match_key: None,
            match_event: default_match_event(),
            log_level: default_log_level(),
        }
    }
}
