//! Defines the read-only application state and the event handler
//! itself.

use crate::conf::Settings;
use crate::trigger::{Notification, Trigger};
use anyhow::{anyhow, Context, Result};
use envy::from_env;
use lambda_runtime::LambdaEvent;
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, instrument, Level};

/// Compile a wildcard expression into an anchored regex. The star
/// (*) matches any number of non-slash characters; everything else
/// matches literally.
pub fn compile_glob(glob: &str) -> Result<Regex> {
    Regex::new(&format!(
        "^{}$",
        glob.split('*')
            .map(regex::escape)
            .collect::<Vec<String>>()
            .join("[^/]*?")
    ))
    .with_context(|| format!("Invalid wildcard expression {:?}", glob))
}

/// The outcome of handling one notification event.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Amount of records found in the event.
    pub records: usize,
    /// Records that were logged as created objects.
    pub processed: usize,
    /// Records skipped because of the configured filters.
    pub ignored: usize,
    /// Records that couldn't be decoded.
    pub failed: usize,
}

/// An App is an initialized application state, derived from
/// settings. This is only useful to pre-compute stuff that will be
/// used on every invocation.
pub struct App {
    /// The original settings.
    pub settings: Settings,

    /// The regex that matches object keys, if any.
    pub match_key_re: Option<Regex>,

    /// The regex that matches event names, if any.
    pub match_event_re: Option<Regex>,

    /// The maximum log level.
    pub log_level: Level,
}

impl App {
    /// Initialize an App instance given a settings struct. Consumes
    /// the settings struct.
    pub fn new(settings: Settings) -> Result<Self> {
        // An empty expression disables the filter.
        let match_key_re = settings
            .match_key
            .as_deref()
            .filter(|glob| !glob.is_empty())
            .map(compile_glob)
            .transpose()?;
        let match_event_re = settings
            .match_event
            .as_deref()
            .filter(|glob| !glob.is_empty())
            .map(compile_glob)
            .transpose()?;
        let log_level = settings
            .log_level
            .parse::<Level>()
            .with_context(|| format!("Invalid log level {:?}", settings.log_level))?;
        Ok(App {
            settings,
            match_key_re,
            match_event_re,
            log_level,
        })
    }

    /// Whether the trigger passes the configured filters. Triggers
    /// without an event name are accepted regardless of the event
    /// filter.
    fn accepts(&self, trigger: &Trigger) -> bool {
        let event_matches = match (&self.match_event_re, &trigger.event_name) {
            (Some(re), Some(event_name)) => re.is_match(event_name),
            _ => true,
        };
        let key_matches = self
            .match_key_re
            .as_ref()
            .map_or(true, |re| re.is_match(&trigger.key));
        event_matches && key_matches
    }

    /// Handle a notification event. Every record is handled on its
    /// own, and no error escapes: failures are logged and counted.
    #[instrument(skip(self, payload))]
    pub fn handle(&self, payload: Value) -> Summary {
        info!("Received S3 notification event");
        if tracing::enabled!(Level::DEBUG) {
            match serde_json::to_string_pretty(&payload) {
                Ok(dump) => debug!("{}", dump),
                Err(e) => debug!("Couldn't serialize the event: {:?}", e),
            }
        }

        let notification = match Notification::from_payload(payload) {
            Ok(notification) => notification,
            Err(e) => {
                error!("Error parsing S3 event: {:#}", e);
                return Summary::default();
            }
        };

        let mut summary = Summary {
            records: notification.records.len(),
            ..Summary::default()
        };
        for (index, record) in notification.records.into_iter().enumerate() {
            let trigger = match Trigger::from_record(record) {
                Ok(trigger) => trigger,
                Err(e) => {
                    error!("Error parsing S3 event record {}: {:#}", index, e);
                    summary.failed += 1;
                    continue;
                }
            };
            if !self.accepts(&trigger) {
                info!(
                    "Ignoring record {} for key '{}' in bucket '{}' (event {:?})",
                    index, trigger.key, trigger.bucket, trigger.event_name
                );
                summary.ignored += 1;
                continue;
            }
            info!(
                "New object created in bucket '{}' at key '{}'",
                trigger.bucket, trigger.key
            );
            // Downstream processing of (bucket, key) belongs here.
            summary.processed += 1;
        }
        summary
    }

    /// Handle a notification event given as raw text. A body that
    /// isn't JSON is a delivery failure, logged once.
    pub fn handle_raw(&self, body: &str) -> Summary {
        if body.trim().is_empty() {
            error!("Error parsing S3 event: empty payload");
            return Summary::default();
        }
        match serde_json::from_str::<Value>(body) {
            Ok(payload) => self.handle(payload),
            Err(e) => {
                error!("Error parsing S3 event: payload is not JSON: {}", e);
                Summary::default()
            }
        }
    }

    /// Handle a Lambda invocation.
    pub async fn invoke(&self, event: LambdaEvent<Value>) -> Result<Summary> {
        Ok(self.handle(event.payload))
    }
}

/// Handle a Lambda invocation with the global App instance.
pub async fn function_handler(event: LambdaEvent<Value>) -> Result<Summary> {
    current().invoke(event).await
}

/// Global App instance.
static CURRENT: OnceCell<App> = OnceCell::new();

/// Initialize the global App instance.
pub fn init() -> Result<()> {
    let settings = from_env()?;
    let app = App::new(settings)?;
    CURRENT
        .set(app)
        .map_err(|_| anyhow!("app::CURRENT was already initialized"))
}

/// The configured log level, or INFO if the App instance couldn't
/// be initialized.
pub fn log_level() -> Level {
    CURRENT.get().map_or(Level::INFO, |app| app.log_level)
}

/// Get the current App instance, or panic if it hasn't been
/// initialized.
pub fn current() -> &'static App {
    CURRENT.get().expect("app is not initialized")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_matches_non_slash_runs() {
        let re = compile_glob("release/*").unwrap();
        assert!(re.is_match("release/v1.zip"));
        assert!(!re.is_match("release/nested/v1.zip"));
        assert!(!re.is_match("staging/v1.zip"));
    }

    #[test]
    fn glob_escapes_literal_characters() {
        let re = compile_glob("release/v1.zip").unwrap();
        assert!(re.is_match("release/v1.zip"));
        assert!(!re.is_match("release/v1xzip"));
    }

    #[test]
    fn default_event_filter_accepts_created_events() {
        let app = App::new(Settings::default()).unwrap();
        let mut trigger = Trigger {
            bucket: String::from("b"),
            key: String::from("k"),
            event_name: Some(String::from("ObjectCreated:CompleteMultipartUpload")),
        };
        assert!(app.accepts(&trigger));
        trigger.event_name = Some(String::from("ObjectRemoved:Delete"));
        assert!(!app.accepts(&trigger));
        trigger.event_name = None;
        assert!(app.accepts(&trigger));
    }

    #[test]
    fn configured_log_level_is_parsed() {
        assert_eq!(App::new(Settings::default()).unwrap().log_level, Level::INFO);
        let settings = Settings {
            log_level: String::from("debug"),
            ..Settings::default()
        };
        assert_eq!(App::new(settings).unwrap().log_level, Level::DEBUG);
    }

    #[test]
    fn empty_expressions_disable_filters() {
        let app = App::new(Settings {
            match_key: Some(String::new()),
            match_event: Some(String::new()),
            ..Settings::default()
        })
        .unwrap();
        assert!(app.match_key_re.is_none());
        assert!(app.match_event_re.is_none());
        assert!(app.accepts(&Trigger {
            bucket: String::from("b"),
            key: String::from("release/v1.zip"),
            event_name: Some(String::from("ObjectRemoved:Delete")),
        }));
    }

    #[test]
    fn log_level_falls_back_to_info_without_an_app() {
        assert!(CURRENT.get().is_none());
        assert_eq!(log_level(), Level::INFO);
    }

    #[test]
    fn invalid_log_level_is_rejected() {
        let settings = Settings {
            log_level: String::from("loud"),
            ..Settings::default()
        };
        assert!(App::new(settings).is_err());
    }
}
