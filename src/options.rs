use crate::consts::{
    DEFAULT_CONTAINER, DEFAULT_DESCRIPTION, DEFAULT_DURATION, DEFAULT_SPEAKER, DURATION_RE,
};
use thiserror::Error;

pub const CONNECTION_STRING_VAR: &str = "AZURE_STORAGE_CONNECTION_STRING";
pub const CONTAINER_VAR: &str = "AZURE_STORAGE_CONTAINER";
pub const DESCRIPTION_VAR: &str = "ARCHIVE_DESCRIPTION";
pub const SPEAKER_VAR: &str = "ARCHIVE_SPEAKER";
pub const DURATION_VAR: &str = "ARCHIVE_DURATION";
pub const PREFIX_VAR: &str = "ARCHIVE_PREFIX";

/// Why a set of script options cannot be used.
#[derive(Debug, Error, PartialEq)]
pub enum InvalidOptions {
    #[error("Set AZURE_STORAGE_CONNECTION_STRING or pass it as the first argument.")]
    MissingConnectionString,

    #[error("ARCHIVE_SPEAKER must not be blank.")]
    BlankSpeaker,

    #[error("ARCHIVE_DURATION must be HH:MM:SS, got `{0}`.")]
    BadDuration(String),
}

/// Settings for one script generation run.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptOptions {
    pub connection_string: Option<String>,
    pub container_name: String,
    /// Written into every row's description column.
    pub description: String,
    /// Used whenever no speaker can be read from a file name.
    pub speaker: String,
    pub duration: String,
    pub blob_prefix: Option<String>,
}

impl Default for ScriptOptions {
    fn default() -> Self {
        Self {
            connection_string: None,
            container_name: DEFAULT_CONTAINER.to_string(),
            description: DEFAULT_DESCRIPTION.to_string(),
            speaker: DEFAULT_SPEAKER.to_string(),
            duration: DEFAULT_DURATION.to_string(),
            blob_prefix: None,
        }
    }
}

impl ScriptOptions {
    /// Resolve options from the process environment, letting the positional
    /// `[connection, container, prefix]` arguments override it.
    pub fn from_env(args: &[String]) -> Self {
        Self::resolve(|key| std::env::var(key).ok(), args)
    }

    /// Same as [`ScriptOptions::from_env`] over an arbitrary variable lookup.
    /// Blank values, from either side, count as absent.
    pub fn resolve(env: impl Fn(&str) -> Option<String>, args: &[String]) -> Self {
        let var = |key: &str| env(key).filter(|v| !v.trim().is_empty());
        let arg = |i: usize| {
            args.get(i)
                .filter(|a| !a.trim().is_empty())
                .map(ToString::to_string)
        };
        let defaults = Self::default();

        let options = Self {
            connection_string: arg(0).or_else(|| var(CONNECTION_STRING_VAR)),
            container_name: arg(1)
                .or_else(|| var(CONTAINER_VAR))
                .unwrap_or(defaults.container_name),
            description: var(DESCRIPTION_VAR).unwrap_or(defaults.description),
            speaker: var(SPEAKER_VAR).unwrap_or(defaults.speaker),
            duration: var(DURATION_VAR).unwrap_or(defaults.duration),
            blob_prefix: arg(2).or_else(|| var(PREFIX_VAR)),
        };
        tracing::debug!(
            container = %options.container_name,
            prefix = ?options.blob_prefix,
            has_connection = options.connection_string.is_some(),
            "resolved script options"
        );
        options
    }

    /// Check the options before anything is listed. A connection string is
    /// only needed when blobs come from the storage account.
    pub fn validate(&self, needs_connection: bool) -> Result<(), InvalidOptions> {
        if needs_connection
            && self
                .connection_string
                .as_deref()
                .is_none_or(|c| c.trim().is_empty())
        {
            return Err(InvalidOptions::MissingConnectionString);
        }
        if self.speaker.trim().is_empty() {
            return Err(InvalidOptions::BlankSpeaker);
        }
        if !DURATION_RE.is_match(&self.duration) {
            return Err(InvalidOptions::BadDuration(self.duration.clone()));
        }
        Ok(())
    }
}
