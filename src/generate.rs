use crate::options::ScriptOptions;
use crate::parser::parse_file_name;
use crate::source::BlobSource;
use crate::sql::{AudioRow, Dialect, InsertBatch, schema};
use eyre::Result;

/// A rendered insert script and what went into it.
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub sql: String,
    pub rows: usize,
    /// Rows whose speaker could not be read from the file name.
    pub default_speaker_rows: usize,
}

impl Script {
    /// Put the table definition for `dialect` ahead of the inserts.
    pub fn with_schema(mut self, dialect: Dialect) -> Self {
        self.sql = format!("{}\n{}", schema(dialect).trim_end(), self.sql);
        self
    }
}

/// List the container, infer speaker and title per object, and fold the
/// rows into one insert statement.
pub fn generate_script(
    source: &dyn BlobSource,
    options: &ScriptOptions,
    dialect: Dialect,
) -> Result<Script> {
    let items = source.list(options.blob_prefix.as_deref())?;

    let mut batch = InsertBatch::new(dialect);
    let mut default_speaker_rows = 0;
    for item in items {
        let parsed = parse_file_name(item.file_name(), &options.speaker);
        if parsed.has_default_speaker(&options.speaker) {
            default_speaker_rows += 1;
            tracing::debug!(name = %item.name, "no speaker inferred");
        } else {
            tracing::debug!(name = %item.name, speaker = %parsed.speaker, title = %parsed.title);
        }

        batch.push(AudioRow {
            title: parsed.title,
            description: options.description.clone(),
            blob_url: item.url,
            speaker: parsed.speaker,
            duration: options.duration.clone(),
        });
    }

    if batch.is_empty() {
        tracing::warn!(
            container = %options.container_name,
            prefix = ?options.blob_prefix,
            "no blobs found"
        );
    }

    Ok(Script {
        sql: batch.finish(),
        rows: batch.len(),
        default_speaker_rows,
    })
}
