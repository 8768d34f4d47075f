use crate::catalog::SURREAL_SCHEMA;
use crate::consts::{DELIMITERS, DESCRIPTION_MAX_CHARS, SPEAKER_MAX_CHARS, TITLE_MAX_CHARS};
use std::fmt;
use std::str::FromStr;

/// Written in place of an insert when nothing was listed.
pub const EMPTY_BATCH: &str = "-- No blobs found for the provided container/prefix.";

const SQLSERVER_INSERT: &str = "INSERT INTO [dbo].[AudioStreams] ([Id], [Title], [Description], [BlobUrl], [CreatedAt], [Speaker], [IsLive], [Duration]) VALUES";

const SQLSERVER_SCHEMA: &str = "\
IF OBJECT_ID(N'[dbo].[AudioStreams]', N'U') IS NULL
BEGIN
    CREATE TABLE [dbo].[AudioStreams] (
        [Id] uniqueidentifier NOT NULL,
        [Title] nvarchar(200) NOT NULL,
        [Description] nvarchar(500) NOT NULL,
        [BlobUrl] nvarchar(max) NOT NULL,
        [CreatedAt] datetime2 NOT NULL,
        [ScheduledAt] datetime2 NULL,
        [IsLive] bit NOT NULL,
        [Speaker] nvarchar(100) NOT NULL,
        [Duration] time NOT NULL,
        CONSTRAINT [PK_AudioStreams] PRIMARY KEY ([Id])
    );
END;
";

/// Target database flavour of the generated script.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Dialect {
    /// T-SQL batch for the `[dbo].[AudioStreams]` table.
    #[default]
    SqlServer,
    /// SurrealQL batch for the `audio_streams` catalog table.
    Surreal,
}

impl FromStr for Dialect {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqlserver" | "mssql" | "tsql" => Ok(Self::SqlServer),
            "surreal" | "surql" | "surrealql" => Ok(Self::Surreal),
            other => Err(eyre::eyre!("unknown SQL dialect `{other}`")),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SqlServer => "sqlserver",
            Self::Surreal => "surreal",
        })
    }
}

/// One archive record, as written into the insert batch.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioRow {
    pub title: String,
    pub description: String,
    pub blob_url: String,
    pub speaker: String,
    pub duration: String,
}

impl AudioRow {
    /// Cut text columns down to the table's limits.
    pub fn truncated(mut self) -> Self {
        truncate_field(&mut self.title, TITLE_MAX_CHARS, "title", &self.blob_url);
        truncate_field(&mut self.description, DESCRIPTION_MAX_CHARS, "description", &self.blob_url);
        truncate_field(&mut self.speaker, SPEAKER_MAX_CHARS, "speaker", &self.blob_url);
        // a cut may land right after a separator
        for field in [&mut self.title, &mut self.speaker] {
            let kept = field.trim_end_matches(DELIMITERS).len();
            field.truncate(kept);
        }
        self
    }
}

fn truncate_field(value: &mut String, max_chars: usize, field: &str, blob_url: &str) {
    if let Some((cut, _)) = value.char_indices().nth(max_chars) {
        tracing::warn!(field, max_chars, blob_url, "value too long; truncating");
        value.truncate(cut);
        let trimmed = value.trim_end().len();
        value.truncate(trimmed);
    }
}

/// Accumulates rows into a single multi-row insert statement.
#[derive(Debug, Default)]
pub struct InsertBatch {
    dialect: Dialect,
    rows: Vec<String>,
}

impl InsertBatch {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push(&mut self, row: AudioRow) {
        let row = row.truncated();
        let literal = match self.dialect {
            Dialect::SqlServer => format!(
                "    (NEWID(), '{}', '{}', '{}', GETUTCDATE(), '{}', 0, '{}')",
                escape_sqlserver(&row.title),
                escape_sqlserver(&row.description),
                escape_sqlserver(&row.blob_url),
                escape_sqlserver(&row.speaker),
                escape_sqlserver(&row.duration),
            ),
            Dialect::Surreal => format!(
                "    {{ title: '{}', description: '{}', blob_url: '{}', created_at: time::now(), speaker: '{}', is_live: false, running_time: '{}' }}",
                escape_surreal(&row.title),
                escape_surreal(&row.description),
                escape_surreal(&row.blob_url),
                escape_surreal(&row.speaker),
                escape_surreal(&row.duration),
            ),
        };
        self.rows.push(literal);
    }

    /// Render the batch; an empty batch renders as a comment.
    pub fn finish(&self) -> String {
        if self.rows.is_empty() {
            return EMPTY_BATCH.to_string();
        }
        let rows = self.rows.join(",\n");
        match self.dialect {
            Dialect::SqlServer => format!("{SQLSERVER_INSERT}\n{rows}\n;"),
            Dialect::Surreal => format!("INSERT INTO audio_streams [\n{rows}\n];"),
        }
    }
}

/// DDL creating the target table when it does not exist yet.
pub fn schema(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::SqlServer => SQLSERVER_SCHEMA,
        Dialect::Surreal => SURREAL_SCHEMA,
    }
}

/// T-SQL string literal body: single quotes are doubled.
pub fn escape_sqlserver(value: &str) -> String {
    value.replace('\'', "''")
}

/// SurrealQL single-quoted string body.
pub fn escape_surreal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}
