use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use voice_archive::Dialect;

#[derive(Parser, Debug)]
#[command(name = "archive-sql", version)]
#[command(about = "Generate SQL insert scripts for audio archive blobs")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose logging
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List a container and write an insert script for every blob
    Generate(GenerateArgs),
    /// Show the speaker and title inferred from file names
    Parse(ParseArgs),
}

#[derive(clap::Args, Debug)]
pub struct GenerateArgs {
    /// Storage connection string [env: AZURE_STORAGE_CONNECTION_STRING]
    pub connection: Option<String>,

    /// Container to list [env: AZURE_STORAGE_CONTAINER] [default: archives]
    pub container: Option<String>,

    /// Only list blobs whose name starts with this [env: ARCHIVE_PREFIX]
    pub prefix: Option<String>,

    /// Treat a local directory as the container instead of the storage account
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Where to write the script [default: ./AudioStreams_Insert.sql]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// SQL flavour of the script
    #[arg(long, value_enum, default_value_t = DialectArg::Sqlserver)]
    pub dialect: DialectArg,

    /// Create the target table first if it is missing
    #[arg(long)]
    pub with_schema: bool,
}

#[derive(clap::Args, Debug)]
pub struct ParseArgs {
    /// File names to parse
    #[arg(required = true)]
    pub names: Vec<String>,

    /// Speaker used when none can be inferred [default: ARCHIVE_SPEAKER or Unknown Speaker]
    #[arg(long)]
    pub speaker: Option<String>,

    /// Print one JSON object per name
    #[arg(long)]
    pub json: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum DialectArg {
    /// SQL Server `[dbo].[AudioStreams]`
    Sqlserver,
    /// SurrealDB `audio_streams`
    Surreal,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Sqlserver => Dialect::SqlServer,
            DialectArg::Surreal => Dialect::Surreal,
        }
    }
}
