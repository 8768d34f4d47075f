//! Audio archive tooling: turns the object names of an archive container
//! into catalog rows by inferring each recording's speaker and title.

#[cfg(feature = "azure")]
pub mod azure;
pub mod catalog;
pub mod consts;
pub mod generate;
pub mod migration;
pub mod options;
pub mod parser;
pub mod source;
pub mod sql;

pub use catalog::{AudioService, AudioStream};
pub use generate::{Script, generate_script};
pub use options::{InvalidOptions, ScriptOptions};
pub use parser::{ParsedName, parse_file_name};
pub use source::{BlobItem, BlobSource, LocalDirSource, SourceError};
pub use sql::Dialect;
