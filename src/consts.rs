use regex::Regex;
use std::sync::LazyLock;

/// Speaker honorifics, checked in this order. The first entry found anywhere
/// in the text wins, so `Dr.` must stay ahead of `Dr`.
pub const HONORIFICS: &[&str] = &[
    "Muallim", "Prof.", "Prof", "Sheikh", "Barr.", "Barr", "Maulvi", "Amir", "Dr.", "Dr",
    "Ustadh", "Imam",
];

/// Organization names embedded in archive filenames, longest first.
pub const BRAND_NOISE: &[&str] = &["Ohun Islam Lagos State", "Ohun Islam Lagos", "Ohun Islam"];

/// Marker that switches the parser into the episode rule.
pub const EPISODE_KEYWORD: &str = "Episode";

/// Title used when a name starts directly with an honorific.
pub const GENERAL_LECTURE: &str = "General Lecture";

/// Characters trimmed from both ends of every derived field.
pub const DELIMITERS: &[char] = &['-', '_', ' '];

/// Record limits of the `AudioStreams` table, in characters.
pub const TITLE_MAX_CHARS: usize = 200;
pub const DESCRIPTION_MAX_CHARS: usize = 500;
pub const SPEAKER_MAX_CHARS: usize = 100;

pub const DEFAULT_CONTAINER: &str = "archives";
pub const DEFAULT_DESCRIPTION: &str = "Lagos State";
pub const DEFAULT_SPEAKER: &str = "Unknown Speaker";
pub const DEFAULT_DURATION: &str = "00:00:00";
pub const DEFAULT_OUTPUT_FILE: &str = "AudioStreams_Insert.sql";

/// Matches a `HH:MM:SS` duration (SQL Server `time` literal without fraction).
pub static DURATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[01]\d|2[0-3]):[0-5]\d:[0-5]\d$").unwrap());
