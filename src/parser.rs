//! Heuristic split of archive file names into a speaker and a title.
//!
//! Archive names carry no fixed layout. The parser strips organization
//! noise, then looks for an `Episode` marker, then for a speaker honorific,
//! and finally falls back to the last `-` or `_` delimiter. Every input
//! yields a result; unknown speakers fall back to the caller's default.

use crate::consts::{
    BRAND_NOISE, DEFAULT_SPEAKER, DELIMITERS, EPISODE_KEYWORD, GENERAL_LECTURE, HONORIFICS,
};
use serde::Serialize;
use unicode_general_category::{GeneralCategory, get_general_category};

/// Speaker and title inferred from a single file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedName {
    pub speaker: String,
    pub title: String,
}

impl ParsedName {
    /// Trim both fields of delimiters; an emptied field takes its fallback.
    fn normalized(speaker: &str, title: &str, default_speaker: &str) -> Self {
        let speaker = match trim_delimiters(speaker) {
            "" => match trim_delimiters(default_speaker) {
                "" => DEFAULT_SPEAKER,
                d => d,
            },
            s => s,
        };
        let title = match trim_delimiters(title) {
            "" => GENERAL_LECTURE,
            t => t,
        };
        Self {
            speaker: speaker.to_string(),
            title: title.to_string(),
        }
    }

    /// True when no speaker could be inferred from the name.
    pub fn has_default_speaker(&self, default_speaker: &str) -> bool {
        self.speaker == trim_delimiters(default_speaker)
    }
}

/// Infer `(speaker, title)` from `raw_name`, which must already be the final
/// path segment of the object key.
pub fn parse_file_name(raw_name: &str, default_speaker: &str) -> ParsedName {
    let file_name = strip_extension(raw_name);
    if file_name.trim().is_empty() {
        return ParsedName::normalized(default_speaker, raw_name, default_speaker);
    }

    let stripped = strip_brand_noise(file_name);
    let clean = trim_delimiters(stripped.trim());
    if clean.trim().is_empty() {
        return ParsedName::normalized(default_speaker, file_name, default_speaker);
    }

    let (speaker, title) = match find_ignore_case(clean, EPISODE_KEYWORD) {
        Some((episode_at, _)) => split_episode(clean, episode_at, default_speaker),
        None => split_standard(clean, default_speaker),
    };
    tracing::trace!(raw = raw_name, clean, %speaker, %title, "parsed file name");

    ParsedName::normalized(&speaker, &title, default_speaker)
}

/// Split a name that mentions an episode. A speaker ahead of the marker
/// keeps the topic in front of the episode text; a speaker after the marker
/// is cut out of the episode text instead.
fn split_episode(clean: &str, episode_at: usize, default_speaker: &str) -> (String, String) {
    let before = trim_delimiters(&clean[..episode_at]);
    let episode = &clean[episode_at..];

    if let Some(at) = first_honorific(before) {
        let speaker = before[at..].trim();
        let topic = trim_delimiters(&before[..at]);
        let title = if topic.trim().is_empty() {
            episode.trim().to_string()
        } else {
            format!("{topic} {episode}").trim().to_string()
        };
        return (speaker.to_string(), title);
    }

    if let Some(at) = first_honorific(episode) {
        let speaker = episode[at..].trim();
        let episode_part = trim_delimiters(&episode[..at]);
        let title = format!("{before} {episode_part}").trim().to_string();
        return (speaker.to_string(), title);
    }

    (default_speaker.to_string(), clean.to_string())
}

fn split_standard(clean: &str, default_speaker: &str) -> (String, String) {
    if let Some(at) = first_honorific(clean) {
        let speaker = clean[at..].trim();
        let title = if at > 0 {
            trim_delimiters(&clean[..at])
        } else {
            GENERAL_LECTURE
        };
        return (speaker.to_string(), title.to_string());
    }

    let last_delimiter = [clean.rfind('-'), clean.rfind('_')]
        .into_iter()
        .flatten()
        .max();
    if let Some(at) = last_delimiter
        && at > 0
        && at + 1 < clean.len()
    {
        let tail = clean[at + 1..].trim();
        if tail.chars().next().is_some_and(is_uppercase_letter) {
            return (tail.to_string(), clean[..at].trim().to_string());
        }
    }

    (default_speaker.to_string(), clean.to_string())
}

/// Only letters of category Lu; numerals and symbols with an upper-case
/// form do not count.
fn is_uppercase_letter(c: char) -> bool {
    get_general_category(c) == GeneralCategory::UppercaseLetter
}

/// Byte offset of the first honorific in list order, at its first occurrence.
fn first_honorific(text: &str) -> Option<usize> {
    HONORIFICS
        .iter()
        .find_map(|honorific| find_ignore_case(text, honorific).map(|(start, _)| start))
}

/// Drop everything from the last `.` of the final segment onwards.
fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(dot) if !name[dot..].contains(['/', '\\']) => &name[..dot],
        _ => name,
    }
}

fn strip_brand_noise(name: &str) -> String {
    BRAND_NOISE
        .iter()
        .fold(name.to_string(), |acc, phrase| remove_ignore_case(&acc, phrase))
}

pub(crate) fn trim_delimiters(s: &str) -> &str {
    s.trim_matches(DELIMITERS)
}

/// Remove every non-overlapping occurrence of `phrase`, scanning left to right.
fn remove_ignore_case(text: &str, phrase: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some((start, end)) = find_ignore_case(rest, phrase) {
        out.push_str(&rest[..start]);
        rest = &rest[end..];
    }
    out.push_str(rest);
    out
}

/// Ordinal case-insensitive search. Returns the byte range of the first
/// match in `haystack`; an empty needle never matches.
fn find_ignore_case(haystack: &str, needle: &str) -> Option<(usize, usize)> {
    if needle.is_empty() {
        return None;
    }
    haystack.char_indices().find_map(|(start, _)| {
        matched_len(&haystack[start..], needle).map(|len| (start, start + len))
    })
}

fn matched_len(s: &str, prefix: &str) -> Option<usize> {
    let mut chars = s.chars();
    let mut len = 0;
    for expected in prefix.chars() {
        let c = chars.next()?;
        if fold(c) != fold(expected) {
            return None;
        }
        len += c.len_utf8();
    }
    Some(len)
}

/// Simple upper-case mapping; characters that expand keep their own form.
fn fold(c: char) -> char {
    let mut upper = c.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(u), None) => u,
        _ => c,
    }
}
