pub mod utils;

use regex::Regex;
use std::{fmt::Display, sync::OnceLock};

pub use utils::validate_non_empty;

static LINK_RE: OnceLock<Regex> = OnceLock::new();
static VIDEO_ID_RE: OnceLock<Regex> = OnceLock::new();

/// Length of every YouTube video identifier.
pub const VIDEO_ID_LEN: usize = 11;

fn link_regex() -> &'static Regex {
    LINK_RE.get_or_init(|| {
        Regex::new(r"(https?://)?(www\.)?(youtube\.com|youtu\.be)/.+")
            .expect("failed to compile link regex")
    })
}

fn video_id_regex() -> &'static Regex {
    VIDEO_ID_RE.get_or_init(|| {
        Regex::new(
            r#"(?:https?://)?(?:www\.)?(?:youtube\.com/(?:[^/]+/.*/|(?:v|e(?:mbed)?|shorts|live)/|.*[?&]v=)|youtu\.be/)([^"&?/\s]{11})"#,
        )
        .expect("failed to compile video id regex")
    })
}

/// Find the first YouTube-looking link in arbitrary chat text.
///
/// The match runs from the link start to the end of its line, so it may
/// carry trailing words; [`VideoId::extract`] copes with that.
#[must_use]
pub fn find_youtube_link(text: &str) -> Option<&str> {
    link_regex().find(text).map(|m| m.as_str())
}

/// An 11-character YouTube video identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoId(String);

impl VideoId {
    /// Extract the video identifier from a `watch?v=`, `youtu.be/`,
    /// `embed/`, `e/`, `v/`, `shorts/` or `live/` URL.
    #[must_use]
    pub fn extract(url: &str) -> Option<Self> {
        video_id_regex()
            .captures(url)
            .and_then(|c| c.get(1))
            .map(|m| Self(m.as_str().to_owned()))
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for VideoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VideoId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
