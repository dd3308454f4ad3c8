//! Validation error type and the request validator
//!
//! There is no global validator. The composition root builds one
//! [`Validator`] and hands it to whoever needs it (the HTTP state, tests).

use std::fmt;

use chrono::NaiveDate;
use url::Url;

use super::song::{NewSong, SongPatch, SongPatchRequest, SongRequest};

/// Validation error for domain models
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Field is empty when it shouldn't be
    Empty { field: &'static str },

    /// Field exceeds maximum length
    TooLong { field: &'static str, max: usize },

    /// String doesn't match required format (e.g., date)
    InvalidFormat { field: &'static str, reason: &'static str },

    /// Invalid enum variant
    InvalidVariant { field: &'static str, value: String },

    /// Update request that changes nothing
    NothingToUpdate,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { field } => write!(f, "{} cannot be empty", field),
            Self::TooLong { field, max } => {
                write!(f, "{} exceeds maximum length of {} characters", field, max)
            }
            Self::InvalidFormat { field, reason } => {
                write!(f, "{}: {}", field, reason)
            }
            Self::InvalidVariant { field, value } => {
                write!(f, "invalid {} value: '{}'", field, value)
            }
            Self::NothingToUpdate => write!(f, "at least one field must be provided"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Field limits for song requests.
#[derive(Debug, Clone)]
pub struct SongLimits {
    pub max_group_len: usize,
    pub max_title_len: usize,
    pub max_text_len: usize,
    pub max_link_len: usize,
}

impl Default for SongLimits {
    fn default() -> Self {
        Self {
            max_group_len: 256,
            max_title_len: 256,
            // Lyrics, 64KB
            max_text_len: 65536,
            max_link_len: 2048,
        }
    }
}

/// Accepted release date layouts, tried in order.
const DATE_FORMATS: &[&str] = &["%d.%m.%Y", "%Y-%m-%d"];

/// Request validator.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    limits: SongLimits,
}

impl Validator {
    pub fn new(limits: SongLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &SongLimits {
        &self.limits
    }

    /// Validate a create request into a [`NewSong`].
    pub fn new_song(&self, req: &SongRequest) -> Result<NewSong, ValidationError> {
        Ok(NewSong {
            group: self.text("group", &req.group, self.limits.max_group_len)?,
            title: self.text("title", &req.title, self.limits.max_title_len)?,
            release_date: self.release_date(&req.release_date)?,
            text: self.text("text", &req.text, self.limits.max_text_len)?,
            link: self.link(&req.link)?,
        })
    }

    /// Validate an update request. Absent fields stay untouched.
    pub fn song_patch(&self, req: &SongPatchRequest) -> Result<SongPatch, ValidationError> {
        let patch = SongPatch {
            group: req
                .group
                .as_deref()
                .map(|v| self.text("group", v, self.limits.max_group_len))
                .transpose()?,
            title: req
                .title
                .as_deref()
                .map(|v| self.text("title", v, self.limits.max_title_len))
                .transpose()?,
            release_date: req
                .release_date
                .as_deref()
                .map(|v| self.release_date(v))
                .transpose()?,
            text: req
                .text
                .as_deref()
                .map(|v| self.text("text", v, self.limits.max_text_len))
                .transpose()?,
            link: req.link.as_deref().map(|v| self.link(v)).transpose()?,
        };

        if patch.is_empty() {
            return Err(ValidationError::NothingToUpdate);
        }
        Ok(patch)
    }

    /// Required, trimmed, bounded text.
    pub fn text(&self, field: &'static str, value: &str, max: usize) -> Result<String, ValidationError> {
        let value = value.trim();

        if value.is_empty() {
            return Err(ValidationError::Empty { field });
        }
        if value.chars().count() > max {
            return Err(ValidationError::TooLong { field, max });
        }

        Ok(value.to_owned())
    }

    /// `DD.MM.YYYY` or `YYYY-MM-DD`.
    pub fn release_date(&self, value: &str) -> Result<NaiveDate, ValidationError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(ValidationError::Empty { field: "release_date" });
        }

        DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
            .ok_or(ValidationError::InvalidFormat {
                field: "release_date",
                reason: "expected DD.MM.YYYY or YYYY-MM-DD",
            })
    }

    /// Absolute http(s) URL.
    pub fn link(&self, value: &str) -> Result<String, ValidationError> {
        let value = self.text("link", value, self.limits.max_link_len)?;

        let url = Url::parse(&value).map_err(|_| ValidationError::InvalidFormat {
            field: "link",
            reason: "must be an absolute URL",
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ValidationError::InvalidFormat {
                field: "link",
                reason: "must use http or https",
            });
        }

        Ok(value)
    }
}
