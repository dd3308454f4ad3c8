//! Song request and domain types

use chrono::NaiveDate;
use serde::Deserialize;

use super::ValidationError;

/// Create request body. Missing fields deserialize empty and fail validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SongRequest {
    pub group: String,
    pub title: String,
    pub release_date: String,
    pub text: String,
    pub link: String,
}

/// Update request body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SongPatchRequest {
    pub group: Option<String>,
    pub title: Option<String>,
    pub release_date: Option<String>,
    pub text: Option<String>,
    pub link: Option<String>,
}

/// Validated song ready for insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSong {
    pub group: String,
    pub title: String,
    pub release_date: NaiveDate,
    pub text: String,
    pub link: String,
}

/// Validated partial update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SongPatch {
    pub group: Option<String>,
    pub title: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub text: Option<String>,
    pub link: Option<String>,
}

impl SongPatch {
    pub fn is_empty(&self) -> bool {
        self.group.is_none()
            && self.title.is_none()
            && self.release_date.is_none()
            && self.text.is_none()
            && self.link.is_none()
    }
}

/// Sortable song columns. Only these ever reach ORDER BY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SongOrder {
    #[default]
    Id,
    Group,
    Title,
    ReleaseDate,
    CreatedAt,
}

/// Sort column plus direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SongSort {
    pub order: SongOrder,
    pub descending: bool,
}

impl SongSort {
    /// Parse `orderBy`: a column name, optionally prefixed with `-` for
    /// descending. Empty means by id, ascending.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let raw = raw.trim();
        let (descending, name) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };

        let order = match name {
            "" | "id" => SongOrder::Id,
            "group" => SongOrder::Group,
            "title" => SongOrder::Title,
            "release_date" => SongOrder::ReleaseDate,
            "created_at" | "createdAt" => SongOrder::CreatedAt,
            _ => {
                return Err(ValidationError::InvalidVariant {
                    field: "orderBy",
                    value: raw.to_owned(),
                })
            }
        };

        Ok(Self { order, descending })
    }

    /// `ORDER BY` clause body
    pub fn to_sql(&self) -> String {
        let column = match self.order {
            SongOrder::Id => "id",
            SongOrder::Group => "group_name",
            SongOrder::Title => "title",
            SongOrder::ReleaseDate => "release_date",
            SongOrder::CreatedAt => "created_at",
        };
        let direction = if self.descending { "DESC" } else { "ASC" };

        // Tie-break on id so pages are stable
        if self.order == SongOrder::Id {
            format!("id {direction}")
        } else {
            format!("{column} {direction}, id ASC")
        }
    }
}
