//! Domain models with validation at construction
//!
//! All user input is validated before it reaches a repository.
//! Invalid input returns ValidationError, not panic.

pub mod pagination;
pub mod song;
pub mod validation;

pub use pagination::{Paginated, Pagination, PaginationParams};
pub use song::{NewSong, SongOrder, SongPatch, SongPatchRequest, SongRequest, SongSort};
pub use validation::{SongLimits, ValidationError, Validator};
