//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument. Methods suffixed `_inner` or
//! `_in_tx` run inside a caller-owned transaction instead.

pub mod category_repo;
pub mod genre_repo;
pub mod video_repo;

pub use category_repo::CategoryRepo;
pub use genre_repo::GenreRepo;
pub use video_repo::VideoRepo;
