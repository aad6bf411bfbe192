pub mod category;
pub mod genre;
pub mod video;
