//! Multi-step operations that span the database and the file store.

pub mod video_sync;

pub use video_sync::{SyncStage, VideoSync};
