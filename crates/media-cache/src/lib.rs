//! Cutforge Media Cache
//!
//! Turns a remote media identifier into a locally cached file via
//! resumable, indexed chunk fetch, and uploads local files to the media
//! server in fixed-size chunks.
//!
//! Cache layout, one directory per media id:
//!
//! ```text
//! <root>/<safe-key>/chunks/000000.part
//! <root>/<safe-key>/chunks/000001.part
//! <root>/<safe-key>/final.<ext>
//! ```
//!
//! The final file is written via temp-file + rename, so its existence
//! implies the assembled bytes are complete and correctly ordered. A cache
//! entry holding only partial chunks is never read as complete.

pub mod naming;
pub mod store;

pub use store::{ChunkSource, ChunkStore, MediaCacheError, ResolvedMedia, UploadRequest};
