//! Decomposition of the nested bulk-data containers: ZIP-in-ZIP weeklies,
//! TAR weeklies holding per-document ZIPs, and the occasional pre-extracted
//! directory tree.

pub mod backfill;
mod kind;
mod stream;

pub use self::kind::{detect, ArchiveKind};
pub use self::stream::stream_archive;

#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("failed to open archive: {0}")]
    Open(#[source] std::io::Error),

    #[error("archive i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt ZIP container: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("{0:?} archives are read through the backfill path, not streamed")]
    NotStreamable(ArchiveKind),
}
