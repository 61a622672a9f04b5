pub mod episode;
pub mod request;
pub mod source;

pub use episode::EpisodeRef;
pub use request::ResolveRequest;
pub use source::{
    AllSources, BackendOutcome, CacheEntry, ExtractionResult, Resolution, VideoSource,
    QUALITY_BACKUP, QUALITY_DEFAULT, QUALITY_UNKNOWN,
};
