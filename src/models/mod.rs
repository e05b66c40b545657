//! Core data models for search requests, results and responses.

mod author;
mod result;
mod search;

pub use author::AuthorProfile;
pub use result::{AcademicResult, SearchResult, SourceKind, VideoResult, WebResult};
pub use search::{
    AcademicFilters, ResponseMetadata, SafeSearch, SearchFilters, SearchRequest, SearchResponse,
    UploadDate, VideoDuration, VideoFilters, VideoSort, WebFilters, DEFAULT_NUM_RESULTS,
};
