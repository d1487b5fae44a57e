//! Search entry points: embed, rank and record history.

mod errors;
mod service;

pub use errors::SearchError;
pub use service::{EntitySearchRequest, SavedEntity, SearchResponse, SearchService};
