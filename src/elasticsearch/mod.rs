//! Elasticsearch client and operations.

mod bulk;
mod candidates;
mod client;
mod lookup;
mod schema;
mod search;

pub use bulk::BulkIndexer;
pub use candidates::{candidate_query, EsCandidateSource};
pub use client::EsClient;
pub use schema::{create_index, geonames_mapping};
