//! Data models for papers, searches and summaries.
//!
//! Wire-facing models use `#[serde(rename_all = "camelCase")]` so a UI process
//! sees the same names over JSON-RPC.

mod enums;
mod inputs;
mod paper;
mod summary;

pub use enums::{PageSource, ResponseFormat, SortBy, SortOrder};
pub use inputs::{SearchRequest, SummaryRequest};
pub use paper::{PaperPage, PaperRecord};
pub use summary::SummaryResult;
