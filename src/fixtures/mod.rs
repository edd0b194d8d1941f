//! Tagged-source fixtures.
//!
//! `<AS:ids>` marks active statements, `<ER:statement.index>` their
//! exception regions and `<TS:ids>` editor tracking spans. Tags nest and
//! clear to spaces so the untagged text keeps every offset.

pub mod description;
pub mod markers;
pub mod scanner;

pub use description::{
    FIXTURE_MODULE, MarkedSource, StatementDescription, active_statement_debug_infos,
    changed_document, tracking_spans,
};
pub use markers::SourceMarkers;
pub use scanner::{TagKind, TagToken, TaggedSpan, clear_tags, match_tags, scan};
