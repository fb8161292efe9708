/// CSV export of per-case results.
pub mod export;
