/// Data layer: fetching, loading, and filtering.
///
/// Architecture:
/// ```text
///        URL
///         │
///         ▼
///   ┌──────────┐
///   │ fetcher  │  blocking GET → RawContent
///   └──────────┘
///         │
///         ▼
///   ┌──────────┐
///   │  loader  │  csv / xls / xlsx / json → Table, CSV copy under data/raw
///   └──────────┘
///         │
///         ▼
///   ┌──────────┐
///   │  filter  │  selections, search, row cap, projection → view Table
///   └──────────┘
/// ```

pub mod fetcher;
pub mod filter;
pub mod loader;
pub mod model;
