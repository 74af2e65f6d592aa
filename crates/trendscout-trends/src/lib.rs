//! Multi-platform trend collection.
//!
//! The [`Aggregator`] fans out one collection per platform, normalizes the raw
//! records into [`TrendItem`]s, and substitutes synthetic [`fallback`] data for
//! any platform whose live path is unconfigured or fails.

pub mod aggregator;
pub mod collectors;
pub mod error;
pub mod fallback;
pub mod normalize;
pub mod registry;
pub mod strategies;
pub mod types;

pub use aggregator::{
    Aggregator, AggregatorSettings, CollectionReport, DegradeReason, PlatformOutcome,
    PlatformPlan, PlatformStatus,
};
pub use collectors::{BrowserCollector, CollectionMethod, JobCollector, TrendCollector};
pub use error::{CollectError, ErrorCategory};
pub use normalize::{normalize, normalize_all, parse_count};
pub use registry::build_aggregator;
pub use strategies::{strategy_for, BrowserSettings, ExtractionStrategy, Target};
pub use types::{CollectParams, ContentKind, ItemSource, RawItem, TrendItem};
