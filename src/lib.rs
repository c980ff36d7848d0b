//! Opsboard - Aggregation core for the marketing operations dashboard
//!
//! Opsboard turns loosely typed rows from the record store into dashboard
//! figures through a deterministic pass: concurrent fetch → normalization →
//! fold-and-derive aggregation → activity feed merge.
//!
//! ## Modules
//!
//! - **Metrics Aggregator**: sum raw counters per group, then derive CTR, CPC,
//!   CPA, ROAS and conversion rate from the totals
//! - **Activity Feed Merger**: merge recent activity from several sources into
//!   one newest-first feed with relative-age labels

pub mod config;
pub mod dashboard;
pub mod error;
pub mod feed;
pub mod metrics;
pub mod normalizer;
pub mod pipeline;
pub mod source;
pub mod types;

pub use config::DashboardConfig;
pub use error::DashboardError;
pub use feed::{ActivityRecord, FeedMerger};
pub use metrics::{GroupBy, MetricsAggregator, RankBy};
pub use pipeline::{
    campaign_report_from_json, snapshot_from_json, CampaignReport, DashboardProcessor,
    DashboardState,
};

// Source exports
pub use source::{MemorySource, Query, RecordSource, Repository, Table};

pub use types::{DashboardSnapshot, ExecutiveKpis, FeedEntry, ModuleMetrics};

/// Opsboard version reported by the CLI
pub const OPSBOARD_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for CLI reports
pub const PRODUCER_NAME: &str = "opsboard";
