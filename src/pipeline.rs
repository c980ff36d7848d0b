//! Pipeline orchestration
//!
//! This module provides the public API for opsboard. One refresh pass:
//! 1. issues every sub-fetch against the record source concurrently
//! 2. waits for all of them (join barrier)
//! 3. logs each failed sub-fetch once and substitutes an empty collection
//! 4. aggregates KPIs and module cards, merges the activity feed
//!
//! The processor holds no fetched state. Callers keep the latest snapshot in a
//! [`DashboardState`] and decide when to refresh.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::config::DashboardConfig;
use crate::dashboard::{ActivityBatch, DashboardBatch};
use crate::error::DashboardError;
use crate::feed::FeedMerger;
use crate::metrics::{status_breakdown, GroupBy, MetricsAggregator, RankBy};
use crate::normalizer::or_zero;
use crate::source::{fetch_rows, MemorySource, Query, RecordSource, Table};
use crate::types::{
    CampaignRow, DashboardSnapshot, ExecutiveKpis, GroupedPerformance, ModuleMetrics,
    PerformanceRow, PerformanceSnapshot, WebsiteAnalyticsRow, WebsiteConnectionRow,
};

/// Build a dashboard snapshot from a dataset document.
///
/// # Arguments
/// * `dataset_json` - `{ "<table>": [rows] }` document
/// * `config` - dashboard configuration
/// * `now` - reference time for relative ages
///
/// # Returns
/// The snapshot serialized as JSON
///
/// # Example
/// ```ignore
/// let snapshot = snapshot_from_json(dataset, &DashboardConfig::default(), Utc::now()).await?;
/// ```
pub async fn snapshot_from_json(
    dataset_json: &str,
    config: &DashboardConfig,
    now: DateTime<Utc>,
) -> Result<String, DashboardError> {
    let source = MemorySource::from_dataset(dataset_json)?;
    let processor = DashboardProcessor::new(config.clone());
    let snapshot = processor.refresh(&source, now).await?;
    Ok(serde_json::to_string(&snapshot)?)
}

/// Build a campaign (or ad) performance report from a dataset document.
pub async fn campaign_report_from_json(
    dataset_json: &str,
    config: &DashboardConfig,
    group_by: GroupBy,
) -> Result<String, DashboardError> {
    let source = MemorySource::from_dataset(dataset_json)?;
    let processor = DashboardProcessor::new(config.clone());
    let report = processor.campaign_report(&source, group_by).await?;
    Ok(serde_json::to_string(&report)?)
}

/// A ranked campaign or ad
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedGroup {
    pub id: String,
    pub name: Option<String>,
    pub performance: PerformanceSnapshot,
}

/// Performance view of the campaigns or online ads module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignReport {
    pub group_by: GroupBy,
    pub performance: GroupedPerformance,
    /// Best groups by ROAS (campaigns) or CTR (ads)
    pub top: Vec<RankedGroup>,
    pub status_counts: BTreeMap<String, usize>,
    /// Spent / budget per definition row (percentage)
    pub budget_used_pct: BTreeMap<String, f64>,
    pub failed_sources: Vec<String>,
}

/// Stateless refresh driver
#[derive(Debug, Clone, Default)]
pub struct DashboardProcessor {
    config: DashboardConfig,
}

impl DashboardProcessor {
    pub fn new(config: DashboardConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// Run one full refresh pass against `source`.
    ///
    /// Fails only when every sub-fetch failed; individual failures leave their
    /// own fields at zero and are listed in `failed_sources`.
    pub async fn refresh(
        &self,
        source: &dyn RecordSource,
        now: DateTime<Utc>,
    ) -> Result<DashboardSnapshot, DashboardError> {
        let (batch, activity) = self.fetch_batch(source).await;

        if batch.is_empty_pass() && activity.is_empty_pass() {
            return Err(DashboardError::SourceUnavailable);
        }

        Ok(self.aggregate(&batch, activity, now))
    }

    /// Pure aggregation step over an already-fetched batch
    pub fn aggregate(
        &self,
        batch: &DashboardBatch,
        activity: ActivityBatch,
        now: DateTime<Utc>,
    ) -> DashboardSnapshot {
        let failed: BTreeSet<Table> = batch
            .failed_sources()
            .into_iter()
            .chain(activity.failed_sources())
            .collect();

        let kpis = ExecutiveKpis::compute(batch);
        let modules = ModuleMetrics::compute(batch, self.config.low_stock_threshold);
        let feed = FeedMerger::merge(
            activity.into_sources(),
            now,
            self.config.feed_limit,
            &self.config.currency,
        );

        tracing::debug!(
            feed_entries = feed.len(),
            failed = failed.len(),
            "dashboard pass aggregated"
        );

        DashboardSnapshot {
            kpis,
            modules,
            feed,
            failed_sources: failed.iter().map(|t| t.as_str().to_string()).collect(),
            computed_at: now,
        }
    }

    /// Issue every sub-fetch of a refresh pass concurrently and wait for all
    pub async fn fetch_batch(&self, source: &dyn RecordSource) -> (DashboardBatch, ActivityBatch) {
        let windows = &self.config.feed_windows;

        let (
            campaigns,
            performance,
            leads,
            orders,
            email_campaigns,
            social_posts,
            content,
            website_pages,
            website_analytics,
            seo_keywords,
            products,
            recent_leads,
            recent_orders,
            recent_emails,
            recent_content,
            recent_posts,
        ) = futures::join!(
            settle(source, Query::table(Table::Campaigns)),
            settle(source, Query::table(Table::CampaignPerformance)),
            settle(source, Query::table(Table::Leads)),
            settle(source, Query::table(Table::Orders)),
            settle(source, Query::table(Table::EmailCampaigns)),
            settle(source, Query::table(Table::SocialMediaPosts)),
            settle(source, Query::table(Table::ContentCalendar)),
            settle(source, Query::table(Table::WebsitePages)),
            settle_with(
                Table::WebsiteAnalytics,
                fetch_analytics(source, self.config.analytics_window)
            ),
            settle(source, Query::table(Table::SeoKeywords)),
            settle(source, Query::table(Table::Products)),
            settle(source, Query::table(Table::Leads).newest().limit(windows.leads)),
            settle(source, Query::table(Table::Orders).newest().limit(windows.orders)),
            settle(
                source,
                Query::table(Table::EmailCampaigns)
                    .newest()
                    .limit(windows.email_campaigns)
            ),
            settle(source, Query::table(Table::ContentCalendar).newest().limit(windows.content)),
            settle(
                source,
                Query::table(Table::SocialMediaPosts)
                    .newest()
                    .limit(windows.social_posts)
            ),
        );

        let batch = DashboardBatch {
            campaigns,
            performance,
            leads,
            orders,
            email_campaigns,
            social_posts,
            content,
            website_pages,
            website_analytics,
            seo_keywords,
            products,
        };
        let activity = ActivityBatch {
            leads: recent_leads,
            orders: recent_orders,
            email_campaigns: recent_emails,
            content: recent_content,
            social_posts: recent_posts,
        };

        (batch, activity)
    }

    /// Grouped performance for the campaigns (`GroupBy::Campaign`) or online
    /// ads (`GroupBy::Ad`) module.
    ///
    /// Campaign spend comes from each campaign's booked `spent` value; ad spend
    /// comes from the performance rows themselves.
    pub async fn campaign_report(
        &self,
        source: &dyn RecordSource,
        group_by: GroupBy,
    ) -> Result<CampaignReport, DashboardError> {
        let (definitions_table, performance_table, rank) = match group_by {
            GroupBy::Campaign => (Table::Campaigns, Table::CampaignPerformance, RankBy::Roas),
            GroupBy::Ad => (Table::Ads, Table::AdPerformance, RankBy::Ctr),
        };

        let (definitions, rows) = futures::join!(
            settle::<CampaignRow>(source, Query::table(definitions_table)),
            settle::<PerformanceRow>(source, Query::table(performance_table)),
        );

        if definitions.is_none() && rows.is_none() {
            return Err(DashboardError::SourceUnavailable);
        }

        let mut failed_sources = Vec::new();
        if definitions.is_none() {
            failed_sources.push(definitions_table.as_str().to_string());
        }
        if rows.is_none() {
            failed_sources.push(performance_table.as_str().to_string());
        }

        let definitions = definitions.unwrap_or_default();
        let rows = rows.unwrap_or_default();

        let mut performance = MetricsAggregator::fold_and_derive(&rows, group_by);
        if group_by == GroupBy::Campaign {
            let ledger: HashMap<String, f64> = definitions
                .iter()
                .filter_map(|c| c.id.clone().map(|id| (id, or_zero(c.spent))))
                .collect();
            performance = performance.with_spend_ledger(&ledger);
        }

        let names: HashMap<&str, &str> = definitions
            .iter()
            .filter_map(|c| Some((c.id.as_deref()?, c.name.as_deref()?)))
            .collect();

        let top = performance
            .top_by(rank, self.config.top_ranked)
            .into_iter()
            .map(|(id, snapshot)| RankedGroup {
                name: names.get(id.as_str()).map(|n| n.to_string()),
                id,
                performance: snapshot,
            })
            .collect();

        let budget_used_pct = definitions
            .iter()
            .filter_map(|c| Some((c.id.clone()?, c.budget_used_pct())))
            .collect();

        Ok(CampaignReport {
            group_by,
            status_counts: status_breakdown(definitions.iter().map(|c| c.status.as_deref())),
            performance,
            top,
            budget_used_pct,
            failed_sources,
        })
    }
}

/// Analytics for the first connected website, newest day first
async fn fetch_analytics(
    source: &dyn RecordSource,
    window: usize,
) -> Result<Vec<WebsiteAnalyticsRow>, DashboardError> {
    let connections: Vec<WebsiteConnectionRow> =
        fetch_rows(source, &Query::table(Table::WebsiteConnections)).await?;

    let Some(connection_id) = connections.into_iter().find_map(|c| c.id) else {
        return Ok(Vec::new());
    };

    fetch_rows(
        source,
        &Query::table(Table::WebsiteAnalytics)
            .eq("connection_id", connection_id)
            .order_by("date", true)
            .limit(window),
    )
    .await
}

async fn settle<T>(source: &dyn RecordSource, query: Query) -> Option<Vec<T>>
where
    T: DeserializeOwned,
{
    settle_with(query.table, fetch_rows(source, &query)).await
}

async fn settle_with<T, F>(table: Table, fetch: F) -> Option<Vec<T>>
where
    F: std::future::Future<Output = Result<Vec<T>, DashboardError>>,
{
    match fetch.await {
        Ok(rows) => Some(rows),
        Err(e) => {
            tracing::warn!(table = %table, error = %e, "sub-fetch failed, its metrics default to zero");
            None
        }
    }
}

/// Caller-owned holder of the latest snapshot.
///
/// A successful pass replaces the snapshot wholesale; a failed pass keeps the
/// previous one and records the error.
#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    current: Option<DashboardSnapshot>,
    last_error: Option<String>,
}

impl DashboardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply the outcome of a refresh pass; returns true when the snapshot changed
    pub fn apply(&mut self, outcome: Result<DashboardSnapshot, DashboardError>) -> bool {
        match outcome {
            Ok(snapshot) => {
                self.current = Some(snapshot);
                self.last_error = None;
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "dashboard refresh failed, keeping previous snapshot");
                self.last_error = Some(e.to_string());
                false
            }
        }
    }

    pub fn current(&self) -> Option<&DashboardSnapshot> {
        self.current.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// True until the first successful pass
    pub fn is_loading(&self) -> bool {
        self.current.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Repository;
    use crate::types::ActivityType;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn sample_dataset() -> &'static str {
        r#"{
            "campaigns": [
                {"id": "c1", "name": "Spring Launch", "status": "active", "budget": 10000, "spent": "2500"},
                {"id": "c2", "name": "Eid Promo", "status": "draft", "budget": 0, "spent": 0},
                {"id": "c3", "name": "Winter Clearance", "status": "paused", "budget": 4000, "spent": 1000}
            ],
            "campaign_performance": [
                {"campaign_id": "c1", "impressions": 10000, "clicks": 300, "conversions": 12, "revenue": 7500, "spend": 900},
                {"campaign_id": "c1", "impressions": 5000, "clicks": 200, "conversions": 8, "revenue": 2500, "spend": 600},
                {"campaign_id": "c3", "impressions": 2000, "clicks": 100, "conversions": null, "revenue": 3000, "spend": 400}
            ],
            "ads": [
                {"id": "a1", "name": "Search - Brand", "status": "active"},
                {"id": "a2", "name": "Display - Retarget", "status": "active"}
            ],
            "ad_performance": [
                {"ad_id": "a1", "impressions": 1000, "clicks": 50, "conversions": 5, "spend": 100},
                {"ad_id": "a2", "impressions": 4000, "clicks": 40, "conversions": 2, "spend": "300"}
            ],
            "leads": [
                {"name": "Ayesha Khan", "status": "new", "created_at": "2024-03-01T11:55:00Z"},
                {"name": "Bilal Ahmed", "status": "converted", "created_at": "2024-03-01T08:00:00Z"},
                {"name": "Sara Malik", "status": "new", "created_at": "2024-02-27T10:00:00Z"},
                {"name": "Omar Farooq", "status": "contacted", "created_at": "2024-02-20T10:00:00Z"}
            ],
            "orders": [
                {"order_number": "WC-1001", "total_amount": "12500", "status": "delivered", "created_at": "2024-03-01T11:59:00Z"},
                {"order_number": "WC-1000", "total_amount": 7500, "status": "processing", "created_at": "2024-02-29T12:00:00Z"}
            ],
            "email_campaigns": [
                {"name": "March Newsletter", "status": "sent", "sent_count": 2000, "open_count": 500, "click_rate": 4, "created_at": "2024-03-01T10:00:00Z"}
            ],
            "social_media_posts": [
                {"platform": "Instagram", "engagement": 320, "reach": 4000, "created_at": "2024-03-01T09:00:00Z"},
                {"platform": "Facebook", "engagement": 80, "reach": 1000, "created_at": null}
            ],
            "content_calendar": [
                {"title": "Spring lookbook", "status": "scheduled", "created_at": "2024-03-01T07:00:00Z"},
                {"title": "Care guide", "status": "published", "created_at": "2024-02-25T07:00:00Z"}
            ],
            "website_pages": [
                {"page_views": 1200, "status": "published"},
                {"page_views": 300, "status": "draft"}
            ],
            "website_connections": [{"id": "site-1"}],
            "website_analytics": [
                {"connection_id": "site-1", "date": "2024-02-29", "page_views": 1500, "unique_visitors": 900, "bounce_rate": 40.0},
                {"connection_id": "site-1", "date": "2024-02-28", "page_views": 1000, "unique_visitors": 600, "bounce_rate": 45.0},
                {"connection_id": "site-2", "date": "2024-02-29", "page_views": 99999, "unique_visitors": 99999, "bounce_rate": 99.0}
            ],
            "seo_keywords": [{"keyword": "indoor plants", "current_rank": 4}],
            "products": [{"name": "Fiddle Leaf Fig", "stock_quantity": 3}, {"name": "Snake Plant", "stock_quantity": 25}]
        }"#
    }

    fn sample_source() -> MemorySource {
        MemorySource::from_dataset(sample_dataset()).unwrap()
    }

    /// Wraps a source and fails every query against the listed tables
    struct FlakySource {
        inner: MemorySource,
        failing: Vec<Table>,
    }

    #[async_trait]
    impl RecordSource for FlakySource {
        async fn select(&self, query: &Query) -> Result<Vec<Value>, DashboardError> {
            if self.failing.contains(&query.table) {
                return Err(DashboardError::fetch(query.table.as_str(), "connection reset"));
            }
            self.inner.select(query).await
        }
    }

    #[tokio::test]
    async fn test_refresh_builds_full_snapshot() {
        let processor = DashboardProcessor::default();
        let snapshot = processor.refresh(&sample_source(), now()).await.unwrap();

        let kpis = &snapshot.kpis;
        assert_eq!(kpis.total_visits, 2500.0);
        assert_eq!(kpis.unique_visitors, 1500.0);
        assert_eq!(kpis.bounce_rate, 42.5);
        // 20 conversions / 600 clicks
        assert_eq!(kpis.conversion_rate, 3.33);
        assert_eq!(kpis.total_revenue, 20000.0);
        assert_eq!(kpis.avg_order_value, 10000.0);
        assert_eq!(kpis.new_leads, 4);
        assert_eq!(kpis.email_open_rate, 25.0);
        assert_eq!(kpis.active_campaigns, 2);
        assert_eq!(kpis.content_scheduled, 1);
        assert_eq!(kpis.products, 2);

        assert_eq!(snapshot.modules.ecommerce.low_stock, 1);
        assert_eq!(snapshot.modules.leads.new, 2);
        assert!(snapshot.failed_sources.is_empty());
        assert_eq!(snapshot.computed_at, now());
    }

    #[tokio::test]
    async fn test_feed_is_merged_newest_first() {
        let processor = DashboardProcessor::default();
        let snapshot = processor.refresh(&sample_source(), now()).await.unwrap();
        let feed = &snapshot.feed;

        // 3 leads + 2 orders + 1 email + 2 content + 2 social, capped at 8
        assert_eq!(feed.len(), 8);
        assert_eq!(feed[0].action, "New order WC-1001 - PKR 12,500");
        assert_eq!(feed[0].time_ago, "1 minute ago");
        assert_eq!(feed[1].action, "New lead: Ayesha Khan");
        assert_eq!(feed[2].activity_type, ActivityType::Email);
        assert_eq!(feed[2].time_ago, "2 hours ago");

        for pair in feed.windows(2) {
            if let (Some(a), Some(b)) = (pair[0].created_at, pair[1].created_at) {
                assert!(a >= b);
            }
        }
        // the undated Facebook post falls off the end
        assert!(feed.iter().all(|e| e.created_at.is_some()));
    }

    #[tokio::test]
    async fn test_newest_lead_survives_window_in_postgres_format() {
        let source = MemorySource::new().with_rows(
            Table::Leads,
            vec![
                json!({"name": "A", "created_at": "2024-03-01T08:00:00Z"}),
                json!({"name": "B", "created_at": "2024-03-01T07:00:00Z"}),
                json!({"name": "Newest", "created_at": "2024-03-01 11:59:00+00"}),
                json!({"name": "C", "created_at": "2024-03-01T06:00:00Z"}),
            ],
        );
        let snapshot = DashboardProcessor::default()
            .refresh(&source, now())
            .await
            .unwrap();

        let actions: Vec<&str> = snapshot.feed.iter().map(|e| e.action.as_str()).collect();
        assert_eq!(actions, vec!["New lead: Newest", "New lead: A", "New lead: B"]);
        assert_eq!(snapshot.feed[0].time_ago, "1 minute ago");
    }

    #[tokio::test]
    async fn test_feed_limit_from_config() {
        let config = DashboardConfig {
            feed_limit: 3,
            ..Default::default()
        };
        let processor = DashboardProcessor::new(config);
        let snapshot = processor.refresh(&sample_source(), now()).await.unwrap();
        assert_eq!(snapshot.feed.len(), 3);
    }

    #[tokio::test]
    async fn test_failed_sub_fetch_is_isolated() {
        let processor = DashboardProcessor::default();
        let complete = processor.refresh(&sample_source(), now()).await.unwrap();

        let flaky = FlakySource {
            inner: sample_source(),
            failing: vec![Table::Orders],
        };
        let partial = processor.refresh(&flaky, now()).await.unwrap();

        assert_eq!(partial.kpis.total_revenue, 0.0);
        assert_eq!(partial.kpis.avg_order_value, 0.0);
        assert_eq!(partial.kpis.total_orders, 0);
        assert_eq!(partial.failed_sources, vec!["orders".to_string()]);

        assert_eq!(partial.kpis.conversion_rate, complete.kpis.conversion_rate);
        assert_eq!(partial.kpis.email_open_rate, complete.kpis.email_open_rate);
        assert_eq!(partial.kpis.bounce_rate, complete.kpis.bounce_rate);
        assert_eq!(partial.modules.leads, complete.modules.leads);
        assert!(partial
            .feed
            .iter()
            .all(|e| e.activity_type != ActivityType::Order));
    }

    #[tokio::test]
    async fn test_two_step_analytics_failure_is_isolated() {
        let processor = DashboardProcessor::default();
        let flaky = FlakySource {
            inner: sample_source(),
            failing: vec![Table::WebsiteConnections],
        };
        let snapshot = processor.refresh(&flaky, now()).await.unwrap();

        assert_eq!(snapshot.kpis.total_visits, 0.0);
        assert_eq!(snapshot.kpis.bounce_rate, 0.0);
        assert_eq!(snapshot.failed_sources, vec!["website_analytics".to_string()]);
        assert_eq!(snapshot.kpis.total_revenue, 20000.0);
    }

    #[tokio::test]
    async fn test_analytics_window_limits_days() {
        let rows: Vec<Value> = (1..=31)
            .map(|day| {
                json!({
                    "connection_id": "site-1",
                    "date": format!("2024-01-{day:02}"),
                    "page_views": day,
                    "bounce_rate": 50.0
                })
            })
            .collect();
        let source = MemorySource::new()
            .with_rows(Table::WebsiteConnections, vec![json!({"id": "site-1"})])
            .with_rows(Table::WebsiteAnalytics, rows);

        let config = DashboardConfig {
            analytics_window: 2,
            ..Default::default()
        };
        let snapshot = DashboardProcessor::new(config)
            .refresh(&source, now())
            .await
            .unwrap();

        // Jan 31 and Jan 30 only
        assert_eq!(snapshot.kpis.total_visits, 61.0);
        assert_eq!(snapshot.kpis.bounce_rate, 50.0);
    }

    #[tokio::test]
    async fn test_all_sources_down() {
        let flaky = FlakySource {
            inner: sample_source(),
            failing: Table::ALL.to_vec(),
        };
        let result = DashboardProcessor::default().refresh(&flaky, now()).await;
        assert!(matches!(result, Err(DashboardError::SourceUnavailable)));
    }

    #[tokio::test]
    async fn test_empty_store_is_valid_zero_snapshot() {
        let snapshot = DashboardProcessor::default()
            .refresh(&MemorySource::new(), now())
            .await
            .unwrap();

        assert_eq!(snapshot.kpis, ExecutiveKpis::default());
        assert!(snapshot.feed.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_is_idempotent() {
        let processor = DashboardProcessor::default();
        let source = sample_source();
        let first = processor.refresh(&source, now()).await.unwrap();
        let second = processor.refresh(&source, now()).await.unwrap();

        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[tokio::test]
    async fn test_state_keeps_previous_snapshot_on_error() {
        let processor = DashboardProcessor::default();
        let mut state = DashboardState::new();
        assert!(state.is_loading());

        assert!(state.apply(processor.refresh(&sample_source(), now()).await));
        let before = state.current().cloned();

        let down = FlakySource {
            inner: MemorySource::new(),
            failing: Table::ALL.to_vec(),
        };
        assert!(!state.apply(processor.refresh(&down, now()).await));

        assert_eq!(state.current().cloned(), before);
        assert!(state.last_error().is_some());
        assert!(!state.is_loading());
    }

    #[tokio::test]
    async fn test_writes_show_up_on_next_refresh() {
        let processor = DashboardProcessor::default();
        let source = sample_source();

        source
            .insert(
                Table::Orders,
                json!({"order_number": "WC-1002", "total_amount": 5000, "created_at": "2024-03-01T12:00:00Z"}),
            )
            .await
            .unwrap();
        let snapshot = processor.refresh(&source, now()).await.unwrap();

        assert_eq!(snapshot.kpis.total_orders, 3);
        assert_eq!(snapshot.kpis.total_revenue, 25000.0);
        assert_eq!(snapshot.feed[0].action, "New order WC-1002 - PKR 5,000");
        assert_eq!(snapshot.feed[0].time_ago, "Just now");
    }

    #[tokio::test]
    async fn test_campaign_report_uses_booked_spend() {
        let processor = DashboardProcessor::default();
        let report = processor
            .campaign_report(&sample_source(), GroupBy::Campaign)
            .await
            .unwrap();

        let c1 = report.performance.groups["c1"];
        assert_eq!(c1.impressions, 15000.0);
        assert_eq!(c1.spend, 2500.0);
        assert_eq!(c1.roas, 400.0);
        assert_eq!(c1.cpc, 5.0);

        let c3 = report.performance.groups["c3"];
        assert_eq!(c3.spend, 1000.0);
        assert_eq!(c3.cpa, 0.0);

        assert_eq!(report.performance.site_wide.spend, 3500.0);
        assert_eq!(report.top[0].id, "c1");
        assert_eq!(report.top[0].name.as_deref(), Some("Spring Launch"));
        assert_eq!(report.status_counts["active"], 1);
        assert_eq!(report.budget_used_pct["c1"], 25.0);
        assert_eq!(report.budget_used_pct["c2"], 0.0);
    }

    #[tokio::test]
    async fn test_campaign_report_counts_spend_without_performance() {
        let source = MemorySource::new()
            .with_rows(
                Table::Campaigns,
                vec![
                    json!({"id": "c1", "name": "Spring Launch", "spent": 1000}),
                    json!({"id": "c2", "name": "Eid Promo", "spent": "3000"}),
                ],
            )
            .with_rows(
                Table::CampaignPerformance,
                vec![json!({"campaign_id": "c1", "impressions": 1000, "clicks": 50, "revenue": 2000})],
            );
        let report = DashboardProcessor::default()
            .campaign_report(&source, GroupBy::Campaign)
            .await
            .unwrap();

        assert_eq!(report.performance.groups["c2"].spend, 3000.0);
        assert_eq!(report.performance.site_wide.spend, 4000.0);
        assert_eq!(report.performance.site_wide.roas, 50.0);
        assert_eq!(report.top[0].id, "c1");
        assert_eq!(report.top[0].performance.roas, 200.0);
    }

    #[tokio::test]
    async fn test_ad_report_uses_row_spend() {
        let processor = DashboardProcessor::default();
        let report = processor
            .campaign_report(&sample_source(), GroupBy::Ad)
            .await
            .unwrap();

        assert_eq!(report.performance.groups["a2"].spend, 300.0);
        assert_eq!(report.performance.site_wide.spend, 400.0);
        // 90 clicks / 5000 impressions
        assert!((report.performance.site_wide.ctr - 1.8).abs() < 1e-9);
        // a1 CTR 5% beats a2 CTR 1%
        assert_eq!(report.top[0].id, "a1");
    }

    #[tokio::test]
    async fn test_report_with_definitions_down() {
        let flaky = FlakySource {
            inner: sample_source(),
            failing: vec![Table::Campaigns],
        };
        let report = DashboardProcessor::default()
            .campaign_report(&flaky, GroupBy::Campaign)
            .await
            .unwrap();

        assert_eq!(report.failed_sources, vec!["campaigns".to_string()]);
        // no ledger, so no booked spend
        assert_eq!(report.performance.site_wide.spend, 0.0);
        assert_eq!(report.performance.site_wide.clicks, 600.0);
    }

    #[tokio::test]
    async fn test_snapshot_from_json() {
        let json = snapshot_from_json(sample_dataset(), &DashboardConfig::default(), now())
            .await
            .unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["kpis"]["total_orders"], 2);
        assert_eq!(value["feed"][0]["type"], "order");
        assert_eq!(value["feed"][0]["module"], "E-commerce");
    }

    #[tokio::test]
    async fn test_invalid_dataset() {
        let result = snapshot_from_json("not json", &DashboardConfig::default(), now()).await;
        assert!(result.is_err());
    }
}
