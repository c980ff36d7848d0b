//! Metrics aggregation
//!
//! This module turns collections of fetched rows into KPI snapshots:
//! - Additive fields are folded (summed) first, ratios derived second
//! - Grouped snapshots and the site-wide snapshot are separate fold-then-derive
//!   passes; ratios are never averaged across groups
//! - Every ratio is zero when its denominator is zero
//!
//! All functions here are pure: the same input always yields the same snapshot.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::normalizer::or_zero;
use crate::types::{
    EmailCampaignRow, GroupedPerformance, OrderRow, PerformanceRow, PerformanceSnapshot,
    ProductRow, SeoKeywordRow, SocialPostRow, WebsiteAnalyticsRow,
};

/// Group key for performance rows that carry no parent id
pub const UNASSIGNED_GROUP: &str = "unassigned";

/// `num / den`, or 0 when the denominator is zero or the result is not finite
#[inline]
pub fn safe_ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 {
        return 0.0;
    }
    let ratio = num / den;
    if ratio.is_finite() {
        ratio
    } else {
        0.0
    }
}

/// `num / den * 100`, or 0 when the denominator is zero
#[inline]
pub fn percent(num: f64, den: f64) -> f64 {
    safe_ratio(num, den) * 100.0
}

/// Arithmetic mean of a pre-summed value, 0 for an empty window
#[inline]
pub fn mean(sum: f64, count: usize) -> f64 {
    safe_ratio(sum, count as f64)
}

/// Round to a fixed number of decimal places (half away from zero)
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    let rounded = (value * factor).round() / factor;
    if rounded.is_finite() {
        rounded
    } else {
        0.0
    }
}

/// Parent entity performance rows are grouped by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    Campaign,
    Ad,
}

impl GroupBy {
    fn key_of<'a>(&self, row: &'a PerformanceRow) -> &'a str {
        let key = match self {
            GroupBy::Campaign => row.campaign_id.as_deref(),
            GroupBy::Ad => row.ad_id.as_deref(),
        };
        key.filter(|k| !k.is_empty()).unwrap_or(UNASSIGNED_GROUP)
    }
}

/// Derived metric groups can be ranked by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankBy {
    Roas,
    Ctr,
    Conversions,
    Revenue,
}

impl RankBy {
    fn value(&self, snapshot: &PerformanceSnapshot) -> f64 {
        match self {
            RankBy::Roas => snapshot.roas,
            RankBy::Ctr => snapshot.ctr,
            RankBy::Conversions => snapshot.conversions,
            RankBy::Revenue => snapshot.revenue,
        }
    }
}

/// Summed additive performance fields
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PerformanceTotals {
    pub impressions: f64,
    pub clicks: f64,
    pub conversions: f64,
    pub revenue: f64,
    pub spend: f64,
}

impl PerformanceTotals {
    /// Add one row; missing fields count as zero
    pub fn add_row(&mut self, row: &PerformanceRow) {
        self.impressions += or_zero(row.impressions);
        self.clicks += or_zero(row.clicks);
        self.conversions += or_zero(row.conversions);
        self.revenue += or_zero(row.revenue);
        self.spend += or_zero(row.spend);
    }

    /// Add another set of totals
    pub fn merge(&mut self, other: &PerformanceTotals) {
        self.impressions += other.impressions;
        self.clicks += other.clicks;
        self.conversions += other.conversions;
        self.revenue += other.revenue;
        self.spend += other.spend;
    }

    /// Fold a collection of rows into totals
    pub fn fold<'a, I>(rows: I) -> Self
    where
        I: IntoIterator<Item = &'a PerformanceRow>,
    {
        let mut totals = Self::default();
        for row in rows {
            totals.add_row(row);
        }
        totals
    }

    /// Derive ratios from the summed fields
    pub fn derive(&self) -> PerformanceSnapshot {
        PerformanceSnapshot {
            impressions: self.impressions,
            clicks: self.clicks,
            conversions: self.conversions,
            revenue: self.revenue,
            spend: self.spend,
            ctr: percent(self.clicks, self.impressions),
            cpc: safe_ratio(self.spend, self.clicks),
            cpa: safe_ratio(self.spend, self.conversions),
            roas: percent(self.revenue, self.spend),
            conversion_rate: percent(self.conversions, self.clicks),
        }
    }
}

impl PerformanceSnapshot {
    /// The additive fields this snapshot was derived from
    pub fn totals(&self) -> PerformanceTotals {
        PerformanceTotals {
            impressions: self.impressions,
            clicks: self.clicks,
            conversions: self.conversions,
            revenue: self.revenue,
            spend: self.spend,
        }
    }
}

/// Aggregator for performance rows
pub struct MetricsAggregator;

impl MetricsAggregator {
    /// Site-wide snapshot over a flat list of rows
    pub fn site_wide(rows: &[PerformanceRow]) -> PerformanceSnapshot {
        PerformanceTotals::fold(rows).derive()
    }

    /// Fold rows per group, derive each group, then derive the site-wide
    /// snapshot once from the summed group totals.
    pub fn fold_and_derive(rows: &[PerformanceRow], group_by: GroupBy) -> GroupedPerformance {
        let mut totals: BTreeMap<String, PerformanceTotals> = BTreeMap::new();
        for row in rows {
            totals
                .entry(group_by.key_of(row).to_string())
                .or_default()
                .add_row(row);
        }

        GroupedPerformance::from_totals(totals)
    }
}

impl GroupedPerformance {
    fn from_totals(totals: BTreeMap<String, PerformanceTotals>) -> Self {
        let mut site = PerformanceTotals::default();
        let mut groups = BTreeMap::new();
        for (key, group) in totals {
            site.merge(&group);
            groups.insert(key, group.derive());
        }

        GroupedPerformance {
            groups,
            site_wide: site.derive(),
        }
    }

    /// Replace every group's spend with the spend booked in `ledger`.
    ///
    /// Groups absent from the ledger have no booked spend and read as zero.
    /// Ledger entries without performance rows become groups of their own, so
    /// their spend still counts toward the site-wide totals. All ratios are
    /// re-derived afterwards.
    pub fn with_spend_ledger(self, ledger: &HashMap<String, f64>) -> Self {
        let mut totals: BTreeMap<String, PerformanceTotals> = self
            .groups
            .into_iter()
            .map(|(key, snapshot)| {
                let mut group = snapshot.totals();
                group.spend = 0.0;
                (key, group)
            })
            .collect();
        for (key, spent) in ledger {
            totals.entry(key.clone()).or_default().spend = or_zero(Some(*spent));
        }

        Self::from_totals(totals)
    }

    /// The `n` best groups by a derived metric, highest first.
    /// Equal values keep key order.
    pub fn top_by(&self, rank: RankBy, n: usize) -> Vec<(String, PerformanceSnapshot)> {
        let mut ranked: Vec<(String, PerformanceSnapshot)> = self
            .groups
            .iter()
            .map(|(key, snapshot)| (key.clone(), *snapshot))
            .collect();
        ranked.sort_by(|a, b| rank.value(&b.1).total_cmp(&rank.value(&a.1)));
        ranked.truncate(n);
        ranked
    }
}

/// Count rows per status; rows without a status count as "unknown"
pub fn status_breakdown<'a, I>(statuses: I) -> BTreeMap<String, usize>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut counts = BTreeMap::new();
    for status in statuses {
        *counts
            .entry(status.unwrap_or("unknown").to_string())
            .or_insert(0) += 1;
    }
    counts
}

/// Count rows whose status is one of `wanted`
pub fn count_status<'a, I>(statuses: I, wanted: &[&str]) -> usize
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    statuses
        .into_iter()
        .filter(|s| s.map(|s| wanted.contains(&s)).unwrap_or(false))
        .count()
}

/// Order totals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub orders: usize,
    pub total_revenue: f64,
    pub avg_order_value: f64,
    pub by_status: BTreeMap<String, usize>,
}

impl OrderSummary {
    pub fn from_rows(rows: &[OrderRow]) -> Self {
        let total_revenue: f64 = rows.iter().map(|o| or_zero(o.total_amount)).sum();
        OrderSummary {
            orders: rows.len(),
            total_revenue,
            avg_order_value: mean(total_revenue, rows.len()),
            by_status: status_breakdown(rows.iter().map(|o| o.status.as_deref())),
        }
    }
}

/// Email campaign totals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmailSummary {
    pub campaigns: usize,
    pub sent_campaigns: usize,
    pub total_sent: f64,
    pub total_opens: f64,
    /// Opens per sent email (percentage)
    pub open_rate: f64,
    /// Clicks per sent email (percentage)
    pub click_rate: f64,
}

impl EmailSummary {
    /// Rates are derived from summed counts. The per-campaign click rate is
    /// turned back into a click count (rate × sent) before summing.
    pub fn from_rows(rows: &[EmailCampaignRow]) -> Self {
        let mut total_sent = 0.0;
        let mut total_opens = 0.0;
        let mut total_clicks = 0.0;
        for row in rows {
            let sent = or_zero(row.sent_count);
            total_sent += sent;
            total_opens += or_zero(row.open_count);
            total_clicks += or_zero(row.click_rate) / 100.0 * sent;
        }

        EmailSummary {
            campaigns: rows.len(),
            sent_campaigns: count_status(rows.iter().map(|r| r.status.as_deref()), &["sent"]),
            total_sent,
            total_opens,
            open_rate: percent(total_opens, total_sent),
            click_rate: percent(total_clicks, total_sent),
        }
    }
}

/// Social post totals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SocialSummary {
    pub posts: usize,
    pub total_engagement: f64,
    pub total_reach: f64,
    /// Engagement per reached account (percentage)
    pub engagement_rate: f64,
}

impl SocialSummary {
    pub fn from_rows(rows: &[SocialPostRow]) -> Self {
        let total_engagement: f64 = rows.iter().map(|p| or_zero(p.engagement)).sum();
        let total_reach: f64 = rows.iter().map(|p| or_zero(p.reach)).sum();
        SocialSummary {
            posts: rows.len(),
            total_engagement,
            total_reach,
            engagement_rate: percent(total_engagement, total_reach),
        }
    }
}

/// Website traffic over an analytics window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub days: usize,
    pub page_views: f64,
    pub unique_visitors: f64,
    pub sessions: f64,
    /// Mean of the daily bounce rates (percentage)
    pub bounce_rate: f64,
    /// Mean of the daily session durations (whole seconds)
    pub avg_session_duration: f64,
}

impl SessionSummary {
    pub fn from_rows(rows: &[WebsiteAnalyticsRow]) -> Self {
        let days = rows.len();
        let sum = |f: fn(&WebsiteAnalyticsRow) -> Option<f64>| -> f64 {
            rows.iter().map(|r| or_zero(f(r))).sum()
        };

        SessionSummary {
            days,
            page_views: sum(|r| r.page_views),
            unique_visitors: sum(|r| r.unique_visitors),
            sessions: sum(|r| r.sessions),
            bounce_rate: mean(sum(|r| r.bounce_rate), days),
            avg_session_duration: mean(sum(|r| r.avg_session_duration), days).round(),
        }
    }
}

/// SEO keyword totals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeoSummary {
    pub keywords: usize,
    pub ranked_keywords: usize,
    /// Mean position over keywords that currently rank. Unranked keywords
    /// (rank 0 or missing) are left out rather than averaged in as 0.
    pub avg_rank: f64,
}

impl SeoSummary {
    pub fn from_rows(rows: &[SeoKeywordRow]) -> Self {
        let ranks: Vec<f64> = rows
            .iter()
            .map(|k| or_zero(k.current_rank))
            .filter(|rank| *rank > 0.0)
            .collect();

        SeoSummary {
            keywords: rows.len(),
            ranked_keywords: ranks.len(),
            avg_rank: mean(ranks.iter().sum(), ranks.len()),
        }
    }
}

/// Product catalogue totals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub products: usize,
    pub low_stock: usize,
}

impl ProductSummary {
    pub fn from_rows(rows: &[ProductRow], low_stock_threshold: f64) -> Self {
        ProductSummary {
            products: rows.len(),
            low_stock: rows
                .iter()
                .filter(|p| or_zero(p.stock_quantity) < low_stock_threshold)
                .count(),
        }
    }
}
