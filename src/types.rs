//! Core types for opsboard
//!
//! This module defines the records that flow in from the record source and the
//! snapshot structures the aggregator and feed merger produce from them.
//! Rows are read-only value records; snapshots are recomputed on every pass.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::normalizer::{lenient_f64, lenient_id, lenient_timestamp, or_zero};

// ============================================================================
// Record rows
// ============================================================================

/// Daily performance row for a campaign or an ad
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRow {
    /// Parent campaign (campaign_performance rows)
    #[serde(default, deserialize_with = "lenient_id")]
    pub campaign_id: Option<String>,
    /// Parent ad (ad_performance rows)
    #[serde(default, deserialize_with = "lenient_id")]
    pub ad_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub impressions: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub clicks: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub conversions: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub revenue: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub spend: Option<f64>,
}

/// Campaign definition row (the `ads` table shares this shape)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CampaignRow {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// active | paused | draft | completed
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub budget: Option<f64>,
    /// Spend booked against the campaign
    #[serde(default, deserialize_with = "lenient_f64")]
    pub spent: Option<f64>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

impl CampaignRow {
    /// Share of the budget already spent, as a percentage (0 when no budget)
    pub fn budget_used_pct(&self) -> f64 {
        crate::metrics::percent(or_zero(self.spent), or_zero(self.budget))
    }
}

/// Lead row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadRow {
    #[serde(default)]
    pub name: Option<String>,
    /// new | contacted | qualified | converted | lost
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub campaign_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// E-commerce order row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderRow {
    #[serde(default, deserialize_with = "lenient_id")]
    pub order_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total_amount: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Email campaign row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmailCampaignRow {
    #[serde(default)]
    pub name: Option<String>,
    /// draft | scheduled | sent
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub sent_count: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub open_count: Option<f64>,
    /// Click rate recorded by the email provider (percentage)
    #[serde(default, deserialize_with = "lenient_f64")]
    pub click_rate: Option<f64>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Social media post row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SocialPostRow {
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub engagement: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub reach: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Content calendar item row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentItemRow {
    #[serde(default)]
    pub title: Option<String>,
    /// idea | draft | scheduled | published
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Website page row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebsitePageRow {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub page_views: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Connected website (the analytics owner)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebsiteConnectionRow {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<String>,
}

/// One day of website analytics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebsiteAnalyticsRow {
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub page_views: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub unique_visitors: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub sessions: Option<f64>,
    /// Bounce rate for the day (percentage)
    #[serde(default, deserialize_with = "lenient_f64")]
    pub bounce_rate: Option<f64>,
    /// Average session duration for the day (seconds)
    #[serde(default, deserialize_with = "lenient_f64")]
    pub avg_session_duration: Option<f64>,
}

/// Tracked SEO keyword row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeoKeywordRow {
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub current_rank: Option<f64>,
}

/// Product catalogue row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductRow {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub stock_quantity: Option<f64>,
}

// ============================================================================
// Derived snapshots
// ============================================================================

/// Summed additive performance fields plus the ratios derived from them
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    pub impressions: f64,
    pub clicks: f64,
    pub conversions: f64,
    pub revenue: f64,
    pub spend: f64,
    /// Click-through rate (percentage)
    pub ctr: f64,
    /// Cost per click
    pub cpc: f64,
    /// Cost per acquisition
    pub cpa: f64,
    /// Return on ad spend (percentage)
    pub roas: f64,
    /// Conversions per click (percentage)
    pub conversion_rate: f64,
}

/// Per-group snapshots plus the site-wide snapshot derived from their totals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupedPerformance {
    pub groups: BTreeMap<String, PerformanceSnapshot>,
    pub site_wide: PerformanceSnapshot,
}

/// Headline KPIs for the executive dashboard
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutiveKpis {
    pub total_visits: f64,
    pub unique_visitors: f64,
    /// Mean daily bounce rate over the analytics window (percentage, 1 dp)
    pub bounce_rate: f64,
    /// Conversions per click across all campaigns (percentage, 2 dp)
    pub conversion_rate: f64,
    pub total_revenue: f64,
    pub avg_order_value: f64,
    pub new_leads: usize,
    pub total_orders: usize,
    pub email_campaigns: usize,
    /// Opens per sent email across all campaigns (percentage, 1 dp)
    pub email_open_rate: f64,
    pub social_posts: usize,
    pub social_engagement: f64,
    pub content_scheduled: usize,
    pub active_campaigns: usize,
    pub website_pages: usize,
    pub seo_keywords: usize,
    pub products: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CampaignCard {
    pub active: usize,
    pub paused: usize,
    pub draft: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadCard {
    pub total: usize,
    pub new: usize,
    pub converted: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentCard {
    pub scheduled: usize,
    pub published: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmailCard {
    pub campaigns: usize,
    pub open_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SocialCard {
    pub posts: usize,
    pub engagement: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebsiteCard {
    pub pages: usize,
    pub views: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EcommerceCard {
    pub orders: usize,
    pub revenue: f64,
    pub products: usize,
    pub low_stock: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeoCard {
    pub keywords: usize,
    /// Mean rank of ranked keywords only, 1 dp
    pub avg_rank: f64,
}

/// Per-module summary cards shown under the KPI strip
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleMetrics {
    pub campaigns: CampaignCard,
    pub leads: LeadCard,
    pub content: ContentCard,
    pub email: EmailCard,
    pub social: SocialCard,
    pub website: WebsiteCard,
    pub ecommerce: EcommerceCard,
    pub seo: SeoCard,
}

/// Activity type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Lead,
    Order,
    Email,
    Content,
    Social,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Lead => "lead",
            ActivityType::Order => "order",
            ActivityType::Email => "email",
            ActivityType::Content => "content",
            ActivityType::Social => "social",
        }
    }

    /// Human label of the dashboard module the activity belongs to
    pub fn module_name(&self) -> &'static str {
        match self {
            ActivityType::Lead => "Leads",
            ActivityType::Order => "E-commerce",
            ActivityType::Email => "Email Marketing",
            ActivityType::Content => "Content Calendar",
            ActivityType::Social => "Social Media",
        }
    }
}

/// One entry of the merged activity feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedEntry {
    pub action: String,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub module: String,
    /// Relative age label, e.g. "3 hours ago"
    pub time_ago: String,
    /// Underlying timestamp; the feed is ordered by this, never by the label
    pub created_at: Option<DateTime<Utc>>,
}

/// Complete output of one dashboard aggregation pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub kpis: ExecutiveKpis,
    pub modules: ModuleMetrics,
    pub feed: Vec<FeedEntry>,
    /// Tables whose sub-fetch failed; their fields read as zero
    pub failed_sources: Vec<String>,
    pub computed_at: DateTime<Utc>,
}
