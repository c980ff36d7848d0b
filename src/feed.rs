//! Activity feed merging
//!
//! Recent events from several independently fetched sources are normalized into
//! one shape, merged newest first and truncated. Ordering always uses the
//! underlying timestamp; the "3 hours ago" label is display-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::normalizer::or_zero;
use crate::types::{
    ActivityType, ContentItemRow, EmailCampaignRow, FeedEntry, LeadRow, OrderRow, SocialPostRow,
};

/// Label for records without a usable timestamp
pub const UNKNOWN_AGE: &str = "Unknown";

/// A recent event from one of the dashboard modules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActivityRecord {
    LeadCreated {
        name: Option<String>,
        created_at: Option<DateTime<Utc>>,
    },
    OrderPlaced {
        order_number: Option<String>,
        total_amount: Option<f64>,
        created_at: Option<DateTime<Utc>>,
    },
    EmailCampaignCreated {
        name: Option<String>,
        created_at: Option<DateTime<Utc>>,
    },
    ContentScheduled {
        title: Option<String>,
        created_at: Option<DateTime<Utc>>,
    },
    SocialPostPublished {
        platform: Option<String>,
        created_at: Option<DateTime<Utc>>,
    },
}

impl ActivityRecord {
    pub fn activity_type(&self) -> ActivityType {
        match self {
            ActivityRecord::LeadCreated { .. } => ActivityType::Lead,
            ActivityRecord::OrderPlaced { .. } => ActivityType::Order,
            ActivityRecord::EmailCampaignCreated { .. } => ActivityType::Email,
            ActivityRecord::ContentScheduled { .. } => ActivityType::Content,
            ActivityRecord::SocialPostPublished { .. } => ActivityType::Social,
        }
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        match self {
            ActivityRecord::LeadCreated { created_at, .. }
            | ActivityRecord::OrderPlaced { created_at, .. }
            | ActivityRecord::EmailCampaignCreated { created_at, .. }
            | ActivityRecord::ContentScheduled { created_at, .. }
            | ActivityRecord::SocialPostPublished { created_at, .. } => *created_at,
        }
    }

    /// Display text for the feed
    pub fn action_text(&self, currency: &str) -> String {
        match self {
            ActivityRecord::LeadCreated { name, .. } => {
                format!("New lead: {}", name.as_deref().unwrap_or("Unnamed"))
            }
            ActivityRecord::OrderPlaced {
                order_number,
                total_amount,
                ..
            } => format!(
                "New order {} - {} {}",
                order_number.as_deref().unwrap_or("#"),
                currency,
                format_amount(or_zero(*total_amount))
            ),
            ActivityRecord::EmailCampaignCreated { name, .. } => format!(
                "Email campaign \"{}\" created",
                name.as_deref().unwrap_or("Untitled")
            ),
            ActivityRecord::ContentScheduled { title, .. } => format!(
                "Content \"{}\" scheduled",
                title.as_deref().unwrap_or("Untitled")
            ),
            ActivityRecord::SocialPostPublished { platform, .. } => {
                format!("{} post published", platform.as_deref().unwrap_or("Social"))
            }
        }
    }

    /// Convert to the common feed shape
    pub fn normalize(&self, now: DateTime<Utc>, currency: &str) -> FeedEntry {
        let activity_type = self.activity_type();
        let created_at = self.created_at();
        FeedEntry {
            action: self.action_text(currency),
            activity_type,
            module: activity_type.module_name().to_string(),
            time_ago: time_ago(created_at, now),
            created_at,
        }
    }
}

impl From<&LeadRow> for ActivityRecord {
    fn from(row: &LeadRow) -> Self {
        ActivityRecord::LeadCreated {
            name: row.name.clone(),
            created_at: row.created_at,
        }
    }
}

impl From<&OrderRow> for ActivityRecord {
    fn from(row: &OrderRow) -> Self {
        ActivityRecord::OrderPlaced {
            order_number: row.order_number.clone(),
            total_amount: row.total_amount,
            created_at: row.created_at,
        }
    }
}

impl From<&EmailCampaignRow> for ActivityRecord {
    fn from(row: &EmailCampaignRow) -> Self {
        ActivityRecord::EmailCampaignCreated {
            name: row.name.clone(),
            created_at: row.created_at,
        }
    }
}

impl From<&ContentItemRow> for ActivityRecord {
    fn from(row: &ContentItemRow) -> Self {
        ActivityRecord::ContentScheduled {
            title: row.title.clone(),
            created_at: row.created_at,
        }
    }
}

impl From<&SocialPostRow> for ActivityRecord {
    fn from(row: &SocialPostRow) -> Self {
        ActivityRecord::SocialPostPublished {
            platform: row.platform.clone(),
            created_at: row.created_at,
        }
    }
}

/// Merger for per-source activity lists
pub struct FeedMerger;

impl FeedMerger {
    /// Normalize every record, order newest first and keep the first `limit`.
    ///
    /// Sources are concatenated in the order given; the sort is stable, so
    /// records with identical timestamps keep that order. Records without a
    /// timestamp sort after everything else.
    pub fn merge<I>(sources: I, now: DateTime<Utc>, limit: usize, currency: &str) -> Vec<FeedEntry>
    where
        I: IntoIterator<Item = Vec<ActivityRecord>>,
    {
        let mut entries: Vec<FeedEntry> = sources
            .into_iter()
            .flatten()
            .map(|record| record.normalize(now, currency))
            .collect();

        entries.sort_by(|a, b| newest_first(a.created_at, b.created_at));
        entries.truncate(limit);
        entries
    }
}

fn newest_first(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Relative age label: "Just now", "N minute(s) ago", "N hour(s) ago", "N day(s) ago"
pub fn time_ago(created_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(created_at) = created_at else {
        return UNKNOWN_AGE.to_string();
    };

    let seconds = (now - created_at).num_seconds();
    if seconds < 60 {
        return "Just now".to_string();
    }

    let minutes = seconds / 60;
    if minutes < 60 {
        return plural(minutes, "minute");
    }

    let hours = minutes / 60;
    if hours < 24 {
        return plural(hours, "hour");
    }

    plural(hours / 24, "day")
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{count} {unit}s ago")
    }
}

/// Format an amount with thousands separators and at most three decimals,
/// trailing zeros dropped: `1234567.5` -> `1,234,567.5`
pub fn format_amount(value: f64) -> String {
    let value = or_zero(Some(value));
    let abs = value.abs();
    let mut whole = abs.trunc();
    let mut frac = ((abs - whole) * 1000.0).round() as u64;
    if frac >= 1000 {
        whole += 1.0;
        frac = 0;
    }
    let nonzero = whole > 0.0 || frac > 0;
    let whole = format!("{whole:.0}");

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    if frac > 0 {
        let decimals = format!("{frac:03}");
        grouped.push('.');
        grouped.push_str(decimals.trim_end_matches('0'));
    }

    if value < 0.0 && nonzero {
        format!("-{grouped}")
    } else {
        grouped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn lead(name: &str, ago: Duration) -> ActivityRecord {
        ActivityRecord::LeadCreated {
            name: Some(name.to_string()),
            created_at: Some(now() - ago),
        }
    }

    fn order(number: &str, amount: f64, ago: Duration) -> ActivityRecord {
        ActivityRecord::OrderPlaced {
            order_number: Some(number.to_string()),
            total_amount: Some(amount),
            created_at: Some(now() - ago),
        }
    }

    fn email(name: &str, ago: Duration) -> ActivityRecord {
        ActivityRecord::EmailCampaignCreated {
            name: Some(name.to_string()),
            created_at: Some(now() - ago),
        }
    }

    #[test]
    fn test_merge_orders_by_recency_and_truncates() {
        let feed = FeedMerger::merge(
            vec![
                vec![lead("Ayesha", Duration::minutes(5))],
                vec![order("ORD-1", 2500.0, Duration::minutes(1))],
                vec![email("Spring Sale", Duration::hours(2))],
            ],
            now(),
            2,
            "PKR",
        );

        let types: Vec<ActivityType> = feed.iter().map(|e| e.activity_type).collect();
        assert_eq!(types, vec![ActivityType::Order, ActivityType::Lead]);
        assert_eq!(feed[0].action, "New order ORD-1 - PKR 2,500");
        assert_eq!(feed[0].time_ago, "1 minute ago");
        assert_eq!(feed[1].time_ago, "5 minutes ago");
        assert_eq!(feed[1].module, "Leads");
    }

    #[test]
    fn test_sort_uses_timestamp_not_label() {
        // "9 minutes ago" sorts after "10 minutes ago" lexically
        let feed = FeedMerger::merge(
            vec![
                vec![lead("Older", Duration::minutes(10))],
                vec![email("Newer", Duration::minutes(9))],
            ],
            now(),
            8,
            "PKR",
        );

        assert_eq!(feed[0].time_ago, "9 minutes ago");
        assert_eq!(feed[1].time_ago, "10 minutes ago");
    }

    #[test]
    fn test_same_bucket_keeps_true_order() {
        // both read "2 hours ago"; the later timestamp still comes first
        let feed = FeedMerger::merge(
            vec![
                vec![lead("A", Duration::minutes(150))],
                vec![email("B", Duration::minutes(125))],
            ],
            now(),
            8,
            "PKR",
        );

        assert_eq!(feed[0].time_ago, feed[1].time_ago);
        assert_eq!(feed[0].activity_type, ActivityType::Email);
    }

    #[test]
    fn test_ties_keep_source_order() {
        let at = Duration::minutes(30);
        let feed = FeedMerger::merge(
            vec![
                vec![lead("First", at)],
                vec![order("ORD-2", 10.0, at)],
                vec![email("Third", at)],
            ],
            now(),
            8,
            "PKR",
        );

        let types: Vec<ActivityType> = feed.iter().map(|e| e.activity_type).collect();
        assert_eq!(
            types,
            vec![ActivityType::Lead, ActivityType::Order, ActivityType::Email]
        );
    }

    #[test]
    fn test_missing_timestamp_sorts_last() {
        let feed = FeedMerger::merge(
            vec![
                vec![ActivityRecord::ContentScheduled {
                    title: Some("Launch post".to_string()),
                    created_at: None,
                }],
                vec![lead("Bilal", Duration::days(3))],
            ],
            now(),
            8,
            "PKR",
        );

        assert_eq!(feed[0].activity_type, ActivityType::Lead);
        assert_eq!(feed[1].time_ago, UNKNOWN_AGE);
        assert_eq!(feed[1].action, "Content \"Launch post\" scheduled");
    }

    #[test]
    fn test_empty_sources_give_empty_feed() {
        let feed = FeedMerger::merge(Vec::<Vec<ActivityRecord>>::new(), now(), 8, "PKR");
        assert!(feed.is_empty());

        let feed = FeedMerger::merge(vec![vec![], vec![]], now(), 8, "PKR");
        assert!(feed.is_empty());
    }

    #[test]
    fn test_time_ago_buckets() {
        let at = |d: Duration| time_ago(Some(now() - d), now());

        assert_eq!(at(Duration::seconds(59)), "Just now");
        assert_eq!(at(Duration::seconds(-30)), "Just now");
        assert_eq!(at(Duration::seconds(60)), "1 minute ago");
        assert_eq!(at(Duration::minutes(59)), "59 minutes ago");
        assert_eq!(at(Duration::minutes(60)), "1 hour ago");
        assert_eq!(at(Duration::hours(23)), "23 hours ago");
        assert_eq!(at(Duration::hours(24)), "1 day ago");
        assert_eq!(at(Duration::days(12)), "12 days ago");
        assert_eq!(time_ago(None, now()), UNKNOWN_AGE);
    }

    #[test]
    fn test_action_texts() {
        let social = ActivityRecord::SocialPostPublished {
            platform: Some("Instagram".to_string()),
            created_at: None,
        };
        assert_eq!(social.action_text("PKR"), "Instagram post published");
        assert_eq!(
            email("Eid Offers", Duration::zero()).action_text("PKR"),
            "Email campaign \"Eid Offers\" created"
        );
        assert_eq!(
            lead("Sara", Duration::zero()).action_text("PKR"),
            "New lead: Sara"
        );
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0.0), "0");
        assert_eq!(format_amount(999.0), "999");
        assert_eq!(format_amount(1000.0), "1,000");
        assert_eq!(format_amount(1234567.5), "1,234,567.5");
        assert_eq!(format_amount(12.3456), "12.346");
        assert_eq!(format_amount(-4200.25), "-4,200.25");
        assert_eq!(format_amount(f64::NAN), "0");
        assert_eq!(format_amount(2.9996), "3");
        assert_eq!(format_amount(-0.0001), "0");
        // past u64 range
        assert_eq!(format_amount(1e20), "100,000,000,000,000,000,000");
        assert_eq!(format_amount(-3e19), "-30,000,000,000,000,000,000");
    }

    #[test]
    fn test_from_rows() {
        let row = OrderRow {
            order_number: Some("WC-1042".to_string()),
            total_amount: Some(15999.0),
            status: Some("processing".to_string()),
            created_at: Some(now()),
        };
        let entry = ActivityRecord::from(&row).normalize(now(), "PKR");

        assert_eq!(entry.action, "New order WC-1042 - PKR 15,999");
        assert_eq!(entry.module, "E-commerce");
        assert_eq!(entry.time_ago, "Just now");
    }
}
