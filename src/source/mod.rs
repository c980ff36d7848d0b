//! Record source boundary
//!
//! The dashboard reads rows from an external store through simple predicate
//! queries (equality / lower bound, ordering, limit). Writes issued by forms go
//! through [`Repository`]; the aggregation core only ever reads.

mod memory;

pub use memory::MemorySource;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

use crate::error::DashboardError;

/// Tables the dashboard reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Campaigns,
    CampaignPerformance,
    Ads,
    AdPerformance,
    Leads,
    Orders,
    Products,
    EmailCampaigns,
    SocialMediaPosts,
    ContentCalendar,
    WebsitePages,
    WebsiteConnections,
    WebsiteAnalytics,
    SeoKeywords,
}

impl Table {
    pub const ALL: [Table; 14] = [
        Table::Campaigns,
        Table::CampaignPerformance,
        Table::Ads,
        Table::AdPerformance,
        Table::Leads,
        Table::Orders,
        Table::Products,
        Table::EmailCampaigns,
        Table::SocialMediaPosts,
        Table::ContentCalendar,
        Table::WebsitePages,
        Table::WebsiteConnections,
        Table::WebsiteAnalytics,
        Table::SeoKeywords,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Campaigns => "campaigns",
            Table::CampaignPerformance => "campaign_performance",
            Table::Ads => "ads",
            Table::AdPerformance => "ad_performance",
            Table::Leads => "leads",
            Table::Orders => "orders",
            Table::Products => "products",
            Table::EmailCampaigns => "email_campaigns",
            Table::SocialMediaPosts => "social_media_posts",
            Table::ContentCalendar => "content_calendar",
            Table::WebsitePages => "website_pages",
            Table::WebsiteConnections => "website_connections",
            Table::WebsiteAnalytics => "website_analytics",
            Table::SeoKeywords => "seo_keywords",
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Table {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Table::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| DashboardError::UnknownTable(s.to_string()))
    }
}

/// Row predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    Gte(String, Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub column: String,
    pub descending: bool,
}

/// A predicate query against one table
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: Table,
    pub filters: Vec<Filter>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn table(table: Table) -> Self {
        Self {
            table,
            filters: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(column.to_string(), value.into()));
        self
    }

    pub fn gte(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Gte(column.to_string(), value.into()));
        self
    }

    pub fn order_by(mut self, column: &str, descending: bool) -> Self {
        self.order_by = Some(OrderBy {
            column: column.to_string(),
            descending,
        });
        self
    }

    /// Newest rows first by `created_at`
    pub fn newest(self) -> Self {
        self.order_by("created_at", true)
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Read side of the external row store
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Run a query and return the matching rows as JSON objects
    async fn select(&self, query: &Query) -> Result<Vec<Value>, DashboardError>;
}

/// Write side used by the presentation layer's forms
#[async_trait]
pub trait Repository: RecordSource {
    /// Insert a row and return it as stored
    async fn insert(&self, table: Table, row: Value) -> Result<Value, DashboardError>;

    /// Merge `patch` into the row with the given id; returns rows touched
    async fn update(&self, table: Table, id: &str, patch: Value) -> Result<usize, DashboardError>;

    /// Delete the row with the given id; returns rows removed
    async fn delete(&self, table: Table, id: &str) -> Result<usize, DashboardError>;
}

/// Run a query and deserialize the rows.
///
/// Rows that cannot be read at all (not an object, wrong field shapes) are
/// skipped with a warning rather than failing the whole fetch.
pub async fn fetch_rows<T>(source: &dyn RecordSource, query: &Query) -> Result<Vec<T>, DashboardError>
where
    T: DeserializeOwned,
{
    let rows = source.select(query).await?;
    let mut typed = Vec::with_capacity(rows.len());
    for (index, row) in rows.into_iter().enumerate() {
        match serde_json::from_value::<T>(row) {
            Ok(value) => typed.push(value),
            Err(e) => {
                tracing::warn!(table = %query.table, index, error = %e, "skipping unreadable row");
            }
        }
    }
    Ok(typed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OrderRow;
    use serde_json::json;

    #[test]
    fn test_table_names_round_trip() {
        for table in Table::ALL {
            assert_eq!(table.as_str().parse::<Table>().unwrap(), table);
            assert_eq!(
                serde_json::to_value(table).unwrap(),
                Value::String(table.as_str().to_string())
            );
        }
        assert!(matches!(
            "users".parse::<Table>(),
            Err(DashboardError::UnknownTable(_))
        ));
    }

    #[test]
    fn test_query_builder() {
        let query = Query::table(Table::WebsiteAnalytics)
            .eq("connection_id", "c1")
            .order_by("date", true)
            .limit(30);

        assert_eq!(query.filters, vec![Filter::Eq("connection_id".into(), json!("c1"))]);
        assert_eq!(query.order_by.as_ref().unwrap().column, "date");
        assert_eq!(query.limit, Some(30));
    }

    #[tokio::test]
    async fn test_fetch_rows_skips_unreadable_rows() {
        let source = MemorySource::new().with_rows(
            Table::Orders,
            vec![
                json!({"order_number": "A-1", "total_amount": "120.5"}),
                json!("not a row"),
                json!({"order_number": "A-2", "total_amount": null}),
            ],
        );

        let rows: Vec<OrderRow> = fetch_rows(&source, &Query::table(Table::Orders))
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].total_amount, Some(120.5));
        assert_eq!(rows[1].total_amount, None);
    }
}
