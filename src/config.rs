//! Dashboard configuration
//!
//! Every field has a default, so a partial JSON document (or none at all) is a
//! valid configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::DashboardError;

/// Default number of entries kept in the merged activity feed
pub const DEFAULT_FEED_LIMIT: usize = 8;

/// Default number of website analytics days averaged for traffic KPIs
pub const DEFAULT_ANALYTICS_WINDOW: usize = 30;

/// How many recent records are pulled from each activity source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedWindows {
    pub leads: usize,
    pub orders: usize,
    pub email_campaigns: usize,
    pub content: usize,
    pub social_posts: usize,
}

impl Default for FeedWindows {
    fn default() -> Self {
        Self {
            leads: 3,
            orders: 3,
            email_campaigns: 2,
            content: 2,
            social_posts: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Entries kept after merging the activity feed
    pub feed_limit: usize,
    pub feed_windows: FeedWindows,
    /// Most recent analytics rows considered for traffic KPIs
    pub analytics_window: usize,
    /// Currency label used in order activity text
    pub currency: String,
    /// Products with stock below this count as low stock
    pub low_stock_threshold: f64,
    /// Length of ranked lists (top campaigns by ROAS, ...)
    pub top_ranked: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            feed_limit: DEFAULT_FEED_LIMIT,
            feed_windows: FeedWindows::default(),
            analytics_window: DEFAULT_ANALYTICS_WINDOW,
            currency: "PKR".to_string(),
            low_stock_threshold: 10.0,
            top_ranked: 5,
        }
    }
}

impl DashboardConfig {
    /// Parse a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, DashboardError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn from_file(path: &Path) -> Result<Self, DashboardError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), DashboardError> {
        if self.feed_limit == 0 {
            return Err(DashboardError::ConfigError(
                "feed_limit must be at least 1".to_string(),
            ));
        }
        if self.analytics_window == 0 {
            return Err(DashboardError::ConfigError(
                "analytics_window must be at least 1".to_string(),
            ));
        }
        if !self.low_stock_threshold.is_finite() {
            return Err(DashboardError::ConfigError(
                "low_stock_threshold must be a finite number".to_string(),
            ));
        }
        Ok(())
    }
}
