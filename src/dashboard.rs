//! Executive dashboard assembly
//!
//! One refresh pass produces a [`DashboardBatch`]: one collection per table, or
//! `None` where that sub-fetch failed. KPIs and module cards are computed from
//! the batch field by field, so a failed collection only zeroes the values
//! derived from it.

use crate::feed::ActivityRecord;
use crate::metrics::{
    count_status, round_to, EmailSummary, MetricsAggregator, OrderSummary, ProductSummary,
    SeoSummary, SessionSummary, SocialSummary,
};
use crate::normalizer::or_zero;
use crate::source::Table;
use crate::types::{
    CampaignCard, CampaignRow, ContentCard, ContentItemRow, EcommerceCard, EmailCampaignRow,
    EmailCard, ExecutiveKpis, LeadCard, LeadRow, ModuleMetrics, OrderRow, PerformanceRow,
    ProductRow, SeoCard, SeoKeywordRow, SocialCard, SocialPostRow, WebsiteAnalyticsRow,
    WebsiteCard, WebsitePageRow,
};

/// Collections fetched for one aggregation pass; `None` marks a failed sub-fetch
#[derive(Debug, Clone, Default)]
pub struct DashboardBatch {
    pub campaigns: Option<Vec<CampaignRow>>,
    pub performance: Option<Vec<PerformanceRow>>,
    pub leads: Option<Vec<LeadRow>>,
    pub orders: Option<Vec<OrderRow>>,
    pub email_campaigns: Option<Vec<EmailCampaignRow>>,
    pub social_posts: Option<Vec<SocialPostRow>>,
    pub content: Option<Vec<ContentItemRow>>,
    pub website_pages: Option<Vec<WebsitePageRow>>,
    pub website_analytics: Option<Vec<WebsiteAnalyticsRow>>,
    pub seo_keywords: Option<Vec<SeoKeywordRow>>,
    pub products: Option<Vec<ProductRow>>,
}

fn rows<T>(collection: &Option<Vec<T>>) -> &[T] {
    collection.as_deref().unwrap_or(&[])
}

impl DashboardBatch {
    fn fetch_status(&self) -> [(Table, bool); 11] {
        [
            (Table::Campaigns, self.campaigns.is_none()),
            (Table::CampaignPerformance, self.performance.is_none()),
            (Table::Leads, self.leads.is_none()),
            (Table::Orders, self.orders.is_none()),
            (Table::EmailCampaigns, self.email_campaigns.is_none()),
            (Table::SocialMediaPosts, self.social_posts.is_none()),
            (Table::ContentCalendar, self.content.is_none()),
            (Table::WebsitePages, self.website_pages.is_none()),
            (Table::WebsiteAnalytics, self.website_analytics.is_none()),
            (Table::SeoKeywords, self.seo_keywords.is_none()),
            (Table::Products, self.products.is_none()),
        ]
    }

    /// Tables whose sub-fetch failed
    pub fn failed_sources(&self) -> Vec<Table> {
        self.fetch_status()
            .into_iter()
            .filter(|(_, failed)| *failed)
            .map(|(table, _)| table)
            .collect()
    }

    /// True when no sub-fetch succeeded
    pub fn is_empty_pass(&self) -> bool {
        self.fetch_status().iter().all(|(_, failed)| *failed)
    }
}

/// Most recent records per activity source; `None` marks a failed sub-fetch
#[derive(Debug, Clone, Default)]
pub struct ActivityBatch {
    pub leads: Option<Vec<LeadRow>>,
    pub orders: Option<Vec<OrderRow>>,
    pub email_campaigns: Option<Vec<EmailCampaignRow>>,
    pub content: Option<Vec<ContentItemRow>>,
    pub social_posts: Option<Vec<SocialPostRow>>,
}

impl ActivityBatch {
    fn fetch_status(&self) -> [(Table, bool); 5] {
        [
            (Table::Leads, self.leads.is_none()),
            (Table::Orders, self.orders.is_none()),
            (Table::EmailCampaigns, self.email_campaigns.is_none()),
            (Table::ContentCalendar, self.content.is_none()),
            (Table::SocialMediaPosts, self.social_posts.is_none()),
        ]
    }

    /// Tables whose activity sub-fetch failed
    pub fn failed_sources(&self) -> Vec<Table> {
        self.fetch_status()
            .into_iter()
            .filter(|(_, failed)| *failed)
            .map(|(table, _)| table)
            .collect()
    }

    pub fn is_empty_pass(&self) -> bool {
        self.fetch_status().iter().all(|(_, failed)| *failed)
    }

    /// Per-source activity lists in feed source order:
    /// leads, orders, email campaigns, content, social posts
    pub fn into_sources(self) -> Vec<Vec<ActivityRecord>> {
        fn convert<T>(collection: Option<Vec<T>>) -> Vec<ActivityRecord>
        where
            for<'a> &'a T: Into<ActivityRecord>,
        {
            collection
                .unwrap_or_default()
                .iter()
                .map(|row| row.into())
                .collect()
        }

        vec![
            convert(self.leads),
            convert(self.orders),
            convert(self.email_campaigns),
            convert(self.content),
            convert(self.social_posts),
        ]
    }
}

impl ExecutiveKpis {
    /// Compute the headline KPIs from one batch
    pub fn compute(batch: &DashboardBatch) -> Self {
        let sessions = SessionSummary::from_rows(rows(&batch.website_analytics));
        let performance = MetricsAggregator::site_wide(rows(&batch.performance));
        let orders = OrderSummary::from_rows(rows(&batch.orders));
        let email = EmailSummary::from_rows(rows(&batch.email_campaigns));
        let social = SocialSummary::from_rows(rows(&batch.social_posts));

        ExecutiveKpis {
            total_visits: sessions.page_views,
            unique_visitors: sessions.unique_visitors,
            bounce_rate: round_to(sessions.bounce_rate, 1),
            conversion_rate: round_to(performance.conversion_rate, 2),
            total_revenue: orders.total_revenue,
            avg_order_value: orders.avg_order_value,
            new_leads: rows(&batch.leads).len(),
            total_orders: orders.orders,
            email_campaigns: email.campaigns,
            email_open_rate: round_to(email.open_rate, 1),
            social_posts: social.posts,
            social_engagement: social.total_engagement,
            content_scheduled: count_status(
                rows(&batch.content).iter().map(|c| c.status.as_deref()),
                &["scheduled"],
            ),
            active_campaigns: count_status(
                rows(&batch.campaigns).iter().map(|c| c.status.as_deref()),
                &["active", "draft"],
            ),
            website_pages: rows(&batch.website_pages).len(),
            seo_keywords: rows(&batch.seo_keywords).len(),
            products: rows(&batch.products).len(),
        }
    }
}

impl ModuleMetrics {
    /// Compute the per-module cards from one batch
    pub fn compute(batch: &DashboardBatch, low_stock_threshold: f64) -> Self {
        let campaigns = rows(&batch.campaigns);
        let campaign_status =
            |wanted: &[&str]| count_status(campaigns.iter().map(|c| c.status.as_deref()), wanted);

        let leads = rows(&batch.leads);
        let lead_status =
            |wanted: &[&str]| count_status(leads.iter().map(|l| l.status.as_deref()), wanted);

        let content = rows(&batch.content);
        let content_status =
            |wanted: &[&str]| count_status(content.iter().map(|c| c.status.as_deref()), wanted);

        let email = EmailSummary::from_rows(rows(&batch.email_campaigns));
        let social = SocialSummary::from_rows(rows(&batch.social_posts));
        let orders = OrderSummary::from_rows(rows(&batch.orders));
        let seo = SeoSummary::from_rows(rows(&batch.seo_keywords));
        let products = ProductSummary::from_rows(rows(&batch.products), low_stock_threshold);
        let pages = rows(&batch.website_pages);

        ModuleMetrics {
            campaigns: CampaignCard {
                active: campaign_status(&["active"]),
                paused: campaign_status(&["paused"]),
                draft: campaign_status(&["draft"]),
                total: campaigns.len(),
            },
            leads: LeadCard {
                total: leads.len(),
                new: lead_status(&["new"]),
                converted: lead_status(&["converted"]),
            },
            content: ContentCard {
                scheduled: content_status(&["scheduled"]),
                published: content_status(&["published"]),
            },
            email: EmailCard {
                campaigns: email.campaigns,
                open_rate: round_to(email.open_rate, 1),
            },
            social: SocialCard {
                posts: social.posts,
                engagement: social.total_engagement,
            },
            website: WebsiteCard {
                pages: pages.len(),
                views: pages.iter().map(|p| or_zero(p.page_views)).sum(),
            },
            ecommerce: EcommerceCard {
                orders: orders.orders,
                revenue: orders.total_revenue,
                products: products.products,
                low_stock: products.low_stock,
            },
            seo: SeoCard {
                keywords: seo.keywords,
                avg_rank: round_to(seo.avg_rank, 1),
            },
        }
    }
}
