//! Derived dashboard metrics and the activity feed.
//!
//! Everything here is a pure function of the assigned assets plus an
//! injectable jitter term; the web handlers roll the jitter and pass it
//! in, so renders are deterministic in tests. The formulas deliberately
//! keep the demo character of the product: metrics scale with how many
//! assets of the matching category a customer has been assigned.

use chrono::{DateTime, Utc};

use crate::records::{DataAsset, DataCategory};

/// Baselines the derived metrics grow from.
pub const REVENUE_PER_SALES_ASSET: f64 = 15_000.0;
pub const REVENUE_JITTER_SPAN: f64 = 10_000.0;
pub const BASE_USERS: f64 = 1_200.0;
pub const BASE_ORDERS: f64 = 300.0;
pub const BASE_CONVERSION: f64 = 85.0;

/// One render's worth of metric-card values.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSet {
    pub revenue: f64,
    pub users: i64,
    pub orders: i64,
    pub conversion: i64,
}

/// Derives the four metric cards from a customer's assigned assets.
/// `jitter` must be in `[0, 1)`; equal inputs yield equal outputs.
pub fn derive_metrics(assigned: &[&DataAsset], jitter: f64) -> MetricSet {
    let sales = count_in(assigned, DataCategory::Sales);
    let analytics = count_in(assigned, DataCategory::Analytics);

    MetricSet {
        revenue: sales as f64 * REVENUE_PER_SALES_ASSET + jitter * REVENUE_JITTER_SPAN,
        users: scaled_metric(BASE_USERS, analytics, jitter),
        orders: scaled_metric(BASE_ORDERS, sales, jitter),
        conversion: scaled_metric(BASE_CONVERSION, analytics, jitter),
    }
}

fn count_in(assigned: &[&DataAsset], category: DataCategory) -> usize {
    assigned.iter().filter(|a| a.category == category).count()
}

/// base * (1 + count/10 + jitter/5), floored.
fn scaled_metric(base: f64, count: usize, jitter: f64) -> i64 {
    (base * (1.0 + count as f64 * 0.1 + jitter * 0.2)).floor() as i64
}

/// One entry in the "recent activity" feed.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ActivityItem {
    pub title: String,
    pub description: String,
    pub time_label: String,
}

/// The five most recent assigned assets, newest first.
pub fn activity_feed(assigned: &[&DataAsset], now: DateTime<Utc>) -> Vec<ActivityItem> {
    let mut ordered: Vec<&&DataAsset> = assigned.iter().collect();
    ordered.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));

    ordered
        .into_iter()
        .take(5)
        .map(|asset| ActivityItem {
            title: format!("{} Updated", asset.name),
            description: asset.description.clone(),
            time_label: relative_time(asset.uploaded_at, now),
        })
        .collect()
}

/// "Just now" under an hour, then whole hours, then whole days.
pub fn relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let hours = (now - then).num_hours();
    if hours < 1 {
        return "Just now".to_string();
    }
    if hours < 24 {
        return format!("{hours} hours ago");
    }
    format!("{} days ago", hours / 24)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{AssetFormat, DataAsset};
    use chrono::Duration;
    use std::collections::BTreeSet;

    fn asset(name: &str, category: DataCategory, age_hours: i64) -> DataAsset {
        DataAsset {
            id: 0,
            name: name.to_string(),
            category,
            format: AssetFormat::Csv,
            description: format!("{name} description"),
            assigned_customers: BTreeSet::new(),
            uploaded_at: Utc::now() - Duration::hours(age_hours),
        }
    }

    #[test]
    fn test_metrics_are_deterministic_for_fixed_jitter() {
        let a = asset("Sales", DataCategory::Sales, 1);
        let b = asset("Traffic", DataCategory::Analytics, 2);
        let assigned = vec![&a, &b];

        let first = derive_metrics(&assigned, 0.5);
        let second = derive_metrics(&assigned, 0.5);
        assert_eq!(first, second);

        assert_eq!(first.revenue, 20_000.0);
        assert_eq!(first.users, (1200.0_f64 * 1.2).floor() as i64);
        assert_eq!(first.orders, (300.0_f64 * 1.2).floor() as i64);
        assert_eq!(first.conversion, (85.0_f64 * 1.2).floor() as i64);
    }

    #[test]
    fn test_metrics_scale_with_category_counts() {
        let s1 = asset("S1", DataCategory::Sales, 1);
        let s2 = asset("S2", DataCategory::Sales, 1);
        let m = asset("M", DataCategory::Marketing, 1);

        let one = derive_metrics(&[&s1], 0.0);
        let two = derive_metrics(&[&s1, &s2, &m], 0.0);
        assert!(two.revenue > one.revenue);
        assert!(two.orders > one.orders);
        // Marketing assets do not move the analytics-driven cards.
        assert_eq!(one.users, two.users);
    }

    #[test]
    fn test_activity_feed_is_recent_first_and_capped() {
        let assets: Vec<DataAsset> = (0..7)
            .map(|i| asset(&format!("Asset {i}"), DataCategory::Sales, i * 3))
            .collect();
        let refs: Vec<&DataAsset> = assets.iter().collect();

        let feed = activity_feed(&refs, Utc::now());
        assert_eq!(feed.len(), 5);
        assert_eq!(feed[0].title, "Asset 0 Updated");
        assert_eq!(feed[4].title, "Asset 4 Updated");
        assert_eq!(feed[0].time_label, "Just now");
    }

    #[test]
    fn test_relative_time_buckets() {
        let now = Utc::now();
        assert_eq!(relative_time(now - Duration::minutes(20), now), "Just now");
        assert_eq!(relative_time(now - Duration::hours(5), now), "5 hours ago");
        assert_eq!(relative_time(now - Duration::hours(23), now), "23 hours ago");
        assert_eq!(relative_time(now - Duration::hours(49), now), "2 days ago");
    }
}
