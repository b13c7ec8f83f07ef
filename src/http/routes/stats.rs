//! Admin statistics
//!
//! Aggregate read endpoints for the back-office dashboard: tool usage, search
//! analytics, Stripe revenue bucketing, and the headline counters.

use std::collections::{BTreeSet, HashMap};

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::constants::analytics::{AI_TOOL_NAMES, DEFAULT_PERIOD_DAYS, TOP_LIMIT};
use crate::constants::billing::MAX_REVENUE_MONTHS;
use crate::http::AppState;
use crate::http::error::ApiResult;
use crate::http::session::AdminUser;
use crate::types::ScribeError;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/overview", get(overview))
        .route("/searches", get(searches))
        .route("/stripe-revenue", get(stripe_revenue))
        .route("/dashboard", get(dashboard))
}

/// "7d" | "30d" | "90d" -> days, defaulting to 30
pub(crate) fn period_days(period: &str) -> i64 {
    match period {
        "7d" => 7,
        "90d" => 90,
        _ => DEFAULT_PERIOD_DAYS,
    }
}

#[derive(Debug, Deserialize)]
struct PeriodQuery {
    #[serde(default = "default_period")]
    period: String,
    limit: Option<usize>,
}

fn default_period() -> String {
    "30d".to_string()
}

async fn overview(_admin: AdminUser, State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let since = Utc::now() - Duration::days(DEFAULT_PERIOD_DAYS);

    let tools_usage = state.db.top_tools(since, TOP_LIMIT)?;
    let top_searches = state.db.top_searches(since, TOP_LIMIT)?;

    // Static placeholder block until revenue wiring replaces it; the real
    // numbers live under /stripe-revenue
    let revenue = json!({
        "total": 1250,
        "currency": "usd",
        "monthly": [
            { "month": "1/2025", "value": 200 },
            { "month": "2/2025", "value": 350 },
            { "month": "3/2025", "value": 700 },
        ],
    });

    Ok(Json(json!({
        "success": true,
        "toolsUsage": tools_usage,
        "topSearches": top_searches,
        "revenue": revenue,
    })))
}

async fn searches(
    _admin: AdminUser,
    State(state): State<AppState>,
    Query(query): Query<PeriodQuery>,
) -> ApiResult<Json<Value>> {
    let since = Utc::now() - Duration::days(period_days(&query.period));
    let limit = query.limit.unwrap_or(20);

    let top_searches = state.db.top_searches(since, limit)?;
    let by_tool = state.db.searches_by_tool(since)?;
    let trend = state.db.search_trend(since)?;

    Ok(Json(json!({
        "success": true,
        "period": query.period,
        "topSearches": top_searches,
        "searchesByTool": by_tool,
        "searchTrend": trend,
    })))
}

// =============================================================================
// Stripe revenue
// =============================================================================

#[derive(Debug, Deserialize)]
struct RevenueQuery {
    months: Option<u32>,
    currency: Option<String>,
    metric: Option<String>,
}

/// One UTC month of revenue, per currency in minor units
struct MonthBucket {
    key: String,
    label: String,
    amounts: HashMap<String, i64>,
}

fn month_key(year: i32, month: u32) -> String {
    format!("{:04}-{:02}", year, month)
}

fn month_label(year: i32, month: u32) -> String {
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|d| d.format("%b %Y").to_string())
        .unwrap_or_else(|| month_key(year, month))
}

fn step_back(year: i32, month: u32, steps: u32) -> (i32, u32) {
    let total = year * 12 + month as i32 - 1 - steps as i32;
    (total.div_euclid(12), (total.rem_euclid(12) + 1) as u32)
}

/// Month buckets ending at the current UTC month, oldest first, plus the
/// epoch second the oldest bucket starts at.
fn build_buckets(months: u32, now: DateTime<Utc>) -> (Vec<MonthBucket>, i64) {
    let (year, month) = (now.year(), now.month());

    let mut buckets = Vec::with_capacity(months as usize);
    for i in (0..months).rev() {
        let (y, m) = step_back(year, month, i);
        buckets.push(MonthBucket {
            key: month_key(y, m),
            label: month_label(y, m),
            amounts: HashMap::new(),
        });
    }

    let (first_year, first_month) = step_back(year, month, months - 1);
    let since = Utc
        .with_ymd_and_hms(first_year, first_month, 1, 0, 0, 0)
        .single()
        .map(|d| d.timestamp())
        .unwrap_or_default();

    (buckets, since)
}

fn add_amount(buckets: &mut [MonthBucket], unix: i64, minor: i64, currency: &str) {
    if minor == 0 || currency.is_empty() {
        return;
    }
    let Some(at) = DateTime::<Utc>::from_timestamp(unix, 0) else {
        return;
    };
    let key = month_key(at.year(), at.month());
    if let Some(bucket) = buckets.iter_mut().find(|b| b.key == key) {
        *bucket.amounts.entry(currency.to_string()).or_insert(0) += minor;
    }
}

async fn stripe_revenue(
    _admin: AdminUser,
    State(state): State<AppState>,
    Query(query): Query<RevenueQuery>,
) -> ApiResult<Json<Value>> {
    let Some(stripe) = state.stripe.as_deref() else {
        return Err(ScribeError::Payment("Stripe not configured".to_string()).into());
    };

    let months = query.months.unwrap_or(12).clamp(1, MAX_REVENUE_MONTHS);
    let currency = query
        .currency
        .unwrap_or_else(|| "usd".to_string())
        .to_lowercase();
    let metric = query
        .metric
        .unwrap_or_else(|| "gross".to_string())
        .to_lowercase();

    let (mut buckets, since_epoch) = build_buckets(months, Utc::now());

    if metric == "net" {
        // Net revenue (fees and refunds accounted) from balance transactions
        for txn in stripe.list_balance_transactions(since_epoch).await? {
            add_amount(&mut buckets, txn.created, txn.net, &txn.currency);
        }
    } else {
        // Gross revenue: succeeded charges minus refunds
        for charge in stripe.list_charges(since_epoch).await? {
            if charge.status == "succeeded" && charge.paid {
                let minor = charge.amount - charge.amount_refunded;
                if minor > 0 {
                    add_amount(&mut buckets, charge.created, minor, &charge.currency);
                }
            }
        }
    }

    if currency == "all" {
        let currencies: BTreeSet<String> = buckets
            .iter()
            .flat_map(|b| b.amounts.keys().cloned())
            .collect();

        let mut totals = Map::new();
        for c in &currencies {
            let minor: i64 = buckets.iter().map(|b| b.amounts.get(c).copied().unwrap_or(0)).sum();
            totals.insert(c.to_uppercase(), json!(minor as f64 / 100.0));
        }

        let monthly: Vec<Value> = buckets
            .iter()
            .map(|b| {
                let mut row = Map::new();
                row.insert("month".to_string(), json!(b.label));
                for c in &currencies {
                    let minor = b.amounts.get(c).copied().unwrap_or(0);
                    row.insert(c.to_uppercase(), json!(minor as f64 / 100.0));
                }
                Value::Object(row)
            })
            .collect();

        return Ok(Json(json!({
            "success": true,
            "currency": "ALL",
            "totals": totals,
            "monthlyByCurrency": monthly,
            "metric": metric,
        })));
    }

    let total_minor: i64 = buckets
        .iter()
        .map(|b| b.amounts.get(&currency).copied().unwrap_or(0))
        .sum();
    let monthly: Vec<Value> = buckets
        .iter()
        .map(|b| {
            let minor = b.amounts.get(&currency).copied().unwrap_or(0);
            json!({ "month": b.label, "value": minor as f64 / 100.0 })
        })
        .collect();

    Ok(Json(json!({
        "success": true,
        "currency": currency.to_uppercase(),
        "total": total_minor as f64 / 100.0,
        "monthly": monthly,
        "metric": metric,
    })))
}

// =============================================================================
// Dashboard
// =============================================================================

/// Headline counters. Deliberately session-gate-free: the original exposed
/// this route without the admin check, and the UI relies on that.
async fn dashboard(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let now = Utc::now();
    let start_of_month = Utc
        .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now);
    let start_of_today = Utc
        .with_ymd_and_hms(now.year(), now.month(), now.day(), 0, 0, 0)
        .single()
        .unwrap_or(now);

    let total_users = state.db.count_users()?;
    let active_users = state.db.count_active_users(start_of_month)?;
    let premium_users = state.db.count_premium_variants()?;
    let total_ai_requests = state.db.count_tool_events(AI_TOOL_NAMES, None)?;
    let today_requests = state
        .db
        .count_tool_events(AI_TOOL_NAMES, Some(start_of_today))?;
    let searches_this_month = state.db.count_searches_since(start_of_month)?;
    let content_generated = state.db.count_tool_events(&["Content Gen"], None)?;

    let percentage = |part: i64| {
        if total_users > 0 {
            ((part as f64 / total_users as f64) * 100.0).round() as i64
        } else {
            0
        }
    };

    Ok(Json(json!({
        "success": true,
        "stats": {
            "totalUsers": total_users,
            "activeUsers": active_users,
            "premiumUsers": premium_users,
            "totalAiRequests": total_ai_requests,
            "todayRequests": today_requests,
            "searchesThisMonth": searches_this_month,
            "contentGenerated": content_generated,
            "averageSessionTime": 0,
            "activeUserPercentage": percentage(active_users),
            "premiumPercentage": percentage(premium_users),
        },
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_days() {
        assert_eq!(period_days("7d"), 7);
        assert_eq!(period_days("30d"), 30);
        assert_eq!(period_days("90d"), 90);
        assert_eq!(period_days("anything"), 30);
    }

    #[test]
    fn test_step_back_crosses_year_boundary() {
        assert_eq!(step_back(2025, 2, 0), (2025, 2));
        assert_eq!(step_back(2025, 2, 1), (2025, 1));
        assert_eq!(step_back(2025, 2, 2), (2024, 12));
        assert_eq!(step_back(2025, 2, 14), (2023, 12));
    }

    #[test]
    fn test_build_buckets_shape() {
        let now = Utc.with_ymd_and_hms(2025, 3, 15, 12, 0, 0).unwrap();
        let (buckets, since) = build_buckets(3, now);

        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets[0].key, "2025-01");
        assert_eq!(buckets[2].key, "2025-03");
        assert_eq!(buckets[0].label, "Jan 2025");
        assert_eq!(
            since,
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap().timestamp()
        );
    }

    #[test]
    fn test_add_amount_buckets_by_month() {
        let now = Utc.with_ymd_and_hms(2025, 3, 15, 12, 0, 0).unwrap();
        let (mut buckets, _) = build_buckets(3, now);

        let in_feb = Utc.with_ymd_and_hms(2025, 2, 10, 0, 0, 0).unwrap().timestamp();
        add_amount(&mut buckets, in_feb, 500, "usd");
        add_amount(&mut buckets, in_feb, 250, "usd");
        // Outside the window: dropped
        let in_dec = Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap().timestamp();
        add_amount(&mut buckets, in_dec, 999, "usd");

        assert_eq!(buckets[1].amounts.get("usd").copied(), Some(750));
        assert!(buckets[0].amounts.is_empty());
    }
}
