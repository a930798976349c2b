#![cfg(feature = "web")]

//! Insight Hub handlers: customer sign-in and the dashboard it unlocks.
//! The dashboard page is fully rendered on the server, charts included,
//! and a meta refresh re-requests it on the configured interval.

use axum::{
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use rand::Rng;
use serde::Deserialize;

use crate::app::{
    self, PORTAL_COOKIE, SharedState, notice_redirect, render, require_customer, storage_banner,
};
use crate::auth::{self, SessionUser};
use crate::charts::{self, PieKind, TrendKind};
use crate::dashboard;
use crate::export;
use crate::report;
use crate::views::{
    self, AssetRow, KindOption, LoginView, MetricCards, Notice, PortalView,
};

#[derive(Deserialize)]
pub struct NoticeQuery {
    message: Option<String>,
    kind: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginForm {
    username: String,
    password: String,
}

pub async fn login_page(
    State(state): State<SharedState>,
    Query(query): Query<NoticeQuery>,
) -> Response {
    render(
        &state,
        "insight_hub",
        &LoginView {
            app_name: state.settings.app_name.clone(),
            notice: Notice::from_query(query.message, query.kind),
        },
    )
}

pub async fn login(
    State(state): State<SharedState>,
    jar: CookieJar,
    axum::Form(form): axum::Form<LoginForm>,
) -> Response {
    let mut ws = state.workspace.lock().await;
    let Some(user) = auth::verify_customer_login(&ws.customers, &form.username, &form.password)
    else {
        log::warn!("rejected portal sign-in for '{}'", form.username);
        return notice_redirect(
            "/insight-hub",
            "Invalid username or password, or the account is inactive",
            "error",
        )
        .into_response();
    };

    if let SessionUser::Customer { id, .. } = &user {
        ws.record_login(*id).await;
    }
    drop(ws);

    let session_id = state.sessions.create(user);
    let jar = jar.add(app::session_cookie(PORTAL_COOKIE, session_id));
    (jar, Redirect::to("/portal")).into_response()
}

pub async fn logout(State(state): State<SharedState>, jar: CookieJar) -> Response {
    if let Some(cookie) = jar.get(PORTAL_COOKIE) {
        state.sessions.remove(cookie.value());
    }
    let jar = jar.add(app::expired_cookie(PORTAL_COOKIE));
    (jar, Redirect::to("/")).into_response()
}

#[derive(Deserialize)]
pub struct PortalQuery {
    chart: Option<String>,
    pie: Option<String>,
    message: Option<String>,
    kind: Option<String>,
}

pub async fn portal(
    State(state): State<SharedState>,
    jar: CookieJar,
    Query(query): Query<PortalQuery>,
) -> Response {
    let (customer_id, _) = match require_customer(&state, &jar) {
        Ok(user) => user,
        Err(redirect) => return redirect.into_response(),
    };

    let mut ws = state.workspace.lock().await;
    // The periodic page refresh doubles as the data refresh.
    ws.refresh_assets().await;

    let Some(record) = ws.customers.find(customer_id) else {
        drop(ws);
        let jar = jar.add(app::expired_cookie(PORTAL_COOKIE));
        return (
            jar,
            notice_redirect("/insight-hub", "Your account is no longer available", "error"),
        )
            .into_response();
    };

    let trend_kind = query
        .chart
        .as_deref()
        .and_then(TrendKind::parse)
        .unwrap_or(TrendKind::Revenue);
    let pie_kind = query
        .pie
        .as_deref()
        .and_then(PieKind::parse)
        .unwrap_or(PieKind::Traffic);

    let mut rng = rand::thread_rng();
    let trend_jitter: [f64; 6] = rng.r#gen();
    let pie_jitter: [f64; 4] = rng.r#gen();
    let metric_jitter: f64 = rng.r#gen();

    let now = Utc::now();
    let assigned = ws.assets.assigned_to(customer_id);
    let metrics = dashboard::derive_metrics(&assigned, metric_jitter);
    let points = charts::trend_points(trend_kind, &trend_jitter);
    let slices = charts::pie_slices(pie_kind, &pie_jitter);

    let view = PortalView {
        app_name: state.settings.app_name.clone(),
        customer_name: record.name.clone(),
        company: record.company.clone(),
        industry: record.industry.clone(),
        status: record.status.as_str().to_string(),
        storage: storage_banner(&ws),
        notice: Notice::from_query(query.message, query.kind),
        refresh_secs: state.settings.refresh_secs,
        metrics: MetricCards {
            revenue: views::format_money(metrics.revenue),
            users: views::format_count(metrics.users),
            orders: views::format_count(metrics.orders),
            conversion: metrics.conversion.to_string(),
        },
        trend_title: trend_kind.title().to_string(),
        trend_svg: charts::trend_svg(&points),
        trend_options: trend_kind_options(trend_kind),
        pie_title: pie_kind.title().to_string(),
        pie_svg: charts::pie_svg(&slices),
        pie_legend: slices,
        pie_options: pie_kind_options(pie_kind),
        activity: dashboard::activity_feed(&assigned, now),
        assets: assigned
            .iter()
            .map(|asset| AssetRow::from_asset(asset, ws.customers.records(), now))
            .collect(),
    };
    drop(ws);

    render(&state, "portal", &view)
}

fn trend_kind_options(selected: TrendKind) -> Vec<KindOption> {
    TrendKind::ALL
        .iter()
        .map(|kind| KindOption {
            value: kind.as_str().to_string(),
            title: kind.title().to_string(),
            selected: *kind == selected,
        })
        .collect()
}

fn pie_kind_options(selected: PieKind) -> Vec<KindOption> {
    PieKind::ALL
        .iter()
        .map(|kind| KindOption {
            value: kind.as_str().to_string(),
            title: kind.title().to_string(),
            selected: *kind == selected,
        })
        .collect()
}

/// Downloads the signed-in customer's assigned assets as CSV.
pub async fn export_csv(State(state): State<SharedState>, jar: CookieJar) -> Response {
    let (customer_id, _) = match require_customer(&state, &jar) {
        Ok(user) => user,
        Err(redirect) => return redirect.into_response(),
    };

    let ws = state.workspace.lock().await;
    let body = export::assets_to_csv(&ws.assets.assigned_to(customer_id));
    (
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"my-data.csv\"".to_string(),
            ),
        ],
        body,
    )
        .into_response()
}

#[derive(Deserialize)]
pub struct ReportQuery {
    chart: Option<String>,
}

/// Renders the current trend chart as a PNG download.
pub async fn report_png(
    State(state): State<SharedState>,
    jar: CookieJar,
    Query(query): Query<ReportQuery>,
) -> Response {
    if let Err(redirect) = require_customer(&state, &jar) {
        return redirect.into_response();
    }

    let kind = query
        .chart
        .as_deref()
        .and_then(TrendKind::parse)
        .unwrap_or(TrendKind::Revenue);

    let jitter: [f64; 6] = rand::thread_rng().r#gen();
    let points = charts::trend_points(kind, &jitter);

    match report::trend_report_png(kind, &points) {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, "image/png".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}-trend.png\"", kind.as_str()),
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => {
            log::error!("chart report failed: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
