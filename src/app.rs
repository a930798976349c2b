#![cfg(feature = "web")]

//! Application state and router.
//!
//! One [`Workspace`] behind an async mutex serves every request, so each
//! user action runs its whole load-mutate-save sequence without
//! interleaving. Handlers live in [`crate::admin`] and [`crate::customer`];
//! this module owns the wiring, the session cookies, and the small shared
//! helpers both portals use.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use handlebars::Handlebars;
use serde::Serialize;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir};

use crate::auth::{AdminAccount, SessionStore, SessionUser};
use crate::drive::{DriveClient, RemoteStore};
use crate::settings::Settings;
use crate::views::{self, LandingView, StorageBanner};
use crate::workspace::Workspace;

pub const ADMIN_COOKIE: &str = "admin_session";
pub const PORTAL_COOKIE: &str = "portal_session";

pub struct AppState {
    pub settings: Settings,
    pub workspace: tokio::sync::Mutex<Workspace<DriveClient>>,
    pub sessions: SessionStore,
    pub admin: AdminAccount,
    pub templates: Handlebars<'static>,
}

pub type SharedState = Arc<AppState>;

pub async fn run(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let remote = if settings.drive.enabled {
        Some(DriveClient::new(&settings.drive))
    } else {
        None
    };
    let workspace = Workspace::open(&settings, remote).await;
    log::info!("storage: {}", workspace.status().describe());

    let admin = AdminAccount::from_settings(&settings.admin)?;
    let templates = views::registry()?;
    let bind = settings.bind.clone();

    let state = Arc::new(AppState {
        settings,
        workspace: tokio::sync::Mutex::new(workspace),
        sessions: SessionStore::new(),
        admin,
        templates,
    });

    let app = router(state);

    let listener = TcpListener::bind(&bind).await?;
    log::info!("listening on http://{bind}");
    if let Ok(ip) = local_ip_address::local_ip() {
        let port = bind.rsplit(':').next().unwrap_or("3000");
        log::info!("reachable on the local network at http://{ip}:{port}");
    }
    axum::serve(listener, app).await?;

    Ok(())
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(landing))
        .route("/insight-hub", get(crate::customer::login_page))
        .route("/insight-hub/login", post(crate::customer::login))
        .route("/portal", get(crate::customer::portal))
        .route("/portal/export.csv", get(crate::customer::export_csv))
        .route("/portal/report.png", get(crate::customer::report_png))
        .route("/portal/logout", post(crate::customer::logout))
        .route(
            "/admin/login",
            get(crate::admin::login_page).post(crate::admin::login),
        )
        .route("/admin", get(crate::admin::panel))
        .route("/admin/logout", post(crate::admin::logout))
        .route("/admin/customers", post(crate::admin::add_customer))
        .route("/admin/customers/:id", post(crate::admin::update_customer))
        .route(
            "/admin/customers/:id/delete",
            post(crate::admin::delete_customer),
        )
        .route("/admin/data", post(crate::admin::upload_asset))
        .route("/admin/data/:id/delete", post(crate::admin::delete_asset))
        .route("/admin/data/:id/assign", post(crate::admin::assign_asset))
        .route("/admin/data/:id/unassign", post(crate::admin::unassign_asset))
        .route("/admin/export/:file", get(crate::admin::export))
        .route("/api/status", get(api_status))
        .nest_service("/static", ServeDir::new("static"))
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
        .with_state(state)
}

async fn landing(State(state): State<SharedState>) -> Response {
    render(
        &state,
        "landing",
        &LandingView {
            app_name: state.settings.app_name.clone(),
            version: state.settings.version.clone(),
        },
    )
}

#[derive(Serialize)]
struct StatusBody {
    app: String,
    version: String,
    storage: &'static str,
    detail: String,
    folder: String,
    customers: usize,
    assets: usize,
}

async fn api_status(State(state): State<SharedState>) -> Json<StatusBody> {
    let ws = state.workspace.lock().await;
    Json(StatusBody {
        app: state.settings.app_name.clone(),
        version: state.settings.version.clone(),
        storage: if ws.status().is_connected() {
            "remote"
        } else {
            "local"
        },
        detail: ws.status().describe(),
        folder: ws.folder_name().to_string(),
        customers: ws.customers.len(),
        assets: ws.assets.len(),
    })
}

/// Renders a registered template, or a bare 500 if rendering fails. A
/// render failure is a programming error (view model out of step with its
/// template), so there is nothing friendlier to show.
pub fn render<T: Serialize>(state: &AppState, name: &str, view: &T) -> Response {
    match state.templates.render(name, view) {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            log::error!("template '{name}' failed to render: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "template error").into_response()
        }
    }
}

/// Post-redirect-get notice: the message travels in the query string and
/// the next page render turns it into a banner.
pub fn notice_location(path: &str, message: &str, kind: &str) -> String {
    let sep = if path.contains('?') { '&' } else { '?' };
    format!(
        "{path}{sep}message={}&kind={kind}",
        urlencoding::encode(message)
    )
}

pub fn notice_redirect(path: &str, message: &str, kind: &str) -> Redirect {
    Redirect::to(&notice_location(path, message, kind))
}

pub fn session_cookie(name: &'static str, value: String) -> Cookie<'static> {
    let mut cookie = Cookie::new(name, value);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_max_age(time::Duration::hours(24));
    cookie
}

pub fn expired_cookie(name: &'static str) -> Cookie<'static> {
    let mut cookie = Cookie::new(name, "");
    cookie.set_path("/");
    cookie.set_max_age(time::Duration::ZERO);
    cookie
}

/// Resolves the admin session or redirects to the admin sign-in page.
pub fn require_admin(state: &AppState, jar: &CookieJar) -> Result<String, Redirect> {
    match jar
        .get(ADMIN_COOKIE)
        .and_then(|c| state.sessions.validate(c.value()))
    {
        Some(SessionUser::Admin { username }) => Ok(username),
        _ => Err(Redirect::to("/admin/login")),
    }
}

/// Resolves the customer session or redirects to the Insight Hub sign-in.
pub fn require_customer(state: &AppState, jar: &CookieJar) -> Result<(i64, String), Redirect> {
    match jar
        .get(PORTAL_COOKIE)
        .and_then(|c| state.sessions.validate(c.value()))
    {
        Some(SessionUser::Customer { id, username }) => Ok((id, username)),
        _ => Err(Redirect::to("/insight-hub")),
    }
}

pub fn storage_banner<R: RemoteStore>(ws: &Workspace<R>) -> StorageBanner {
    StorageBanner {
        connected: ws.status().is_connected(),
        message: ws.status().describe(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_location_encodes_message() {
        assert_eq!(
            notice_location("/admin", "Customer added", "success"),
            "/admin?message=Customer%20added&kind=success",
        );
        assert_eq!(
            notice_location("/admin?section=data", "gone", "error"),
            "/admin?section=data&message=gone&kind=error",
        );
    }

    #[test]
    fn test_session_cookie_shape() {
        let cookie = session_cookie(ADMIN_COOKIE, "abc".into());
        assert_eq!(cookie.name(), "admin_session");
        assert!(cookie.http_only().unwrap_or(false));
        assert_eq!(cookie.max_age(), Some(time::Duration::hours(24)));

        let gone = expired_cookie(PORTAL_COOKIE);
        assert_eq!(gone.max_age(), Some(time::Duration::ZERO));
    }
}
