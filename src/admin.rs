#![cfg(feature = "web")]

//! Admin portal handlers: sign-in, the customers and data sections, and
//! the category exports. Every mutation ends in a redirect back to the
//! panel carrying a notice, so refreshing the page never replays a form.

use std::collections::BTreeSet;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::header,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use serde::Deserialize;

use crate::app::{
    self, ADMIN_COOKIE, SharedState, notice_redirect, render, require_admin, storage_banner,
};
use crate::auth::{self, AuthError, SessionUser};
use crate::export;
use crate::records::{AssetFormat, CustomerRecord, CustomerStatus, DataAsset, DataCategory, Plan};
use crate::views::{AdminView, AssetRow, CategoryTab, CustomerRow, LoginView, Notice, RemoteFileRow};

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
        "admin_login",
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
    if !state.admin.verify(&form.username, &form.password) {
        log::warn!("rejected admin sign-in for '{}'", form.username);
        return notice_redirect("/admin/login", "Invalid username or password", "error")
            .into_response();
    }

    let session_id = state.sessions.create(SessionUser::Admin {
        username: form.username,
    });
    let jar = jar.add(app::session_cookie(ADMIN_COOKIE, session_id));
    (jar, Redirect::to("/admin")).into_response()
}

pub async fn logout(State(state): State<SharedState>, jar: CookieJar) -> Response {
    if let Some(cookie) = jar.get(ADMIN_COOKIE) {
        state.sessions.remove(cookie.value());
    }
    let jar = jar.add(app::expired_cookie(ADMIN_COOKIE));
    (jar, Redirect::to("/")).into_response()
}

#[derive(Deserialize)]
pub struct PanelQuery {
    section: Option<String>,
    category: Option<String>,
    message: Option<String>,
    kind: Option<String>,
}

pub async fn panel(
    State(state): State<SharedState>,
    jar: CookieJar,
    Query(query): Query<PanelQuery>,
) -> Response {
    let admin_user = match require_admin(&state, &jar) {
        Ok(username) => username,
        Err(redirect) => return redirect.into_response(),
    };

    let mut ws = state.workspace.lock().await;
    // Pick up edits made by another instance sharing the same folder.
    ws.refresh_customers().await;
    ws.refresh_assets().await;

    let now = Utc::now();
    let section_data = query.section.as_deref() == Some("data");
    let active_category = query
        .category
        .as_deref()
        .and_then(DataCategory::parse)
        .unwrap_or(DataCategory::Sales);

    let customers: Vec<CustomerRow> = ws
        .customers
        .iter()
        .map(|record| CustomerRow::from_record(record, now))
        .collect();

    let category_tabs: Vec<CategoryTab> = DataCategory::ALL
        .iter()
        .map(|category| CategoryTab {
            name: category.as_str().to_string(),
            active: *category == active_category,
            assets: ws
                .assets
                .in_category(*category)
                .into_iter()
                .map(|asset| AssetRow::from_asset(asset, ws.customers.records(), now))
                .collect(),
        })
        .collect();

    let remote_files: Vec<RemoteFileRow> = if section_data && ws.status().is_connected() {
        ws.remote_files()
            .await
            .iter()
            .map(RemoteFileRow::from_file)
            .collect()
    } else {
        Vec::new()
    };

    let view = AdminView {
        app_name: state.settings.app_name.clone(),
        admin_user,
        section_customers: !section_data,
        section_data,
        storage: storage_banner(&ws),
        notice: Notice::from_query(query.message, query.kind),
        customer_count: customers.len(),
        customers,
        category_tabs,
        active_category: active_category.as_str().to_string(),
        remote_files,
    };
    drop(ws);

    render(&state, "admin", &view)
}

#[derive(Deserialize)]
pub struct CustomerForm {
    name: String,
    #[serde(default)]
    company: String,
    #[serde(default)]
    contact: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    phone: String,
    #[serde(default)]
    plan: String,
    #[serde(default)]
    industry: String,
    username: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    notes: String,
}

/// Builds a record from the submitted form. A blank password yields a
/// blank hash, which `Workspace::update_customer` reads as "keep the old
/// one" and the login path reads as "cannot sign in".
fn record_from_form(form: CustomerForm) -> Result<CustomerRecord, AuthError> {
    let password_hash = if form.password.is_empty() {
        String::new()
    } else {
        auth::hash_password(&form.password)?
    };

    Ok(CustomerRecord {
        id: 0,
        name: form.name,
        contact: form.contact,
        title: form.title,
        email: form.email,
        phone: form.phone,
        company: form.company,
        plan: Plan::parse(&form.plan).unwrap_or(Plan::Starter),
        industry: form.industry,
        username: form.username,
        password_hash,
        status: CustomerStatus::parse(&form.status).unwrap_or(CustomerStatus::Active),
        notes: form.notes,
        last_login: None,
        created_at: Utc::now(),
        updated_at: None,
    })
}

const CUSTOMERS_SECTION: &str = "/admin?section=customers";
const DATA_SECTION: &str = "/admin?section=data";

pub async fn add_customer(
    State(state): State<SharedState>,
    jar: CookieJar,
    axum::Form(form): axum::Form<CustomerForm>,
) -> Response {
    if let Err(redirect) = require_admin(&state, &jar) {
        return redirect.into_response();
    }

    let record = match record_from_form(form) {
        Ok(record) => record,
        Err(e) => return notice_redirect(CUSTOMERS_SECTION, &e.to_string(), "error").into_response(),
    };

    let mut ws = state.workspace.lock().await;
    match ws.add_customer(record).await {
        Ok(id) => {
            log::info!("admin created customer {id}");
            notice_redirect(CUSTOMERS_SECTION, "Customer added", "success").into_response()
        }
        Err(e) => notice_redirect(CUSTOMERS_SECTION, &e.to_string(), "error").into_response(),
    }
}

pub async fn update_customer(
    State(state): State<SharedState>,
    jar: CookieJar,
    Path(id): Path<i64>,
    axum::Form(form): axum::Form<CustomerForm>,
) -> Response {
    if let Err(redirect) = require_admin(&state, &jar) {
        return redirect.into_response();
    }

    let record = match record_from_form(form) {
        Ok(record) => record,
        Err(e) => return notice_redirect(CUSTOMERS_SECTION, &e.to_string(), "error").into_response(),
    };

    let mut ws = state.workspace.lock().await;
    match ws.update_customer(id, record).await {
        Ok(()) => notice_redirect(CUSTOMERS_SECTION, "Customer updated", "success").into_response(),
        Err(e) => notice_redirect(CUSTOMERS_SECTION, &e.to_string(), "error").into_response(),
    }
}

pub async fn delete_customer(
    State(state): State<SharedState>,
    jar: CookieJar,
    Path(id): Path<i64>,
) -> Response {
    if let Err(redirect) = require_admin(&state, &jar) {
        return redirect.into_response();
    }

    let mut ws = state.workspace.lock().await;
    match ws.delete_customer(id).await {
        Ok(removed) => {
            log::info!("admin deleted customer {} ('{}')", removed.id, removed.name);
            notice_redirect(CUSTOMERS_SECTION, "Customer deleted", "success").into_response()
        }
        Err(e) => notice_redirect(CUSTOMERS_SECTION, &e.to_string(), "error").into_response(),
    }
}

pub async fn upload_asset(
    State(state): State<SharedState>,
    jar: CookieJar,
    mut multipart: Multipart,
) -> Response {
    if let Err(redirect) = require_admin(&state, &jar) {
        return redirect.into_response();
    }

    let mut name = String::new();
    let mut category = String::new();
    let mut format = String::new();
    let mut description = String::new();
    let mut assign = String::new();
    let mut raw: Option<Vec<u8>> = None;

    while let Some(field) = multipart.next_field().await.unwrap_or(None) {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "name" => name = field.text().await.unwrap_or_default(),
            "category" => category = field.text().await.unwrap_or_default(),
            "format" => format = field.text().await.unwrap_or_default(),
            "description" => description = field.text().await.unwrap_or_default(),
            "assign" => assign = field.text().await.unwrap_or_default(),
            "file" => {
                let bytes = field.bytes().await.unwrap_or_default();
                if !bytes.is_empty() {
                    raw = Some(bytes.to_vec());
                }
            }
            _ => {}
        }
    }

    if name.is_empty() {
        return notice_redirect(DATA_SECTION, "Asset name is required", "error").into_response();
    }

    let mut ws = state.workspace.lock().await;
    let assigned_customers: BTreeSet<i64> = if assign == "all" {
        ws.customers.active_ids().into_iter().collect()
    } else {
        BTreeSet::new()
    };

    let asset = DataAsset {
        id: 0,
        name,
        category: DataCategory::parse(&category).unwrap_or(DataCategory::Sales),
        format: AssetFormat::parse(&format).unwrap_or(AssetFormat::Csv),
        description,
        assigned_customers,
        uploaded_at: Utc::now(),
    };

    match ws.upload_asset(asset, raw).await {
        Ok(id) => {
            log::info!("admin uploaded data asset {id}");
            notice_redirect(DATA_SECTION, "Data asset uploaded", "success").into_response()
        }
        Err(e) => notice_redirect(DATA_SECTION, &e.to_string(), "error").into_response(),
    }
}

pub async fn delete_asset(
    State(state): State<SharedState>,
    jar: CookieJar,
    Path(id): Path<i64>,
) -> Response {
    if let Err(redirect) = require_admin(&state, &jar) {
        return redirect.into_response();
    }

    let mut ws = state.workspace.lock().await;
    match ws.delete_asset(id).await {
        Ok(removed) => {
            log::info!("admin deleted data asset {} ('{}')", removed.id, removed.name);
            notice_redirect(DATA_SECTION, "Data asset deleted", "success").into_response()
        }
        Err(e) => notice_redirect(DATA_SECTION, &e.to_string(), "error").into_response(),
    }
}

#[derive(Deserialize)]
pub struct AssignForm {
    customer_id: i64,
}

pub async fn assign_asset(
    State(state): State<SharedState>,
    jar: CookieJar,
    Path(id): Path<i64>,
    axum::Form(form): axum::Form<AssignForm>,
) -> Response {
    if let Err(redirect) = require_admin(&state, &jar) {
        return redirect.into_response();
    }

    let mut ws = state.workspace.lock().await;
    match ws.assign_asset(id, form.customer_id).await {
        Ok(()) => notice_redirect(DATA_SECTION, "Customer assigned", "success").into_response(),
        Err(e) => notice_redirect(DATA_SECTION, &e.to_string(), "error").into_response(),
    }
}

pub async fn unassign_asset(
    State(state): State<SharedState>,
    jar: CookieJar,
    Path(id): Path<i64>,
    axum::Form(form): axum::Form<AssignForm>,
) -> Response {
    if let Err(redirect) = require_admin(&state, &jar) {
        return redirect.into_response();
    }

    let mut ws = state.workspace.lock().await;
    match ws.unassign_asset(id, form.customer_id).await {
        Ok(()) => notice_redirect(DATA_SECTION, "Customer unassigned", "success").into_response(),
        Err(e) => notice_redirect(DATA_SECTION, &e.to_string(), "error").into_response(),
    }
}

/// `/admin/export/sales.csv` style downloads. The path carries both the
/// category and the format.
pub async fn export(
    State(state): State<SharedState>,
    jar: CookieJar,
    Path(file): Path<String>,
) -> Response {
    if let Err(redirect) = require_admin(&state, &jar) {
        return redirect.into_response();
    }

    let Some((category_name, extension)) = file.rsplit_once('.') else {
        return axum::http::StatusCode::NOT_FOUND.into_response();
    };
    let Some(category) = DataCategory::parse(category_name) else {
        return axum::http::StatusCode::NOT_FOUND.into_response();
    };

    let ws = state.workspace.lock().await;
    let assets = ws.assets.in_category(category);

    match extension {
        "csv" => {
            let body = export::assets_to_csv(&assets);
            (
                [
                    (header::CONTENT_TYPE, "text/csv".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{category_name}.csv\""),
                    ),
                ],
                body,
            )
                .into_response()
        }
        "xlsx" => match export::assets_to_xlsx(&assets) {
            Ok(bytes) => (
                [
                    (
                        header::CONTENT_TYPE,
                        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
                            .to_string(),
                    ),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{category_name}.xlsx\""),
                    ),
                ],
                bytes,
            )
                .into_response(),
            Err(e) => {
                log::error!("xlsx export failed: {e}");
                axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        },
        _ => axum::http::StatusCode::NOT_FOUND.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(password: &str) -> CustomerForm {
        CustomerForm {
            name: "Acme".into(),
            company: "Acme Corp".into(),
            contact: String::new(),
            title: String::new(),
            email: "ops@acme.example".into(),
            phone: String::new(),
            plan: "professional".into(),
            industry: "Retail".into(),
            username: "acme_user".into(),
            password: password.into(),
            status: "inactive".into(),
            notes: String::new(),
        }
    }

    #[test]
    fn test_form_maps_to_record() {
        let record = record_from_form(form("s3cret")).unwrap();
        assert_eq!(record.plan, Plan::Professional);
        assert_eq!(record.status, CustomerStatus::Inactive);
        assert!(record.password_hash.starts_with("$argon2"));
        assert!(record.last_login.is_none());
    }

    #[test]
    fn test_blank_password_leaves_hash_empty() {
        let record = record_from_form(form("")).unwrap();
        assert!(record.password_hash.is_empty());
    }

    #[test]
    fn test_unknown_plan_and_status_fall_back() {
        let mut submitted = form("x");
        submitted.plan = "platinum".into();
        submitted.status = "frozen".into();
        let record = record_from_form(submitted).unwrap();
        assert_eq!(record.plan, Plan::Starter);
        assert_eq!(record.status, CustomerStatus::Active);
    }
}
