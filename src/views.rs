#![cfg(feature = "web")]

//! Handlebars template registry and the serializable view models the
//! handlers render from. Rendering is pure: handlers assemble a view
//! model from domain state, templates turn it into markup, and no
//! template reaches back into application state.

use chrono::{DateTime, Utc};
use handlebars::Handlebars;
use serde::Serialize;

use crate::charts::PieSlice;
use crate::dashboard::ActivityItem;
use crate::drive::RemoteFile;
use crate::records::{CustomerRecord, DataAsset};

/// Templates are embedded at compile time; the binary carries its whole
/// presentation layer.
pub fn registry() -> Result<Handlebars<'static>, handlebars::TemplateError> {
    let mut hb = Handlebars::new();
    hb.register_template_string("landing", include_str!("templates/landing.hbs"))?;
    hb.register_template_string("insight_hub", include_str!("templates/insight_hub.hbs"))?;
    hb.register_template_string("admin_login", include_str!("templates/admin_login.hbs"))?;
    hb.register_template_string("admin", include_str!("templates/admin.hbs"))?;
    hb.register_template_string("portal", include_str!("templates/portal.hbs"))?;
    Ok(hb)
}

/// Informational banner carried through redirect query parameters, the
/// post-redirect-get analogue of a toast.
#[derive(Debug, Clone, Serialize)]
pub struct Notice {
    pub message: String,
    pub kind: String,
}

impl Notice {
    pub fn from_query(message: Option<String>, kind: Option<String>) -> Option<Self> {
        let message = message?;
        if message.is_empty() {
            return None;
        }
        Some(Self {
            message,
            kind: kind.unwrap_or_else(|| "info".to_string()),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct LandingView {
    pub app_name: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct LoginView {
    pub app_name: String,
    pub notice: Option<Notice>,
}

/// Storage banner shown on both portals.
#[derive(Debug, Serialize)]
pub struct StorageBanner {
    pub connected: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct CustomerRow {
    pub id: i64,
    pub name: String,
    pub company: String,
    pub email: String,
    pub phone: String,
    pub plan: String,
    pub industry: String,
    pub username: String,
    pub status: String,
    pub active: bool,
    pub notes: String,
    pub last_login: String,
}

impl CustomerRow {
    pub fn from_record(record: &CustomerRecord, now: DateTime<Utc>) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            company: record.company.clone(),
            email: record.email.clone(),
            phone: record.phone.clone(),
            plan: record.plan.as_str().to_string(),
            industry: record.industry.clone(),
            username: record.username.clone(),
            status: record.status.as_str().to_string(),
            active: record.is_active(),
            notes: record.notes.clone(),
            last_login: match record.last_login {
                Some(ts) => crate::dashboard::relative_time(ts, now),
                None => "never".to_string(),
            },
        }
    }
}

/// A customer option inside an asset's assignment controls.
#[derive(Debug, Serialize)]
pub struct AssignmentOption {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct AssetRow {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub format: String,
    pub description: String,
    pub uploaded: String,
    pub assigned: Vec<AssignmentOption>,
    pub unassigned: Vec<AssignmentOption>,
}

impl AssetRow {
    pub fn from_asset(
        asset: &DataAsset,
        customers: &[CustomerRecord],
        now: DateTime<Utc>,
    ) -> Self {
        let mut assigned = Vec::new();
        let mut unassigned = Vec::new();
        for customer in customers {
            let option = AssignmentOption {
                id: customer.id,
                name: customer.name.clone(),
            };
            if asset.is_assigned_to(customer.id) {
                assigned.push(option);
            } else if customer.is_active() {
                unassigned.push(option);
            }
        }

        Self {
            id: asset.id,
            name: asset.name.clone(),
            category: asset.category.as_str().to_string(),
            format: asset.format.as_str().to_string(),
            description: asset.description.clone(),
            uploaded: crate::dashboard::relative_time(asset.uploaded_at, now),
            assigned,
            unassigned,
        }
    }
}

/// One per-category tab in the admin data section.
#[derive(Debug, Serialize)]
pub struct CategoryTab {
    pub name: String,
    pub active: bool,
    pub assets: Vec<AssetRow>,
}

#[derive(Debug, Serialize)]
pub struct RemoteFileRow {
    pub name: String,
    pub mime_type: String,
    pub modified: String,
    pub size: String,
}

impl RemoteFileRow {
    pub fn from_file(file: &RemoteFile) -> Self {
        Self {
            name: file.name.clone(),
            mime_type: file.mime_type.clone(),
            modified: file.modified_time.clone().unwrap_or_default(),
            size: file.size.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AdminView {
    pub app_name: String,
    pub admin_user: String,
    pub section_customers: bool,
    pub section_data: bool,
    pub storage: StorageBanner,
    pub notice: Option<Notice>,
    pub customers: Vec<CustomerRow>,
    pub customer_count: usize,
    pub category_tabs: Vec<CategoryTab>,
    pub active_category: String,
    pub remote_files: Vec<RemoteFileRow>,
}

/// A selectable chart kind in the portal dropdowns.
#[derive(Debug, Serialize)]
pub struct KindOption {
    pub value: String,
    pub title: String,
    pub selected: bool,
}

#[derive(Debug, Serialize)]
pub struct MetricCards {
    pub revenue: String,
    pub users: String,
    pub orders: String,
    pub conversion: String,
}

#[derive(Debug, Serialize)]
pub struct PortalView {
    pub app_name: String,
    pub customer_name: String,
    pub company: String,
    pub industry: String,
    pub status: String,
    pub storage: StorageBanner,
    pub notice: Option<Notice>,
    pub refresh_secs: u64,
    pub metrics: MetricCards,
    pub trend_title: String,
    pub trend_svg: String,
    pub trend_options: Vec<KindOption>,
    pub pie_title: String,
    pub pie_svg: String,
    pub pie_legend: Vec<PieSlice>,
    pub pie_options: Vec<KindOption>,
    pub activity: Vec<ActivityItem>,
    pub assets: Vec<AssetRow>,
}

/// Thousands-separated integer formatting for the metric cards.
pub fn format_count(value: i64) -> String {
    let digits = value.abs().to_string();
    let mut grouped = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if value < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

pub fn format_money(value: f64) -> String {
    format!("${}", format_count(value.round() as i64))
}
