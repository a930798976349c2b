use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::auth;

lazy_static! {
    static ref USERNAME_REGEX: Regex = Regex::new(r"^[A-Za-z0-9_]{3,32}$").unwrap();
    static ref EMAIL_REGEX: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

/// Subscription plan offered on the pricing page.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Starter,
    Professional,
    Enterprise,
}

impl Plan {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "starter" => Some(Plan::Starter),
            "professional" => Some(Plan::Professional),
            "enterprise" => Some(Plan::Enterprise),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Starter => "starter",
            Plan::Professional => "professional",
            Plan::Enterprise => "enterprise",
        }
    }
}

impl Default for Plan {
    fn default() -> Self {
        Plan::Starter
    }
}

/// Account status. Inactive customers stay in the book but cannot sign in
/// and are excluded from "assign to all" selections.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CustomerStatus {
    Active,
    Inactive,
}

impl CustomerStatus {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "active" => Some(CustomerStatus::Active),
            "inactive" => Some(CustomerStatus::Inactive),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerStatus::Active => "active",
            CustomerStatus::Inactive => "inactive",
        }
    }
}

impl Default for CustomerStatus {
    fn default() -> Self {
        CustomerStatus::Active
    }
}

/// Category a data asset is filed under; the admin data section shows one
/// tab per category.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DataCategory {
    Sales,
    Analytics,
    Marketing,
    Operations,
}

impl DataCategory {
    pub const ALL: [DataCategory; 4] = [
        DataCategory::Sales,
        DataCategory::Analytics,
        DataCategory::Marketing,
        DataCategory::Operations,
    ];

    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "sales" => Some(DataCategory::Sales),
            "analytics" => Some(DataCategory::Analytics),
            "marketing" => Some(DataCategory::Marketing),
            "operations" => Some(DataCategory::Operations),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DataCategory::Sales => "sales",
            DataCategory::Analytics => "analytics",
            DataCategory::Marketing => "marketing",
            DataCategory::Operations => "operations",
        }
    }
}

/// File format tag for an uploaded asset.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AssetFormat {
    Csv,
    Xlsx,
    Json,
    Pdf,
}

impl AssetFormat {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "csv" => Some(AssetFormat::Csv),
            "xlsx" => Some(AssetFormat::Xlsx),
            "json" => Some(AssetFormat::Json),
            "pdf" => Some(AssetFormat::Pdf),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetFormat::Csv => "csv",
            AssetFormat::Xlsx => "xlsx",
            AssetFormat::Json => "json",
            AssetFormat::Pdf => "pdf",
        }
    }
}

impl Default for AssetFormat {
    fn default() -> Self {
        AssetFormat::Csv
    }
}

/// A client account managed from the admin panel
///
/// Serialized field names stay camelCase so the persisted `customers.json`
/// documents keep their historical shape. Passwords are stored only as
/// argon2 hashes.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRecord {
    /// Unique id within the collection (epoch milliseconds at creation,
    /// bumped past collisions)
    pub id: i64,

    /// Display name of the client organization
    pub name: String,

    /// Name of the primary contact person
    #[serde(default)]
    pub contact: String,

    /// Job title of the primary contact
    #[serde(default)]
    pub title: String,

    /// Contact email address
    #[serde(default)]
    pub email: String,

    /// Contact phone number
    #[serde(default)]
    pub phone: String,

    /// Legal company name shown on the customer dashboard
    #[serde(default)]
    pub company: String,

    /// Subscription plan
    #[serde(default)]
    pub plan: Plan,

    /// Industry tag shown on the customer dashboard
    #[serde(default)]
    pub industry: String,

    /// Sign-in name for the customer portal (expected unique, first match
    /// wins on lookup)
    pub username: String,

    /// Argon2 hash of the portal password
    #[serde(default)]
    pub password_hash: String,

    /// Account status
    #[serde(default)]
    pub status: CustomerStatus,

    /// Free-form notes kept by the admin
    #[serde(default)]
    pub notes: String,

    /// Last successful portal sign-in, if any
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,

    /// Record creation time
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    /// Last admin edit, if any
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl CustomerRecord {
    pub fn is_active(&self) -> bool {
        self.status == CustomerStatus::Active
    }
}

/// An uploaded data product offered to customers
///
/// Carries metadata only; raw file bytes are forwarded to the remote store
/// at upload time and never embedded in the document.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DataAsset {
    /// Unique id within the collection (same scheme as customer ids)
    pub id: i64,

    /// Display name, also used as the remote file name for raw uploads
    pub name: String,

    /// Category tab the asset is filed under
    pub category: DataCategory,

    /// File format tag ("type" in the persisted document)
    #[serde(rename = "type", default)]
    pub format: AssetFormat,

    /// Short description shown in listings and the activity feed
    #[serde(default)]
    pub description: String,

    /// Ids of customers who see this asset on their dashboard
    #[serde(default)]
    pub assigned_customers: BTreeSet<i64>,

    /// Upload time
    #[serde(default = "Utc::now")]
    pub uploaded_at: DateTime<Utc>,
}

impl DataAsset {
    pub fn is_assigned_to(&self, customer_id: i64) -> bool {
        self.assigned_customers.contains(&customer_id)
    }
}

/// The "customers" collection: an ordered list owned in memory for the
/// session and persisted as a plain JSON array.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(transparent)]
pub struct CustomerBook {
    records: Vec<CustomerRecord>,
}

impl CustomerBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[CustomerRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CustomerRecord> {
        self.records.iter()
    }

    pub fn contains(&self, id: i64) -> bool {
        self.records.iter().any(|r| r.id == id)
    }

    /// Walks forward from `candidate` until an unused id is found.
    pub fn claim_id(&self, candidate: i64) -> i64 {
        let mut id = candidate;
        while self.contains(id) {
            id += 1;
        }
        id
    }

    /// Inserts a record, assigning it a fresh id. Returns the assigned id.
    pub fn add(&mut self, mut record: CustomerRecord) -> i64 {
        let id = self.claim_id(Utc::now().timestamp_millis());
        record.id = id;
        self.records.push(record);
        id
    }

    pub fn find(&self, id: i64) -> Option<&CustomerRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn find_mut(&mut self, id: i64) -> Option<&mut CustomerRecord> {
        self.records.iter_mut().find(|r| r.id == id)
    }

    /// First record with a matching username.
    pub fn find_by_username(&self, username: &str) -> Option<&CustomerRecord> {
        self.records.iter().find(|r| r.username == username)
    }

    /// Removes exactly one record (the first with a matching id).
    pub fn remove(&mut self, id: i64) -> Option<CustomerRecord> {
        let index = self.records.iter().position(|r| r.id == id)?;
        Some(self.records.remove(index))
    }

    /// Ids of active customers, the target set for "assign to all".
    pub fn active_ids(&self) -> Vec<i64> {
        self.records
            .iter()
            .filter(|r| r.is_active())
            .map(|r| r.id)
            .collect()
    }
}

/// The "dashboardData" collection of uploaded assets.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(transparent)]
pub struct AssetCatalog {
    assets: Vec<DataAsset>,
}

impl AssetCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn assets(&self) -> &[DataAsset] {
        &self.assets
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DataAsset> {
        self.assets.iter()
    }

    pub fn contains(&self, id: i64) -> bool {
        self.assets.iter().any(|a| a.id == id)
    }

    pub fn claim_id(&self, candidate: i64) -> i64 {
        let mut id = candidate;
        while self.contains(id) {
            id += 1;
        }
        id
    }

    pub fn add(&mut self, mut asset: DataAsset) -> i64 {
        let id = self.claim_id(Utc::now().timestamp_millis());
        asset.id = id;
        self.assets.push(asset);
        id
    }

    pub fn find(&self, id: i64) -> Option<&DataAsset> {
        self.assets.iter().find(|a| a.id == id)
    }

    pub fn find_mut(&mut self, id: i64) -> Option<&mut DataAsset> {
        self.assets.iter_mut().find(|a| a.id == id)
    }

    /// Removes exactly one asset (the first with a matching id).
    pub fn remove(&mut self, id: i64) -> Option<DataAsset> {
        let index = self.assets.iter().position(|a| a.id == id)?;
        Some(self.assets.remove(index))
    }

    /// Assets visible to one customer, in catalog order.
    pub fn assigned_to(&self, customer_id: i64) -> Vec<&DataAsset> {
        self.assets
            .iter()
            .filter(|a| a.is_assigned_to(customer_id))
            .collect()
    }

    pub fn in_category(&self, category: DataCategory) -> Vec<&DataAsset> {
        self.assets
            .iter()
            .filter(|a| a.category == category)
            .collect()
    }

    pub fn assign(&mut self, asset_id: i64, customer_id: i64) -> bool {
        match self.find_mut(asset_id) {
            Some(asset) => asset.assigned_customers.insert(customer_id),
            None => false,
        }
    }

    pub fn unassign(&mut self, asset_id: i64, customer_id: i64) -> bool {
        match self.find_mut(asset_id) {
            Some(asset) => asset.assigned_customers.remove(&customer_id),
            None => false,
        }
    }
}

/// Portal username shape: 3-32 word characters.
pub fn valid_username(username: &str) -> bool {
    USERNAME_REGEX.is_match(username)
}

pub fn valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}

/// The three demo accounts created the first time an empty customers
/// document is loaded with demo data enabled. Seed passwords are hashed
/// here so plaintext never reaches a document.
pub fn demo_customers() -> CustomerBook {
    let now = Utc::now();
    let demo = |id: i64,
                name: &str,
                email: &str,
                company: &str,
                phone: &str,
                plan: Plan,
                industry: &str,
                username: &str,
                password: &str,
                notes: &str| CustomerRecord {
        id,
        name: name.to_string(),
        contact: String::new(),
        title: String::new(),
        email: email.to_string(),
        phone: phone.to_string(),
        company: company.to_string(),
        plan,
        industry: industry.to_string(),
        username: username.to_string(),
        password_hash: auth::hash_password(password).unwrap_or_default(),
        status: CustomerStatus::Active,
        notes: notes.to_string(),
        last_login: None,
        created_at: now,
        updated_at: None,
    };

    CustomerBook {
        records: vec![
            demo(
                1,
                "Acme Corporation",
                "contact@acme.com",
                "Acme Corp",
                "555-123-4567",
                Plan::Professional,
                "Manufacturing",
                "acme_user",
                "acme2024",
                "Large manufacturing company with complex data needs",
            ),
            demo(
                2,
                "TechStart Inc",
                "info@techstart.com",
                "TechStart Inc",
                "555-987-6543",
                Plan::Enterprise,
                "Technology",
                "techstart_user",
                "tech2024",
                "Startup company looking for growth insights",
            ),
            demo(
                3,
                "Local Business Co",
                "owner@localbiz.com",
                "Local Business Co",
                "555-456-7890",
                Plan::Starter,
                "Retail",
                "localbiz_user",
                "local2024",
                "Small local business expanding operations",
            ),
        ],
    }
}

/// The two demo assets paired with the demo accounts.
pub fn demo_assets() -> AssetCatalog {
    let now = Utc::now();
    AssetCatalog {
        assets: vec![
            DataAsset {
                id: 1,
                name: "Q4 2024 Sales Report".to_string(),
                category: DataCategory::Sales,
                format: AssetFormat::Csv,
                description: "Revenue, orders, and customer acquisition data".to_string(),
                assigned_customers: BTreeSet::from([1, 2]),
                uploaded_at: now,
            },
            DataAsset {
                id: 2,
                name: "Website Traffic Analysis".to_string(),
                category: DataCategory::Analytics,
                format: AssetFormat::Csv,
                description: "Page views, bounce rates, and user behavior".to_string(),
                assigned_customers: BTreeSet::from([1, 2, 3]),
                uploaded_at: now,
            },
        ],
    }
}
