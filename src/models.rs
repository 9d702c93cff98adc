use super::{auth::AccessGate, lifecycle::Lifecycle};
use axum::body::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, sync::Arc};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListingType {
    Buy,
    Rent,
}

impl ListingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "Buy",
            Self::Rent => "Rent",
        }
    }
}

impl FromStr for ListingType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Buy" => Ok(Self::Buy),
            "Rent" => Ok(Self::Rent),
            _ => Err(format!("{s:?} is not a listing type (Buy or Rent)")),
        }
    }
}

impl fmt::Display for ListingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    #[default]
    Available,
    Pending,
    Sold,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::Pending => "Pending",
            Self::Sold => "Sold",
        }
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Available" => Ok(Self::Available),
            "Pending" => Ok(Self::Pending),
            "Sold" => Ok(Self::Sold),
            _ => Err(format!(
                "{s:?} is not a status (Available, Pending or Sold)"
            )),
        }
    }
}

/// Named boolean amenities. All three keys are always resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Extras {
    pub parking: bool,
    pub gym: bool,
    pub pool: bool,
}

/// A raw amenity flag as it arrives from a client: a real boolean, or the
/// `"true"`/`"false"` strings that multipart forms carry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Flag {
    Bool(bool),
    Text(String),
}

impl Flag {
    fn is_set(&self) -> bool {
        match self {
            Flag::Bool(b) => *b,
            Flag::Text(s) => s == "true",
        }
    }
}

impl Extras {
    /// Resolve every amenity from loosely typed input. Unknown keys are
    /// ignored and missing keys are false.
    pub fn normalize<'a, I>(flags: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, Flag)>,
    {
        let mut extras = Extras::default();
        for (key, flag) in flags {
            match key {
                "parking" => extras.parking = flag.is_set(),
                "gym" => extras.gym = flag.is_set(),
                "pool" => extras.pool = flag.is_set(),
                _ => {}
            }
        }
        extras
    }
}

/// A single field that failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub reason: String,
}

impl FieldError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    pub fn names(&self) -> Vec<&'static str> {
        self.0.iter().map(|e| e.field).collect()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|e| format!("{}: {}", e.field, e.reason))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Everything about a listing that the operator supplies. An update replaces
/// this whole bag; fields are never merged one by one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyAttributes {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub listing_type: ListingType,
    pub country: String,
    pub city: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<String>,
    pub bedrooms: i32,
    pub bathrooms: i32,
    pub size: f64,
    pub price: f64,
    pub contact_name: String,
    pub phone: String,
    pub email: String,
    pub extras: Extras,
    #[serde(default)]
    pub status: Status,
}

impl PropertyAttributes {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = vec![];
        let required = [
            ("title", &self.title),
            ("type", &self.kind),
            ("description", &self.description),
            ("country", &self.country),
            ("city", &self.city),
            ("address", &self.address),
            ("contactName", &self.contact_name),
            ("phone", &self.phone),
            ("email", &self.email),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                errors.push(FieldError::new(field, "must not be empty"));
            }
        }
        if self.bedrooms < 0 {
            errors.push(FieldError::new("bedrooms", "must not be negative"));
        }
        if self.bathrooms < 0 {
            errors.push(FieldError::new("bathrooms", "must not be negative"));
        }
        if !self.size.is_finite() {
            errors.push(FieldError::new("size", "must be a finite number"));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            errors.push(FieldError::new(
                "price",
                "must be a non-negative number",
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors(errors))
        }
    }
}

/// A record that has not been handed to the repository yet, so it has no id.
#[derive(Debug, Clone)]
pub struct PropertyDraft {
    pub attributes: PropertyAttributes,
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyRecord {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(flatten)]
    pub attributes: PropertyAttributes,
    /// Display order.
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl PropertyRecord {
    pub fn from_draft(id: Uuid, draft: PropertyDraft) -> Self {
        Self {
            id,
            attributes: draft.attributes,
            images: draft.images,
            created_at: draft.created_at,
        }
    }
}

/// Raw image payload headed for the blob store.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Bytes,
}

#[derive(Clone)]
pub struct AppState {
    pub lifecycle: Arc<Lifecycle>,
    pub gate: Arc<dyn AccessGate>,
    pub purge_on_update: bool,
    pub mutations_require_admin: bool,
}
