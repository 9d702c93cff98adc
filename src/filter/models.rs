use serde::Deserialize;

/// Filter values exactly as a client sends them, usually as a query string.
/// An absent or empty field means "anything".
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterSpec {
    pub listing_type: Option<String>,
    pub city: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub bedrooms: Option<String>,
    pub bathrooms: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
}

/// The record attribute a [Filter] looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    ListingType,
    City,
    Type,
    Bedrooms,
    Bathrooms,
    Price,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    Eq,
    Contains,
    Gte,
    Lte,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Text(String),
    /// `None` when the client's value could not be read as an integer. Such a
    /// filter matches nothing.
    Int(Option<i64>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub field: Field,
    pub r#type: FilterType,
    pub value: FilterValue,
}
