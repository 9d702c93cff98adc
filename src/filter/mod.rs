//! Narrowing a list of properties by several predicates at once.
//!
//! Every supplied predicate must hold (they are AND-ed). Relative order of
//! the input is preserved. Bad numeric input never errors; it just matches
//! nothing.

pub mod models;

use crate::models::PropertyRecord;
pub use models::FilterSpec;
use models::{Field, Filter, FilterType, FilterValue};

/// Read the leading integer of `s` the way a lenient form parser would:
/// surrounding whitespace is skipped, an optional sign is accepted, and
/// anything after the digits is ignored. `"3"`, `"3.5"` and `"8+"` give 3, 3
/// and 8; `"Studio"` gives nothing. Values past the `i64` range saturate.
pub fn parse_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let n = digits[..end].bytes().fold(0i64, |acc, d| {
        acc.saturating_mul(10).saturating_add(i64::from(d - b'0'))
    });

    Some(if negative { -n } else { n })
}

fn supplied(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl FilterSpec {
    /// The predicates this spec actually imposes.
    pub fn filters(&self) -> Vec<Filter> {
        let text = |field, r#type, value: &Option<String>| {
            supplied(value).map(|v| Filter {
                field,
                r#type,
                value: FilterValue::Text(v.to_string()),
            })
        };
        let int = |field, r#type, value: &Option<String>| {
            supplied(value).map(|v| Filter {
                field,
                r#type,
                value: FilterValue::Int(parse_int(v)),
            })
        };

        [
            text(Field::ListingType, FilterType::Eq, &self.listing_type),
            text(Field::City, FilterType::Contains, &self.city),
            text(Field::Type, FilterType::Eq, &self.kind),
            int(Field::Bedrooms, FilterType::Eq, &self.bedrooms),
            int(Field::Bathrooms, FilterType::Eq, &self.bathrooms),
            int(Field::Price, FilterType::Gte, &self.min_price),
            int(Field::Price, FilterType::Lte, &self.max_price),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.filters().is_empty()
    }
}

impl Filter {
    pub fn matches(&self, record: &PropertyRecord) -> bool {
        let attrs = &record.attributes;
        match &self.value {
            FilterValue::Text(wanted) => {
                let actual = match self.field {
                    Field::ListingType => attrs.listing_type.as_str(),
                    Field::City => attrs.city.as_str(),
                    Field::Type => attrs.kind.as_str(),
                    _ => return false,
                };
                match self.r#type {
                    FilterType::Eq => actual == wanted,
                    FilterType::Contains => actual
                        .to_lowercase()
                        .contains(&wanted.to_lowercase()),
                    _ => false,
                }
            }
            FilterValue::Int(None) => false,
            FilterValue::Int(Some(wanted)) => {
                let actual = match self.field {
                    Field::Bedrooms => attrs.bedrooms as f64,
                    Field::Bathrooms => attrs.bathrooms as f64,
                    Field::Price => attrs.price,
                    _ => return false,
                };
                let wanted = *wanted as f64;
                match self.r#type {
                    FilterType::Eq => actual == wanted,
                    FilterType::Gte => actual >= wanted,
                    FilterType::Lte => actual <= wanted,
                    FilterType::Contains => false,
                }
            }
        }
    }
}

/// Keep the records that satisfy every predicate in `spec`, in input order.
pub fn evaluate(
    records: Vec<PropertyRecord>,
    spec: &FilterSpec,
) -> Vec<PropertyRecord> {
    let filters = spec.filters();
    if filters.is_empty() {
        return records;
    }
    records
        .into_iter()
        .filter(|record| filters.iter().all(|f| f.matches(record)))
        .collect()
}
