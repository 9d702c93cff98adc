//! The multipart wire format of the mutation endpoints.
//!
//! Everything arrives as text, including amenity flags
//! (`extras[parking]=true`). This module is the only place that sees those
//! strings; it hands typed [PropertyAttributes] to the rest of the crate.

use super::{
    errors::ServerError,
    models::{
        Extras, FieldError, Flag, ImageUpload, ListingType, PropertyAttributes,
        Status, ValidationErrors,
    },
};
use axum::extract::Multipart;
use std::{collections::HashMap, str::FromStr};

const IMAGE_FIELD: &str = "images";
const KEEP_FIELDS: [&str; 2] = ["existingImages[]", "existingImages"];

#[derive(Debug, Default)]
pub struct PropertyForm {
    fields: HashMap<String, String>,
    /// URLs the client wants to keep, in display order. Update only.
    pub existing_images: Vec<String>,
    pub images: Vec<ImageUpload>,
}

impl PropertyForm {
    pub async fn from_multipart(
        mut multipart: Multipart,
    ) -> Result<Self, ServerError> {
        let mut form = PropertyForm::default();
        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            if name == IMAGE_FIELD {
                let file_name =
                    field.file_name().unwrap_or("image").to_string();
                let bytes = field.bytes().await?;
                if !bytes.is_empty() {
                    form.images.push(ImageUpload { file_name, bytes });
                }
            } else if KEEP_FIELDS.contains(&name.as_str()) {
                let url = field.text().await?;
                if !url.is_empty() {
                    form.existing_images.push(url);
                }
            } else {
                let value = field.text().await?;
                form.set(&name, value);
            }
        }

        Ok(form)
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.fields.insert(name.to_string(), value.into());
    }

    /// The field exactly as submitted, unless it is absent or blank.
    fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    fn extras(&self) -> Extras {
        Extras::normalize(self.fields.iter().filter_map(|(key, value)| {
            let name = key.strip_prefix("extras[")?.strip_suffix(']')?;
            Some((name, Flag::Text(value.clone())))
        }))
    }

    /// Read the typed attributes, naming every missing or malformed field.
    pub fn attributes(&self) -> Result<PropertyAttributes, ValidationErrors> {
        let mut errors = vec![];

        let mut required = |name: &'static str| -> String {
            match self.text(name) {
                Some(v) => v.to_string(),
                None => {
                    errors.push(FieldError::new(name, "is required"));
                    String::new()
                }
            }
        };
        let title = required("title");
        let kind = required("type");
        let description = required("description");
        let country = required("country");
        let city = required("city");
        let address = required("address");
        let contact_name = required("contactName");
        let phone = required("phone");
        let email = required("email");

        let listing_type = self.parsed::<ListingType>("listingType", &mut errors);
        let bedrooms = self.parsed::<i32>("bedrooms", &mut errors);
        let bathrooms = self.parsed::<i32>("bathrooms", &mut errors);
        let size = self.parsed::<f64>("size", &mut errors);
        let price = self.parsed::<f64>("price", &mut errors);
        let status = match self.text("status") {
            None => Some(Status::default()),
            Some(v) => match v.trim().parse::<Status>() {
                Ok(s) => Some(s),
                Err(e) => {
                    errors.push(FieldError::new("status", e));
                    None
                }
            },
        };

        match (listing_type, bedrooms, bathrooms, size, price, status) {
            (
                Some(listing_type),
                Some(bedrooms),
                Some(bathrooms),
                Some(size),
                Some(price),
                Some(status),
            ) if errors.is_empty() => Ok(PropertyAttributes {
                title,
                kind,
                description,
                listing_type,
                country,
                city,
                address,
                map_link: self.text("mapLink").map(str::to_string),
                latitude: self.text("latitude").map(str::to_string),
                longitude: self.text("longitude").map(str::to_string),
                bedrooms,
                bathrooms,
                size,
                price,
                contact_name,
                phone,
                email,
                extras: self.extras(),
                status,
            }),
            _ => Err(ValidationErrors(errors)),
        }
    }

    fn parsed<T>(
        &self,
        name: &'static str,
        errors: &mut Vec<FieldError>,
    ) -> Option<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let Some(raw) = self.text(name) else {
            errors.push(FieldError::new(name, "is required"));
            return None;
        };
        match raw.trim().parse::<T>() {
            Ok(v) => Some(v),
            Err(e) => {
                errors.push(FieldError::new(name, format!("{raw:?}: {e}")));
                None
            }
        }
    }
}
