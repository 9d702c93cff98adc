use super::{
    models::{Extras, PropertyAttributes, PropertyDraft, PropertyRecord},
    repository::PropertyRepository,
};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPool, query, query_as, FromRow};
use uuid::Uuid;

const COLUMNS: &str = "id, title, property_type, description, listing_type,
    images, country, city, address, map_link, latitude, longitude, bedrooms,
    bathrooms, size, price, contact_name, phone, email, parking, gym, pool,
    status, created_at";

#[derive(FromRow)]
struct QRes {
    id: Uuid,
    title: String,
    property_type: String,
    description: String,
    listing_type: String,
    images: Vec<String>,
    country: String,
    city: String,
    address: String,
    map_link: Option<String>,
    latitude: Option<String>,
    longitude: Option<String>,
    bedrooms: i32,
    bathrooms: i32,
    size: f64,
    price: f64,
    contact_name: String,
    phone: String,
    email: String,
    parking: bool,
    gym: bool,
    pool: bool,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<QRes> for PropertyRecord {
    type Error = anyhow::Error;

    fn try_from(row: QRes) -> Result<Self> {
        Ok(PropertyRecord {
            id: row.id,
            attributes: PropertyAttributes {
                title: row.title,
                kind: row.property_type,
                description: row.description,
                listing_type: row
                    .listing_type
                    .parse()
                    .map_err(|e| anyhow!("{e}"))?,
                country: row.country,
                city: row.city,
                address: row.address,
                map_link: row.map_link,
                latitude: row.latitude,
                longitude: row.longitude,
                bedrooms: row.bedrooms,
                bathrooms: row.bathrooms,
                size: row.size,
                price: row.price,
                contact_name: row.contact_name,
                phone: row.phone,
                email: row.email,
                extras: Extras {
                    parking: row.parking,
                    gym: row.gym,
                    pool: row.pool,
                },
                status: row.status.parse().map_err(|e| anyhow!("{e}"))?,
            },
            images: row.images,
            created_at: row.created_at,
        })
    }
}

/// Postgres-backed [PropertyRepository].
#[derive(Clone, Debug)]
pub struct PgRepository {
    db: PgPool,
}

impl PgRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PropertyRepository for PgRepository {
    async fn find(&self, id: Uuid) -> Result<Option<PropertyRecord>> {
        let sql = format!("select {COLUMNS} from property where id = $1");
        query_as::<_, QRes>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .map(PropertyRecord::try_from)
            .transpose()
    }

    async fn list(&self) -> Result<Vec<PropertyRecord>> {
        let sql =
            format!("select {COLUMNS} from property order by created_at desc");
        query_as::<_, QRes>(&sql)
            .fetch_all(&self.db)
            .await?
            .into_iter()
            .map(PropertyRecord::try_from)
            .collect()
    }

    async fn insert(&self, draft: PropertyDraft) -> Result<PropertyRecord> {
        let a = &draft.attributes;
        let sql = format!(
            "insert into property (
                title, property_type, description, listing_type, images,
                country, city, address, map_link, latitude, longitude,
                bedrooms, bathrooms, size, price, contact_name, phone, email,
                parking, gym, pool, status, created_at
            ) values (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                $15, $16, $17, $18, $19, $20, $21, $22, $23
            )
            returning {COLUMNS}"
        );
        let row = query_as::<_, QRes>(&sql)
            .bind(&a.title)
            .bind(&a.kind)
            .bind(&a.description)
            .bind(a.listing_type.as_str())
            .bind(&draft.images)
            .bind(&a.country)
            .bind(&a.city)
            .bind(&a.address)
            .bind(&a.map_link)
            .bind(&a.latitude)
            .bind(&a.longitude)
            .bind(a.bedrooms)
            .bind(a.bathrooms)
            .bind(a.size)
            .bind(a.price)
            .bind(&a.contact_name)
            .bind(&a.phone)
            .bind(&a.email)
            .bind(a.extras.parking)
            .bind(a.extras.gym)
            .bind(a.extras.pool)
            .bind(a.status.as_str())
            .bind(draft.created_at)
            .fetch_one(&self.db)
            .await?;

        row.try_into()
    }

    async fn replace(
        &self,
        id: Uuid,
        record: PropertyRecord,
    ) -> Result<Option<PropertyRecord>> {
        // id and created_at are never written after insert
        let a = &record.attributes;
        let sql = format!(
            "update property
            set
                title = $2,
                property_type = $3,
                description = $4,
                listing_type = $5,
                images = $6,
                country = $7,
                city = $8,
                address = $9,
                map_link = $10,
                latitude = $11,
                longitude = $12,
                bedrooms = $13,
                bathrooms = $14,
                size = $15,
                price = $16,
                contact_name = $17,
                phone = $18,
                email = $19,
                parking = $20,
                gym = $21,
                pool = $22,
                status = $23
            where id = $1
            returning {COLUMNS}"
        );
        query_as::<_, QRes>(&sql)
            .bind(id)
            .bind(&a.title)
            .bind(&a.kind)
            .bind(&a.description)
            .bind(a.listing_type.as_str())
            .bind(&record.images)
            .bind(&a.country)
            .bind(&a.city)
            .bind(&a.address)
            .bind(&a.map_link)
            .bind(&a.latitude)
            .bind(&a.longitude)
            .bind(a.bedrooms)
            .bind(a.bathrooms)
            .bind(a.size)
            .bind(a.price)
            .bind(&a.contact_name)
            .bind(&a.phone)
            .bind(&a.email)
            .bind(a.extras.parking)
            .bind(a.extras.gym)
            .bind(a.extras.pool)
            .bind(a.status.as_str())
            .fetch_optional(&self.db)
            .await?
            .map(PropertyRecord::try_from)
            .transpose()
    }

    async fn remove(&self, id: Uuid) -> Result<bool> {
        let res = query("delete from property where id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(res.rows_affected() > 0)
    }
}
