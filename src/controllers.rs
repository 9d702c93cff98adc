use super::{
    errors::ServerError,
    extractors::AuthenticatedUser,
    filter::{self, FilterSpec},
    form::PropertyForm,
    lifecycle::ImageDeletion,
    models::AppState,
};
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};
use tracing::warn;
use uuid::Uuid;

pub async fn root() -> impl IntoResponse {
    "API is running..."
}

pub async fn list_properties(
    State(AppState { lifecycle, .. }): State<AppState>,
    Query(spec): Query<FilterSpec>,
) -> Result<impl IntoResponse, ServerError> {
    let properties = lifecycle.list().await?;

    Ok(Json(filter::evaluate(properties, &spec)))
}

pub async fn get_property(
    State(AppState { lifecycle, .. }): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServerError> {
    Ok(Json(lifecycle.get(id).await?))
}

pub async fn create_property(
    State(AppState { lifecycle, .. }): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    multipart: Multipart,
) -> Result<impl IntoResponse, ServerError> {
    let form = PropertyForm::from_multipart(multipart).await?;
    let attributes = form.attributes()?;
    let property = lifecycle.create(&principal, attributes, form.images).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Property saved successfully",
            "property": property,
        })),
    ))
}

pub async fn update_property(
    State(state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ServerError> {
    let form = PropertyForm::from_multipart(multipart).await?;
    let attributes = form.attributes()?;
    let updated = state
        .lifecycle
        .update(&principal, id, attributes, form.existing_images, form.images)
        .await?;

    let mut body = json!({
        "message": "Property updated successfully",
        "property": updated.record,
        "releasedImages": updated.released,
    });
    // the record is saved at this point; a failed purge only leaves blobs
    if state.purge_on_update && !updated.released.is_empty() {
        match state
            .lifecycle
            .release_images(&principal, &updated.released)
            .await
        {
            Ok(purged) => body["purgedImages"] = deletions_json(&purged),
            Err(e) => {
                warn!(id = %id, error = %e, "could not purge released images");
                body["purgeError"] = Value::String(e.to_string());
            }
        }
    }

    Ok(Json(body))
}

pub async fn delete_property(
    State(AppState { lifecycle, .. }): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServerError> {
    let deletions = lifecycle.delete(&principal, id).await?;

    Ok(Json(json!({
        "message": "Property and images deleted successfully",
        "images": deletions_json(&deletions),
    })))
}

fn deletions_json(deletions: &[ImageDeletion]) -> Value {
    deletions
        .iter()
        .map(|d| match &d.outcome {
            Ok(()) => json!({ "url": d.url, "deleted": true }),
            Err(e) => json!({ "url": d.url, "deleted": false, "error": e }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::{
        auth::{HmacGate, Role},
        lifecycle::Lifecycle,
        models::{fixtures, AppState},
        routes,
        session::{self, Claims},
        testing::{admin, upload, FlakyRepository, RecordingBlobStore, RepoCall},
    };
    use axum::{
        body::Body,
        extract::DefaultBodyLimit,
        http::{
            header::{AUTHORIZATION, CONTENT_TYPE},
            Request, StatusCode,
        },
        Router,
    };
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    const SECRET: &str = "test-secret";
    const BOUNDARY: &str = "homehive-test-boundary";

    struct Harness {
        app: Router,
        lifecycle: Arc<Lifecycle>,
        repo: Arc<FlakyRepository>,
        blobs: Arc<RecordingBlobStore>,
    }

    fn harness(purge_on_update: bool, mutations_require_admin: bool) -> Harness {
        let repo = Arc::new(FlakyRepository::new());
        let blobs = Arc::new(RecordingBlobStore::new());
        let lifecycle =
            Arc::new(Lifecycle::new(repo.clone(), blobs.clone()));
        let state = AppState {
            lifecycle: lifecycle.clone(),
            gate: Arc::new(HmacGate::new(SECRET)),
            purge_on_update,
            mutations_require_admin,
        };
        Harness {
            app: routes::get_routes().with_state(state),
            lifecycle,
            repo,
            blobs,
        }
    }

    fn token(role: Role) -> String {
        signed_token(role, SECRET.as_bytes())
    }

    fn signed_token(role: Role, secret: &[u8]) -> String {
        let now = chrono::Utc::now().timestamp();
        session::issue(
            &Claims {
                sub: "operator-1".to_string(),
                role,
                issued_at: now,
                expires_at: now + 3600,
            },
            secret,
        )
    }

    const FIELDS: [(&str, &str); 15] = [
        ("title", "Sea view apartment"),
        ("type", "Apartment"),
        ("description", "Two bedrooms by the marina"),
        ("listingType", "Buy"),
        ("country", "UAE"),
        ("city", "Dubai"),
        ("address", "12 Marina Walk"),
        ("bedrooms", "2"),
        ("bathrooms", "2"),
        ("size", "120"),
        ("price", "100000"),
        ("contactName", "Sam"),
        ("phone", "+971 50 000 0000"),
        ("email", "sam@example.com"),
        ("extras[parking]", "true"),
    ];

    fn multipart(fields: &[(&str, &str)], files: &[&str]) -> Body {
        let mut body = String::new();
        for (name, value) in fields {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; \
                 name=\"{name}\"\r\n\r\n{value}\r\n"
            ));
        }
        for file in files {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; \
                 name=\"images\"; filename=\"{file}\"\r\n\
                 Content-Type: image/jpeg\r\n\r\nbytes of {file}\r\n"
            ));
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        Body::from(body)
    }

    fn mutation(
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Body,
    ) -> Request<Body> {
        let mut req = Request::builder()
            .method(method)
            .uri(uri)
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            );
        if let Some(token) = token {
            req = req.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        req.body(body).unwrap()
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_create_requires_token() {
        let h = harness(false, false);
        let (status, body) = send(
            &h.app,
            mutation("POST", "/api/properties", None, multipart(&FIELDS, &[])),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Access denied. No token provided.");

        let (status, _) = send(
            &h.app,
            mutation(
                "POST",
                "/api/properties",
                Some(&signed_token(Role::Admin, b"not-the-secret")),
                multipart(&FIELDS, &[]),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(h.lifecycle.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_from_multipart() {
        let h = harness(false, false);
        let (status, body) = send(
            &h.app,
            mutation(
                "POST",
                "/api/properties",
                Some(&token(Role::User)),
                multipart(&FIELDS, &["front.jpg", "pool.jpg"]),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "Property saved successfully");
        let property = &body["property"];
        assert_eq!(property["extras"]["parking"], true);
        assert_eq!(property["extras"]["gym"], false);
        assert_eq!(property["status"], "Available");
        assert_eq!(
            property["images"],
            serde_json::json!([
                h.blobs.url_for("front.jpg"),
                h.blobs.url_for("pool.jpg")
            ])
        );
    }

    #[tokio::test]
    async fn test_create_names_missing_fields() {
        let h = harness(false, false);
        let (status, body) = send(
            &h.app,
            mutation(
                "POST",
                "/api/properties",
                Some(&token(Role::Admin)),
                multipart(&FIELDS[2..], &[]),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let detail = body["error"].as_str().unwrap();
        assert!(detail.contains("title: is required"), "{detail}");
        assert!(detail.contains("type: is required"), "{detail}");
    }

    #[tokio::test]
    async fn test_list_applies_query_filter() {
        let h = harness(false, false);
        for city in ["Dubai", "Abu Dhabi", "dubai marina"] {
            let mut attrs = fixtures::attributes();
            attrs.city = city.to_string();
            h.lifecycle.create(&admin(), attrs, vec![]).await.unwrap();
        }

        let (status, body) = send(&h.app, get("/api/properties")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 3);

        let (_, body) =
            send(&h.app, get("/api/properties?city=Dub&bedrooms=2")).await;
        let mut cities: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["city"].as_str().unwrap())
            .collect();
        cities.sort();
        assert_eq!(cities, vec!["Dubai", "dubai marina"]);

        let (_, body) = send(&h.app, get("/api/properties?bedrooms=Studio")).await;
        assert!(body.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_then_purge_released() {
        let h = harness(true, false);
        let created = h
            .lifecycle
            .create(
                &admin(),
                fixtures::attributes(),
                vec![upload("a.jpg"), upload("c.jpg")],
            )
            .await
            .unwrap();
        let url_a = h.blobs.url_for("a.jpg");
        let mut fields = FIELDS.to_vec();
        fields.push(("existingImages[]", url_a.as_str()));
        fields[0] = ("title", "Renovated");

        let (status, body) = send(
            &h.app,
            mutation(
                "PUT",
                &format!("/api/properties/{}", created.id),
                Some(&token(Role::Admin)),
                multipart(&fields, &["b.jpg"]),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["property"]["title"], "Renovated");
        assert_eq!(
            body["property"]["images"],
            serde_json::json!([url_a, h.blobs.url_for("b.jpg")])
        );
        assert_eq!(
            body["releasedImages"],
            serde_json::json!([h.blobs.url_for("c.jpg")])
        );
        assert_eq!(body["purgedImages"][0]["deleted"], true);
        assert_eq!(h.blobs.deleted_keys(), vec!["properties/c"]);
    }

    #[tokio::test]
    async fn test_delete_then_not_found() {
        let h = harness(false, false);
        let created = h
            .lifecycle
            .create(&admin(), fixtures::attributes(), vec![upload("a.jpg")])
            .await
            .unwrap();
        let uri = format!("/api/properties/{}", created.id);

        let req = Request::builder()
            .method("DELETE")
            .uri(&uri)
            .header(AUTHORIZATION, format!("Bearer {}", token(Role::Admin)))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&h.app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["images"][0]["deleted"], true);

        let (status, body) = send(&h.app, get(&uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Property not found");
    }

    #[tokio::test]
    async fn test_admin_only_mutations() {
        let h = harness(false, true);
        let created = h
            .lifecycle
            .create(&admin(), fixtures::attributes(), vec![])
            .await
            .unwrap();
        let req = Request::builder()
            .method("DELETE")
            .uri(format!("/api/properties/{}", created.id))
            .header(AUTHORIZATION, format!("Bearer {}", token(Role::User)))
            .body(Body::empty())
            .unwrap();

        let (status, _) = send(&h.app, req).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(h.lifecycle.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_survives_failed_purge() {
        let h = harness(true, false);
        let created = h
            .lifecycle
            .create(
                &admin(),
                fixtures::attributes(),
                vec![upload("a.jpg"), upload("c.jpg")],
            )
            .await
            .unwrap();
        h.repo.fail(RepoCall::List);
        let url_a = h.blobs.url_for("a.jpg");
        let mut fields = FIELDS.to_vec();
        fields.push(("existingImages[]", url_a.as_str()));
        fields[0] = ("title", "Renovated");

        let (status, body) = send(
            &h.app,
            mutation(
                "PUT",
                &format!("/api/properties/{}", created.id),
                Some(&token(Role::Admin)),
                multipart(&fields, &[]),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["property"]["title"], "Renovated");
        assert_eq!(
            body["releasedImages"],
            serde_json::json!([h.blobs.url_for("c.jpg")])
        );
        assert!(body["purgeError"].as_str().unwrap().contains("db timeout"));
        assert!(body.get("purgedImages").is_none());
        assert!(h.blobs.deleted_keys().is_empty());
        let stored = h.lifecycle.get(created.id).await.unwrap();
        assert_eq!(stored.images, vec![url_a]);
    }

    #[tokio::test]
    async fn test_list_failure_reports_fetch() {
        let h = harness(false, false);
        h.repo.fail(RepoCall::List);
        let (status, body) = send(&h.app, get("/api/properties")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Failed to fetch properties");
    }

    #[tokio::test]
    async fn test_oversized_body_is_413() {
        let h = harness(false, false);
        let app = h.app.layer(DefaultBodyLimit::max(64));
        let (status, body) = send(
            &app,
            mutation(
                "POST",
                "/api/properties",
                Some(&token(Role::Admin)),
                multipart(&FIELDS, &["front.jpg"]),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["message"], "Upload too large");
        assert!(h.blobs.put_order().is_empty());
    }
}
