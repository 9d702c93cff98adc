use super::{controllers, models};
use axum::routing::{delete, get, post, put, Router};

#[rustfmt::skip]
pub fn get_routes() -> Router<models::AppState> {
    Router::new()
        .route("/", get(controllers::root))
        .route("/api/properties", get(controllers::list_properties))
        .route("/api/properties", post(controllers::create_property))
        .route("/api/properties/:id", get(controllers::get_property))
        .route("/api/properties/:id", put(controllers::update_property))
        .route("/api/properties/:id", delete(controllers::delete_property))
}
