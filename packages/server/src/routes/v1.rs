use axum::{
    Router,
    routing::{get, post, put},
};

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().nest("/projects/{id}/resources", resource_routes())
}

fn resource_routes() -> Router<AppState> {
    let reads = Router::new()
        .route("/", get(handlers::resource::list_resources))
        .route(
            "/{resource_id}",
            get(handlers::resource::download_resource)
                .delete(handlers::resource::delete_resource),
        );

    let uploads = Router::new()
        .route("/", post(handlers::resource::upload_resource))
        .route("/{resource_id}", put(handlers::resource::update_resource))
        .layer(handlers::resource::upload_body_limit());

    reads.merge(uploads)
}
