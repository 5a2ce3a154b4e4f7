//! Users-related HTTP API.
mod delete;
mod get;
mod list;
mod update;

use axum::Router;
use axum::routing::{get, post};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        // `POST /users` goes to `create`, `GET /users` to `list`.
        .route("/users", post(super::create::handler).get(list::handler))
        // `GET`, `PUT` and `DELETE /users/{user_id}`.
        .route(
            "/users/{user_id}",
            get(get::handler)
                .put(update::handler)
                .delete(delete::handler),
        )
}
