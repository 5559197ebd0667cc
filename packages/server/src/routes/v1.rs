use axum::routing::{get, post};
use utoipa_axum::router::OpenApiRouter;

use crate::handlers;
use crate::state::AppState;

type Router = OpenApiRouter<AppState>;

pub fn routes() -> Router {
    Router::new()
        .nest("/auth", auth_routes())
        .nest("/projects", project_routes())
        .nest("/contact", contact_routes())
        .merge(assistant_routes())
}

fn auth_routes() -> Router {
    Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/me", get(handlers::auth::me))
}

fn project_routes() -> Router {
    Router::new()
        .route(
            "/",
            get(handlers::project::list_projects).post(handlers::project::create_project),
        )
        .route("/featured", get(handlers::project::list_featured_projects))
        .route(
            "/{id}",
            get(handlers::project::get_project)
                .patch(handlers::project::update_project)
                .delete(handlers::project::delete_project),
        )
        .layer(handlers::project::project_upload_body_limit())
}

fn contact_routes() -> Router {
    Router::new().route("/", post(handlers::contact::submit_contact))
}

fn assistant_routes() -> Router {
    Router::new()
        .route("/chat", post(handlers::assistant::chat))
        .route(
            "/projectgen",
            post(handlers::assistant::generate_project_ideas),
        )
}
