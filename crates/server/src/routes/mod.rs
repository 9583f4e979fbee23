pub mod admin;
pub mod answers;
pub mod auth;
pub mod catalog;
pub mod contact;
pub mod health;
pub mod profile;

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::state::AppState;

/// Creates the full router: public routes plus everything behind a bearer
/// session.
pub fn create_router(state: AppState) -> Router {
    let public = Router::new()
        .merge(health::routes())
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/forgot_password", post(auth::forgot_password))
        .route("/contact", post(contact::submit));

    let protected = Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/check_answer", post(answers::check_answer))
        .route("/submit_mcq_answer", post(answers::submit_mcq_answer))
        .route("/modules", get(catalog::list_modules))
        .route("/modules/:id", get(catalog::module_detail))
        .route("/lessons/:id", get(catalog::lesson_detail))
        .route(
            "/profile",
            get(profile::show)
                .post(profile::update)
                .delete(profile::delete_account),
        )
        .route("/profile/password", post(profile::change_password))
        .nest("/admin", admin::routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            crate::auth::auth_required,
        ));

    public.merge(protected).with_state(state)
}
