use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/next/:page", get(handlers::next_page))
        .route("/previous/:page", get(handlers::previous_page))
        .route("/send", post(handlers::send))
        .route("/edit/:post_id", post(handlers::edit))
        .route("/update-like/:action/:post_id", get(handlers::update_like))
        .route("/update-like/:action/:post_id/", get(handlers::update_like))
        .route("/profile/:username", get(handlers::profile))
        .route("/follow/:username", get(handlers::follow))
        .route("/unfollow/:username", get(handlers::unfollow))
        .route("/following", get(handlers::following))
        .route("/login", get(handlers::login_page).post(handlers::login))
        .route("/register", post(handlers::register))
        .route("/logout", get(handlers::logout))
        .route("/api/posts", get(handlers::list_posts))
        .with_state(state)
}
