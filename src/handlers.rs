use crate::errors::AppError;
use crate::feed::{self, FeedScope};
use crate::models::{FeedPage, LikeResponse, PageQuery, TextForm, UsernameForm};
use crate::session::{current_user, login_cookie, logout_cookie, require_user};
use crate::social;
use crate::state::AppState;
use crate::ui::{FeedLinks, render_feed, render_login, render_profile};
use axum::{
    Form, Json,
    extract::{Path, Query, State},
    http::{HeaderMap, header},
    response::{Html, IntoResponse, Redirect, Response},
};
use chrono::Utc;
use tracing::info;

pub async fn index(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> Html<String> {
    let viewer = current_user(&headers);
    let data = state.data.lock().await;
    let page = feed::page(&data, &FeedScope::All, viewer.as_deref(), query.page.unwrap_or(1));
    let links = FeedLinks {
        base: "/",
        path_style: true,
    };
    Html(render_feed("All Posts", viewer.as_deref(), &page, &links, true))
}

pub async fn next_page(Path(page): Path<usize>) -> Redirect {
    Redirect::to(&format!("/?page={}", page.saturating_add(1)))
}

pub async fn previous_page(Path(page): Path<usize>) -> Redirect {
    Redirect::to(&format!("/?page={}", page.saturating_sub(1).max(1)))
}

pub async fn list_posts(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> Json<FeedPage> {
    let viewer = current_user(&headers);
    let data = state.data.lock().await;
    Json(feed::page(&data, &FeedScope::All, viewer.as_deref(), query.page.unwrap_or(1)))
}

pub async fn send(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<TextForm>,
) -> Result<Redirect, AppError> {
    let user = require_user(&headers)?;
    let id = state
        .mutate(|data| social::create_post(data, &user, &form.text, Utc::now()))
        .await?;
    info!(post_id = id, author = %user, "post created");
    Ok(Redirect::to("/"))
}

pub async fn edit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(post_id): Path<u64>,
    Form(form): Form<TextForm>,
) -> Result<Redirect, AppError> {
    let user = require_user(&headers)?;
    state
        .mutate(|data| social::edit_post(data, &user, post_id, &form.text))
        .await?;
    info!(post_id, author = %user, "post edited");
    Ok(Redirect::to("/"))
}

pub async fn update_like(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((action, post_id)): Path<(String, u64)>,
) -> Result<Json<LikeResponse>, AppError> {
    let user = require_user(&headers)?;
    let response = state
        .mutate(|data| social::update_like(data, &user, &action, post_id))
        .await?;
    info!(post_id, user = %user, action = %action, likes = ?response.likes, "like updated");
    Ok(Json(response))
}

pub async fn profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, AppError> {
    let viewer = current_user(&headers);
    let data = state.data.lock().await;
    let view = social::profile(&data, viewer.as_deref(), &username, query.page.unwrap_or(1))?;
    Ok(Html(render_profile(viewer.as_deref(), &view)))
}

pub async fn follow(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(username): Path<String>,
) -> Result<Redirect, AppError> {
    let user = require_user(&headers)?;
    state.mutate(|data| social::follow(data, &user, &username)).await?;
    info!(user = %user, target = %username, "followed");
    Ok(Redirect::to(&format!("/profile/{username}")))
}

pub async fn unfollow(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(username): Path<String>,
) -> Result<Redirect, AppError> {
    let user = require_user(&headers)?;
    state.mutate(|data| social::unfollow(data, &user, &username)).await?;
    info!(user = %user, target = %username, "unfollowed");
    Ok(Redirect::to(&format!("/profile/{username}")))
}

pub async fn following(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, AppError> {
    let user = require_user(&headers)?;
    let data = state.data.lock().await;
    social::require_actor(&data, &user)?;
    let page = feed::page(
        &data,
        &FeedScope::FollowedBy(&user),
        Some(&user),
        query.page.unwrap_or(1),
    );
    let links = FeedLinks {
        base: "/following",
        path_style: false,
    };
    Ok(Html(render_feed("Following", Some(&user), &page, &links, false)))
}

pub async fn login_page() -> Html<String> {
    Html(render_login(None))
}

pub async fn login(State(state): State<AppState>, Form(form): Form<UsernameForm>) -> Response {
    let username = form.username.trim().to_string();
    let known = state.data.lock().await.users.contains_key(&username);
    if !known {
        return Html(render_login(Some("Invalid username."))).into_response();
    }
    info!(user = %username, "logged in");
    signed_in(&username)
}

pub async fn register(State(state): State<AppState>, Form(form): Form<UsernameForm>) -> Response {
    match state
        .mutate(|data| social::register(data, &form.username, Utc::now()))
        .await
    {
        Ok(username) => {
            info!(user = %username, "registered");
            signed_in(&username)
        }
        Err(err) => (err.status, Html(render_login(Some(&err.message)))).into_response(),
    }
}

pub async fn logout() -> Response {
    ([(header::SET_COOKIE, logout_cookie())], Redirect::to("/")).into_response()
}

fn signed_in(username: &str) -> Response {
    ([(header::SET_COOKIE, login_cookie(username))], Redirect::to("/")).into_response()
}
