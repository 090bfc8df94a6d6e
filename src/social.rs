use crate::errors::AppError;
use crate::feed::{self, FeedScope};
use crate::models::{AppData, LikeAction, LikeResponse, Post, ProfileView, User};
use chrono::{DateTime, Utc};

const MAX_USERNAME_LEN: usize = 32;
const MAX_POST_LEN: usize = 999;

pub fn register(data: &mut AppData, username: &str, now: DateTime<Utc>) -> Result<String, AppError> {
    let username = username.trim();
    validate_username(username)?;
    if data.users.contains_key(username) {
        return Err(AppError::bad_request("Username already taken."));
    }

    data.users.insert(
        username.to_string(),
        User {
            username: username.to_string(),
            following: Default::default(),
            joined_at: now,
        },
    );
    Ok(username.to_string())
}

pub fn validate_username(username: &str) -> Result<(), AppError> {
    if username.is_empty() || username.chars().count() > MAX_USERNAME_LEN {
        return Err(AppError::bad_request(format!(
            "username must be 1 to {MAX_USERNAME_LEN} characters"
        )));
    }
    if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(AppError::bad_request(
            "username may only contain letters, digits and '_'",
        ));
    }
    Ok(())
}

pub fn create_post(
    data: &mut AppData,
    author: &str,
    content: &str,
    now: DateTime<Utc>,
) -> Result<u64, AppError> {
    require_actor(data, author)?;
    let content = validate_content(content)?;

    let id = data.next_post_id;
    data.next_post_id = id.saturating_add(1);
    data.posts.insert(
        id,
        Post {
            id,
            author: author.to_string(),
            content,
            created_at: now,
            liked_by: Default::default(),
        },
    );
    Ok(id)
}

pub fn edit_post(data: &mut AppData, editor: &str, post_id: u64, content: &str) -> Result<(), AppError> {
    require_actor(data, editor)?;
    let content = validate_content(content)?;
    let post = find_post(data, post_id)?;
    if post.author != editor {
        return Err(AppError::forbidden("only the author can edit a post"));
    }
    post.content = content;
    Ok(())
}

/// Applies a like or unlike by `user` on `post_id`.
///
/// Unknown actions answer with a failure body rather than an error status,
/// which is what the page script expects.
pub fn update_like(
    data: &mut AppData,
    user: &str,
    action: &str,
    post_id: u64,
) -> Result<LikeResponse, AppError> {
    require_actor(data, user)?;
    let post = find_post(data, post_id)?;
    let Ok(action) = action.parse::<LikeAction>() else {
        return Ok(LikeResponse::failure());
    };

    let changed = match action {
        LikeAction::Like => post.liked_by.insert(user.to_string()),
        LikeAction::Unlike => post.liked_by.remove(user),
    };
    let reported = if changed { action.as_str() } else { "nothing" };
    Ok(LikeResponse::success(reported, post.likes()))
}

pub fn follow(data: &mut AppData, user: &str, target: &str) -> Result<(), AppError> {
    require_actor(data, user)?;
    if user == target {
        return Err(AppError::bad_request("you cannot follow yourself"));
    }
    require_user(data, target)?;
    let me = data.users.get_mut(user).ok_or_else(AppError::unauthorized)?;
    me.following.insert(target.to_string());
    Ok(())
}

pub fn unfollow(data: &mut AppData, user: &str, target: &str) -> Result<(), AppError> {
    require_actor(data, user)?;
    require_user(data, target)?;
    let me = data.users.get_mut(user).ok_or_else(AppError::unauthorized)?;
    me.following.remove(target);
    Ok(())
}

pub fn follower_count(data: &AppData, username: &str) -> usize {
    data.users
        .values()
        .filter(|user| user.following.contains(username))
        .count()
}

pub fn profile(
    data: &AppData,
    viewer: Option<&str>,
    username: &str,
    page: usize,
) -> Result<ProfileView, AppError> {
    let user = data
        .users
        .get(username)
        .ok_or_else(|| AppError::not_found(format!("no user named '{username}'")))?;
    let is_following = viewer
        .and_then(|name| data.users.get(name))
        .is_some_and(|me| me.following.contains(username));

    Ok(ProfileView {
        username: user.username.clone(),
        follower_count: follower_count(data, username),
        following_count: user.following.len(),
        is_following,
        is_self: viewer == Some(username),
        feed: feed::page(data, &FeedScope::Author(username), viewer, page),
    })
}

/// The user acting on a request must still exist; a cookie naming a user
/// that is gone counts as not logged in.
pub fn require_actor(data: &AppData, username: &str) -> Result<(), AppError> {
    if data.users.contains_key(username) {
        Ok(())
    } else {
        Err(AppError::unauthorized())
    }
}

fn require_user(data: &AppData, username: &str) -> Result<(), AppError> {
    if data.users.contains_key(username) {
        Ok(())
    } else {
        Err(AppError::not_found(format!("no user named '{username}'")))
    }
}

fn find_post(data: &mut AppData, post_id: u64) -> Result<&mut Post, AppError> {
    data.posts
        .get_mut(&post_id)
        .ok_or_else(|| AppError::not_found(format!("no post with id {post_id}")))
}

fn validate_content(content: &str) -> Result<String, AppError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(AppError::bad_request("post text must not be empty"));
    }
    if content.chars().count() > MAX_POST_LEN {
        return Err(AppError::bad_request(format!(
            "post text must be at most {MAX_POST_LEN} characters"
        )));
    }
    Ok(content.to_string())
}
