use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    #[serde(default)]
    pub following: BTreeSet<String>,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: u64,
    pub author: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub liked_by: BTreeSet<String>,
}

impl Post {
    pub fn likes(&self) -> u64 {
        self.liked_by.len() as u64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppData {
    #[serde(default)]
    pub users: BTreeMap<String, User>,
    #[serde(default)]
    pub posts: BTreeMap<u64, Post>,
    #[serde(default = "first_post_id")]
    pub next_post_id: u64,
}

impl Default for AppData {
    fn default() -> Self {
        Self {
            users: BTreeMap::new(),
            posts: BTreeMap::new(),
            next_post_id: first_post_id(),
        }
    }
}

fn first_post_id() -> u64 {
    1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LikeAction {
    Like,
    Unlike,
}

impl LikeAction {
    pub fn as_str(self) -> &'static str {
        match self {
            LikeAction::Like => "like",
            LikeAction::Unlike => "unlike",
        }
    }
}

impl fmt::Display for LikeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LikeAction {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "like" => Ok(LikeAction::Like),
            "unlike" => Ok(LikeAction::Unlike),
            other => Err(format!("unknown like action '{other}'")),
        }
    }
}

/// Body of `/update-like/{action}/{post_id}`.
///
/// `likes` is absent on the failure response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likes: Option<u64>,
}

impl LikeResponse {
    pub fn success(action: &str, likes: u64) -> Self {
        Self {
            status: "success".to_string(),
            action: Some(action.to_string()),
            likes: Some(likes),
        }
    }

    pub fn failure() -> Self {
        Self {
            status: "failure".to_string(),
            action: None,
            likes: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostView {
    pub id: u64,
    pub author: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub likes: u64,
    pub liked: bool,
    pub editable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedPage {
    pub posts: Vec<PostView>,
    pub page: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub username: String,
    pub follower_count: usize,
    pub following_count: usize,
    pub is_following: bool,
    pub is_self: bool,
    pub feed: FeedPage,
}

#[derive(Debug, Deserialize)]
pub struct TextForm {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct UsernameForm {
    pub username: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct PageQuery {
    pub page: Option<usize>,
}
