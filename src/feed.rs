use crate::models::{AppData, FeedPage, Post, PostView};

pub const PAGE_SIZE: usize = 10;

pub enum FeedScope<'a> {
    All,
    Author(&'a str),
    FollowedBy(&'a str),
}

impl FeedScope<'_> {
    fn includes(&self, data: &AppData, post: &Post) -> bool {
        match self {
            FeedScope::All => true,
            FeedScope::Author(author) => post.author == *author,
            FeedScope::FollowedBy(viewer) => data
                .users
                .get(*viewer)
                .is_some_and(|user| user.following.contains(&post.author)),
        }
    }
}

/// Builds one page of a feed, newest first. `page` is 1-based and clamped
/// into the available range.
pub fn page(data: &AppData, scope: &FeedScope<'_>, viewer: Option<&str>, page: usize) -> FeedPage {
    let mut posts: Vec<&Post> = data
        .posts
        .values()
        .filter(|post| scope.includes(data, post))
        .collect();
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

    let total_pages = posts.len().div_ceil(PAGE_SIZE).max(1);
    let page = page.clamp(1, total_pages);
    let posts = posts
        .into_iter()
        .skip((page - 1) * PAGE_SIZE)
        .take(PAGE_SIZE)
        .map(|post| to_view(post, viewer))
        .collect();

    FeedPage {
        posts,
        page,
        total_pages,
        has_next: page < total_pages,
        has_prev: page > 1,
    }
}

fn to_view(post: &Post, viewer: Option<&str>) -> PostView {
    PostView {
        id: post.id,
        author: post.author.clone(),
        content: post.content.clone(),
        created_at: post.created_at,
        likes: post.likes(),
        liked: viewer.is_some_and(|name| post.liked_by.contains(name)),
        editable: viewer == Some(post.author.as_str()),
    }
}
