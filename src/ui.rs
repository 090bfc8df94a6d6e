use crate::models::{FeedPage, PostView, ProfileView};
use crate::page::like_label;

pub struct FeedLinks<'a> {
    pub base: &'a str,
    pub path_style: bool,
}

impl FeedLinks<'_> {
    fn page_href(&self, page: usize, forward: bool) -> String {
        if self.path_style {
            // `/next/N` and `/previous/N` step from the page they name.
            let (route, from) = if forward {
                ("next", page - 1)
            } else {
                ("previous", page + 1)
            };
            format!("/{route}/{from}")
        } else {
            format!("{}?page={page}", self.base)
        }
    }
}

pub fn render_feed(
    title: &str,
    viewer: Option<&str>,
    feed: &FeedPage,
    links: &FeedLinks<'_>,
    compose: bool,
) -> String {
    let mut body = String::new();
    if compose && viewer.is_some() {
        body.push_str(COMPOSE_FORM);
    }
    body.push_str(&render_posts(viewer, feed, links));
    render_layout(title, viewer, &body)
}

pub fn render_profile(viewer: Option<&str>, profile: &ProfileView) -> String {
    let name = escape(&profile.username);
    let follow_button = match viewer {
        Some(_) if profile.is_self => String::new(),
        Some(_) if profile.is_following => {
            format!(r#"<a class="pill" href="/unfollow/{name}">Unfollow</a>"#)
        }
        Some(_) => format!(r#"<a class="pill" href="/follow/{name}">Follow</a>"#),
        None => String::new(),
    };
    let header = format!(
        r#"<section class="profile">
  <h2>{name}</h2>
  <p class="subtitle"><span id="followerCount">{followers} Followers</span> &middot; <span id="followingCount">{following} Following</span></p>
  {follow_button}
</section>
"#,
        followers = profile.follower_count,
        following = profile.following_count,
    );
    let base = format!("/profile/{name}");
    let links = FeedLinks {
        base: &base,
        path_style: false,
    };
    let body = header + &render_posts(viewer, &profile.feed, &links);
    render_layout(&profile.username, viewer, &body)
}

pub fn render_login(message: Option<&str>) -> String {
    let notice = message
        .map(|msg| format!(r#"<p class="status error">{}</p>"#, escape(msg)))
        .unwrap_or_default();
    let body = format!(
        r#"{notice}<section class="card auth">
  <form action="/login" method="post">
    <h2>Log in</h2>
    <input name="username" placeholder="Username" autocomplete="username" required />
    <button type="submit">Log in</button>
  </form>
  <form action="/register" method="post">
    <h2>Register</h2>
    <input name="username" placeholder="Username" required />
    <button type="submit">Register</button>
  </form>
</section>
"#
    );
    render_layout("Log in", None, &body)
}

fn render_posts(viewer: Option<&str>, feed: &FeedPage, links: &FeedLinks<'_>) -> String {
    let mut out = String::new();
    if feed.posts.is_empty() {
        out.push_str(r#"<p class="subtitle">No posts yet.</p>"#);
    }
    for post in &feed.posts {
        out.push_str(&render_post(viewer, post));
    }

    out.push_str(r#"<nav class="pager">"#);
    if feed.has_prev {
        out.push_str(&format!(
            r#"<a class="pill" href="{}">Previous</a>"#,
            links.page_href(feed.page - 1, false)
        ));
    }
    out.push_str(&format!(
        r#"<span>Page {} of {}</span>"#,
        feed.page, feed.total_pages
    ));
    if feed.has_next {
        out.push_str(&format!(
            r#"<a class="pill" href="{}">Next</a>"#,
            links.page_href(feed.page + 1, true)
        ));
    }
    out.push_str("</nav>\n");
    out
}

pub fn render_post(viewer: Option<&str>, post: &PostView) -> String {
    let id = post.id;
    let author = escape(&post.author);
    let content = escape(&post.content);
    let when = post.created_at.format("%b %-d %Y, %H:%M");

    let edit = if post.editable {
        format!(
            r#"
  <form id="edit{id}" class="edit-form" action="/edit/{id}" method="post" hidden>
    <textarea name="text" maxlength="999">{content}</textarea>
    <button type="submit">Save</button>
  </form>
  <button id="{id}" class="edit" type="button" data-edit-target="edit{id}" data-content-target="content{id}">Edit</button>"#
        )
    } else {
        String::new()
    };

    let like = if viewer.is_some() {
        let (action, label) = if post.liked {
            ("unlike", "Unlike")
        } else {
            ("like", "Like")
        };
        format!(
            r#"
  <button class="like-button" type="button" action-type="{action}" post-id="{id}" data-like-target="likeCount{id}">{label}</button>"#
        )
    } else {
        String::new()
    };

    format!(
        r#"<article class="card post">
  <header><a href="/profile/{author}">{author}</a> <time>{when}</time></header>
  <p id="content{id}" class="content">{content}</p>{edit}
  <footer><span id="likeCount{id}" class="likes">{likes}</span>{like}</footer>
</article>
"#,
        likes = like_label(post.likes),
    )
}

fn render_layout(title: &str, viewer: Option<&str>, body: &str) -> String {
    let nav = match viewer {
        Some(name) => {
            let name = escape(name);
            format!(
                r#"<a href="/profile/{name}"><strong>{name}</strong></a><a href="/">All Posts</a><a href="/following">Following</a><a href="/logout">Log Out</a>"#
            )
        }
        None => r#"<a href="/">All Posts</a><a href="/login">Log In</a>"#.to_string(),
    };
    LAYOUT_HTML
        .replace("{{TITLE}}", &escape(title))
        .replace("{{NAV}}", &nav)
        .replace("{{SCRIPT}}", PAGE_SCRIPT)
        .replace("{{BODY}}", body)
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

const COMPOSE_FORM: &str = r#"<form class="card compose" action="/send" method="post">
  <textarea name="text" maxlength="999" placeholder="What's happening?" required></textarea>
  <button type="submit">Post</button>
</form>
"#;

/// Browser side of the post-page controller in [`crate::page`].
pub const PAGE_SCRIPT: &str = r#"    document.addEventListener('DOMContentLoaded', () => {
      const byId = (id) => (id ? document.getElementById(id) : null);

      document.querySelectorAll('.edit').forEach((button) => {
        const form = byId(button.dataset.editTarget || `edit${button.id}`);
        const content = byId(button.dataset.contentTarget || `content${button.id}`);
        if (!form || !content) {
          console.warn(`edit button ${button.id} has no form/content pair`);
          return;
        }
        button.addEventListener('click', () => {
          form.removeAttribute('hidden');
          content.setAttribute('hidden', 'true');
        });
      });

      document.querySelectorAll('.like-button').forEach((button) => {
        button.addEventListener('click', () => {
          const action = button.getAttribute('action-type');
          const rawId = (button.getAttribute('post-id') || '').trim();
          if (!action) {
            console.error('like button without an action-type');
            return;
          }
          if (!/^[0-9]+$/.test(rawId)) {
            console.error(`'${rawId}' is not a post id`);
            return;
          }
          const postId = Number(rawId);
          const counter = byId(button.dataset.likeTarget || `likeCount${postId}`);

          fetch(`/update-like/${action}/${postId}`)
            .then((res) => {
              if (!res.ok) {
                throw new Error(`server answered ${res.status}`);
              }
              return res.json();
            })
            .then((data) => {
              if (typeof data.likes !== 'number') {
                return;
              }
              if (!counter) {
                throw new Error(`no counter for post ${postId}`);
              }
              counter.textContent = `${data.likes} Likes`;
            })
            .catch((err) => console.error('like request failed:', err));
        });
      });
    });
"#;

const LAYOUT_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>{{TITLE}} | Network</title>
  <style>
    :root {
      --bg-1: #f8f3e6;
      --ink: #2b2a28;
      --accent: #ff6b4a;
      --accent-2: #2f4858;
      --card: rgba(255, 255, 255, 0.9);
      --shadow: 0 12px 32px rgba(47, 72, 88, 0.14);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      background: linear-gradient(135deg, var(--bg-1), #ffe9d4 60%, #f9f2e9 100%);
      color: var(--ink);
      font-family: "Trebuchet MS", sans-serif;
      min-height: 100vh;
    }

    nav.top {
      display: flex;
      gap: 18px;
      padding: 16px 24px;
      background: var(--accent-2);
    }

    nav.top a {
      color: white;
      text-decoration: none;
    }

    main {
      width: min(720px, 100%);
      margin: 0 auto;
      padding: 24px 16px 48px;
      display: grid;
      gap: 16px;
    }

    .card {
      background: var(--card);
      border-radius: 18px;
      box-shadow: var(--shadow);
      padding: 18px;
      display: grid;
      gap: 10px;
    }

    .post header time,
    .subtitle {
      color: #8b857d;
      font-size: 0.9rem;
    }

    textarea {
      width: 100%;
      min-height: 80px;
      font: inherit;
    }

    button,
    .pill {
      border: none;
      border-radius: 999px;
      padding: 6px 16px;
      background: var(--accent);
      color: white;
      font: inherit;
      cursor: pointer;
      text-decoration: none;
      justify-self: start;
    }

    .post footer {
      display: flex;
      align-items: center;
      gap: 12px;
    }

    .pager {
      display: flex;
      justify-content: center;
      align-items: center;
      gap: 12px;
    }

    .status.error {
      color: #b42318;
    }
  </style>
</head>
<body>
  <nav class="top">{{NAV}}</nav>
  <main>
    {{BODY}}
  </main>

  <script>
{{SCRIPT}}
  </script>
</body>
</html>
"#;
