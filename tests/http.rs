use network::models::{FeedPage, LikeResponse};
use network::page::{
    ACTION_ATTR, Element, LIKE_CLASS, LIKE_TARGET_ATTR, LikeOutcome, LikeTransport,
    MemoryDom, POST_ID_ATTR, PageController, PageError,
};
use once_cell::sync::Lazy;
use reqwest::{Client, StatusCode, header, redirect};
use std::future::Future;
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

struct TestServer {
    base_url: String,
    child: Child,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

static TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
static SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));

#[cfg(unix)]
mod cleanup {
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Once;

    static REGISTER: Once = Once::new();
    static PID: AtomicI32 = AtomicI32::new(0);

    pub fn register(pid: u32) {
        REGISTER.call_once(|| {
            PID.store(pid as i32, Ordering::SeqCst);
            unsafe {
                libc::atexit(on_exit);
            }
        });
    }

    extern "C" fn on_exit() {
        let pid = PID.load(Ordering::SeqCst);
        if pid > 0 {
            unsafe {
                libc::kill(pid, libc::SIGTERM);
            }
        }
    }
}

fn no_redirects() -> Client {
    Client::builder()
        .redirect(redirect::Policy::none())
        .build()
        .unwrap()
}

fn location(response: &reqwest::Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .expect("redirect has a location")
        .to_str()
        .unwrap()
}

fn set_cookie(response: &reqwest::Response) -> &str {
    response
        .headers()
        .get(header::SET_COOKIE)
        .expect("response sets a cookie")
        .to_str()
        .unwrap()
}

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn unique_data_path() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("network_http_{}_{}.json", std::process::id(), nanos));
    path.to_string_lossy().to_string()
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/api/posts")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(Duration::from_millis(100)).await;
    }
}

async fn spawn_server() -> TestServer {
    spawn_server_at(&unique_data_path()).await
}

async fn spawn_server_at(data_path: &str) -> TestServer {
    let port = pick_free_port();
    let child = Command::new(env!("CARGO_BIN_EXE_network"))
        .env("PORT", port.to_string())
        .env("BIND_ADDR", "127.0.0.1")
        .env("APP_DATA_PATH", data_path)
        .env("RUST_LOG", "info")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url).await;

    TestServer { base_url, child }
}

async fn shared_server() -> Arc<TestServer> {
    let mut guard = SERVER.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let server = Arc::new(spawn_server().await);
    *guard = Some(Arc::clone(&server));
    server
}

/// Registers `username` and returns the cookie pair the server set.
async fn register(base_url: &str, username: &str) -> String {
    let response = no_redirects()
        .post(format!("{base_url}/register"))
        .form(&[("username", username)])
        .send()
        .await
        .unwrap();
    assert!(response.status().is_redirection());
    set_cookie(&response).split(';').next().unwrap().to_string()
}

async fn create_post(base_url: &str, cookie: &str, text: &str) -> u64 {
    let client = Client::new();
    let response = client
        .post(format!("{base_url}/send"))
        .header(header::COOKIE, cookie)
        .form(&[("text", text)])
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let feed: FeedPage = client
        .get(format!("{base_url}/api/posts"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    feed.posts
        .iter()
        .find(|post| post.content == text)
        .map(|post| post.id)
        .expect("new post is on the first page")
}

async fn get_like(base_url: &str, cookie: &str, path: &str) -> LikeResponse {
    Client::new()
        .get(format!("{base_url}{path}"))
        .header(header::COOKIE, cookie)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

struct HttpTransport {
    client: Client,
    base_url: String,
    cookie: String,
}

impl LikeTransport for HttpTransport {
    fn fetch_like(
        &self,
        action: &str,
        post_id: u64,
    ) -> impl Future<Output = Result<LikeResponse, PageError>> + Send {
        let request = self
            .client
            .get(format!("{}/update-like/{action}/{post_id}", self.base_url))
            .header(header::COOKIE, self.cookie.clone());
        async move {
            let response = request
                .send()
                .await
                .map_err(|err| PageError::Transport(err.to_string()))?;
            if !response.status().is_success() {
                return Err(PageError::Status(response.status().as_u16()));
            }
            response
                .json::<LikeResponse>()
                .await
                .map_err(|err| PageError::Decode(err.to_string()))
        }
    }
}

#[tokio::test]
async fn http_like_and_unlike_track_count() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let author = register(&server.base_url, "like_author").await;
    let fan = register(&server.base_url, "like_fan").await;
    let id = create_post(&server.base_url, &author, "like me").await;

    let liked = get_like(&server.base_url, &fan, &format!("/update-like/like/{id}")).await;
    assert_eq!(liked, LikeResponse::success("like", 1));

    let again = get_like(&server.base_url, &fan, &format!("/update-like/like/{id}/")).await;
    assert_eq!(again, LikeResponse::success("nothing", 1));

    let by_author = get_like(&server.base_url, &author, &format!("/update-like/like/{id}")).await;
    assert_eq!(by_author.likes, Some(2));

    let unliked = get_like(&server.base_url, &fan, &format!("/update-like/unlike/{id}")).await;
    assert_eq!(unliked, LikeResponse::success("unlike", 1));

    let unknown = get_like(&server.base_url, &fan, &format!("/update-like/love/{id}")).await;
    assert_eq!(unknown, LikeResponse::failure());
}

#[tokio::test]
async fn http_like_requires_login_and_known_post() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let user = register(&server.base_url, "like_anon_check").await;

    let anonymous = client
        .get(format!("{}/update-like/like/1", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let missing = client
        .get(format!("{}/update-like/like/999999", server.base_url))
        .header(header::COOKIE, &user)
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    for path in ["/update-like/like/1", "/following", "/follow/like_anon_check"] {
        let stale = client
            .get(format!("{}{path}", server.base_url))
            .header(header::COOKIE, "network_user=ghost")
            .send()
            .await
            .unwrap();
        assert_eq!(stale.status(), StatusCode::UNAUTHORIZED, "{path}");
    }
    let stale_send = client
        .post(format!("{}/send", server.base_url))
        .header(header::COOKIE, "network_user=ghost")
        .form(&[("text", "from beyond")])
        .send()
        .await
        .unwrap();
    assert_eq!(stale_send.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn http_page_step_routes_redirect_and_clamp() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = no_redirects();

    for (path, expected) in [
        ("/next/1", "/?page=2"),
        ("/next/4", "/?page=5"),
        ("/previous/3", "/?page=2"),
        ("/previous/1", "/?page=1"),
        ("/previous/0", "/?page=1"),
    ] {
        let response = client
            .get(format!("{}{path}", server.base_url))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_redirection(), "{path}");
        assert_eq!(location(&response), expected, "{path}");
    }

    let far = client
        .get(format!("{}/?page=999", server.base_url))
        .send()
        .await
        .unwrap();
    assert!(far.status().is_success());
    let feed: FeedPage = client
        .get(format!("{}/api/posts?page=999", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(feed.page, feed.total_pages);
    assert!(!feed.has_next);
}

#[tokio::test]
async fn http_login_and_logout_manage_cookie() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = no_redirects();
    register(&server.base_url, "returning_user").await;

    let known = client
        .post(format!("{}/login", server.base_url))
        .form(&[("username", " returning_user ")])
        .send()
        .await
        .unwrap();
    assert!(known.status().is_redirection());
    assert_eq!(location(&known), "/");
    assert!(set_cookie(&known).starts_with("network_user=returning_user;"));

    let unknown = client
        .post(format!("{}/login", server.base_url))
        .form(&[("username", "never_registered")])
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status(), StatusCode::OK);
    assert!(unknown.headers().get(header::SET_COOKIE).is_none());
    assert!(unknown.text().await.unwrap().contains("Invalid username."));

    let logout = client
        .get(format!("{}/logout", server.base_url))
        .header(header::COOKIE, "network_user=returning_user")
        .send()
        .await
        .unwrap();
    assert!(logout.status().is_redirection());
    assert_eq!(location(&logout), "/");
    let cleared = set_cookie(&logout);
    assert!(cleared.starts_with("network_user=;"));
    assert!(cleared.contains("Max-Age=0"));
}

#[tokio::test]
async fn http_likes_survive_restart() {
    let _guard = TEST_LOCK.lock().await;
    let data_path = unique_data_path();

    let id = {
        let server = spawn_server_at(&data_path).await;
        let author = register(&server.base_url, "durable_author").await;
        let fan = register(&server.base_url, "durable_fan").await;
        let id = create_post(&server.base_url, &author, "still here").await;
        let liked = get_like(&server.base_url, &fan, &format!("/update-like/like/{id}")).await;
        assert_eq!(liked.likes, Some(1));
        id
    };

    let server = spawn_server_at(&data_path).await;
    let feed: FeedPage = Client::new()
        .get(format!("{}/api/posts", server.base_url))
        .header(header::COOKIE, "network_user=durable_fan")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let post = feed
        .posts
        .iter()
        .find(|post| post.id == id)
        .expect("post restored from disk");
    assert_eq!(post.content, "still here");
    assert_eq!(post.likes, 1);
    assert!(post.liked);

    let again = get_like(&server.base_url, "network_user=durable_fan", &format!("/update-like/like/{id}")).await;
    assert_eq!(again, LikeResponse::success("nothing", 1));

    drop(server);
    let _ = std::fs::remove_file(&data_path);
}

#[tokio::test]
async fn http_edit_is_author_only() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let author = register(&server.base_url, "edit_author").await;
    let other = register(&server.base_url, "edit_other").await;
    let id = create_post(&server.base_url, &author, "first draft").await;

    let denied = client
        .post(format!("{}/edit/{id}", server.base_url))
        .header(header::COOKIE, &other)
        .form(&[("text", "vandalized")])
        .send()
        .await
        .unwrap();
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);

    let page = client
        .post(format!("{}/edit/{id}", server.base_url))
        .header(header::COOKIE, &author)
        .form(&[("text", "second draft")])
        .send()
        .await
        .unwrap();
    assert!(page.status().is_success());
    let html = page.text().await.unwrap();
    assert!(html.contains(&format!(r#"<p id="content{id}" class="content">second draft</p>"#)));
}

#[tokio::test]
async fn http_following_feed_shows_followed_posts() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let writer = register(&server.base_url, "feed_writer").await;
    let reader = register(&server.base_url, "feed_reader").await;
    create_post(&server.base_url, &writer, "for my followers").await;

    let before = client
        .get(format!("{}/following", server.base_url))
        .header(header::COOKIE, &reader)
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(!before.contains("for my followers"));

    let profile = client
        .get(format!("{}/follow/feed_writer", server.base_url))
        .header(header::COOKIE, &reader)
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(profile.contains("1 Followers"));
    assert!(profile.contains(r#"href="/unfollow/feed_writer""#));

    let after = client
        .get(format!("{}/following", server.base_url))
        .header(header::COOKIE, &reader)
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(after.contains("for my followers"));
}

#[tokio::test]
async fn page_controller_updates_counter_from_server() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let author = register(&server.base_url, "page_author").await;
    let fan = register(&server.base_url, "page_fan").await;
    let id = create_post(&server.base_url, &author, "click the heart").await;

    let mut dom = MemoryDom::new();
    dom.insert(
        Element::new()
            .with_id(format!("likeCount{id}"))
            .with_text("0 Likes"),
    );
    let button = dom.insert(
        Element::new()
            .with_class(LIKE_CLASS)
            .with_attr(ACTION_ATTR, "like")
            .with_attr(POST_ID_ATTR, id.to_string())
            .with_attr(LIKE_TARGET_ATTR, format!("likeCount{id}")),
    );
    let controller = PageController::bind(&dom);
    let transport = HttpTransport {
        client: Client::new(),
        base_url: server.base_url.clone(),
        cookie: fan,
    };

    let toggle = controller.like_for(button).expect("like button bound");
    let outcome = toggle.click(&mut dom, &transport).await;
    assert_eq!(outcome, LikeOutcome::Updated { post_id: id, likes: 1 });
    assert_eq!(dom.text_of(&format!("likeCount{id}")), Some("1 Likes"));

    let anonymous = HttpTransport {
        client: Client::new(),
        base_url: server.base_url.clone(),
        cookie: String::new(),
    };
    let failed = toggle.click(&mut dom, &anonymous).await;
    assert_eq!(failed, LikeOutcome::Failed(PageError::Status(401)));
    assert_eq!(dom.text_of(&format!("likeCount{id}")), Some("1 Likes"));
}
