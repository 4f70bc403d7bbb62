//! Client navigation against the fixture app: hydration, clicks,
//! prefetching, cancellation, redirects and error pages.

use std::sync::atomic::Ordering;

use page_router::hydration::ScrollPosition;
use page_router::navigation::{NavigationResult, NavigationState};
use page_router::preload::PreloadValue;

mod common;

use common::{eventually, App};

fn committed_path(result: &NavigationResult) -> &str {
    match result {
        NavigationResult::Committed { url, .. } => &url.path,
        other => panic!("expected a committed navigation, got {:?}", other),
    }
}

fn committed_status(result: &NavigationResult) -> u16 {
    match result {
        NavigationResult::Committed { status, .. } => *status,
        other => panic!("expected a committed navigation, got {:?}", other),
    }
}

#[tokio::test]
async fn test_hydrates_server_render() {
    let app = App::new("");
    let client = app.hydrated("/").await;

    assert!(client.document.contains("<h1>Great success!</h1>"));
    assert!(client.document.contains("root preload function ran: true"));
    assert_eq!(client.history.entries(), vec!["/"]);
    assert_eq!(client.navigator.location().unwrap().path, "/");
}

#[tokio::test]
async fn test_hydration_reuses_server_data() {
    let app = App::new("");
    let client = app.hydrated("/blog").await;

    assert!(client.document.contains("What is Sapper?"));
    assert_eq!(app.blog_hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_click_navigates() {
    let app = App::new("");
    let client = app.hydrated("/").await;

    let result = client.navigator.click("about").await;
    assert_eq!(committed_path(&result), "/about");
    assert_eq!(committed_status(&result), 200);

    assert!(client.document.contains("<h1>About this site</h1>"));
    assert!(!client.document.contains("Great success!"));
    assert_eq!(client.history.entries(), vec!["/", "/about"]);
    assert_eq!(client.document.scroll(), Some(ScrollPosition::Top));
    assert_eq!(client.navigator.state(), NavigationState::Idle);
}

#[tokio::test]
async fn test_click_under_base_path() {
    let app = App::new("/custom-basepath");
    let client = app.hydrated("/").await;

    let result = client.navigator.click("about").await;
    assert_eq!(committed_path(&result), "/about");
    assert_eq!(
        client.history.entries(),
        vec!["/custom-basepath/", "/custom-basepath/about"]
    );
}

#[tokio::test]
async fn test_goto_navigates() {
    let app = App::new("");
    let client = app.hydrated("/").await;

    let result = client.navigator.goto("blog/what-is-sapper").await;
    assert_eq!(committed_path(&result), "/blog/what-is-sapper");
    assert!(client.document.contains("<h1>What is Sapper?</h1>"));
}

#[tokio::test]
async fn test_deep_link_scrolls_to_element() {
    let app = App::new("");
    let client = app.hydrated("/").await;

    client.navigator.click("about#four").await;
    assert_eq!(
        client.document.scroll(),
        Some(ScrollPosition::Element("four".into()))
    );
    assert_eq!(client.history.entries(), vec!["/", "/about#four"]);
}

#[tokio::test]
async fn test_fragment_change_skips_preload() {
    let app = App::new("");
    let client = app.hydrated("/blog").await;
    assert_eq!(app.blog_hits.load(Ordering::SeqCst), 1);

    let result = client.navigator.click("blog#top").await;
    assert!(result.is_committed());
    assert_eq!(app.blog_hits.load(Ordering::SeqCst), 1);
    assert_eq!(client.history.entries(), vec!["/blog", "/blog#top"]);
}

#[tokio::test]
async fn test_prefetch_is_reused() {
    let app = App::new("");
    let client = app.hydrated("/").await;
    assert_eq!(app.blog_hits.load(Ordering::SeqCst), 0);

    assert!(client.navigator.prefetch("blog"));
    eventually(|| app.blog_hits.load(Ordering::SeqCst) == 1).await;

    let result = client.navigator.click("blog").await;
    assert_eq!(committed_path(&result), "/blog");
    assert!(client.document.contains("What is Sapper?"));
    assert_eq!(app.blog_hits.load(Ordering::SeqCst), 1);
    assert!(client.navigator.prefetch_cache().is_empty());
}

#[tokio::test]
async fn test_prefetch_ignores_foreign_links() {
    let app = App::new("");
    let client = app.hydrated("/").await;

    assert!(!client.navigator.prefetch("https://example.com/blog"));
    assert!(!client.navigator.prefetch("blog.json"));
    assert!(!client.navigator.prefetch("fizz"));
}

#[tokio::test]
async fn test_sets_preloading_state() {
    let app = App::new("");
    let client = app.hydrated("/").await;
    let mut state = client.navigator.subscribe_state();

    let navigator = client.navigator.clone();
    let slow = tokio::spawn(async move { navigator.click("slow-preload").await });

    state.wait_for(|s| s.is_preloading()).await.unwrap();
    assert!(!client.document.contains("Slow preload"));

    app.fulfil();
    let result = slow.await.unwrap();
    assert_eq!(committed_path(&result), "/slow-preload");
    assert!(client.document.contains("<h1>Slow preload</h1>"));
    assert_eq!(client.navigator.state(), NavigationState::Idle);
}

#[tokio::test]
async fn test_superseded_navigation_is_discarded() {
    let app = App::new("");
    let client = app.hydrated("/").await;
    let mut state = client.navigator.subscribe_state();

    let navigator = client.navigator.clone();
    let slow = tokio::spawn(async move { navigator.click("slow-preload").await });
    state.wait_for(|s| s.is_preloading()).await.unwrap();

    let about = client.navigator.click("about").await;
    assert_eq!(committed_path(&about), "/about");

    app.fulfil();
    let slow = slow.await.unwrap();
    assert!(matches!(slow, NavigationResult::Discarded { seq: 1 }));

    assert!(client.document.contains("<h1>About this site</h1>"));
    assert!(!client.document.contains("Slow preload"));
    assert_eq!(client.history.entries(), vec!["/", "/about"]);
}

#[tokio::test]
async fn test_client_redirect() {
    let app = App::new("");
    let client = app.hydrated("/").await;

    let result = client.navigator.click("redirect-from").await;
    assert_eq!(committed_path(&result), "/redirect-to");
    assert!(client.document.contains("<h1>redirected</h1>"));
    assert_eq!(client.history.entries(), vec!["/", "/redirect-to"]);
}

#[tokio::test]
async fn test_client_redirect_to_root_under_base_path() {
    let app = App::new("/custom-basepath");
    let client = app.hydrated("/about").await;

    let result = client.navigator.click("redirect-root").await;
    assert_eq!(committed_path(&result), "/");
    assert!(client.document.contains("<h1>Great success!</h1>"));
    assert_eq!(
        client.history.entries(),
        vec!["/custom-basepath/about", "/custom-basepath/"]
    );
}

#[tokio::test]
async fn test_client_error_pages() {
    let app = App::new("");
    let client = app.hydrated("/").await;

    let result = client.navigator.click("blog/nope").await;
    assert_eq!(committed_path(&result), "/blog/nope");
    assert_eq!(committed_status(&result), 404);
    assert!(client.document.contains("<h1>404</h1>"));
    assert!(client.document.contains("<p>Not found</p>"));

    let result = client.navigator.click("blog/throw-an-error").await;
    assert_eq!(committed_status(&result), 500);
    assert!(client.document.contains("<p>Internal server error</p>"));
    assert!(!client.document.contains("nope"));

    let result = client.navigator.goto("about").await;
    assert_eq!(committed_status(&result), 200);
    assert!(client.document.contains("<h1>About this site</h1>"));
    assert!(!client.document.contains("Internal server error"));
}

#[tokio::test]
async fn test_failed_mount_keeps_previous_page() {
    let app = App::new("");
    let client = app.hydrated("/").await;

    let result = client.navigator.goto("unmountable").await;
    match result {
        NavigationResult::Failed { message } => assert!(message.contains("boom"), "{}", message),
        other => panic!("expected a failed navigation, got {:?}", other),
    }

    assert_eq!(client.history.entries(), vec!["/"]);
    assert_eq!(client.navigator.location().unwrap().path, "/");
    let page = client.navigator.store().get("page").unwrap();
    assert_eq!(page.get("path").and_then(PreloadValue::as_str), Some("/"));
    assert!(client.document.contains("<h1>Great success!</h1>"));
    assert!(client.document.contains("root preload function ran: true"));
    assert_eq!(client.navigator.state(), NavigationState::Idle);

    let result = client.navigator.goto("about").await;
    assert_eq!(committed_path(&result), "/about");
    assert_eq!(client.history.entries(), vec!["/", "/about"]);
}

#[tokio::test]
async fn test_unknown_route_on_client_runs_root_preload() {
    let app = App::new("");
    let client = app.hydrated("/").await;

    let result = client.navigator.goto("nowhere/to/be/found").await;
    assert_eq!(committed_status(&result), 404);
    assert!(client.document.contains("root preload function ran: true"));
}

#[tokio::test]
async fn test_server_routes_and_ignored_paths_are_left_to_host() {
    let app = App::new("");
    let client = app.hydrated("/").await;

    for href in ["echo/server-route/hi", "fizz", "fizzer", "buzz", "foobar", "hello", "https://example.com/"] {
        let result = client.navigator.click(href).await;
        assert_eq!(
            result,
            NavigationResult::External { href: href.to_string() },
            "{} should be left to the host",
            href
        );
    }
    assert_eq!(client.history.entries(), vec!["/"]);
}

#[tokio::test]
async fn test_layout_is_reused_across_sibling_pages() {
    let app = App::new("");
    let client = app.hydrated("/foo/bar/baz").await;

    assert!(client.document.contains("y: bar 1"));
    assert!(client.document.contains("z: baz 1"));
    assert!(client.document.contains("child segment: baz"));

    let result = client.navigator.click("foo/bar/qux").await;
    assert!(result.is_committed());

    assert!(client.document.contains("y: bar 1"));
    assert!(client.document.contains("z: qux 2"));
    assert!(client.document.contains("child segment: qux"));
    assert_eq!(app.counters.layout.load(Ordering::SeqCst), 1);
    assert_eq!(app.counters.page.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_popstate_does_not_push() {
    let app = App::new("");
    let client = app.hydrated("/").await;
    client.navigator.click("about").await;

    let back = client.history.back().unwrap();
    assert_eq!(back, "/");
    let result = client.navigator.popstate(&back).await;
    assert_eq!(committed_path(&result), "/");
    assert!(client.document.contains("<h1>Great success!</h1>"));
    assert_eq!(client.history.entries(), vec!["/", "/about"]);
}

#[tokio::test]
async fn test_encoded_links() {
    let app = App::new("");
    let client = app.hydrated("/").await;

    client.navigator.click("fünke").await;
    assert!(client.document.contains("<h1>I'm afraid I just blue myself</h1>"));

    client.navigator.click("echo/page/encöded?message=hëllö-wörld").await;
    assert!(client.document.contains("<h1>encöded (hëllö-wörld)</h1>"));

    client.navigator.click("echo/page/empty?message").await;
    assert!(client.document.contains("<h1>empty ()</h1>"));
}

#[tokio::test]
async fn test_hydrated_store_and_values() {
    let app = App::new("");

    let client = app.hydrated("/store").await;
    assert!(client.document.contains("<h1>hello world</h1>"));
    assert_eq!(
        client.navigator.store().get("title"),
        Some(PreloadValue::from("hello world"))
    );

    let client = app.hydrated("/preload-values/set").await;
    assert!(client.document.contains("<h1>true</h1>"));

    let client = app.hydrated("/preload-values/custom-class").await;
    assert!(client.document.contains("<h1>answer: 42</h1>"));
}

#[tokio::test]
async fn test_hydrated_error_page() {
    let app = App::new("");
    let client = app.hydrated("/blog/nope").await;

    assert!(client.document.contains("<h1>404</h1>"));
    let result = client.navigator.click("blog/what-is-sapper").await;
    assert_eq!(committed_status(&result), 200);
    assert!(client.document.contains("<h1>What is Sapper?</h1>"));
}
