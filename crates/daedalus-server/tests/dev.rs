//! The development handler over a scanned pages directory.

use std::path::Path;
use std::sync::Arc;

use daedalus_config::{OutputMode, SiteConfig};
use daedalus_core::{
    body_bytes, fixtures, page_fn, PageOutput, RenderError, Response, StaticPath, StaticPathsFn,
};
use daedalus_middleware::{RenderUnit, UnitMap};
use daedalus_router::{Params, RouteDescriptor};
use daedalus_server::{DevHandler, RenderOptions};
use http::StatusCode;

fn touch(root: &Path, file: &str) {
    let path = root.join(file);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, "").unwrap();
}

fn page(body: &'static str) -> RenderUnit {
    RenderUnit::page(page_fn(move |_ctx, _api| async move { Ok(PageOutput::from(body)) }))
}

fn echo_param(name: &'static str) -> RenderUnit {
    RenderUnit::page(page_fn(move |_ctx, api| async move {
        let value = api.param(name).unwrap_or_default().to_string();
        Ok(PageOutput::Html(format!("{name}={value}")))
    }))
}

fn static_paths(name: &'static str, values: &'static [&'static str]) -> StaticPathsFn {
    Arc::new(move |_route: &RouteDescriptor| {
        Ok::<_, RenderError>(
            values
                .iter()
                .map(|value| StaticPath::new(Params::from([(name, *value)])))
                .collect::<Vec<_>>(),
        )
    })
}

fn units() -> UnitMap {
    UnitMap::new()
        .unit("index.html", page("home"))
        .unit("about.html", page("about"))
        .unit("contact.html", page("contact"))
        .unit("404.html", page("Not Found"))
        .unit(
            "blog/[slug].html",
            echo_param("slug").with_static_paths(static_paths("slug", &["first"])),
        )
        .unit(
            "blog/[...rest].html",
            echo_param("rest").with_static_paths(static_paths("rest", &["second", "archive/2020"])),
        )
        .unit(
            "broken.html",
            RenderUnit::page(page_fn(|_ctx, _api| async {
                Err::<PageOutput, _>(RenderError::render("boom <script>"))
            })),
        )
}

fn site(pages: &Path) -> SiteConfig {
    let mut config = SiteConfig::development();
    config.pages_dir = pages.to_path_buf();
    config.output = OutputMode::Static;
    config
        .server
        .headers
        .insert("x-frame-options".to_string(), "DENY".to_string());
    config
}

fn handler(pages: &Path) -> DevHandler {
    for file in [
        "index.html",
        "about.html",
        "404.html",
        "broken.html",
        "blog/[slug].html",
        "blog/[...rest].html",
    ] {
        touch(pages, file);
    }
    DevHandler::new(site(pages), units()).unwrap()
}

async fn text(response: Response) -> String {
    String::from_utf8(body_bytes(response.into_body()).await.to_vec()).unwrap()
}

#[tokio::test]
async fn test_serves_scanned_pages() {
    let dir = tempfile::tempdir().unwrap();
    let dev = handler(dir.path());
    assert_eq!(dev.routes().len(), 6);

    let response = dev.handle(fixtures::get("/"), RenderOptions::new()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
    assert_eq!(text(response).await, "home");
}

#[tokio::test]
async fn test_html_suffix_is_retried() {
    let dir = tempfile::tempdir().unwrap();
    let dev = handler(dir.path());

    let response = dev.handle(fixtures::get("/about.html"), RenderOptions::new()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(text(response).await, "about");

    let response = dev.handle(fixtures::get("/index.html"), RenderOptions::new()).await;
    assert_eq!(text(response).await, "home");
}

#[tokio::test]
async fn test_static_path_miss_tries_next_candidate() {
    let dir = tempfile::tempdir().unwrap();
    let dev = handler(dir.path());

    let response = dev.handle(fixtures::get("/blog/first"), RenderOptions::new()).await;
    assert_eq!(text(response).await, "slug=first");

    let response = dev.handle(fixtures::get("/blog/second"), RenderOptions::new()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(text(response).await, "rest=second");

    let response = dev.handle(fixtures::get("/blog/unknown"), RenderOptions::new()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(text(response).await, "Not Found");
}

#[tokio::test]
async fn test_render_failure_shows_escaped_error_document() {
    let dir = tempfile::tempdir().unwrap();
    let dev = handler(dir.path());

    let response = dev.handle(fixtures::get("/broken"), RenderOptions::new()).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
    let body = text(response).await;
    assert!(body.contains("500 Internal Server Error"));
    assert!(body.contains("boom &lt;script&gt;"));
}

#[tokio::test]
async fn test_missing_404_page_uses_error_document() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "index.html");
    let dev = DevHandler::new(site(dir.path()), units()).unwrap();

    let response = dev.handle(fixtures::get("/nowhere"), RenderOptions::new()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(text(response).await.contains("No page found for /nowhere"));
}

#[tokio::test]
async fn test_reload_picks_up_new_pages() {
    let dir = tempfile::tempdir().unwrap();
    let dev = handler(dir.path());

    let response = dev.handle(fixtures::get("/contact"), RenderOptions::new()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    touch(dir.path(), "contact.html");
    assert_eq!(dev.reload().unwrap(), 7);

    let response = dev.handle(fixtures::get("/contact"), RenderOptions::new()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(text(response).await, "contact");
}

#[test]
fn test_missing_pages_dir_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = DevHandler::new(site(&dir.path().join("missing")), units());
    assert!(result.is_err());
}
