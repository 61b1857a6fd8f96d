//! Middleware composition through the render pipeline.

use std::sync::Arc;

use daedalus_core::{
    body_bytes, fixtures, page_fn, ApiContext, Environment, PageOutput, RenderError, Response,
    ResponseExt,
};
use daedalus_middleware::{
    middleware_fn, sequence, I18nMiddleware, Middleware, Pipeline, RenderUnit,
};
use daedalus_router::{RouteDescriptor, RoutingStrategy};
use http::{HeaderValue, StatusCode};
use serde_json::{json, Value};

fn trace(ctx: &ApiContext, entry: &str) {
    let mut trail = match ctx.locals().get("trail") {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    };
    trail.push(json!(entry));
    ctx.locals().insert("trail", Value::Array(trail));
}

fn tracing_middleware(name: &'static str) -> Arc<dyn Middleware> {
    middleware_fn(name, move |ctx, next| {
        Box::pin(async move {
            trace(ctx, &format!("{name}:before"));
            let response = next.run(ctx).await?;
            trace(ctx, &format!("{name}:after"));
            Ok(Some(response))
        })
    })
}

fn page_unit() -> RenderUnit {
    RenderUnit::page(page_fn(|_ctx, api| async move {
        trace(&api, "render");
        Ok(PageOutput::from("page"))
    }))
}

fn trail(ctx: &ApiContext) -> Vec<String> {
    match ctx.locals().get("trail") {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

async fn text(response: Response) -> String {
    String::from_utf8(body_bytes(response.into_body()).await.to_vec()).unwrap()
}

#[tokio::test]
async fn test_handlers_run_in_order_around_render() {
    let chain = sequence([tracing_middleware("a"), tracing_middleware("b")]);
    // The trail lives in locals, which the pipeline shares with every clone.
    let ctx = fixtures::render_context("/", RouteDescriptor::page("/").unwrap());
    let observer = ApiContext::from_render_context(&ctx, &Environment::default());

    let pipeline = Pipeline::builder(Environment::default()).build();
    let response = pipeline
        .render_route(ctx, &page_unit(), Some(&chain))
        .await
        .unwrap();

    assert_eq!(text(response).await, "page");
    assert_eq!(
        trail(&observer),
        ["a:before", "b:before", "render", "b:after", "a:after"]
    );
}

#[tokio::test]
async fn test_short_circuit_skips_render() {
    let gate = middleware_fn("gate", |_ctx, _next| {
        Box::pin(async { Ok(Some(Response::text(StatusCode::UNAUTHORIZED, "login first"))) })
    });
    let chain = sequence([tracing_middleware("outer"), gate, tracing_middleware("inner")]);
    let ctx = fixtures::render_context("/", RouteDescriptor::page("/").unwrap());
    let observer = ApiContext::from_render_context(&ctx, &Environment::default());

    let pipeline = Pipeline::builder(Environment::default()).build();
    let response = pipeline
        .render_route(ctx, &page_unit(), Some(&chain))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(trail(&observer), ["outer:before", "outer:after"]);
}

#[tokio::test]
async fn test_replacing_the_response() {
    let replace = middleware_fn("replace", |ctx, next| {
        Box::pin(async move {
            let original = next.run(ctx).await?;
            let mut replaced = Response::html(format!("wrapped {}", original.status().as_u16()));
            replaced
                .headers_mut()
                .insert("x-replaced", HeaderValue::from_static("yes"));
            Ok(Some(replaced))
        })
    });
    let pipeline = Pipeline::builder(Environment::default()).build();
    let ctx = fixtures::render_context("/", RouteDescriptor::page("/").unwrap());
    let response = pipeline
        .render_route(ctx, &page_unit(), Some(&sequence([replace])))
        .await
        .unwrap();

    assert_eq!(response.headers().get("x-replaced").unwrap(), "yes");
    assert_eq!(text(response).await, "wrapped 200");
}

#[tokio::test]
async fn test_nested_sequences_flatten_in_order() {
    let inner = Arc::new(sequence([tracing_middleware("b"), tracing_middleware("c")]));
    let chain = sequence([tracing_middleware("a"), inner as Arc<dyn Middleware>]);
    let ctx = fixtures::render_context("/", RouteDescriptor::page("/").unwrap());
    let observer = ApiContext::from_render_context(&ctx, &Environment::default());

    let pipeline = Pipeline::builder(Environment::default()).build();
    pipeline
        .render_route(ctx, &page_unit(), Some(&chain))
        .await
        .unwrap();

    assert_eq!(
        trail(&observer),
        ["a:before", "b:before", "c:before", "render", "c:after", "b:after", "a:after"]
    );
}

#[tokio::test]
async fn test_contract_violation_inside_pipeline() {
    let silent = middleware_fn("silent", |_ctx, _next| Box::pin(async { Ok(None) }));
    let pipeline = Pipeline::builder(Environment::default()).build();
    let ctx = fixtures::render_context("/", RouteDescriptor::page("/").unwrap());
    let err = pipeline
        .render_route(ctx, &page_unit(), Some(&sequence([silent])))
        .await
        .unwrap_err();

    assert!(err.is_middleware_contract());
    assert!(matches!(err, RenderError::MiddlewareNoResponse { middleware: "silent" }));
}

#[tokio::test]
async fn test_i18n_runs_ahead_of_user_middleware() {
    let i18n = Arc::new(fixtures::i18n_routing(RoutingStrategy::PrefixOtherLocales));
    let chain = sequence([
        Arc::new(I18nMiddleware::new(Arc::clone(&i18n))) as Arc<dyn Middleware>,
        tracing_middleware("user"),
    ]);
    let route = Arc::new(RouteDescriptor::page("/en/about").unwrap());
    let ctx = daedalus_core::RenderContext::builder(Arc::new(fixtures::get("/en/about")), route)
        .i18n(Some(i18n))
        .build(&Environment::default(), None)
        .unwrap()
        .found()
        .unwrap();
    let observer = ApiContext::from_render_context(&ctx, &Environment::default());

    let pipeline = Pipeline::builder(Environment::default()).build();
    let response = pipeline
        .render_route(ctx, &page_unit(), Some(&chain))
        .await
        .unwrap();

    // The user middleware saw the page response; i18n rewrote it afterwards.
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(trail(&observer), ["user:before", "render", "user:after"]);
}
