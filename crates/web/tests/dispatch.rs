use bytes::Bytes;
use futures::future::BoxFuture;
use http::header::{ALLOW, CONTENT_TYPE, HeaderValue};
use http::{Method, Request, Response, StatusCode};
use micro_app::{
    App, BaseCtx, Ctx, CustomCtx, DefaultCtx, Error, HandlerResult, MethodCode, ResponseBody, Seal, handler_fn,
};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn request(method: Method, uri: &str) -> Request<Bytes> {
    Request::builder().method(method).uri(uri).body(Bytes::new()).unwrap()
}

fn body_str(response: &Response<ResponseBody>) -> &str {
    std::str::from_utf8(response.body().as_bytes()).unwrap()
}

fn pong(c: &mut DefaultCtx) -> BoxFuture<'_, HandlerResult> {
    Box::pin(async move { c.send_string("pong") })
}

#[tokio::test]
async fn test_get_route_matches_only_get() {
    let app = App::new();
    app.route("/ping").get(pong, &[]).unwrap();

    let response = app.handle(request(Method::GET, "/ping")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_str(&response), "pong");

    let response = app.handle(request(Method::POST, "/ping")).await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers().get(ALLOW).unwrap(), "GET");

    let response = app.handle(request(Method::GET, "/pong")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_str(&response), "Cannot GET /pong");
}

#[tokio::test]
async fn test_all_matches_every_verb() {
    let app = App::new();
    app.route("/any")
        .all(
            |c: &mut DefaultCtx| {
                Box::pin(async move {
                    let method = c.method().to_string();
                    c.send(method)
                })
            },
            &[],
        )
        .unwrap();

    for code in MethodCode::VERBS {
        let response = app.handle(request(code.as_method(), "/any")).await;
        assert_eq!(response.status(), StatusCode::OK, "{code}");
        if code != MethodCode::Head {
            assert_eq!(body_str(&response), code.as_str());
        }
    }
}

#[tokio::test]
async fn test_add_equals_individual_verbs() {
    let combined = App::new();
    combined.route("/form").add(&["GET", "POST"], pong, &[]).unwrap();

    let split = App::new();
    split.route("/form").get(pong, &[]).unwrap().post(pong, &[]).unwrap();

    for method in [Method::GET, Method::POST, Method::PUT, Method::HEAD] {
        let a = combined.handle(request(method.clone(), "/form")).await;
        let b = split.handle(request(method.clone(), "/form")).await;
        assert_eq!(a.status(), b.status(), "{method}");
        assert_eq!(a.body().as_bytes(), b.body().as_bytes(), "{method}");
    }
}

#[tokio::test]
async fn test_nested_routes_compose_paths() {
    let app = App::new();
    let api = app.route("/api");
    let v1 = api.route("/v1");
    v1.route("/users/{id}")
        .get(
            |c: &mut DefaultCtx| {
                Box::pin(async move {
                    let id = c.param("id").unwrap_or_default().to_string();
                    c.send_string(format!("user {id}"))
                })
            },
            &[],
        )
        .unwrap();

    let response = app.handle(request(Method::GET, "/api/v1/users/Alice")).await;
    assert_eq!(body_str(&response), "user Alice");
    assert_eq!(app.stack().get(0).unwrap().path(), "/api/v1/users/{id}");
    assert_eq!(v1.path(), "/api/v1");
    assert_eq!(api.path(), "/api");
}

#[tokio::test]
async fn test_middleware_runs_in_order_and_next_reaches_following_route() {
    fn trace(tag: &'static str) -> micro_app::Handler<DefaultCtx> {
        handler_fn(move |c: &mut DefaultCtx| {
            Box::pin(async move {
                let mut seen = c.local::<Vec<&'static str>>().cloned().unwrap_or_default();
                seen.push(tag);
                c.set_local(seen);
                c.next().await
            })
        })
    }

    let app = App::new();
    app.route("/").all(
        |c: &mut DefaultCtx| {
            Box::pin(async move {
                let mut seen = c.local::<Vec<&'static str>>().cloned().unwrap_or_default();
                seen.push("all");
                c.set_local(seen);
                c.next().await
            })
        },
        &[trace("m1"), trace("m2")],
    )
    .unwrap();
    app.route("/").get(
        |c: &mut DefaultCtx| {
            Box::pin(async move {
                let seen = c.local::<Vec<&'static str>>().cloned().unwrap_or_default();
                c.send_string(seen.join(","))
            })
        },
        &[],
    )
    .unwrap();

    let response = app.handle(request(Method::GET, "/")).await;
    assert_eq!(body_str(&response), "m1,m2,all");

    let response = app.handle(request(Method::POST, "/")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_str(&response), "Cannot POST /");
}

#[tokio::test]
async fn test_all_mounts_middleware_on_prefix() {
    let app = App::new();
    let api = app.route("/api");
    api.all(
        |c: &mut DefaultCtx| {
            Box::pin(async move {
                c.set_local("api");
                c.next().await
            })
        },
        &[],
    )
    .unwrap();
    api.route("/users/{id}")
        .get(
            |c: &mut DefaultCtx| {
                Box::pin(async move {
                    let mount = c.local::<&'static str>().copied().unwrap_or("none");
                    let id = c.param("id").unwrap_or_default().to_string();
                    let values = c.values().len();
                    c.send_string(format!("{mount} {id} {values}"))
                })
            },
            &[],
        )
        .unwrap();
    app.route("/apis").get(
        |c: &mut DefaultCtx| {
            Box::pin(async move {
                let mount = c.local::<&'static str>().copied().unwrap_or("none");
                c.send_string(mount)
            })
        },
        &[],
    )
    .unwrap();

    let response = app.handle(request(Method::GET, "/api/users/Alice")).await;
    assert_eq!(body_str(&response), "api Alice 1");

    let response = app.handle(request(Method::GET, "/apis")).await;
    assert_eq!(body_str(&response), "none");

    let response = app.handle(request(Method::DELETE, "/api/unknown")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_str(&response), "Cannot DELETE /api/unknown");
}

#[tokio::test]
async fn test_pool_reuses_contexts_with_cleared_state() {
    let app = App::new();
    app.route("/items/{id}")
        .get(|c: &mut DefaultCtx| Box::pin(async move { c.status(StatusCode::ACCEPTED).send("item") }), &[])
        .unwrap();

    for _ in 0..8 {
        let response = app.handle(request(Method::GET, "/items/1")).await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }
    assert_eq!(app.ctx_created(), 1);

    let ctx = app.acquire_ctx(request(Method::GET, "/other"));
    assert_eq!(ctx.index_route(), None);
    assert_eq!(ctx.index_handler(), 0);
    assert!(!ctx.matched());
    assert!(ctx.values().is_empty());
    assert!(ctx.route().is_none());
    assert_eq!(ctx.tree_path(), "");
    assert_eq!(ctx.response_status(), StatusCode::OK);
    assert!(ctx.response_body().is_empty());
    app.release_ctx(ctx);
}

struct UserCtx {
    base: BaseCtx<UserCtx>,
    user: Option<String>,
}

impl Ctx for UserCtx {
    fn base(&self) -> &BaseCtx<Self> {
        &self.base
    }

    fn base_mut(&mut self, _seal: &Seal) -> &mut BaseCtx<Self> {
        &mut self.base
    }
}

impl CustomCtx for UserCtx {
    fn from_app(app: &App<Self>) -> Self {
        Self { base: BaseCtx::new(app), user: None }
    }

    fn reset(&mut self, seal: &Seal, request: Request<Bytes>) {
        self.user = None;
        self.base.reset(seal, request);
    }
}

#[tokio::test]
async fn test_custom_ctx_factory() {
    let built = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&built);
    let app = App::<UserCtx>::builder()
        .new_ctx_func(move |app| {
            counter.fetch_add(1, Ordering::SeqCst);
            UserCtx::from_app(app)
        })
        .build();

    app.route("/me").get(
        |c: &mut UserCtx| {
            Box::pin(async move {
                let previous = c.user.replace("ferris".to_string());
                c.send_string(format!("{previous:?}"))
            })
        },
        &[],
    )
    .unwrap();

    for _ in 0..3 {
        let response = app.handle(request(Method::GET, "/me")).await;
        assert_eq!(body_str(&response), "None");
    }
    assert_eq!(built.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_case_and_strict_routing() {
    let app = App::new();
    app.route("/Users/").get(pong, &[]).unwrap();
    for uri in ["/users", "/USERS/", "/Users"] {
        let response = app.handle(request(Method::GET, uri)).await;
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
    }

    let strict = App::<DefaultCtx>::builder().case_sensitive(true).strict_routing(true).build();
    strict.route("/Users").get(pong, &[]).unwrap();
    assert_eq!(strict.handle(request(Method::GET, "/Users")).await.status(), StatusCode::OK);
    assert_eq!(strict.handle(request(Method::GET, "/users")).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(strict.handle(request(Method::GET, "/Users/")).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_custom_error_handler() {
    #[derive(Serialize)]
    struct Problem {
        status: u16,
        detail: String,
    }

    let app = App::<DefaultCtx>::builder()
        .error_handler(|c: &mut DefaultCtx, err: Error| {
            Box::pin(async move {
                let status = err.status();
                let problem = Problem { status: status.as_u16(), detail: err.to_string() };
                if c.status(status).json(&problem).is_err() {
                    c.status(StatusCode::INTERNAL_SERVER_ERROR);
                }
            })
        })
        .build();
    app.route("/teapot")
        .get(
            |_: &mut DefaultCtx| Box::pin(async { Err(Error::new(StatusCode::IM_A_TEAPOT, "short and stout")) }),
            &[],
        )
        .unwrap();

    let response = app.handle(request(Method::GET, "/teapot")).await;
    assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "application/json");
    assert_eq!(body_str(&response), r#"{"status":418,"detail":"short and stout"}"#);

    let response = app.handle(request(Method::GET, "/nowhere")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_str(&response), r#"{"status":404,"detail":"Cannot GET /nowhere"}"#);
}

#[tokio::test]
async fn test_handler_can_set_headers_before_failing() {
    let app = App::new();
    app.route("/fail")
        .get(
            |c: &mut DefaultCtx| {
                Box::pin(async move {
                    c.set(http::header::RETRY_AFTER, HeaderValue::from_static("5"));
                    Err(Error::new(StatusCode::SERVICE_UNAVAILABLE, "busy"))
                })
            },
            &[],
        )
        .unwrap();

    let response = app.handle(request(Method::GET, "/fail")).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.headers().get(http::header::RETRY_AFTER).unwrap(), "5");
    assert_eq!(body_str(&response), "busy");
}

#[tokio::test]
async fn test_concurrent_requests_share_pool() {
    let app = App::<DefaultCtx>::builder().ctx_pool_capacity(4).build();
    app.route("/n/{n}")
        .get(
            |c: &mut DefaultCtx| {
                Box::pin(async move {
                    let n = c.param("n").unwrap_or_default().to_string();
                    tokio::task::yield_now().await;
                    c.send_string(n)
                })
            },
            &[],
        )
        .unwrap();

    let tasks: Vec<_> = (0..32)
        .map(|i| {
            let app = app.clone();
            tokio::spawn(async move {
                let response = app.handle(request(Method::GET, &format!("/n/{i}"))).await;
                assert_eq!(body_str(&response), i.to_string());
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap();
    }
    assert!(app.ctx_idle() <= 4);
}
