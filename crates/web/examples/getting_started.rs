use bytes::Bytes;
use futures::future::BoxFuture;
use http::{Method, Request, StatusCode};
use micro_app::{App, Config, Ctx, DefaultCtx, Error, HandlerResult, handler_fn};
use serde::Serialize;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Serialize, Debug)]
pub struct User<'a> {
    id: &'a str,
    name: String,
}

fn list_users(c: &mut DefaultCtx) -> BoxFuture<'_, HandlerResult> {
    Box::pin(async move { c.json(&["alice", "bob"]) })
}

fn get_user(c: &mut DefaultCtx) -> BoxFuture<'_, HandlerResult> {
    Box::pin(async move {
        let id = c.param("id").unwrap_or_default().to_string();
        if id == "0" {
            return Err(Error::not_found(format!("user {id} not found")));
        }
        c.json(&User { id: &id, name: format!("user-{id}") })
    })
}

fn create_user(c: &mut DefaultCtx) -> BoxFuture<'_, HandlerResult> {
    Box::pin(async move {
        let name = String::from_utf8_lossy(c.body()).into_owned();
        c.status(StatusCode::CREATED).json(&User { id: "42", name })
    })
}

// every request under /api passes here first
fn api_logger(c: &mut DefaultCtx) -> BoxFuture<'_, HandlerResult> {
    Box::pin(async move {
        info!(method = %c.method(), path = c.path(), "api request");
        c.next().await
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = Config::from_json_str(r#"{ "app_name": "getting-started", "server_header": "micro-app" }"#)?;
    let app = App::<DefaultCtx>::builder().config(config).build();

    let api = app.route("/api");
    api.all(api_logger, &[])?;

    let users = api.route("/users");
    users.get(list_users, &[])?.post(create_user, &[])?;

    let require_token = handler_fn(|c: &mut DefaultCtx| {
        Box::pin(async move {
            if c.get("x-token").is_none() {
                return Err(Error::new(StatusCode::UNAUTHORIZED, "missing token"));
            }
            c.next().await
        })
    });
    users.route("/{id}").get(get_user, &[require_token])?;

    let requests = [
        Request::get("/api/users").body(Bytes::new())?,
        Request::post("/api/users").body(Bytes::from_static(b"carol"))?,
        Request::get("/api/users/7").header("x-token", "secret").body(Bytes::new())?,
        Request::get("/api/users/7").body(Bytes::new())?,
        Request::get("/api/users/0").header("x-token", "secret").body(Bytes::new())?,
        Request::builder().method(Method::DELETE).uri("/api/users").body(Bytes::new())?,
    ];

    for request in requests {
        let (method, uri) = (request.method().clone(), request.uri().clone());
        let response = app.handle(request).await;
        info!(
            %method,
            %uri,
            status = %response.status(),
            body = %String::from_utf8_lossy(response.body().as_bytes()),
            "handled"
        );
    }

    Ok(())
}
