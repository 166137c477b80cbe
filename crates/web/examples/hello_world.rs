use bytes::Bytes;
use futures::future::BoxFuture;
use http::Request;
use micro_app::{App, Ctx, DefaultCtx, HandlerResult};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

fn hello_world(c: &mut DefaultCtx) -> BoxFuture<'_, HandlerResult> {
    Box::pin(async move { c.send_string("hello world") })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let app = App::new();
    app.route("/").get(hello_world, &[])?;

    let response = app.handle(Request::get("/").body(Bytes::new())?).await;
    info!(status = %response.status(), body = ?String::from_utf8_lossy(response.body().as_bytes()), "handled");
    Ok(())
}
