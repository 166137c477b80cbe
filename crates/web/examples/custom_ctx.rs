use bytes::Bytes;
use futures::future::BoxFuture;
use http::{Request, StatusCode};
use micro_app::{App, BaseCtx, Ctx, CustomCtx, Error, HandlerResult, Seal};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

/// A context carrying the authenticated user of the request.
#[derive(Debug)]
struct AuthCtx {
    base: BaseCtx<AuthCtx>,
    user: Option<String>,
}

impl Ctx for AuthCtx {
    fn base(&self) -> &BaseCtx<Self> {
        &self.base
    }

    fn base_mut(&mut self, _seal: &Seal) -> &mut BaseCtx<Self> {
        &mut self.base
    }
}

impl CustomCtx for AuthCtx {
    fn from_app(app: &App<Self>) -> Self {
        Self { base: BaseCtx::new(app), user: None }
    }

    fn reset(&mut self, seal: &Seal, request: Request<Bytes>) {
        self.user = None;
        self.base.reset(seal, request);
    }
}

fn authenticate(c: &mut AuthCtx) -> BoxFuture<'_, HandlerResult> {
    Box::pin(async move {
        let Some(user) = c.get("x-user").map(str::to_string) else {
            return Err(Error::new(StatusCode::UNAUTHORIZED, "who are you?"));
        };
        c.user = Some(user);
        c.next().await
    })
}

fn whoami(c: &mut AuthCtx) -> BoxFuture<'_, HandlerResult> {
    Box::pin(async move {
        let greeting = format!("hello {}", c.user.as_deref().unwrap_or("stranger"));
        c.send_string(greeting)
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let app = App::<AuthCtx>::builder().app_name("custom-ctx").build();
    app.route("/").all(authenticate, &[])?.get(whoami, &[])?;

    for user in [Some("ferris"), None] {
        let mut request = Request::get("/");
        if let Some(user) = user {
            request = request.header("x-user", user);
        }
        let response = app.handle(request.body(Bytes::new())?).await;
        info!(
            status = %response.status(),
            body = %String::from_utf8_lossy(response.body().as_bytes()),
            created = app.ctx_created(),
            "handled"
        );
    }

    Ok(())
}
