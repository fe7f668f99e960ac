//! A tiny blog served by switchyard.
//!
//! ```text
//! cargo run --example blog
//! curl -i http://127.0.0.1:8080/
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use serde_json::json;

use switchyard::config::parse_config;
use switchyard::dispatch::{
    Action, ActionContext, ActionResult, AuthPolicy, Controller, ControllerRegistry, DispatchError,
    Hook,
};
use switchyard::lifecycle::spawn_signal_handler;
use switchyard::observability::init_tracing;
use switchyard::{Application, CsrfOutcome, FlashKind, Shutdown};

const PASSWORD: &str = "letmein";

#[derive(Debug, Clone, Serialize)]
struct Post {
    id: u64,
    title: String,
}

#[derive(Default)]
struct Store {
    posts: DashMap<u64, Post>,
    next_id: AtomicU64,
}

impl Store {
    fn insert(&self, title: String) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.posts.insert(id, Post { id, title });
        id
    }

    fn all(&self) -> Vec<Post> {
        let mut posts: Vec<Post> = self.posts.iter().map(|p| p.value().clone()).collect();
        posts.sort_by_key(|p| p.id);
        posts
    }
}

struct Account;

impl Account {
    fn login(&mut self, ctx: &mut ActionContext<'_>) -> ActionResult {
        let token = ctx.csrf_token("login");
        ctx.render_template("account/login", json!({ "csrf_token": token }))
    }

    fn authenticate(&mut self, ctx: &mut ActionContext<'_>) -> ActionResult {
        match ctx.check_csrf("login") {
            CsrfOutcome::Valid => {}
            CsrfOutcome::Expired => {
                ctx.set_flash_now(FlashKind::Warning, "The form expired. Please try again.");
                return self.login(ctx);
            }
            CsrfOutcome::Unauthorized => {
                ctx.set_flash_now(FlashKind::Danger, "Invalid form submission.");
                return self.login(ctx);
            }
        }
        if ctx.request().form("password") != Some(PASSWORD) {
            ctx.set_flash_now(FlashKind::Danger, "Wrong password.");
            return self.login(ctx);
        }
        ctx.session_mut().set_authenticated(true);
        ctx.set_flash(FlashKind::Success, "Signed in.");
        ctx.redirect("/admin")
    }

    fn logout(&mut self, ctx: &mut ActionContext<'_>) -> ActionResult {
        ctx.session_mut().set_authenticated(false);
        ctx.set_flash(FlashKind::Info, "Signed out.");
        ctx.redirect("/")
    }
}

impl Controller for Account {
    const NAME: &'static str = "account";
    const ACTIONS: &'static [Action<Self>] = &[
        Action::new("login", Account::login),
        Action::new("authenticate", Account::authenticate),
        Action::new("logout", Account::logout),
    ];
}

struct Posts {
    store: Arc<Store>,
    current: Option<Post>,
}

impl Posts {
    fn load(&mut self, ctx: &mut ActionContext<'_>) -> Result<(), DispatchError> {
        let id = ctx.param("id").and_then(|id| id.parse::<u64>().ok());
        self.current = id.and_then(|id| self.store.posts.get(&id).map(|p| p.value().clone()));
        match self.current {
            Some(_) => Ok(()),
            None => Err(ctx.forward_404(format!("No post {:?}", ctx.param("id")))),
        }
    }

    fn index(&mut self, ctx: &mut ActionContext<'_>) -> ActionResult {
        let token = ctx.csrf_token("post");
        ctx.render(json!({ "posts": self.store.all(), "csrf_token": token }))
    }

    fn show(&mut self, ctx: &mut ActionContext<'_>) -> ActionResult {
        ctx.render(json!({ "post": self.current }))
    }

    fn create(&mut self, ctx: &mut ActionContext<'_>) -> ActionResult {
        if let Some(reason) = ctx.check_csrf("post").reason() {
            ctx.set_flash(FlashKind::Danger, format!("Post rejected: token {}.", reason));
            return ctx.redirect("/posts");
        }
        let title = ctx.request().form("title").unwrap_or("Untitled").trim().to_string();
        let id = self.store.insert(title);
        ctx.set_flash(FlashKind::Success, "Post created.");
        ctx.redirect(&format!("/posts/{}", id))
    }

    fn destroy(&mut self, ctx: &mut ActionContext<'_>) -> ActionResult {
        if let Some(post) = self.current.take() {
            self.store.posts.remove(&post.id);
        }
        ctx.set_flash(FlashKind::Info, "Post deleted.");
        ctx.redirect("/posts")
    }
}

impl Controller for Posts {
    const NAME: &'static str = "posts";
    const AUTH: AuthPolicy = AuthPolicy::Actions(&["create", "destroy"]);
    const ACTIONS: &'static [Action<Self>] = &[
        Action::new("index", Posts::index),
        Action::new("show", Posts::show),
        Action::new("create", Posts::create),
        Action::new("destroy", Posts::destroy),
    ];
    const BEFORE: &'static [Hook<Self>] = &[Hook::new("load", Posts::load, &["show", "destroy"])];
}

struct Admin {
    store: Arc<Store>,
}

impl Admin {
    fn index(&mut self, ctx: &mut ActionContext<'_>) -> ActionResult {
        ctx.render(json!({ "count": self.store.posts.len() }))
    }

    fn drafts(&mut self, ctx: &mut ActionContext<'_>) -> ActionResult {
        ctx.render(json!({ "drafts": [] }))
    }
}

impl Controller for Admin {
    const NAME: &'static str = "admin";
    const AUTH: AuthPolicy = AuthPolicy::All;
    const ACTIONS: &'static [Action<Self>] = &[
        Action::new("index", Admin::index),
        Action::new("drafts", Admin::drafts),
    ];
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = parse_config(include_str!("blog.toml"))?;
    init_tracing(&config.observability);

    let store = Arc::new(Store::default());
    store.insert("Hello, switchyard".to_string());

    let mut registry = ControllerRegistry::new();
    registry.register(|| Account);
    let posts_store = store.clone();
    registry.register(move || Posts {
        store: posts_store.clone(),
        current: None,
    });
    registry.register(move || Admin {
        store: store.clone(),
    });

    let app = Application::build(config, registry)?;

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());
    app.run(&shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
