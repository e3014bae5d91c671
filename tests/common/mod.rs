#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, StatusCode, header},
};
use serde_json::Value;
use tcm_backend::{
    AppState,
    config::Config,
    database,
    routes::{
        self,
        article::{Article, ArticleForm},
        chat::PlaceholderProvider,
        group::{MEMBER_GROUP, UserGroup},
        user::{NewUser, User},
    },
};
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(Config::for_tests()).await
}

pub async fn spawn_app_with(config: Config) -> TestApp {
    let pool = database::connect_in_memory().await.unwrap();
    database::bootstrap(&pool, &config).await.unwrap();

    let state = AppState {
        pool,
        config,
        redis: None,
        chat_provider: Arc::new(PlaceholderProvider),
    };
    TestApp {
        router: routes::app(state.clone()),
        state,
    }
}

impl TestApp {
    pub async fn send(&self, req: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(req).await.unwrap()
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_form(
        &self,
        uri: &str,
        fields: &[(&str, &str)],
        cookie: Option<&str>,
    ) -> Response<Body> {
        let body = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body)).unwrap()).await
    }

    pub async fn json(
        &self,
        method: &str,
        uri: &str,
        body: Value,
        cookie: Option<&str>,
    ) -> Response<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    /// 登录并返回可直接放入 Cookie 请求头的会话值
    pub async fn login(&self, username: &str, password: &str) -> String {
        let res = self
            .post_form("/login", &[("username", username), ("password", password)], None)
            .await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        session_cookie(&res).expect("login should set a session cookie")
    }

    pub async fn create_member(&self, username: &str) -> User {
        let group = UserGroup::find_by_name(&self.state.pool, MEMBER_GROUP)
            .await
            .unwrap();
        User::create(
            &self.state.pool,
            NewUser {
                username,
                email: &format!("{username}@example.com"),
                password: "password1",
                is_admin: false,
                group_id: group.map(|g| g.id),
            },
            4,
        )
        .await
        .unwrap()
    }

    pub async fn create_article(&self, author_id: i64, title: &str) -> Article {
        Article::create(&self.state.pool, author_id, &article_form(title))
            .await
            .unwrap()
    }
}

pub fn article_form(title: &str) -> ArticleForm {
    ArticleForm {
        title: title.to_string(),
        content: format!("{title} content"),
        summary: String::new(),
        category: "herbs".to_string(),
        tags: "a, b".to_string(),
    }
}

pub fn session_cookie(res: &Response<Body>) -> Option<String> {
    set_cookies(res)
        .into_iter()
        .find(|c| c.starts_with("session=") && !c.starts_with("session=;"))
        .and_then(|c| c.split(';').next().map(str::to_string))
}

pub fn set_cookies(res: &Response<Body>) -> Vec<String> {
    res.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect()
}

pub fn location(res: &Response<Body>) -> String {
    res.headers()[header::LOCATION].to_str().unwrap().to_string()
}

pub async fn body_json(res: Response<Body>) -> Value {
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
