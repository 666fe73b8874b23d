#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode},
};
use filekeep::{
    ServerConfig,
    create_app,
    credentials::hash_password,
    db::{Database, UserRole},
    jwt::JwtConfig,
    rate_limit::RateLimitConfig,
};
use std::path::PathBuf;
use tempfile::TempDir;
use tower::ServiceExt;

pub const ACCESS_SECRET: &[u8] = b"test-access-secret-0123456789abcdef";
pub const REFRESH_SECRET: &[u8] = b"test-refresh-secret-0123456789abcdef";

/// Lowest cost bcrypt accepts, keeps tests fast.
pub const TEST_BCRYPT_COST: u32 = 4;

/// Server configuration with the test secrets and no login rate limit.
pub fn test_config(db: Database, upload_dir: PathBuf) -> ServerConfig {
    ServerConfig {
        db,
        access_secret: ACCESS_SECRET.to_vec(),
        refresh_secret: REFRESH_SECRET.to_vec(),
        upload_dir,
        secure_cookies: false,
        bcrypt_cost: TEST_BCRYPT_COST,
        rate_limit: RateLimitConfig::unlimited(),
    }
}

pub struct TestContext {
    pub app: Router,
    pub db: Database,
    pub jwt: JwtConfig,
    pub upload_dir: PathBuf,
    // Dropped with the context, removing uploaded files
    _tempdir: TempDir,
}

impl TestContext {
    pub async fn new() -> Self {
        let db = Database::open(":memory:")
            .await
            .expect("Failed to open test database");
        let tempdir = tempfile::tempdir().expect("Failed to create upload dir");
        let upload_dir = tempdir.path().to_path_buf();

        let config = test_config(db.clone(), upload_dir.clone());
        let app = create_app(&config).await.expect("Failed to create app");
        let jwt = JwtConfig::new(ACCESS_SECRET, REFRESH_SECRET).expect("Invalid test secrets");

        Self {
            app,
            db,
            jwt,
            upload_dir,
            _tempdir: tempdir,
        }
    }

    /// Create a user with the given password and role.
    pub async fn create_user(&self, username: &str, password: &str, role: UserRole) {
        let hash = hash_password(password, TEST_BCRYPT_COST).await.unwrap();
        self.db.users().create(username, &hash, role).await.unwrap();
    }

    /// Cookie header carrying a freshly minted access token.
    pub fn access_cookie(&self, username: &str, role: UserRole) -> String {
        let access = self.jwt.generate_access_token(username, role).unwrap();
        format!("access_token={}", access.token)
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    pub async fn login(&self, username: &str, password: &str) -> Response<Body> {
        self.send(
            Request::builder()
                .method("POST")
                .uri("/login")
                .header("content-type", "application/x-www-form-urlencoded")
                .body(Body::from(format!(
                    "username={}&password={}",
                    username, password
                )))
                .unwrap(),
        )
        .await
    }

    /// Log in and return the (access, refresh) cookie values.
    pub async fn login_tokens(&self, username: &str, password: &str) -> (String, String) {
        let response = self.login(username, password).await;
        assert_eq!(response.status(), StatusCode::OK);
        let cookies = extract_set_cookies(&response);
        (
            cookie_value(&cookies, "access_token").expect("No access cookie"),
            cookie_value(&cookies, "refresh_token").expect("No refresh cookie"),
        )
    }

    pub async fn refresh(&self, refresh_token: &str) -> Response<Body> {
        self.send(
            Request::builder()
                .method("POST")
                .uri("/refresh")
                .header("cookie", format!("refresh_token={}", refresh_token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// GET /files with the given access token; a cheap protected endpoint.
    pub async fn list_files(&self, access_token: &str) -> Response<Body> {
        self.send(
            Request::builder()
                .method("GET")
                .uri("/files")
                .header("cookie", format!("access_token={}", access_token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// Upload through the API and return the new file id.
    pub async fn upload(
        &self,
        cookie: &str,
        use_type: &str,
        filename: &str,
        content_type: &str,
        data: &[u8],
    ) -> i64 {
        let response = self
            .send(upload_request(
                cookie,
                Some(use_type),
                Some((filename, content_type, data)),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        body["id"].as_i64().expect("No id in upload response")
    }
}

/// Extract Set-Cookie headers from response
pub fn extract_set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .collect()
}

/// Value of the named cookie in a list of Set-Cookie headers.
pub fn cookie_value(cookies: &[String], name: &str) -> Option<String> {
    cookies.iter().find_map(|c| {
        let (pair, _) = c.split_once(';').unwrap_or((c, ""));
        let (key, value) = pair.split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

/// Check if cookies contain a token being cleared (Max-Age=0)
pub fn has_cleared_cookie(cookies: &[String], cookie_name: &str) -> bool {
    cookies
        .iter()
        .any(|c| c.starts_with(&format!("{}=;", cookie_name)) && c.contains("Max-Age=0"))
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

const BOUNDARY: &str = "filekeep-test-boundary";

/// Build a multipart upload request. `None` leaves the field out.
pub fn upload_request(
    cookie: &str,
    use_type: Option<&str>,
    file: Option<(&str, &str, &[u8])>,
) -> Request<Body> {
    let mut body = Vec::new();
    if let Some(use_type) = use_type {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"useType\"\r\n\r\n{use_type}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((filename, content_type, data)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/upload")
        .header("cookie", cookie)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

/// A small valid PNG.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([10, 120, 200]));
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}
