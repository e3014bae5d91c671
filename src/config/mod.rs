use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub database_url: String,
    pub redis_url: Option<String>,
    pub session_secret: String,
    pub session_expiration_secs: u64,
    pub server_host: String,
    pub server_port: u16,
    pub upload_dir: PathBuf,
    pub default_language: String,
    pub bcrypt_cost: u32,
    pub rate_limit_window_secs: u64,
    pub rate_limit_requests: u32,
    pub admin_username: String,
    pub admin_email: String,
    pub admin_password: String,
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenv::dotenv().ok();

        let session_expiration = var_or("SESSION_EXPIRATION", "24")
            .trim_end_matches('h')
            .parse::<u64>()
            .unwrap_or(24);

        Ok(Config {
            database_url: var_or("DATABASE_URL", "sqlite://tcm.db"),
            redis_url: env::var("REDIS_URL").ok().filter(|url| !url.is_empty()),
            session_secret: env::var("SESSION_SECRET")?,
            session_expiration_secs: session_expiration * 3600,
            server_host: var_or("SERVER_HOST", "0.0.0.0"),
            server_port: var_or("SERVER_PORT", "3000").parse().unwrap_or(3000),
            upload_dir: PathBuf::from(var_or("UPLOAD_DIR", "uploads")),
            default_language: var_or("DEFAULT_LANGUAGE", "zh"),
            bcrypt_cost: env::var("BCRYPT_COST")
                .ok()
                .and_then(|cost| cost.parse().ok())
                .unwrap_or(bcrypt::DEFAULT_COST),
            rate_limit_window_secs: var_or("RATE_LIMIT_WINDOW", "60").parse().unwrap_or(60),
            rate_limit_requests: var_or("RATE_LIMIT_REQUESTS", "100").parse().unwrap_or(100),
            admin_username: var_or("ADMIN_USERNAME", "admin"),
            admin_email: var_or("ADMIN_EMAIL", "admin@example.com"),
            admin_password: var_or("ADMIN_PASSWORD", "admin123"),
        })
    }

    pub fn session_expiration(&self) -> Duration {
        Duration::from_secs(self.session_expiration_secs)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    /// 测试与本地开发用的配置，不读取环境变量
    pub fn for_tests() -> Self {
        Config {
            database_url: "sqlite::memory:".into(),
            redis_url: None,
            session_secret: "test-secret".into(),
            session_expiration_secs: 3600,
            server_host: "127.0.0.1".into(),
            server_port: 0,
            upload_dir: env::temp_dir(),
            default_language: "zh".into(),
            bcrypt_cost: 4,
            rate_limit_window_secs: 60,
            rate_limit_requests: 100,
            admin_username: "admin".into(),
            admin_email: "admin@example.com".into(),
            admin_password: "admin123".into(),
        }
    }
}
