use std::str::FromStr;

use anyhow::Context;
use serde::Deserialize;
use sqlx::postgres::PgConnectOptions;

const DEV_SECRET: &str = "dev-only-insecure-secret";
const DEFAULT_TOKEN_TTL_MINUTES: i64 = 60 * 24;
/// One year. Longer lifetimes are refused at startup.
pub const MAX_TOKEN_TTL_MINUTES: i64 = 60 * 24 * 365;

#[derive(Debug, Clone, Deserialize)]
pub struct HashConfig {
    pub time_cost: u32,
    pub memory_kib: u32,
    pub parallelism: u32,
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            time_cost: argon2::Params::DEFAULT_T_COST,
            memory_kib: argon2::Params::DEFAULT_M_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub token_ttl_minutes: i64,
    pub password_min_length: usize,
    pub hash: HashConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    /// Connection options from `DATABASE_URL`, or from the discrete
    /// `POSTGRES_*` parts so passwords never need URL escaping.
    pub fn connect_options(&self) -> anyhow::Result<PgConnectOptions> {
        match &self.url {
            Some(url) => PgConnectOptions::from_str(url).context("parse DATABASE_URL"),
            None => Ok(PgConnectOptions::new()
                .host(&self.host)
                .port(self.port)
                .username(&self.user)
                .password(&self.password)
                .database(&self.name)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(get: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = get("ENV").unwrap_or_else(|| "development".into());
        let secret = match get("SECRET_KEY").filter(|s| !s.is_empty()) {
            Some(secret) => secret,
            None if env == "development" => {
                tracing::warn!("SECRET_KEY not set; using insecure development secret");
                DEV_SECRET.into()
            }
            None => anyhow::bail!("SECRET_KEY is required when ENV={env}"),
        };

        let token_ttl_minutes = match parse_var::<i64, _>(&get, "TOKEN_EXPIRE_MINUTES") {
            Some(m) if m > MAX_TOKEN_TTL_MINUTES => anyhow::bail!(
                "TOKEN_EXPIRE_MINUTES must be at most {MAX_TOKEN_TTL_MINUTES}, got {m}"
            ),
            Some(m) if m >= 0 => m,
            _ => DEFAULT_TOKEN_TTL_MINUTES,
        };

        let defaults = HashConfig::default();
        let auth = AuthConfig {
            secret,
            issuer: get("TOKEN_ISSUER").unwrap_or_else(|| "tci".into()),
            audience: get("TOKEN_AUDIENCE").unwrap_or_else(|| "tci-dashboard".into()),
            token_ttl_minutes,
            password_min_length: parse_var(&get, "PASSWORD_MIN_LENGTH").unwrap_or(8),
            hash: HashConfig {
                time_cost: parse_var(&get, "PASSWORD_HASH_TIME_COST").unwrap_or(defaults.time_cost),
                memory_kib: parse_var(&get, "PASSWORD_HASH_MEMORY_KIB").unwrap_or(defaults.memory_kib),
                parallelism: defaults.parallelism,
            },
        };

        let database = DatabaseConfig {
            url: get("DATABASE_URL").filter(|s| !s.is_empty()),
            host: get("POSTGRES_HOST").unwrap_or_else(|| "localhost".into()),
            port: parse_var(&get, "POSTGRES_PORT").unwrap_or(5432),
            user: get("POSTGRES_USER").unwrap_or_else(|| "postgres".into()),
            password: get("POSTGRES_PASSWORD").unwrap_or_else(|| "postgres".into()),
            name: get("POSTGRES_DB").unwrap_or_else(|| "tci".into()),
            max_connections: parse_var(&get, "DATABASE_MAX_CONNECTIONS").unwrap_or(10),
        };

        Ok(Self {
            env,
            database,
            auth,
        })
    }
}

fn parse_var<T, F>(get: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    get(key).and_then(|v| v.trim().parse().ok())
}
