use std::{env, str::FromStr};

use anyhow::{anyhow, Context, Result};
use url::Url;

use crate::db::DEFAULT_MAX_POOL_SIZE;

pub const DEFAULT_COMPANY_CODE: &str = "MRT";
pub const DEFAULT_EXPIRY_YEARS: u32 = 3;

/// What editing a document does to a completed assignment whose user was
/// removed from the reviewer/approver list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum AssignmentEditPolicy {
    #[default]
    Preserve,
    Delete,
}

impl FromStr for AssignmentEditPolicy {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "preserve" => Ok(Self::Preserve),
            "delete" => Ok(Self::Delete),
            other => Err(anyhow!(
                "unknown assignment edit policy '{other}' (expected preserve or delete)"
            )),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_pool_size: u32,
    pub server_host: String,
    pub server_port: u16,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub jwt_expiry_minutes: i64,
    pub refresh_token_expiry_days: i64,
    pub refresh_cookie_secure: bool,
    pub refresh_cookie_domain: Option<String>,
    pub cors_allowed_origin: Option<String>,
    pub company_code: String,
    pub document_expiry_years: u32,
    pub assignment_edit_policy: AssignmentEditPolicy,
    pub email_api_url: Option<String>,
    pub email_api_key: Option<String>,
    pub email_from: String,
    pub app_base_url: String,
    pub cron_secret: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let database_max_pool_size = env::var("DATABASE_MAX_POOL_SIZE")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_MAX_POOL_SIZE);
        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("SERVER_PORT must be a valid u16")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        let jwt_issuer = env::var("JWT_ISSUER").unwrap_or_else(|_| "doctrack".to_string());
        let jwt_audience =
            env::var("JWT_AUDIENCE").unwrap_or_else(|_| "doctrack-clients".to_string());
        let jwt_expiry_minutes = env::var("JWT_EXPIRY_MINUTES")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .context("JWT_EXPIRY_MINUTES must be an integer")?;
        let refresh_token_expiry_days = env::var("REFRESH_TOKEN_EXPIRY_DAYS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .context("REFRESH_TOKEN_EXPIRY_DAYS must be an integer")?;
        let refresh_cookie_secure = env::var("REFRESH_COOKIE_SECURE")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        let refresh_cookie_domain = env::var("REFRESH_COOKIE_DOMAIN").ok();
        let cors_allowed_origin = env::var("CORS_ALLOWED_ORIGIN").ok();
        let company_code = match env::var("COMPANY_CODE") {
            Ok(value) => parse_company_code(&value)?,
            Err(_) => DEFAULT_COMPANY_CODE.to_string(),
        };
        let document_expiry_years = env::var("DOCUMENT_EXPIRY_YEARS")
            .unwrap_or_else(|_| DEFAULT_EXPIRY_YEARS.to_string())
            .parse()
            .context("DOCUMENT_EXPIRY_YEARS must be a non-negative integer")?;
        let assignment_edit_policy = match env::var("ASSIGNMENT_EDIT_POLICY") {
            Ok(value) => value
                .parse()
                .context("ASSIGNMENT_EDIT_POLICY must be preserve or delete")?,
            Err(_) => AssignmentEditPolicy::default(),
        };
        let email_api_url = env::var("EMAIL_API_URL").ok().filter(|v| !v.is_empty());
        let email_api_key = env::var("EMAIL_API_KEY").ok().filter(|v| !v.is_empty());
        let email_from = env::var("EMAIL_FROM")
            .unwrap_or_else(|_| "Document Control <no-reply@localhost>".to_string());
        let app_base_url =
            env::var("APP_BASE_URL").unwrap_or_else(|_| "http://localhost:5173".to_string());
        let cron_secret = env::var("CRON_SECRET").ok().filter(|v| !v.is_empty());

        Ok(Self {
            database_url,
            database_max_pool_size,
            server_host,
            server_port,
            jwt_secret,
            jwt_issuer,
            jwt_audience,
            jwt_expiry_minutes,
            refresh_token_expiry_days,
            refresh_cookie_secure,
            refresh_cookie_domain,
            cors_allowed_origin,
            company_code,
            document_expiry_years,
            assignment_edit_policy,
            email_api_url,
            email_api_key,
            email_from,
            app_base_url,
            cron_secret,
        })
    }

    pub fn redacted_database_url(&self) -> String {
        redact_database_url(&self.database_url)
    }

    pub fn email_enabled(&self) -> bool {
        self.email_api_url.is_some()
    }
}

/// The company code is the first segment of every document number.
fn parse_company_code(raw: &str) -> Result<String> {
    let code = raw.trim().to_ascii_uppercase();
    if code.is_empty() || !code.chars().all(|ch| ch.is_ascii_alphabetic()) {
        return Err(anyhow!("COMPANY_CODE must contain only letters, got '{raw}'"));
    }
    Ok(code)
}

fn redact_database_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut parsed) => {
            let _ = parsed.set_password(Some("*****"));
            parsed.to_string()
        }
        Err(_) => "***".to_string(),
    }
}
