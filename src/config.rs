use std::{num::NonZeroU32, str::FromStr};

use anyhow::{Context, Result};
use axum::http::HeaderName;

use crate::db::SortOrder;

// ---------------------------------------------------------------------------
// QuerySource
// ---------------------------------------------------------------------------

/// Where the aggregation query endpoint reads its filter parameters from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QuerySource {
    #[default]
    QueryString,
    JsonBody,
}

impl FromStr for QuerySource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "query" => Ok(Self::QueryString),
            "body" => Ok(Self::JsonBody),
            other => Err(anyhow::anyhow!("unknown query parameter source: {other:?}")),
        }
    }
}

// ---------------------------------------------------------------------------
// ApiConfig
// ---------------------------------------------------------------------------

/// Endpoint and parameter conventions of the HTTP surface.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Ingestion route, e.g. `/sensors` or `/sensor`.
    pub ingest_path: String,
    pub query_path: String,
    pub query_source: QuerySource,
    /// Ordering of aggregation query results by `created_at`.
    pub sort_order: SortOrder,
    /// Header whose value attributes a reading that has no `uploaded_by`.
    pub uploader_header: HeaderName,
    /// Attribution used when neither the payload nor the header has one.
    pub default_uploader: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            ingest_path: "/sensors".to_owned(),
            query_path: "/sensor_query".to_owned(),
            query_source: QuerySource::default(),
            sort_order: SortOrder::default(),
            uploader_header: axum::http::header::USER_AGENT,
            default_uploader: "unknown".to_owned(),
        }
    }
}

impl ApiConfig {
    /// Configured routes must not collide with each other or with the
    /// fixed routes.
    pub fn validate(&self) -> Result<()> {
        const FIXED: [&str; 3] = ["/health", "/devices", "/api-docs/openapi.json"];
        if self.ingest_path == self.query_path {
            anyhow::bail!("INGEST_PATH and QUERY_PATH must differ, both are {:?}", self.ingest_path);
        }
        for path in [&self.ingest_path, &self.query_path] {
            if FIXED.contains(&path.as_str()) {
                anyhow::bail!("route {path:?} is reserved");
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    /// `postgres://…`, `sqlite:…` or `memory:`.
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    /// Pool size for relational backends.
    pub max_connections: u32,
    pub api: ApiConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let config = Self {
            database_url: required("DATABASE_URL")?,
            server_host: optional("SERVER_HOST", "0.0.0.0"),
            server_port: optional("SERVER_PORT", "8080")
                .parse()
                .context("SERVER_PORT must be a valid port number")?,
            max_connections: max_connections(&optional("DB_MAX_CONNECTIONS", "10"))?,
            api: ApiConfig {
                ingest_path: route_path("INGEST_PATH", "/sensors")?,
                query_path: route_path("QUERY_PATH", "/sensor_query")?,
                query_source: optional("QUERY_PARAMS_SOURCE", "query")
                    .parse()
                    .context("QUERY_PARAMS_SOURCE must be 'query' or 'body'")?,
                sort_order: optional("QUERY_ORDER", "desc")
                    .parse()
                    .context("QUERY_ORDER must be 'desc', 'asc' or 'none'")?,
                uploader_header: optional("UPLOADER_HEADER", "user-agent")
                    .parse()
                    .context("UPLOADER_HEADER must be a valid header name")?,
                default_uploader: optional("DEFAULT_UPLOADER", "unknown"),
            },
        };
        config.api.validate()?;
        Ok(config)
    }
}

fn max_connections(raw: &str) -> Result<u32> {
    raw.trim()
        .parse::<NonZeroU32>()
        .map(NonZeroU32::get)
        .with_context(|| format!("DB_MAX_CONNECTIONS must be a positive integer, got: {raw:?}"))
}

fn route_path(key: &str, default: &str) -> Result<String> {
    validate_path(key, optional(key, default))
}

/// Route paths must be absolute so they can be mounted on the router.
fn validate_path(key: &str, path: String) -> Result<String> {
    let path = path.trim().to_owned();
    if !path.starts_with('/') || path.len() < 2 {
        anyhow::bail!("{key} must start with '/' and name a route, got: {path:?}");
    }
    Ok(path)
}

fn required(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("missing required env var: {key}"))
}

fn optional(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}
