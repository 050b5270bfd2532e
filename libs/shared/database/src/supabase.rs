use anyhow::{anyhow, Result};
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use shared_config::AppConfig;

use crate::error::DatabaseError;
use crate::query::Query;

/// Thin PostgREST client. Every collection the service touches is a table
/// reached through `/rest/v1/{table}`; the schema named by `DATABASE_NAME`
/// is selected through the profile headers.
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    api_key: String,
    schema: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.database_url.trim_end_matches('/').to_string(),
            api_key: config.database_api_key.clone(),
            schema: config.database_name.clone(),
        }
    }

    fn get_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        headers.insert("apikey", HeaderValue::from_str(&self.api_key)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))?,
        );
        headers.insert("Accept-Profile", HeaderValue::from_str(&self.schema)?);
        headers.insert("Content-Profile", HeaderValue::from_str(&self.schema)?);

        Ok(headers)
    }

    pub async fn request<T>(&self, method: Method, path: &str, body: Option<Value>) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.request_with_headers(method, path, body, None).await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut headers = self.get_headers()?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url).headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("API error ({}): {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => anyhow!("Authentication error: {}", error_text),
                404 => anyhow!("Resource not found: {}", error_text),
                409 => DatabaseError::Conflict(error_text).into(),
                _ => anyhow!("API error ({}): {}", status, error_text),
            });
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }

    fn representation() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        headers
    }

    pub async fn select<T>(&self, query: &Query) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        self.request(Method::GET, &query.to_path(), None).await
    }

    pub async fn select_one<T>(&self, query: Query) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let rows: Vec<T> = self.select(&query.limit(1)).await?;
        Ok(rows.into_iter().next())
    }

    pub async fn is_empty(&self, table: &str) -> Result<bool> {
        let rows: Vec<Value> = self
            .select(&Query::table(table).select("id").limit(1))
            .await?;
        Ok(rows.is_empty())
    }

    /// Inserts one object or an array of objects and returns the stored rows.
    pub async fn insert<T>(&self, table: &str, body: Value) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        self.request_with_headers(
            Method::POST,
            &Query::table(table).to_path(),
            Some(body),
            Some(Self::representation()),
        )
        .await
    }

    /// Insert that is silently skipped when it collides on `on_conflict`.
    /// An empty result means another row already holds that key.
    pub async fn insert_ignore_duplicates<T>(
        &self,
        table: &str,
        on_conflict: &str,
        body: Value,
    ) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let mut headers = HeaderMap::new();
        headers.insert(
            "Prefer",
            HeaderValue::from_static("resolution=ignore-duplicates,return=representation"),
        );

        let path = format!(
            "{}?on_conflict={}",
            Query::table(table).to_path(),
            urlencoding::encode(on_conflict)
        );

        self.request_with_headers(Method::POST, &path, Some(body), Some(headers))
            .await
    }

    /// Patches every row matched by `query` and returns the updated rows.
    pub async fn update<T>(&self, query: &Query, body: Value) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        self.request_with_headers(
            Method::PATCH,
            &query.to_path(),
            Some(body),
            Some(Self::representation()),
        )
        .await
    }
}
