//! `TaskApi` over HTTP/JSON using reqwest.

use crate::api::TaskApi;
use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use task_model::{Category, EntityId, NewOneOff, OneOffPatch, OneOffTodo, TaskStatus, TodoWithCategory};

/// HTTP implementation of [`TaskApi`].
#[derive(Debug, Clone)]
pub struct HttpTaskApi {
    client: Client,
    base_url: String,
}

impl HttpTaskApi {
    /// Build a client from `config`.
    pub fn new(config: &ApiConfig) -> ApiResult<Self> {
        let base_url = config.normalized_base_url().to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ApiError::InvalidUrl(config.base_url.clone()));
        }

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn check(response: Response) -> ApiResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(ApiError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let response = self.client.get(self.url(path)).send().await?;
        let response = Self::check(response).await?;
        Ok(response.json::<T>().await?)
    }

    async fn patch_status(&self, path: &str, status: TaskStatus) -> ApiResult<()> {
        let response = self
            .client
            .patch(self.url(path))
            .query(&[("status", status.as_str())])
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

impl TaskApi for HttpTaskApi {
    async fn list_categories(&self) -> ApiResult<Vec<Category>> {
        self.get_json("categories").await
    }

    async fn list_recommended_todos(&self) -> ApiResult<Vec<TodoWithCategory>> {
        self.get_json("recommended-todos").await
    }

    async fn list_oneoffs(&self) -> ApiResult<Vec<OneOffTodo>> {
        self.get_json("oneoff-todos").await
    }

    async fn update_todo_status(&self, id: EntityId, status: TaskStatus) -> ApiResult<()> {
        tracing::debug!(id, %status, "PATCH todo status");
        self.patch_status(&format!("todos/{id}/status"), status).await
    }

    async fn create_oneoff(&self, new: &NewOneOff) -> ApiResult<OneOffTodo> {
        tracing::debug!(title = %new.title, "POST one-off");
        let response = self
            .client
            .post(self.url("oneoff-todos"))
            .json(new)
            .send()
            .await?;
        let response = Self::check(response).await?;
        Ok(response.json::<OneOffTodo>().await?)
    }

    async fn update_oneoff(&self, id: EntityId, patch: &OneOffPatch) -> ApiResult<OneOffTodo> {
        tracing::debug!(id, "PATCH one-off");
        let response = self
            .client
            .patch(self.url(&format!("oneoff-todos/{id}")))
            .json(patch)
            .send()
            .await?;
        let response = Self::check(response).await?;
        Ok(response.json::<OneOffTodo>().await?)
    }

    async fn update_oneoff_status(&self, id: EntityId, status: TaskStatus) -> ApiResult<()> {
        tracing::debug!(id, %status, "PATCH one-off status");
        self.patch_status(&format!("oneoff-todos/{id}/status"), status).await
    }

    async fn delete_oneoff(&self, id: EntityId) -> ApiResult<()> {
        tracing::debug!(id, "DELETE one-off");
        let response = self
            .client
            .delete(self.url(&format!("oneoff-todos/{id}")))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn health_check(&self) -> ApiResult<()> {
        let response = self.client.get(self.url("health")).send().await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_http_base_url() {
        let err = HttpTaskApi::new(&ApiConfig::new("localhost:8000/api")).unwrap_err();
        assert!(matches!(err, ApiError::InvalidUrl(_)));
    }

    #[test]
    fn test_url_building() {
        let api = HttpTaskApi::new(&ApiConfig::new("http://localhost:8000/api/")).unwrap();
        assert_eq!(api.base_url(), "http://localhost:8000/api");
        assert_eq!(api.url("oneoff-todos/4"), "http://localhost:8000/api/oneoff-todos/4");
    }
}
