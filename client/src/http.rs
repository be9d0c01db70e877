//! HTTP implementation of the table API
//!
//! Talks to the REST backend of the administration console. Every endpoint
//! lives under `{base_url}/api/v1/`; responses are JSON and non-success
//! statuses carry the error text in their body.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use erp_views_core::models::{
    AssignedUser, Column, ColumnDraft, ColumnId, NotificationDraft, PageRequest, Record,
    RecordData, RecordId, RecordPage, ScheduledNotification, SortDraft, SortId, SortRecord,
    TableId, UserId, View, ViewColumnDraft, ViewColumnId, ViewColumnRecord, ViewDraft, ViewId,
};
use erp_views_core::{ApiError, ApiResult, TableApi};

use crate::error::{ClientError, Result};
use crate::settings::ClientSettings;

#[derive(Serialize)]
struct RecordBody<'a> {
    record_data: &'a RecordData,
}

#[derive(Serialize)]
struct PositionBody {
    position: i64,
}

#[derive(Serialize)]
struct AssignedUsersBody<'a> {
    user_ids: &'a [UserId],
}

/// Table API client over HTTP
pub struct HttpTableApi {
    /// Base URL of the backend
    base_url: String,

    /// HTTP client
    client: Client,

    /// Timeout for requests
    timeout: Duration,

    /// Bearer token sent with every request
    auth_token: Option<String>,
}

impl HttpTableApi {
    /// Create a new client
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
            timeout: Duration::from_secs(30),
            auth_token: None,
        }
    }

    /// Create a client from loaded settings
    pub fn from_settings(settings: &ClientSettings) -> Self {
        let mut api = Self::new(&settings.base_url);
        api.set_timeout(settings.request_timeout());
        if let Some(token) = &settings.auth_token {
            api.set_auth_token(token.clone());
        }
        api
    }

    /// Set the timeout for requests
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Set the bearer token
    pub fn set_auth_token(&mut self, token: impl Into<String>) {
        self.auth_token = Some(token.into());
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1/{}", self.base_url, path)
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Response> {
        let request = match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request.timeout(self.timeout).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(response.url().path().to_string()));
        }
        if !status.is_success() {
            let message = response.text().await?;
            return Err(ClientError::Server {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.execute(request).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let url = self.url(path);
        debug!("GET {}", url);
        self.fetch(self.client.get(&url)).await.map_err(ApiError::from)
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> ApiResult<T> {
        let url = self.url(path);
        debug!("POST {}", url);
        self.fetch(self.client.post(&url).json(body)).await.map_err(ApiError::from)
    }

    async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> ApiResult<T> {
        let url = self.url(path);
        debug!("PUT {}", url);
        self.fetch(self.client.put(&url).json(body)).await.map_err(ApiError::from)
    }

    async fn put_ignoring_body<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> ApiResult<()> {
        let url = self.url(path);
        debug!("PUT {}", url);
        self.execute(self.client.put(&url).json(body))
            .await
            .map(|_| ())
            .map_err(ApiError::from)
    }

    async fn delete(&self, path: &str) -> ApiResult<()> {
        let url = self.url(path);
        debug!("DELETE {}", url);
        self.execute(self.client.delete(&url))
            .await
            .map(|_| ())
            .map_err(ApiError::from)
    }
}

#[async_trait]
impl TableApi for HttpTableApi {
    async fn fetch_structure(&self, table_id: TableId) -> ApiResult<Vec<Column>> {
        self.get(&format!("tables/{}/structure", table_id)).await
    }

    async fn create_column(&self, table_id: TableId, draft: &ColumnDraft) -> ApiResult<Column> {
        self.post(&format!("tables/{}/columns", table_id), draft).await
    }

    async fn update_column(&self, table_id: TableId, column_id: ColumnId, draft: &ColumnDraft) -> ApiResult<Column> {
        self.put(&format!("tables/{}/columns/{}", table_id, column_id), draft)
            .await
    }

    async fn delete_column(&self, table_id: TableId, column_id: ColumnId) -> ApiResult<()> {
        self.delete(&format!("tables/{}/columns/{}", table_id, column_id))
            .await
    }

    async fn fetch_records(&self, table_id: TableId, page: PageRequest) -> ApiResult<RecordPage> {
        let url = self.url(&format!("tables/{}/records", table_id));
        debug!("GET {} page {} size {}", url, page.page, page.page_size);
        self.fetch(self.client.get(&url).query(&page))
            .await
            .map_err(ApiError::from)
    }

    async fn fetch_all_records(&self, table_id: TableId) -> ApiResult<Vec<Record>> {
        self.get(&format!("tables/{}/records/all", table_id)).await
    }

    async fn create_record(&self, table_id: TableId, data: &RecordData) -> ApiResult<Record> {
        self.post(
            &format!("tables/{}/records", table_id),
            &RecordBody { record_data: data },
        )
        .await
    }

    async fn update_record(&self, table_id: TableId, record_id: RecordId, data: &RecordData) -> ApiResult<Record> {
        self.put(
            &format!("tables/{}/records/{}", table_id, record_id),
            &RecordBody { record_data: data },
        )
        .await
    }

    async fn delete_record(&self, table_id: TableId, record_id: RecordId) -> ApiResult<()> {
        self.delete(&format!("tables/{}/records/{}", table_id, record_id))
            .await
    }

    async fn update_record_position(&self, record_id: RecordId, position: i64) -> ApiResult<()> {
        self.put_ignoring_body(
            &format!("records/{}/position", record_id),
            &PositionBody { position },
        )
        .await
    }

    async fn list_views(&self, table_id: TableId) -> ApiResult<Vec<View>> {
        self.get(&format!("tables/{}/views", table_id)).await
    }

    async fn create_view(&self, draft: &ViewDraft) -> ApiResult<View> {
        self.post("views", draft).await
    }

    async fn update_view(&self, view: &View) -> ApiResult<View> {
        self.put(&format!("views/{}", view.id), view).await
    }

    async fn delete_view(&self, view_id: ViewId) -> ApiResult<()> {
        self.delete(&format!("views/{}", view_id)).await
    }

    async fn list_view_columns(&self, view_id: ViewId) -> ApiResult<Vec<ViewColumnRecord>> {
        self.get(&format!("views/{}/columns", view_id)).await
    }

    async fn create_view_column(&self, draft: &ViewColumnDraft) -> ApiResult<ViewColumnRecord> {
        self.post(&format!("views/{}/columns", draft.view_id), draft)
            .await
    }

    async fn update_view_column(&self, record: &ViewColumnRecord) -> ApiResult<ViewColumnRecord> {
        self.put(
            &format!("views/{}/columns/{}", record.view_id, record.id),
            record,
        )
        .await
    }

    async fn delete_view_column(&self, view_id: ViewId, entry_id: ViewColumnId) -> ApiResult<()> {
        self.delete(&format!("views/{}/columns/{}", view_id, entry_id))
            .await
    }

    async fn list_sorts(&self, view_id: ViewId) -> ApiResult<Vec<SortRecord>> {
        self.get(&format!("views/{}/sorts", view_id)).await
    }

    async fn create_sort(&self, draft: &SortDraft) -> ApiResult<SortRecord> {
        self.post(&format!("views/{}/sorts", draft.view_id), draft)
            .await
    }

    async fn update_sort(&self, sort: &SortRecord) -> ApiResult<SortRecord> {
        self.put(&format!("views/{}/sorts/{}", sort.view_id, sort.id), sort)
            .await
    }

    async fn delete_sort(&self, view_id: ViewId, sort_id: SortId) -> ApiResult<()> {
        self.delete(&format!("views/{}/sorts/{}", view_id, sort_id))
            .await
    }

    async fn fetch_assigned_users(&self, record_id: RecordId) -> ApiResult<Vec<AssignedUser>> {
        self.get(&format!("records/{}/assigned-users", record_id))
            .await
    }

    async fn set_assigned_users(&self, record_id: RecordId, user_ids: &[UserId]) -> ApiResult<()> {
        self.put_ignoring_body(
            &format!("records/{}/assigned-users", record_id),
            &AssignedUsersBody { user_ids },
        )
        .await
    }

    async fn create_scheduled_notification(&self, draft: &NotificationDraft) -> ApiResult<ScheduledNotification> {
        self.post("scheduled-notifications", draft).await
    }
}
