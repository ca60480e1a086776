//! HTTP-клиент удаленной библиотеки

use std::collections::BTreeSet;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use crate::error::{ReaderError, Result};
use crate::library::{LibraryRecord, RemoteLibraryApi, RemoteSettings};

/// Ответ со списком записей
#[derive(Debug, Deserialize)]
struct LibraryEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    library: Vec<LibraryRecord>,
    #[serde(default)]
    error: Option<String>,
}

/// Ответ с настройками
#[derive(Debug, Deserialize)]
struct SettingsEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    settings: Option<RemoteSettings>,
    #[serde(default)]
    error: Option<String>,
}

/// Клиент REST-сервиса библиотеки
///
/// Эндпоинты: `GET/POST /api/books`, `PUT/DELETE /api/books/{id}`,
/// `GET/PUT /api/settings`. Токен передается в заголовке `Authorization`.
#[derive(Debug, Clone)]
pub struct HttpLibraryApi {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpLibraryApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// URL записи; идентификатор кодируется как один сегмент пути
    fn book_url(&self, id: &str) -> Result<Url> {
        let base = self.url("/api/books");
        let mut url = Url::parse(&base)
            .map_err(|e| ReaderError::Configuration(format!("invalid library url {}: {}", base, e)))?;
        url.path_segments_mut()
            .map_err(|_| ReaderError::Configuration(format!("library url {} cannot have a path", base)))?
            .push(id);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.header("Authorization", token.as_str()),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self.authorize(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(text) => text,
                Err(e) => format!("failed to read error response: {}", e),
            };
            return Err(ReaderError::Network(format!("status {}: {}", status, body)));
        }
        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.send(request).await?;
        Ok(response.json::<T>().await?)
    }
}

fn rejected(error: Option<String>) -> ReaderError {
    ReaderError::Network(error.unwrap_or_else(|| "request rejected by server".to_string()))
}

#[async_trait]
impl RemoteLibraryApi for HttpLibraryApi {
    async fn list(&self) -> Result<Vec<LibraryRecord>> {
        let envelope: LibraryEnvelope = self.send_json(self.client.get(self.url("/api/books"))).await?;
        if !envelope.success {
            return Err(rejected(envelope.error));
        }
        log::debug!("Remote library returned {} records", envelope.library.len());
        Ok(envelope.library)
    }

    async fn create(&self, record: &LibraryRecord) -> Result<()> {
        self.send(self.client.post(self.url("/api/books")).json(record)).await?;
        Ok(())
    }

    async fn update_progress(&self, id: &str, read_pages: &BTreeSet<u32>, last_read: i64) -> Result<()> {
        let body = serde_json::json!({
            "readPages": read_pages,
            "lastRead": last_read,
        });
        self.send(self.client.put(self.book_url(id)?).json(&body)).await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.send(self.client.delete(self.book_url(id)?)).await?;
        Ok(())
    }

    async fn get_settings(&self) -> Result<Option<RemoteSettings>> {
        let envelope: SettingsEnvelope = self.send_json(self.client.get(self.url("/api/settings"))).await?;
        if !envelope.success {
            return Err(rejected(envelope.error));
        }
        Ok(envelope.settings)
    }

    async fn put_settings(&self, settings: &RemoteSettings) -> Result<()> {
        self.send(self.client.put(self.url("/api/settings")).json(settings)).await?;
        Ok(())
    }
}
