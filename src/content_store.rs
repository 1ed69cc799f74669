//! Client for the headless CMS bucket holding site content.
//!
//! Every call is scoped to a single object type. Reads authenticate with the bucket read key
//! passed as a query parameter, writes with the write key as a bearer token.

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::ContentStoreSettings;

/// The store cannot be used because a connection parameter is missing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Content store setting `{0}` is missing")]
    MissingCredential(&'static str),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to reach the content store: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Content store responded with {status}: {message}")]
    Upstream { status: u16, message: String },
}

/// A stored object. Domain fields live in `metadata`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentObject<M> {
    pub id: String,
    pub title: String,
    pub slug: String,
    #[serde(rename = "type", default)]
    pub object_type: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub modified_at: Option<String>,
    pub metadata: M,
}

/// Payload of an insert. The object type is filled in by the store handle.
#[derive(Debug, Clone, Serialize)]
pub struct NewContentObject<M> {
    pub title: String,
    pub slug: String,
    pub metadata: M,
}

#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub limit: Option<u32>,
    /// Field name, prefixed with `-` for descending order.
    pub sort: Option<String>,
}

#[derive(Serialize)]
struct InsertBody<'a, M> {
    title: &'a str,
    slug: &'a str,
    #[serde(rename = "type")]
    object_type: &'a str,
    metadata: &'a M,
}

#[derive(Serialize)]
struct UpdateBody<'a, M> {
    metadata: &'a M,
}

#[derive(Deserialize)]
struct ObjectEnvelope<T> {
    object: T,
}

#[derive(Deserialize)]
struct ObjectsEnvelope<T> {
    #[serde(default = "Vec::new")]
    objects: Vec<T>,
}

#[derive(Deserialize)]
struct UpstreamErrorBody {
    message: Option<String>,
}

/// Handle on a bucket, built once from validated settings and shared by reference.
#[derive(Clone)]
pub struct ContentStore {
    http_client: Client,
    base_url: String,
    bucket_slug: String,
    read_key: Secret<String>,
    write_key: Secret<String>,
    object_type: String,
}

impl ContentStore {
    pub fn from_settings(
        settings: &ContentStoreSettings,
    ) -> Result<ContentStore, ConfigurationError> {
        let bucket_slug = settings
            .bucket_slug
            .clone()
            .filter(|slug| !slug.trim().is_empty())
            .ok_or(ConfigurationError::MissingCredential("bucket_slug"))?;
        let read_key = present_secret(&settings.read_key)
            .ok_or(ConfigurationError::MissingCredential("read_key"))?;
        let write_key = present_secret(&settings.write_key)
            .ok_or(ConfigurationError::MissingCredential("write_key"))?;
        let object_type = if settings.object_type.trim().is_empty() {
            crate::config::DEFAULT_OBJECT_TYPE.to_string()
        } else {
            settings.object_type.clone()
        };
        let http_client = Client::builder()
            .timeout(settings.get_timeout())
            .build()
            .expect("Failed to build the content store HTTP client");

        Ok(ContentStore {
            http_client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            bucket_slug,
            read_key,
            write_key,
            object_type,
        })
    }

    pub fn object_type(&self) -> &str {
        &self.object_type
    }

    fn objects_url(&self) -> String {
        format!("{}/v3/buckets/{}/objects", self.base_url, self.bucket_slug)
    }

    fn object_url(&self, id: &str) -> String {
        format!("{}/{}", self.objects_url(), id)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(self.write_key.expose_secret())
    }

    #[tracing::instrument(
        name = "Insert a content object",
        skip(self, data),
        fields(slug = %data.slug)
    )]
    pub async fn insert_record<M, R>(
        &self,
        data: &NewContentObject<M>,
    ) -> Result<ContentObject<R>, StoreError>
    where
        M: Serialize,
        R: DeserializeOwned,
    {
        let body = InsertBody {
            title: &data.title,
            slug: &data.slug,
            object_type: &self.object_type,
            metadata: &data.metadata,
        };
        let response = self
            .authorized(self.http_client.post(self.objects_url()))
            .json(&body)
            .send()
            .await?;
        let envelope: ObjectEnvelope<ContentObject<R>> =
            check_response(response).await?.json().await?;

        Ok(envelope.object)
    }

    /// Objects of the configured type matching `filter`. A 404 from the store means the
    /// collection is empty, not that something failed.
    #[tracing::instrument(name = "Find content objects", skip(self, filter))]
    pub async fn find_by_type<R>(
        &self,
        filter: serde_json::Map<String, serde_json::Value>,
        options: FindOptions,
    ) -> Result<Vec<ContentObject<R>>, StoreError>
    where
        R: DeserializeOwned,
    {
        let mut query = filter;
        query.insert(
            "type".to_string(),
            serde_json::Value::String(self.object_type.clone()),
        );

        let mut params = vec![
            ("read_key", self.read_key.expose_secret().clone()),
            ("query", serde_json::Value::Object(query).to_string()),
            (
                "props",
                "id,title,slug,type,created_at,modified_at,metadata".to_string(),
            ),
        ];
        if let Some(limit) = options.limit {
            params.push(("limit", limit.to_string()));
        }
        if let Some(sort) = options.sort {
            params.push(("sort", sort));
        }

        let response = self
            .http_client
            .get(self.objects_url())
            .query(&params)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }

        let envelope: ObjectsEnvelope<ContentObject<R>> =
            check_response(response).await?.json().await?;

        Ok(envelope.objects)
    }

    pub async fn find_one_by_field<R>(
        &self,
        field: &str,
        value: &str,
    ) -> Result<Option<ContentObject<R>>, StoreError>
    where
        R: DeserializeOwned,
    {
        let mut filter = serde_json::Map::new();
        filter.insert(field.to_string(), serde_json::Value::String(value.to_string()));

        let objects = self
            .find_by_type(
                filter,
                FindOptions {
                    limit: Some(1),
                    sort: None,
                },
            )
            .await?;

        Ok(objects.into_iter().next())
    }

    #[tracing::instrument(name = "Update a content object", skip(self, metadata))]
    pub async fn update_record<M, R>(
        &self,
        id: &str,
        metadata: &M,
    ) -> Result<ContentObject<R>, StoreError>
    where
        M: Serialize,
        R: DeserializeOwned,
    {
        let response = self
            .authorized(self.http_client.patch(self.object_url(id)))
            .json(&UpdateBody { metadata })
            .send()
            .await?;
        let envelope: ObjectEnvelope<ContentObject<R>> =
            check_response(response).await?.json().await?;

        Ok(envelope.object)
    }

    #[tracing::instrument(name = "Delete a content object", skip(self))]
    pub async fn delete_record(&self, id: &str) -> Result<(), StoreError> {
        let response = self
            .authorized(self.http_client.delete(self.object_url(id)))
            .send()
            .await?;

        check_response(response).await?;

        Ok(())
    }
}

fn present_secret(secret: &Option<Secret<String>>) -> Option<Secret<String>> {
    secret
        .as_ref()
        .filter(|value| !value.expose_secret().trim().is_empty())
        .cloned()
}

async fn check_response(response: Response) -> Result<Response, StoreError> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<UpstreamErrorBody>(&text)
        .ok()
        .and_then(|body| body.message)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error").to_string());

    Err(StoreError::Upstream {
        status: status.as_u16(),
        message,
    })
}
