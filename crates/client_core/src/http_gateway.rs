use std::{marker::PhantomData, time::Duration};

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, CONTENT_TYPE},
    Client, Method, RequestBuilder, StatusCode,
};
use serde_json::Value;
use shared::{
    domain::{Record, ResourceId},
    error::ApiError,
    protocol::{acknowledged_id, unwrap_envelope, ResourceRoutes, UpdateVerb},
    schema::ResourceSchema,
};
use tracing::debug;
use url::Url;

use crate::{
    config::{parse_api_url, ClientSettings},
    error::GatewayError,
    gateway::{CreateOutcome, GatewayResult, ResourceGateway},
};

pub const API_KEY_HEADER: &str = "x-api-key";

/// Shared transport for every resource gateway: base url, credential header
/// and request timeout.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str, api_key: Option<&str>, timeout: Duration) -> anyhow::Result<Self> {
        let base_url = parse_api_url(base_url)?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = api_key {
            let mut value =
                HeaderValue::from_str(key).context("api key is not a valid header value")?;
            value.set_sensitive(true);
            headers.insert(API_KEY_HEADER, value);
        }

        let http = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .context("failed to build http client")?;

        Ok(Self { http, base_url })
    }

    pub fn from_settings(settings: &ClientSettings) -> anyhow::Result<Self> {
        Self::new(
            &settings.api_url,
            settings.api_key.as_deref(),
            settings.request_timeout(),
        )
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, route: &str, id: Option<&ResourceId>) -> GatewayResult<Url> {
        let mut url = self
            .base_url
            .join(route)
            .map_err(|e| GatewayError::Network(format!("invalid route '{route}': {e}")))?;
        if let Some(id) = id {
            url.path_segments_mut()
                .map_err(|_| GatewayError::Network(format!("route '{route}' cannot take an id")))?
                .push(id.as_str());
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!(%method, %url, "gateway: request");
        self.http.request(method, url)
    }

    /// Sends `request` and returns its JSON body (`Null` for an empty body),
    /// mapping non-2xx statuses onto the gateway error taxonomy.
    async fn send(&self, request: RequestBuilder) -> GatewayResult<Value> {
        let response = request.send().await.map_err(|err| {
            if err.is_timeout() {
                GatewayError::Network("request timed out".into())
            } else {
                GatewayError::from(err)
            }
        })?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            return Err(status_error(status, &bytes));
        }
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

fn status_error(status: StatusCode, body: &[u8]) -> GatewayError {
    let api_error = serde_json::from_slice::<ApiError>(body).unwrap_or_default();
    match status {
        StatusCode::NOT_FOUND => GatewayError::NotFound,
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY
            if !api_error.errors.is_empty() =>
        {
            GatewayError::Validation(api_error.errors)
        }
        _ => GatewayError::Server {
            status: status.as_u16(),
            message: api_error
                .summary()
                .or(status.canonical_reason())
                .unwrap_or("unexpected status")
                .to_string(),
        },
    }
}

/// REST gateway for one resource type, routed by [`ResourceRoutes`].
pub struct HttpGateway<F> {
    api: ApiClient,
    routes: ResourceRoutes,
    _schema: PhantomData<fn() -> F>,
}

impl<F: ResourceSchema> HttpGateway<F> {
    pub fn new(api: ApiClient) -> Self {
        Self::with_routes(api, ResourceRoutes::for_kind(F::KIND))
    }

    pub fn with_routes(api: ApiClient, routes: ResourceRoutes) -> Self {
        Self {
            api,
            routes,
            _schema: PhantomData,
        }
    }

    fn decode_record(&self, body: Value) -> GatewayResult<Record<F>> {
        serde_json::from_value(unwrap_envelope(body, self.routes.item_key))
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

#[async_trait]
impl<F: ResourceSchema> ResourceGateway<F> for HttpGateway<F> {
    async fn list(&self) -> GatewayResult<Vec<Record<F>>> {
        let url = self.api.endpoint(self.routes.list, None)?;
        let body = self.api.send(self.api.request(Method::GET, url)).await?;
        match unwrap_envelope(body, self.routes.list_key) {
            Value::Null => Ok(Vec::new()),
            payload => {
                serde_json::from_value(payload).map_err(|e| GatewayError::Decode(e.to_string()))
            }
        }
    }

    async fn get(&self, id: &ResourceId) -> GatewayResult<Record<F>> {
        let url = self.api.endpoint(self.routes.get, Some(id))?;
        let body = self.api.send(self.api.request(Method::GET, url)).await?;
        if body.is_null() {
            return Err(GatewayError::NotFound);
        }
        self.decode_record(body)
    }

    async fn create(&self, fields: &F) -> GatewayResult<CreateOutcome<F>> {
        let url = self.api.endpoint(self.routes.create, None)?;
        let body = self
            .api
            .send(self.api.request(Method::POST, url).json(fields))
            .await?;

        match self.decode_record(body.clone()) {
            Ok(record) => Ok(CreateOutcome::Created(record)),
            Err(_) => Ok(CreateOutcome::Acknowledged(
                acknowledged_id(&body, self.routes.item_key).map(ResourceId::from),
            )),
        }
    }

    async fn update(&self, id: &ResourceId, fields: &F) -> GatewayResult<Record<F>> {
        let method = match self.routes.update_verb {
            UpdateVerb::Post => Method::POST,
            UpdateVerb::Put => Method::PUT,
        };
        let url = self.api.endpoint(self.routes.update, Some(id))?;
        let body = self
            .api
            .send(self.api.request(method, url).json(fields))
            .await?;

        // Servers that only acknowledge an update leave the submitted fields authoritative.
        Ok(self
            .decode_record(body)
            .unwrap_or_else(|_| Record::new(id.clone(), fields.clone())))
    }

    async fn delete(&self, id: &ResourceId) -> GatewayResult<()> {
        let url = self.api.endpoint(self.routes.delete, Some(id))?;
        self.api
            .send(self.api.request(Method::DELETE, url))
            .await
            .map(|_| ())
    }

    async fn toggle(&self, id: &ResourceId, _flag: &str) -> GatewayResult<Record<F>> {
        let Some(route) = self.routes.toggle else {
            return Err(GatewayError::Unsupported);
        };
        let url = self.api.endpoint(route, Some(id))?;
        let body = self.api.send(self.api.request(Method::PATCH, url)).await?;
        match self.decode_record(body) {
            Ok(record) => Ok(record),
            Err(_) => self.get(id).await,
        }
    }
}
