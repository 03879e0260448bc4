//! A small SCIM 2.0 HTTP client.
//!
//! Used by the forwarder to mirror changes downstream and by the
//! `scim-client` binary.

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Response};
use scim_filter::FilterError;
use scim_types::{ErrorBody, ListResponse, PatchOp, ResourceType};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

const SCIM_ACCEPT: &str = "application/scim+json; charset=utf-8";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server returned {status}: {detail}")]
    Status { status: u16, detail: String },

    #[error("Refusing to send invalid filter: {0}")]
    InvalidFilter(#[from] FilterError),

    #[error("Response was not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Query parameters for a list request.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excluded_attributes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

pub struct ScimClient {
    http: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl ScimClient {
    /// `base_url` is the SCIM root, e.g. `https://example.com/scim/v2`.
    pub fn new(
        base_url: &str,
        auth_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token: auth_token.filter(|t| !t.is_empty()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Lists resources. A filter is parsed locally first so malformed
    /// expressions never reach the server.
    pub async fn list(
        &self,
        resource_type: ResourceType,
        params: &ListParams,
    ) -> Result<ListResponse, ClientError> {
        if let Some(filter) = &params.filter {
            scim_filter::parse_filter(filter)?;
        }
        let response = self
            .request(Method::GET, &self.collection_url(resource_type))
            .query(params)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    pub async fn get(
        &self,
        resource_type: ResourceType,
        id: &str,
        attributes: Option<&str>,
    ) -> Result<Value, ClientError> {
        let mut request = self.request(Method::GET, &self.resource_url(resource_type, id));
        if let Some(attributes) = attributes {
            request = request.query(&[("attributes", attributes)]);
        }
        let response = request.send().await?;
        Ok(check(response).await?.json().await?)
    }

    pub async fn create(
        &self,
        resource_type: ResourceType,
        body: &Value,
    ) -> Result<Value, ClientError> {
        let response = self
            .request(Method::POST, &self.collection_url(resource_type))
            .json(body)
            .send()
            .await?;
        read_body(check(response).await?).await
    }

    pub async fn replace(
        &self,
        resource_type: ResourceType,
        id: &str,
        body: &Value,
    ) -> Result<Value, ClientError> {
        let response = self
            .request(Method::PUT, &self.resource_url(resource_type, id))
            .json(body)
            .send()
            .await?;
        read_body(check(response).await?).await
    }

    pub async fn patch(
        &self,
        resource_type: ResourceType,
        id: &str,
        patch: &PatchOp,
    ) -> Result<Value, ClientError> {
        let response = self
            .request(Method::PATCH, &self.resource_url(resource_type, id))
            .json(patch)
            .send()
            .await?;
        read_body(check(response).await?).await
    }

    pub async fn delete(&self, resource_type: ResourceType, id: &str) -> Result<(), ClientError> {
        let response = self
            .request(Method::DELETE, &self.resource_url(resource_type, id))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    fn collection_url(&self, resource_type: ResourceType) -> String {
        format!("{}/{}", self.base_url, resource_type.endpoint())
    }

    fn resource_url(&self, resource_type: ResourceType, id: &str) -> String {
        format!("{}/{}/{}", self.base_url, resource_type.endpoint(), id)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let request = self
            .http
            .request(method, url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, SCIM_ACCEPT);
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

/// Turns non-2xx responses into `ClientError::Status`, using the SCIM error
/// `detail` when the body has one.
async fn check(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.detail)
        .unwrap_or(text);
    Err(ClientError::Status {
        status: status.as_u16(),
        detail,
    })
}

// Some servers answer writes with an empty body.
async fn read_body(response: Response) -> Result<Value, ClientError> {
    let bytes = response.bytes().await?;
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_are_built_from_trimmed_base() {
        let client =
            ScimClient::new("http://localhost:8080/scim/v2/", None, Duration::from_secs(1))
                .unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080/scim/v2");
        assert_eq!(
            client.collection_url(ResourceType::Group),
            "http://localhost:8080/scim/v2/Groups"
        );
        assert_eq!(
            client.resource_url(ResourceType::User, "42"),
            "http://localhost:8080/scim/v2/Users/42"
        );
    }

    #[test]
    fn test_list_params_use_scim_names() {
        let params = ListParams {
            excluded_attributes: Some("emails".into()),
            start_index: Some(3),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&params).unwrap(),
            serde_json::json!({"excludedAttributes": "emails", "startIndex": 3})
        );
    }

    #[tokio::test]
    async fn test_invalid_filter_is_rejected_locally() {
        let client = ScimClient::new("http://127.0.0.1:9", None, Duration::from_secs(1)).unwrap();
        let params = ListParams {
            filter: Some("userName eq".into()),
            ..Default::default()
        };
        let err = client.list(ResourceType::User, &params).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidFilter(_)));
    }
}
