use std::time::Duration;

use bytes::Bytes;
use graphql_client::{GraphQLQuery, QueryBody, Response};
use reqwest::{
    Client, StatusCode,
    header::{ACCEPT, CONTENT_TYPE},
};
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;
use url::Url;

use crate::error::UploadError;

const FRONTIFY_BETA_HEADER: &str = "x-frontify-beta";
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Sends GraphQL operations to the Frontify endpoint.
///
/// There is no retry at this level; a failed or timed out transport, a non-2xx
/// status, an unparseable body or a non-empty `errors` array all come back as
/// an error.
#[derive(Debug, Clone)]
pub struct GraphQlClient {
    client: Client,
    graphql_url: Url,
    auth_token: String,
    request_timeout: Duration,
}

impl GraphQlClient {
    pub fn new(graphql_url: Url, auth_token: String, request_timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            graphql_url,
            auth_token,
            request_timeout,
        }
    }

    pub async fn execute_query<T>(&self, variables: T::Variables) -> Result<Option<T::ResponseData>, UploadError>
    where
        T: GraphQLQuery,
        T::Variables: Serialize,
        T::ResponseData: DeserializeOwned,
    {
        self.execute(&T::build_query(variables)).await
    }

    /// Returns the `data` member of the response, which may legitimately be
    /// `null` when the server had nothing to report.
    pub async fn execute<V, R>(&self, request_body: &QueryBody<V>) -> Result<Option<R>, UploadError>
    where
        V: Serialize,
        R: DeserializeOwned,
    {
        debug!(operation = request_body.operation_name, "Executing GraphQL operation");

        let response = self
            .client
            .post(self.graphql_url.clone())
            .bearer_auth(&self.auth_token)
            .header(FRONTIFY_BETA_HEADER, "enabled")
            .header(ACCEPT, "application/json")
            .timeout(self.request_timeout)
            .json(request_body)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        let response_body: Response<R> = match serde_json::from_slice(&body) {
            Ok(response_body) => response_body,
            Err(_) if !status.is_success() => return Err(status_error(status, &body)),
            Err(e) => return Err(e.into()),
        };

        if let Some(errors) = response_body.errors.filter(|errors| !errors.is_empty()) {
            let message = errors
                .into_iter()
                .map(|error| error.message)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(UploadError::Remote(message));
        }

        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        Ok(response_body.data)
    }
}

fn status_error(status: StatusCode, body: &[u8]) -> UploadError {
    UploadError::Status {
        status,
        body: String::from_utf8_lossy(body)
            .chars()
            .take(MAX_ERROR_BODY_CHARS)
            .collect(),
    }
}

/// Raw binary PUT of chunks to the pre-signed URLs of an upload session.
#[derive(Debug, Clone)]
pub struct ChunkTransport {
    client: Client,
    request_timeout: Duration,
}

impl ChunkTransport {
    pub fn new(request_timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            request_timeout,
        }
    }

    /// Success is decided by the status class alone; the body is ignored.
    pub async fn put_chunk(&self, url: &str, mime_type: &str, data: Bytes) -> bool {
        let response = self
            .client
            .put(url)
            .header(CONTENT_TYPE, mime_type)
            .timeout(self.request_timeout)
            .body(data)
            .send()
            .await;

        match response {
            Ok(response) => {
                let status = response.status();
                debug!(%status, "Chunk PUT finished");
                status.is_success()
            }
            Err(e) => {
                debug!(error = %e, "Chunk PUT failed");
                false
            }
        }
    }
}
