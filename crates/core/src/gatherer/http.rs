//! JSON-over-HTTP plumbing shared by the reference gatherers.

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{GatherError, GatherRequest};
use crate::tenant::GathererEndpoint;

/// Header carrying the correlation id to backing services.
pub const CORRELATION_HEADER: &str = "x-correlation-id";

/// Resolve the tenant's endpoint for a gatherer.
pub(crate) fn endpoint<'a>(
    request: &'a GatherRequest,
    name: &str,
) -> Result<&'a GathererEndpoint, GatherError> {
    request
        .tenant
        .gatherers
        .get(name)
        .ok_or_else(|| GatherError::NotConfigured(name.to_string()))
}

/// POST `body` to the endpoint and decode the JSON response, giving up at
/// the request deadline.
pub(crate) async fn post_json<B, T>(
    client: &reqwest::Client,
    endpoint: &GathererEndpoint,
    body: &B,
    request: &GatherRequest,
) -> Result<T, GatherError>
where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
{
    if request.is_expired() {
        return Err(GatherError::Timeout);
    }

    let call = async {
        let mut builder = client
            .post(&endpoint.url)
            .header(CORRELATION_HEADER, &request.correlation_id)
            .json(body);

        if let Some(ref api_key) = endpoint.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| GatherError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GatherError::Http {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| GatherError::InvalidResponse(e.to_string()))
    };

    tokio::time::timeout_at(request.deadline, call)
        .await
        .map_err(|_| GatherError::Timeout)?
}
