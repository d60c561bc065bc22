//! Resource sub-clients: thin path-scoped views over the gateway core.

use lanyard_session::TokenSource;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{GatewayError, RequestGateway};

/// One resource group of the REST API (`/users`, `/cards`, ...). All
/// verbs inherit the gateway's bearer auth and refresh-and-replay; the
/// sub-client only contributes the path prefix.
pub struct ResourceClient<S: TokenSource> {
    gateway: RequestGateway<S>,
    base: String,
}

impl<S: TokenSource> Clone for ResourceClient<S> {
    fn clone(&self) -> Self {
        Self {
            gateway: self.gateway.clone(),
            base: self.base.clone(),
        }
    }
}

impl<S: TokenSource> ResourceClient<S> {
    pub(crate) fn new(gateway: RequestGateway<S>, name: &str) -> Self {
        Self {
            gateway,
            base: format!("/{}", name.trim_matches('/')),
        }
    }

    /// GET under this resource group.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, GatewayError> {
        self.gateway
            .execute(Method::GET, &join(&self.base, path), None)
            .await
    }

    /// POST with a JSON body.
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, GatewayError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body).map_err(GatewayError::Encode)?;
        self.gateway
            .execute(Method::POST, &join(&self.base, path), Some(body))
            .await
    }

    /// PUT with a JSON body.
    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, GatewayError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body).map_err(GatewayError::Encode)?;
        self.gateway
            .execute(Method::PUT, &join(&self.base, path), Some(body))
            .await
    }

    /// DELETE under this resource group.
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, GatewayError> {
        self.gateway
            .execute(Method::DELETE, &join(&self.base, path), None)
            .await
    }
}

/// Joins a group prefix and a caller path without doubling slashes.
fn join(base: &str, path: &str) -> String {
    if path.is_empty() {
        return base.to_string();
    }
    if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}
