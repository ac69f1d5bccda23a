//! HTTP implementation of [`GatewayApi`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{instrument, warn};
use url::Url;

use petal_core::{OrderId, OrderStatus, ProductId, TelegramId, UserId};

use super::error::GatewayError;
use super::types::{
    AddressBody, CreateOrderRequest, ErrorBody, Identity, LinkRequest, Order, Product,
    RegisterRequest, Report, ReportEnvelope, StatusChange, UpdateStatusRequest,
};
use super::GatewayApi;

/// How a request authenticates.
#[derive(Clone, Copy)]
enum Auth<'a> {
    /// The shared bot key.
    Bot,
    /// A user token.
    User(&'a str),
}

/// Gateway client over HTTP.
#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    /// Base URL ending in `/`.
    base: Url,
    api_key: SecretString,
}

impl std::fmt::Debug for HttpGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGateway")
            .field("base", &self.base.as_str())
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl HttpGateway {
    /// Create a client for the gateway at `base`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base: Url, api_key: SecretString, timeout: Duration) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            base,
            api_key,
        })
    }

    fn url(&self, path: &str) -> Result<Url, GatewayError> {
        self.base
            .join(path)
            .map_err(|e| GatewayError::Decode(format!("bad path {path}: {e}")))
    }

    fn request(&self, method: Method, url: Url, auth: Auth<'_>) -> RequestBuilder {
        let header = match auth {
            Auth::Bot => format!("Bearer {}", self.api_key.expose_secret()),
            Auth::User(token) => format!("Token {token}"),
        };
        self.client
            .request(method, url)
            .header(reqwest::header::AUTHORIZATION, header)
    }

    /// `GET`, retried once when the gateway could not be reached.
    async fn get<T: DeserializeOwned>(&self, path: &str, auth: Auth<'_>) -> Result<T, GatewayError> {
        let url = self.url(path)?;
        let response = match self.request(Method::GET, url.clone(), auth).send().await {
            Err(e) if e.is_timeout() || e.is_connect() => {
                warn!(path, error = %e, "Gateway request failed, retrying once");
                self.request(Method::GET, url, auth).send().await
            }
            other => other,
        }
        .map_err(transport_error)?;
        decode(response).await
    }

    /// `POST` with a JSON body. Never retried.
    async fn post<B, T>(&self, path: &str, auth: Auth<'_>, body: &B) -> Result<T, GatewayError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::POST, self.url(path)?, auth)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;
        decode(response).await
    }
}

fn transport_error(e: reqwest::Error) -> GatewayError {
    if e.is_decode() {
        GatewayError::Decode(e.to_string())
    } else {
        GatewayError::Unavailable(e.to_string())
    }
}

/// Turn a response into a value or the matching [`GatewayError`].
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()));
    }

    let body: Option<ErrorBody> = response.json().await.ok();
    Err(error_for_status(status, body))
}

fn error_for_status(status: StatusCode, body: Option<ErrorBody>) -> GatewayError {
    let (code, message) = body.map_or_else(
        || (String::new(), status.to_string()),
        |b| (b.error, b.message),
    );
    match status {
        StatusCode::UNAUTHORIZED => GatewayError::Unauthorized,
        StatusCode::FORBIDDEN => GatewayError::Forbidden(message),
        StatusCode::NOT_FOUND => GatewayError::NotFound(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            GatewayError::Invalid { code, message }
        }
        StatusCode::CONFLICT => GatewayError::Conflict(message),
        other => GatewayError::Server(other.as_u16()),
    }
}

#[async_trait]
impl GatewayApi for HttpGateway {
    #[instrument(skip(self))]
    async fn identity(&self, telegram_id: TelegramId) -> Result<Option<Identity>, GatewayError> {
        match self
            .get(&format!("api/bot/identities/{telegram_id}/"), Auth::Bot)
            .await
        {
            Ok(identity) => Ok(Some(identity)),
            Err(GatewayError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self, name, phone))]
    async fn register(
        &self,
        telegram_id: TelegramId,
        name: &str,
        phone: &str,
    ) -> Result<Identity, GatewayError> {
        let body = RegisterRequest {
            telegram_id: telegram_id.as_i64(),
            name,
            phone,
        };
        self.post("api/bot/identities/", Auth::Bot, &body).await
    }

    #[instrument(skip(self))]
    async fn link(
        &self,
        telegram_id: TelegramId,
        user_id: UserId,
    ) -> Result<Identity, GatewayError> {
        let body = LinkRequest {
            telegram_id: telegram_id.as_i64(),
            user_id,
        };
        self.post("api/bot/identities/link/", Auth::Bot, &body).await
    }

    async fn products(&self) -> Result<Vec<Product>, GatewayError> {
        self.get("api/products/", Auth::Bot).await
    }

    async fn orders(&self, token: &str) -> Result<Vec<Order>, GatewayError> {
        self.get("api/orders/", Auth::User(token)).await
    }

    async fn order(&self, token: &str, id: OrderId) -> Result<Order, GatewayError> {
        self.get(&format!("api/orders/{id}/"), Auth::User(token))
            .await
    }

    #[instrument(skip(self, token))]
    async fn update_status(
        &self,
        token: &str,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<StatusChange, GatewayError> {
        self.post(
            &format!("api/orders/{id}/update/"),
            Auth::User(token),
            &UpdateStatusRequest { status },
        )
        .await
    }

    #[instrument(skip(self, token, delivery_address))]
    async fn create_order(
        &self,
        token: &str,
        product_ids: &[ProductId],
        delivery_address: Option<&str>,
    ) -> Result<Order, GatewayError> {
        let body = CreateOrderRequest {
            product_ids,
            delivery_address,
        };
        self.post("api/orders/", Auth::User(token), &body).await
    }

    async fn address(&self, token: &str) -> Result<Option<String>, GatewayError> {
        let body: AddressBody = self.get("api/user/address/", Auth::User(token)).await?;
        Ok(body.delivery_address)
    }

    async fn save_address(
        &self,
        token: &str,
        address: &str,
    ) -> Result<Option<String>, GatewayError> {
        let body: AddressBody = self
            .post(
                "api/user/address/save/",
                Auth::User(token),
                &AddressBody {
                    delivery_address: Some(address.to_string()),
                },
            )
            .await?;
        Ok(body.delivery_address)
    }

    async fn latest_report(&self, token: &str) -> Result<Option<Report>, GatewayError> {
        let envelope: ReportEnvelope = self
            .get("api/reports/latest/", Auth::User(token))
            .await?;
        Ok(envelope.report)
    }
}
