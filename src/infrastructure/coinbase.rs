//! Ledger adapter for the Coinbase v2 wallet API using API-key authentication.
//!
//! Every request is signed with HMAC-SHA256 over
//! `timestamp + METHOD + path + body` and carries the pinned `CB-VERSION`.
//! Responses are wrapped in a `{ "pagination": .., "data": .. }` envelope;
//! only `data` is decoded.

use crate::config::LedgerConfig;
use crate::domain::account::Account;
use crate::domain::money::{Currency, Money};
use crate::domain::ports::Ledger;
use crate::domain::transaction::{Address, Price, Transaction};
use crate::error::{Result, TipError};
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

type HmacSha256 = Hmac<Sha256>;

const USER_AGENT: &str = "Cointip/v1";

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Option<Value>,
}

/// Hex-encoded HMAC-SHA256 signature of a request.
pub fn sign(secret: &str, timestamp: &str, method: &str, path: &str, body: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| TipError::Config(format!("invalid api secret: {e}")))?;
    mac.update(timestamp.as_bytes());
    mac.update(method.as_bytes());
    mac.update(path.as_bytes());
    mac.update(body.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Stateless client for the Coinbase ledger. Cheap to clone.
#[derive(Clone)]
pub struct CoinbaseClient {
    http: reqwest::Client,
    config: LedgerConfig,
}

impl CoinbaseClient {
    pub fn new(config: LedgerConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| TipError::Config(format!("failed to build http client: {e}")))?;
        Ok(Self { http, config })
    }

    /// Makes an authenticated request and returns the status with the
    /// unwrapped `data` member of the response, if any.
    async fn request(
        &self,
        operation: &'static str,
        method: Method,
        path: &str,
        params: Option<Value>,
    ) -> Result<(StatusCode, Option<Value>)> {
        let url = format!("{}{}", self.config.endpoint, path);
        let body = match &params {
            Some(params) => params.to_string(),
            None => String::new(),
        };

        let unavailable = |e: reqwest::Error| TipError::LedgerUnavailable {
            operation,
            source: Box::new(e),
        };

        let parsed = reqwest::Url::parse(&url).map_err(|e| {
            TipError::Config(format!("invalid ledger endpoint {url}: {e}"))
        })?;
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
            .to_string();
        let signature = sign(
            &self.config.credentials.api_secret,
            &timestamp,
            method.as_str(),
            parsed.path(),
            &body,
        )?;

        let request = self
            .http
            .request(method.clone(), parsed)
            .header("CB-ACCESS-KEY", &self.config.credentials.api_key)
            .header("CB-ACCESS-SIGN", signature)
            .header("CB-ACCESS-TIMESTAMP", &timestamp)
            .header("CB-VERSION", &self.config.api_version)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body.clone());

        if self.config.debug {
            info!(%method, %url, %body, "ledger request");
        }

        let response = request.send().await.map_err(unavailable)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(unavailable)?;

        if self.config.debug {
            info!(
                status = status.as_u16(),
                body = %String::from_utf8_lossy(&bytes),
                "ledger response"
            );
        }

        if bytes.is_empty() || !status.is_success() {
            return Ok((status, None));
        }
        let envelope: Envelope = serde_json::from_slice(&bytes)
            .map_err(|source| TipError::MalformedPayload { operation, source })?;
        Ok((status, envelope.data))
    }

    async fn call<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        method: Method,
        path: &str,
        params: Option<Value>,
        expected: StatusCode,
    ) -> Result<T> {
        let (status, data) = self.request(operation, method, path, params).await?;
        if status != expected {
            return Err(TipError::LedgerRejected {
                operation,
                status: status.as_u16(),
            });
        }
        serde_json::from_value(data.unwrap_or(Value::Null))
            .map_err(|source| TipError::MalformedPayload { operation, source })
    }

    async fn post_transaction(
        &self,
        operation: &'static str,
        kind: &str,
        from: &str,
        to: &str,
        amount: Money,
    ) -> Result<Transaction> {
        if !amount.currency().is_transferable() {
            return Err(TipError::validation(format!(
                "invalid currency type: {}",
                amount.currency()
            )));
        }
        let params = json!({
            "type": kind,
            "to": to,
            "amount": amount.wire_amount(),
            "currency": amount.currency().code(),
            "description": format!("cointip {operation}"),
        });
        self.call(
            operation,
            Method::POST,
            &format!("accounts/{from}/transactions"),
            Some(params),
            StatusCode::CREATED,
        )
        .await
    }
}

#[async_trait]
impl Ledger for CoinbaseClient {
    async fn list_accounts(&self) -> Result<Vec<Account>> {
        // TODO: follow `pagination.next_uri` once accounts outgrow one page.
        self.call("list_accounts", Method::GET, "accounts", None, StatusCode::OK)
            .await
    }

    async fn get_account(&self, id: &str) -> Result<Account> {
        self.call(
            "get_account",
            Method::GET,
            &format!("accounts/{id}"),
            None,
            StatusCode::OK,
        )
        .await
    }

    async fn create_account(&self, name: &str) -> Result<Account> {
        self.call(
            "create_account",
            Method::POST,
            "accounts",
            Some(json!({ "name": name })),
            StatusCode::CREATED,
        )
        .await
    }

    async fn delete_account(&self, id: &str) -> Result<()> {
        let (status, _) = self
            .request("delete_account", Method::DELETE, &format!("accounts/{id}"), None)
            .await?;
        if status != StatusCode::NO_CONTENT {
            return Err(TipError::LedgerRejected {
                operation: "delete_account",
                status: status.as_u16(),
            });
        }
        Ok(())
    }

    async fn create_address(&self, account_id: &str) -> Result<Address> {
        self.call(
            "create_address",
            Method::POST,
            &format!("accounts/{account_id}/addresses"),
            None,
            StatusCode::CREATED,
        )
        .await
    }

    async fn transfer(&self, from: &str, to: &str, amount: Money) -> Result<Transaction> {
        self.post_transaction("transfer", "transfer", from, to, amount)
            .await
    }

    async fn withdraw(&self, from: &str, to_address: &str, amount: Money) -> Result<Transaction> {
        self.post_transaction("withdraw", "send", from, to_address, amount)
            .await
    }

    async fn get_transaction(&self, account_id: &str, tx_id: &str) -> Result<Transaction> {
        self.call(
            "get_transaction",
            Method::GET,
            &format!("accounts/{account_id}/transactions/{tx_id}"),
            None,
            StatusCode::OK,
        )
        .await
    }

    async fn spot_price(&self, base: Currency, quote: Currency) -> Result<Price> {
        self.call(
            "spot_price",
            Method::GET,
            &format!("prices/{base}-{quote}/spot"),
            None,
            StatusCode::OK,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_is_hex_sha256() {
        let sig = sign("secret", "1500000000", "GET", "/v2/accounts", "").unwrap();
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_signature_covers_every_component() {
        let base = sign("secret", "1", "POST", "/v2/accounts", "{}").unwrap();
        assert_eq!(base, sign("secret", "1", "POST", "/v2/accounts", "{}").unwrap());
        assert_ne!(base, sign("other", "1", "POST", "/v2/accounts", "{}").unwrap());
        assert_ne!(base, sign("secret", "2", "POST", "/v2/accounts", "{}").unwrap());
        assert_ne!(base, sign("secret", "1", "GET", "/v2/accounts", "{}").unwrap());
        assert_ne!(base, sign("secret", "1", "POST", "/v2/addresses", "{}").unwrap());
        assert_ne!(base, sign("secret", "1", "POST", "/v2/accounts", "").unwrap());
    }

    #[test]
    fn test_signature_matches_single_message_mac() {
        let mut mac = HmacSha256::new_from_slice(b"secret").unwrap();
        mac.update(b"1500000000POST/v2/accounts{\"name\":\"x\"}");
        let expected = hex::encode(mac.finalize().into_bytes());
        assert_eq!(
            sign("secret", "1500000000", "POST", "/v2/accounts", "{\"name\":\"x\"}").unwrap(),
            expected
        );
    }
}
