//! Request/response flows against the ledger service
//!
//! Every public operation is one exchange: build the request, dispatch it,
//! decode the JSON envelope, and hand the result back exactly once. Nothing
//! is retried here.

use crate::config::Config;
use crate::core::{Block, ProofOfWork, Solver, Transaction, TxHash};
use crate::error::{ClientError, Result};
use crate::network::transport::{HttpRequest, HttpResponse, HttpTransport, Method, Reply, Transport};
use data_encoding::{HEXLOWER, HEXLOWER_PERMISSIVE};
use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::mpsc;
use std::sync::Arc;

pub const API_PREFIX: &str = "/v1";
pub const PRODUCT: &str = "ledger";
pub const POW_HEADER: &str = "X-Proof-Of-Work";

pub fn user_agent() -> String {
    format!("{PRODUCT}/client_v{}", env!("CARGO_PKG_VERSION"))
}

/// Service status from `GET /v1/`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Info {
    #[serde(default)]
    pub complexity: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One leaderboard row; `rank` is its 1-based position in the response
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub fields: Map<String, Value>,
}

/// Splits a `"<complexity>:<nonce-hex>"` token.
pub fn parse_pow_token(token: &str) -> Result<(u32, Vec<u8>)> {
    let (complexity, hex) = token
        .split_once(':')
        .ok_or_else(|| ClientError::decode(format!("Malformed proof-of-work token {token:?}")))?;
    let complexity = complexity
        .parse()
        .map_err(|_| ClientError::decode(format!("Malformed complexity in {token:?}")))?;
    if hex.is_empty() {
        return Err(ClientError::decode(format!("Empty nonce in {token:?}")));
    }
    let nonce = HEXLOWER_PERMISSIVE
        .decode(hex.as_bytes())
        .map_err(|e| ClientError::decode(format!("Malformed nonce in {token:?}: {e}")))?;
    Ok((complexity, nonce))
}

/// Instance-scoped handle on one service. Cheap to share: concurrent calls
/// are independent exchanges over the same transport.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    solver: Arc<dyn Solver>,
}

impl Client {
    /// HTTP transport for `config` and an entropy-seeded solver
    pub fn new(config: &Config) -> Result<Client> {
        let transport = HttpTransport::new(config)?;
        info!("Using ledger service at {}", config.base_url());
        Ok(Self::with_parts(
            Arc::new(transport),
            Arc::new(ProofOfWork::new()),
        ))
    }

    pub fn with_parts(transport: Arc<dyn Transport>, solver: Arc<dyn Solver>) -> Client {
        Client { transport, solver }
    }

    fn build_request(
        method: Method,
        resource: &str,
        pow: Option<&str>,
        body: Option<&Value>,
    ) -> HttpRequest {
        let mut headers = vec![
            ("User-Agent".to_string(), user_agent()),
            ("Content-Type".to_string(), "application/json".to_string()),
        ];
        if let Some(pow) = pow {
            headers.push((POW_HEADER.to_string(), pow.to_string()));
        }
        HttpRequest {
            method,
            path: format!("{API_PREFIX}{resource}"),
            headers,
            body: body.map(|b| b.to_string().into_bytes()),
        }
    }

    /// Decoding order matters: JSON first, then the `error` field, then the
    /// status code.
    fn interpret(response: HttpResponse) -> Result<Value> {
        let body: Value = serde_json::from_slice(&response.body)?;
        match body.get("error") {
            None | Some(Value::Null) => {}
            Some(Value::String(msg)) => return Err(ClientError::Application(msg.clone())),
            Some(other) => return Err(ClientError::Application(other.to_string())),
        }
        if !(200..400).contains(&response.status) {
            return Err(ClientError::Status(response.status));
        }
        Ok(body)
    }

    /// Callback form of a single exchange. `on_done` runs exactly once, on
    /// whichever thread the transport completes on.
    pub fn request_with<F>(
        &self,
        method: Method,
        resource: &str,
        pow: Option<&str>,
        body: Option<&Value>,
        on_done: F,
    ) where
        F: FnOnce(Result<Value>) + Send + 'static,
    {
        let request = Self::build_request(method, resource, pow, body);
        debug!("{} {}", request.method, request.path);
        let label = format!("{} {}", request.method, request.path);
        let reply = Reply::new(move |outcome| {
            let result = outcome.and_then(Self::interpret);
            if let Err(e) = &result {
                warn!("{label} failed: {e}");
            }
            on_done(result);
        });
        self.transport.dispatch(request, reply);
    }

    /// Blocking form of `request_with`.
    pub fn request(
        &self,
        method: Method,
        resource: &str,
        pow: Option<&str>,
        body: Option<&Value>,
    ) -> Result<Value> {
        let (tx, rx) = mpsc::channel();
        self.request_with(method, resource, pow, body, move |result| {
            // The receiver only goes away if the caller is gone too
            let _ = tx.send(result);
        });
        rx.recv()
            .map_err(|_| ClientError::Transport("request completed without a result".to_string()))?
    }

    fn entity_field<'a>(body: &'a Value, field: &str) -> Result<&'a str> {
        body.get(field)
            .and_then(Value::as_str)
            .ok_or_else(|| ClientError::decode(format!("Response has no `{field}` hex string")))
    }

    pub fn get_block(&self, hash: &TxHash) -> Result<Block> {
        let body = self.request(Method::Get, &format!("/block/{hash}"), None, None)?;
        Block::from_hex(Self::entity_field(&body, "block")?)
    }

    pub fn get_tx(&self, hash: &TxHash) -> Result<Transaction> {
        let body = self.request(Method::Get, &format!("/tx/{hash}"), None, None)?;
        Transaction::from_hex(Self::entity_field(&body, "tx")?)
    }

    /// Submits `tx` under its own hash with a proof-of-work token. On success
    /// the same transaction is handed back; nothing is re-fetched.
    pub fn spend_tx(&self, tx: Transaction, nonce: &str) -> Result<Transaction> {
        tx.check_version()?;
        let hash = tx.hash();
        let payload = json!({ "tx": tx.to_hex() });
        let body = self.request(
            Method::Post,
            &format!("/tx/{hash}"),
            Some(nonce),
            Some(&payload),
        )?;

        if let Some(echoed) = body.get("tx").and_then(Value::as_str) {
            match Transaction::from_hex(echoed) {
                Ok(echo) if echo.hash() == hash => {}
                _ => warn!("Service echoed a different transaction for {hash}"),
            }
        }
        info!("Submitted transaction {hash}");
        Ok(tx)
    }

    pub fn get_info(&self) -> Result<Info> {
        let body = self.request(Method::Get, "/", None, None)?;
        Ok(serde_json::from_value(body)?)
    }

    /// Accepts either a bare array or `{"leaderboard": [...]}`.
    pub fn get_leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>> {
        let body = self.request(
            Method::Get,
            &format!("/leaderboard?limit={limit}"),
            None,
            None,
        )?;
        let rows = match &body {
            Value::Array(rows) => rows,
            Value::Object(map) => match map.get("leaderboard") {
                Some(Value::Array(rows)) => rows,
                _ => return Err(ClientError::decode("Response has no `leaderboard` array")),
            },
            _ => return Err(ClientError::decode("Leaderboard response is not a list")),
        };
        rows.iter()
            .enumerate()
            .map(|(i, row)| match row {
                Value::Object(fields) => Ok(LeaderboardEntry {
                    rank: i + 1,
                    fields: fields.clone(),
                }),
                _ => Err(ClientError::decode(format!(
                    "Leaderboard row {i} is not an object"
                ))),
            })
            .collect()
    }

    /// Current puzzle complexity; a service that omits it asks for none.
    pub fn get_complexity(&self) -> Result<u32> {
        Ok(self.get_info()?.complexity.unwrap_or(0))
    }

    /// Ready-to-send `"<complexity>:<nonce-hex>"` token. Blocks while solving.
    pub fn get_nonce(&self) -> Result<String> {
        let complexity = self.get_complexity()?;
        debug!("Solving proof-of-work at complexity {complexity}");
        let nonce = self.solver.solve(complexity)?;
        Ok(format!("{complexity}:{}", HEXLOWER.encode(&nonce)))
    }

    /// Solve the current puzzle, then submit.
    pub fn submit(&self, tx: Transaction) -> Result<Transaction> {
        tx.check_version()?;
        let nonce = self.get_nonce()?;
        self.spend_tx(tx, &nonce)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_request_carries_fixed_headers() {
        let body = json!({"tx": "00"});
        let request = Client::build_request(Method::Post, "/tx/ab", Some("4:00"), Some(&body));
        assert_eq!(request.path, "/v1/tx/ab");
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.header("User-Agent"), Some(user_agent().as_str()));
        assert_eq!(request.header(POW_HEADER), Some("4:00"));
        assert_eq!(request.body, Some(br#"{"tx":"00"}"#.to_vec()));
    }

    #[test]
    fn test_user_agent_format() {
        assert!(user_agent().starts_with("ledger/client_v"));
    }

    #[test]
    fn test_error_field_beats_status() {
        let err = Client::interpret(response(200, r#"{"error":"rejected"}"#)).unwrap_err();
        assert_eq!(err, ClientError::Application("rejected".to_string()));
        let err = Client::interpret(response(500, r#"{"error":"boom"}"#)).unwrap_err();
        assert_eq!(err, ClientError::Application("boom".to_string()));
    }

    #[test]
    fn test_status_checked_after_envelope() {
        assert_eq!(
            Client::interpret(response(404, "{}")).unwrap_err(),
            ClientError::Status(404)
        );
        assert!(Client::interpret(response(399, "{}")).is_ok());
        assert_eq!(
            Client::interpret(response(199, "{}")).unwrap_err(),
            ClientError::Status(199)
        );
    }

    #[test]
    fn test_bad_json_is_decode_error() {
        assert!(matches!(
            Client::interpret(response(200, "<html>")),
            Err(ClientError::Decode(_))
        ));
    }

    #[test]
    fn test_parse_pow_token() {
        let (complexity, nonce) = parse_pow_token("4:0a0b").unwrap();
        assert_eq!(complexity, 4);
        assert_eq!(nonce, vec![0x0a, 0x0b]);
        assert!(parse_pow_token("nocolon").is_err());
        assert!(parse_pow_token("x:00").is_err());
        assert!(parse_pow_token("4:0").is_err());
        assert!(matches!(parse_pow_token("4:"), Err(ClientError::Decode(_))));
        assert!(parse_pow_token(":").is_err());
    }

    #[test]
    fn test_info_complexity_optional() {
        let info: Info = serde_json::from_value(json!({"height": 12})).unwrap();
        assert_eq!(info.complexity, None);
        assert_eq!(info.extra.get("height"), Some(&json!(12)));
        let info: Info = serde_json::from_value(json!({"complexity": 9})).unwrap();
        assert_eq!(info.complexity, Some(9));
    }
}
