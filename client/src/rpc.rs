//! # JSON-RPC Gateway
//!
//! [`ProgramGateway`] implementation that speaks the chain node's JSON-RPC
//! 2.0 API over plain HTTP. Four methods cover everything this client does:
//!
//! | Method                  | Used for                                  |
//! |-------------------------|-------------------------------------------|
//! | `getAccountInfo`        | Fetching raw account data                 |
//! | `getLatestBlockhash`    | Stamping transactions before signing      |
//! | `sendTransaction`       | Submitting the signed transaction         |
//! | `getSignatureStatuses`  | Polling until the target commitment       |
//!
//! Transport is a raw HTTP/1.1 POST over a tokio `TcpStream` per request,
//! without pulling in an HTTP client crate. Swap in a proper client if this
//! ever grows connection reuse or TLS needs.

use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use solana_sdk::hash::Hash;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::transaction::Transaction;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::{sleep, Instant};

use crate::config;
use crate::gateway::{GatewayError, ProgramGateway};
use crate::manifest;

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

/// JSON-RPC gateway to a chain node.
pub struct RpcGateway {
    endpoint: HttpEndpoint,
    request_id: AtomicU64,
    poll_interval: Duration,
    confirm_timeout: Duration,
}

impl RpcGateway {
    /// Creates a gateway for the given `http://host[:port][/path]` endpoint.
    pub fn new(url: &str) -> Result<Self, GatewayError> {
        Self::with_timing(url, config::CONFIRM_POLL_INTERVAL, config::CONFIRM_TIMEOUT)
    }

    /// Creates a gateway with custom confirmation timing (for testing).
    pub fn with_timing(
        url: &str,
        poll_interval: Duration,
        confirm_timeout: Duration,
    ) -> Result<Self, GatewayError> {
        Ok(Self {
            endpoint: url.parse()?,
            request_id: AtomicU64::new(1),
            poll_interval,
            confirm_timeout,
        })
    }

    /// Performs one JSON-RPC call, returning the `result` value.
    async fn call(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, GatewayError> {
        let request = RpcRequestEnvelope {
            jsonrpc: "2.0",
            id: self.request_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        let body = serde_json::to_string(&request)
            .map_err(|e| GatewayError::Transport(format!("request encode failed: {}", e)))?;

        let (status, raw) = http_post_json(&self.endpoint, &body).await?;

        let envelope: RpcResponseEnvelope = match serde_json::from_str(&raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                // Proxies and load balancers answer errors in plain HTTP,
                // not JSON-RPC.
                if status != 200 {
                    return Err(GatewayError::Transport(format!(
                        "http status {} from {}",
                        status, self.endpoint
                    )));
                }
                return Err(GatewayError::MalformedResponse(e.to_string()));
            }
        };

        if let Some(error) = envelope.error {
            return Err(rpc_error_to_gateway(error));
        }
        envelope.result.ok_or_else(|| {
            GatewayError::MalformedResponse("response carries neither result nor error".into())
        })
    }

    /// Fetches a fresh blockhash to stamp a transaction with.
    async fn latest_blockhash(&self) -> Result<Hash, GatewayError> {
        let params = serde_json::json!([{ "commitment": config::COMMITMENT }]);
        let result = self.call("getLatestBlockhash", params).await?;
        let blockhash = result
            .get("value")
            .and_then(|v| v.get("blockhash"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                GatewayError::MalformedResponse(
                    "getLatestBlockhash response missing value.blockhash".into(),
                )
            })?;
        Hash::from_str(blockhash).map_err(|e| {
            GatewayError::MalformedResponse(format!("invalid blockhash {:?}: {}", blockhash, e))
        })
    }

    /// Polls signature status until the target commitment or the timeout.
    async fn confirm(&self, signature: &Signature) -> Result<(), GatewayError> {
        let started = Instant::now();
        loop {
            if started.elapsed() >= self.confirm_timeout {
                return Err(GatewayError::ConfirmationTimeout {
                    signature: *signature,
                    waited_ms: started.elapsed().as_millis() as u64,
                });
            }
            sleep(self.poll_interval).await;

            let params = serde_json::json!([
                [signature.to_string()],
                { "searchTransactionHistory": false }
            ]);
            let result = self.call("getSignatureStatuses", params).await?;
            let status = result
                .get("value")
                .and_then(|v| v.get(0))
                .cloned()
                .unwrap_or(serde_json::Value::Null);

            match interpret_status(&status)? {
                SignatureDisposition::Landed => {
                    tracing::debug!(
                        signature = %signature,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "transaction confirmed"
                    );
                    return Ok(());
                }
                SignatureDisposition::Pending => {}
            }
        }
    }
}

#[async_trait]
impl ProgramGateway for RpcGateway {
    async fn fetch_account(&self, address: &Pubkey) -> Result<Vec<u8>, GatewayError> {
        let params = serde_json::json!([
            address.to_string(),
            { "encoding": config::RPC_ENCODING, "commitment": config::COMMITMENT }
        ]);
        let result = self.call("getAccountInfo", params).await?;
        let value = result.get("value").unwrap_or(&serde_json::Value::Null);

        match decode_account_value(value)? {
            Some(data) => {
                tracing::debug!(address = %address, len = data.len(), "account fetched");
                Ok(data)
            }
            None => Err(GatewayError::AccountNotFound(*address)),
        }
    }

    async fn submit(
        &self,
        instruction: Instruction,
        payer: &Keypair,
    ) -> Result<Signature, GatewayError> {
        let blockhash = self.latest_blockhash().await?;
        let transaction = Transaction::new_signed_with_payer(
            &[instruction],
            Some(&payer.pubkey()),
            &[payer],
            blockhash,
        );
        let wire = bincode::serialize(&transaction)
            .map_err(|e| GatewayError::Transport(format!("transaction encode failed: {}", e)))?;

        let params = serde_json::json!([
            bs58::encode(wire).into_string(),
            { "encoding": config::RPC_ENCODING, "preflightCommitment": config::COMMITMENT }
        ]);
        let result = self.call("sendTransaction", params).await?;
        let signature = result
            .as_str()
            .and_then(|s| Signature::from_str(s).ok())
            .ok_or_else(|| {
                GatewayError::MalformedResponse(format!("sendTransaction returned {}", result))
            })?;

        tracing::debug!(signature = %signature, "transaction submitted, awaiting confirmation");
        self.confirm(&signature).await?;
        Ok(signature)
    }
}

// ---------------------------------------------------------------------------
// JSON-RPC Envelopes
// ---------------------------------------------------------------------------

/// A JSON-RPC 2.0 request envelope.
#[derive(Debug, Serialize)]
struct RpcRequestEnvelope<'a> {
    /// Protocol version. Always "2.0".
    jsonrpc: &'static str,
    /// Request identifier, echoed back by the node.
    id: u64,
    /// The method to invoke.
    method: &'a str,
    /// Positional method parameters.
    params: serde_json::Value,
}

/// The parts of a JSON-RPC 2.0 response this client reads.
#[derive(Debug, Deserialize)]
struct RpcResponseEnvelope {
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

/// Maps a JSON-RPC error to the gateway error taxonomy.
///
/// Preflight rejections carry the transaction error under `data.err`; those
/// become [`GatewayError::Rejected`] with the custom program code extracted
/// when present. Everything else is a plain RPC failure.
fn rpc_error_to_gateway(error: RpcErrorObject) -> GatewayError {
    if let Some(err) = error.data.as_ref().and_then(|d| d.get("err")) {
        if !err.is_null() {
            return GatewayError::Rejected {
                custom_code: manifest::custom_error_code(err),
                message: error.message,
            };
        }
    }
    GatewayError::Rpc {
        code: error.code,
        message: error.message,
    }
}

/// Decodes `getAccountInfo`'s `value` field. `None` means no such account.
fn decode_account_value(value: &serde_json::Value) -> Result<Option<Vec<u8>>, GatewayError> {
    if value.is_null() {
        return Ok(None);
    }
    let encoded = value
        .get("data")
        .and_then(|d| d.get(0))
        .and_then(|d| d.as_str())
        .ok_or_else(|| GatewayError::MalformedResponse("account value missing data[0]".into()))?;
    let data = bs58::decode(encoded)
        .into_vec()
        .map_err(|e| GatewayError::MalformedResponse(format!("account data is not base58: {}", e)))?;
    Ok(Some(data))
}

/// What one entry of `getSignatureStatuses` tells us.
#[derive(Debug, PartialEq, Eq)]
enum SignatureDisposition {
    /// Not yet at the target commitment; keep polling.
    Pending,
    /// Reached `confirmed` or `finalized`.
    Landed,
}

/// Interprets a signature status entry. A non-null `err` inside the status
/// means the transaction landed but failed on-chain.
fn interpret_status(status: &serde_json::Value) -> Result<SignatureDisposition, GatewayError> {
    if status.is_null() {
        return Ok(SignatureDisposition::Pending);
    }
    if let Some(err) = status.get("err") {
        if !err.is_null() {
            return Err(GatewayError::Rejected {
                custom_code: manifest::custom_error_code(err),
                message: format!("transaction failed on-chain: {}", err),
            });
        }
    }
    match status.get("confirmationStatus").and_then(|s| s.as_str()) {
        Some("confirmed") | Some("finalized") => Ok(SignatureDisposition::Landed),
        _ => Ok(SignatureDisposition::Pending),
    }
}

// ---------------------------------------------------------------------------
// Minimal HTTP Client
// ---------------------------------------------------------------------------

/// A parsed `http://host[:port][/path]` endpoint — just enough URL handling
/// for a JSON-RPC POST. TLS endpoints are rejected up front; terminate TLS
/// in front of the gateway instead.
#[derive(Debug, Clone)]
struct HttpEndpoint {
    host: String,
    port: u16,
    path: String,
}

impl std::fmt::Display for HttpEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "http://{}:{}{}", self.host, self.port, self.path)
    }
}

impl FromStr for HttpEndpoint {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.starts_with("https://") {
            return Err(GatewayError::Endpoint(format!(
                "tls endpoint {:?} is not supported here",
                s
            )));
        }
        let rest = s.strip_prefix("http://").unwrap_or(s);

        let (authority, path) = match rest.find('/') {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, "/"),
        };
        if authority.is_empty() {
            return Err(GatewayError::Endpoint(format!("missing host in {:?}", s)));
        }

        let (host, port) = match authority.rfind(':') {
            Some(i) => {
                let port = authority[i + 1..]
                    .parse::<u16>()
                    .map_err(|e| GatewayError::Endpoint(format!("bad port in {:?}: {}", s, e)))?;
                (authority[..i].to_string(), port)
            }
            None => (authority.to_string(), 80),
        };

        Ok(HttpEndpoint {
            host,
            port,
            path: path.to_string(),
        })
    }
}

/// POSTs a JSON body over a fresh connection, returning (status, body).
async fn http_post_json(
    endpoint: &HttpEndpoint,
    body: &str,
) -> Result<(u16, String), GatewayError> {
    let addr = format!("{}:{}", endpoint.host, endpoint.port);
    let mut stream = tokio::net::TcpStream::connect(&addr)
        .await
        .map_err(|e| GatewayError::Transport(format!("failed to connect to {}: {}", addr, e)))?;

    let request = format!(
        "POST {} HTTP/1.1\r\nHost: {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        endpoint.path,
        endpoint.host,
        body.len(),
        body,
    );

    stream
        .write_all(request.as_bytes())
        .await
        .map_err(|e| GatewayError::Transport(format!("request write failed: {}", e)))?;
    stream
        .shutdown()
        .await
        .map_err(|e| GatewayError::Transport(format!("request flush failed: {}", e)))?;

    let mut raw = Vec::new();
    stream
        .read_to_end(&mut raw)
        .await
        .map_err(|e| GatewayError::Transport(format!("response read failed: {}", e)))?;

    parse_http_response(&raw)
}

/// Splits a raw HTTP/1.1 response into status code and body, reassembling
/// chunked transfer encoding when the server uses it.
fn parse_http_response(raw: &[u8]) -> Result<(u16, String), GatewayError> {
    let boundary = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .ok_or_else(|| GatewayError::Transport("response missing header terminator".into()))?;

    let head = String::from_utf8_lossy(&raw[..boundary]);
    let mut lines = head.split("\r\n");

    let status_line = lines.next().unwrap_or("");
    let status = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse::<u16>().ok())
        .ok_or_else(|| GatewayError::Transport(format!("bad status line {:?}", status_line)))?;

    let chunked = lines.any(|line| {
        let lower = line.to_ascii_lowercase();
        lower.starts_with("transfer-encoding:") && lower.contains("chunked")
    });

    let body_bytes = &raw[boundary + 4..];
    let body = if chunked {
        dechunk(body_bytes)?
    } else {
        body_bytes.to_vec()
    };
    Ok((status, String::from_utf8_lossy(&body).into_owned()))
}

/// Reassembles a chunked transfer-encoded body.
fn dechunk(mut rest: &[u8]) -> Result<Vec<u8>, GatewayError> {
    let mut body = Vec::new();
    loop {
        let line_end = rest
            .windows(2)
            .position(|w| w == b"\r\n")
            .ok_or_else(|| GatewayError::Transport("truncated chunk header".into()))?;
        let size_line = String::from_utf8_lossy(&rest[..line_end]);
        let size_hex = size_line.split(';').next().unwrap_or("").trim();
        let size = usize::from_str_radix(size_hex, 16)
            .map_err(|e| GatewayError::Transport(format!("bad chunk size {:?}: {}", size_hex, e)))?;
        rest = &rest[line_end + 2..];

        if size == 0 {
            return Ok(body);
        }
        if rest.len() < size {
            return Err(GatewayError::Transport("truncated chunk body".into()));
        }
        body.extend_from_slice(&rest[..size]);
        rest = &rest[size..];
        // Each chunk's data is followed by its own CRLF.
        rest = rest.strip_prefix(b"\r\n").unwrap_or(rest);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // -- Endpoint parsing ----------------------------------------------------

    #[test]
    fn endpoint_with_port_and_default_path() {
        let ep: HttpEndpoint = "http://127.0.0.1:8899".parse().unwrap();
        assert_eq!(ep.host, "127.0.0.1");
        assert_eq!(ep.port, 8899);
        assert_eq!(ep.path, "/");
    }

    #[test]
    fn endpoint_with_path_and_default_port() {
        let ep: HttpEndpoint = "http://rpc.example/api/v1".parse().unwrap();
        assert_eq!(ep.host, "rpc.example");
        assert_eq!(ep.port, 80);
        assert_eq!(ep.path, "/api/v1");
    }

    #[test]
    fn endpoint_without_scheme() {
        let ep: HttpEndpoint = "localhost:8080".parse().unwrap();
        assert_eq!(ep.host, "localhost");
        assert_eq!(ep.port, 8080);
    }

    #[test]
    fn tls_endpoint_rejected() {
        let result = "https://api.mainnet-beta.solana.com".parse::<HttpEndpoint>();
        assert!(matches!(result, Err(GatewayError::Endpoint(_))));
    }

    #[test]
    fn bad_port_rejected() {
        let result = "http://host:notaport".parse::<HttpEndpoint>();
        assert!(matches!(result, Err(GatewayError::Endpoint(_))));
    }

    #[test]
    fn empty_host_rejected() {
        let result = "http:///rpc".parse::<HttpEndpoint>();
        assert!(matches!(result, Err(GatewayError::Endpoint(_))));
    }

    // -- HTTP response parsing -----------------------------------------------

    #[test]
    fn parses_content_length_response() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 2\r\n\r\n{}";
        let (status, body) = parse_http_response(raw).unwrap();
        assert_eq!(status, 200);
        assert_eq!(body, "{}");
    }

    #[test]
    fn parses_chunked_response() {
        let raw =
            b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\n{\"a\":\r\n2\r\n1}\r\n0\r\n\r\n";
        let (status, body) = parse_http_response(raw).unwrap();
        assert_eq!(status, 200);
        assert_eq!(body, "{\"a\":1}");
    }

    #[test]
    fn non_200_status_passes_through() {
        let raw = b"HTTP/1.1 502 Bad Gateway\r\nContent-Length: 11\r\n\r\nbad gateway";
        let (status, body) = parse_http_response(raw).unwrap();
        assert_eq!(status, 502);
        assert_eq!(body, "bad gateway");
    }

    #[test]
    fn missing_header_terminator_rejected() {
        let result = parse_http_response(b"HTTP/1.1 200 OK\r\n");
        assert!(matches!(result, Err(GatewayError::Transport(_))));
    }

    #[test]
    fn garbled_status_line_rejected() {
        let result = parse_http_response(b"NOT-HTTP\r\n\r\nbody");
        assert!(matches!(result, Err(GatewayError::Transport(_))));
    }

    #[test]
    fn truncated_chunk_rejected() {
        let raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\nff\r\nshort";
        let result = parse_http_response(raw);
        assert!(matches!(result, Err(GatewayError::Transport(_))));
    }

    // -- Error mapping ---------------------------------------------------------

    #[test]
    fn preflight_custom_error_becomes_rejected() {
        let error = RpcErrorObject {
            code: -32002,
            message: "Transaction simulation failed".into(),
            data: Some(json!({ "err": { "InstructionError": [0, { "Custom": 6000 }] } })),
        };
        match rpc_error_to_gateway(error) {
            GatewayError::Rejected { custom_code, .. } => assert_eq!(custom_code, Some(6000)),
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn preflight_named_error_becomes_rejected_without_code() {
        let error = RpcErrorObject {
            code: -32002,
            message: "Transaction simulation failed".into(),
            data: Some(json!({ "err": { "InstructionError": [0, "InvalidAccountData"] } })),
        };
        match rpc_error_to_gateway(error) {
            GatewayError::Rejected { custom_code, .. } => assert_eq!(custom_code, None),
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn plain_rpc_error_stays_rpc() {
        let error = RpcErrorObject {
            code: -32601,
            message: "Method not found".into(),
            data: None,
        };
        match rpc_error_to_gateway(error) {
            GatewayError::Rpc { code, .. } => assert_eq!(code, -32601),
            other => panic!("expected rpc error, got {:?}", other),
        }
    }

    // -- Account value decoding ------------------------------------------------

    #[test]
    fn null_account_value_means_absent() {
        assert_eq!(decode_account_value(&json!(null)).unwrap(), None);
    }

    #[test]
    fn account_value_decodes_base58_payload() {
        let payload = vec![1u8, 2, 3, 4];
        let value = json!({
            "data": [bs58::encode(&payload).into_string(), "base58"],
            "executable": false,
            "lamports": 1_000_000u64,
        });
        assert_eq!(decode_account_value(&value).unwrap(), Some(payload));
    }

    #[test]
    fn account_value_without_data_rejected() {
        let result = decode_account_value(&json!({ "lamports": 5u64 }));
        assert!(matches!(result, Err(GatewayError::MalformedResponse(_))));
    }

    #[test]
    fn account_value_with_bad_base58_rejected() {
        let result = decode_account_value(&json!({ "data": ["0OIl", "base58"] }));
        assert!(matches!(result, Err(GatewayError::MalformedResponse(_))));
    }

    // -- Signature status interpretation --------------------------------------

    #[test]
    fn missing_status_keeps_polling() {
        assert_eq!(
            interpret_status(&json!(null)).unwrap(),
            SignatureDisposition::Pending
        );
    }

    #[test]
    fn processed_status_keeps_polling() {
        let status = json!({ "confirmationStatus": "processed", "err": null });
        assert_eq!(
            interpret_status(&status).unwrap(),
            SignatureDisposition::Pending
        );
    }

    #[test]
    fn confirmed_and_finalized_land() {
        for level in ["confirmed", "finalized"] {
            let status = json!({ "confirmationStatus": level, "err": null });
            assert_eq!(
                interpret_status(&status).unwrap(),
                SignatureDisposition::Landed
            );
        }
    }

    #[test]
    fn on_chain_failure_is_rejected_with_code() {
        let status = json!({
            "confirmationStatus": "confirmed",
            "err": { "InstructionError": [0, { "Custom": 6002 }] }
        });
        match interpret_status(&status) {
            Err(GatewayError::Rejected { custom_code, .. }) => {
                assert_eq!(custom_code, Some(6002));
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }
}
