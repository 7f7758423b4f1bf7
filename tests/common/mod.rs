#![allow(dead_code)]
//! Shared fixtures: a scripted in-memory transport and a fake ClickHouse
//! HTTP server listening on a random local port.

use async_trait::async_trait;
use clickhouse_link::models::{BatchKey, Response};
use clickhouse_link::parallel::{collect_outcome, BatchOutcome};
use clickhouse_link::{QueryError, Transport};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
        .is_test(true)
        .try_init();
}

// ---------------------------------------------------------------
// Scripted transport
// ---------------------------------------------------------------

type Script = Arc<dyn Fn(&str) -> Result<Response, QueryError> + Send + Sync>;

/// Transport answering every SQL string through a script and recording calls.
#[derive(Clone)]
pub struct ScriptedTransport {
    script: Script,
    executed: Arc<Mutex<Vec<String>>>,
    batches: Arc<Mutex<Vec<Vec<(BatchKey, String)>>>>,
}

impl ScriptedTransport {
    pub fn new(script: impl Fn(&str) -> Result<Response, QueryError> + Send + Sync + 'static) -> Self {
        Self {
            script: Arc::new(script),
            executed: Arc::new(Mutex::new(Vec::new())),
            batches: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// SQL passed to `execute`, in call order.
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    /// Batches passed to `execute_parallel`, in call order.
    pub fn batches(&self) -> Vec<Vec<(BatchKey, String)>> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, sql: &str) -> Result<Response, QueryError> {
        self.executed.lock().unwrap().push(sql.to_string());
        (self.script)(sql)
    }

    async fn execute_parallel(&self, sqls: Vec<(BatchKey, String)>) -> BatchOutcome<Response> {
        self.batches.lock().unwrap().push(sqls.clone());
        collect_outcome(sqls.into_iter().map(|(key, sql)| {
            let result = (self.script)(&sql);
            (key, result)
        }))
    }
}

pub fn rows(values: serde_json::Value) -> Vec<clickhouse_link::Record> {
    values
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_object().unwrap().clone())
        .collect()
}

// ---------------------------------------------------------------
// Fake ClickHouse HTTP server
// ---------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub target: String,
    /// Header names are lowercased.
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl CapturedRequest {
    pub fn query_param(&self, name: &str) -> Option<String> {
        let (_, query) = self.target.split_once('?')?;
        query.split('&').find_map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            (k == name).then(|| v.to_string())
        })
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

#[derive(Debug, Clone)]
pub struct FakeReply {
    pub status: u16,
    pub content_type: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
    pub delay: Duration,
}

impl FakeReply {
    pub fn json(body: serde_json::Value) -> Self {
        Self {
            status: 200,
            content_type: "application/json; charset=UTF-8".to_string(),
            headers: Vec::new(),
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn rows(data: serde_json::Value) -> Self {
        Self::json(serde_json::json!({ "meta": [], "data": data, "rows": 0 }))
    }

    pub fn written(rows: u64) -> Self {
        Self {
            status: 200,
            content_type: "text/plain; charset=UTF-8".to_string(),
            headers: vec![(
                "X-ClickHouse-Summary".to_string(),
                format!(
                    r#"{{"read_rows":"0","read_bytes":"0","written_rows":"{}","written_bytes":"0"}}"#,
                    rows
                ),
            )],
            body: String::new(),
            delay: Duration::ZERO,
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "text/plain; charset=UTF-8".to_string(),
            headers: Vec::new(),
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn exception(status: u16, code: u32, message: &str) -> Self {
        Self::text(
            status,
            &format!("Code: {}. DB::Exception: {}. (version 23.8.2.7 (official build))\n", code, message),
        )
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

type Handler = Arc<dyn Fn(&CapturedRequest) -> FakeReply + Send + Sync>;

/// Minimal HTTP/1.1 server answering each request through a handler.
pub struct FakeClickHouse {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl FakeClickHouse {
    pub async fn start(handler: impl Fn(&CapturedRequest) -> FakeReply + Send + Sync + 'static) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handler: Handler = Arc::new(handler);
        let requests = Arc::new(Mutex::new(Vec::new()));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_in_flight = Arc::new(AtomicUsize::new(0));

        let server = Self {
            addr,
            requests: Arc::clone(&requests),
            in_flight: Arc::clone(&in_flight),
            max_in_flight: Arc::clone(&max_in_flight),
        };

        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let handler = Arc::clone(&handler);
                let requests = Arc::clone(&requests);
                let in_flight = Arc::clone(&in_flight);
                let max_in_flight = Arc::clone(&max_in_flight);
                tokio::spawn(async move {
                    let _ = serve_connection(stream, handler, requests, in_flight, max_in_flight).await;
                });
            }
        });

        server
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Highest number of requests the server was handling at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

async fn serve_connection(
    mut stream: TcpStream,
    handler: Handler,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
) -> std::io::Result<()> {
    let Some(request) = read_request(&mut stream).await? else {
        return Ok(());
    };

    let current = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    max_in_flight.fetch_max(current, Ordering::SeqCst);

    requests.lock().unwrap().push(request.clone());
    let reply = handler(&request);
    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }

    let mut head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n",
        reply.status,
        reason_phrase(reply.status),
        reply.content_type,
        reply.body.len()
    );
    for (name, value) in &reply.headers {
        head.push_str(&format!("{}: {}\r\n", name, value));
    }
    head.push_str("\r\n");

    let written = async {
        stream.write_all(head.as_bytes()).await?;
        stream.write_all(reply.body.as_bytes()).await?;
        stream.flush().await?;
        stream.shutdown().await
    }
    .await;

    in_flight.fetch_sub(1, Ordering::SeqCst);
    written
}

async fn read_request(stream: &mut TcpStream) -> std::io::Result<Option<CapturedRequest>> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos;
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or_default().to_string();

    let headers: HashMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let content_length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);

    let mut body = buf[header_end + 4..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    Ok(Some(CapturedRequest {
        method,
        target,
        headers,
        body: String::from_utf8_lossy(&body).to_string(),
    }))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}
