//! Per-connection request pipeline.
//!
//! A worker owns exactly one TLS connection: it enforces the connection
//! limit, reads a bounded request line, validates and routes it, charges the
//! byte quota before writing a single response, and tears the session down.
//! Every fault is classified here and mapped to at most one wire response;
//! nothing escapes to the accept loop.

use std::io::ErrorKind;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_rustls::TlsAcceptor;
use tokio_rustls::server::TlsStream;
use tracing::{info, warn};

use crate::error::{HandlerError, RequestError};
use crate::ratelimiter::RateLimit;
use crate::request::{GeminiRequest, check_url};
use crate::response::{Response, TemplateError};
use crate::router::{RouteTarget, Router};
use crate::tls::ServerIdentity;

/// Read-only state shared by all workers.
pub(crate) struct WorkerContext {
    pub router: Arc<Router>,
    pub limiter: Arc<dyn RateLimit>,
    pub identity: Arc<ServerIdentity>,
    pub port: u16,
}

/// A request line is abandoned once the buffer holds this much without CRLF.
const MAX_REQUEST_BYTES: usize = 2048;
const READ_CHUNK: usize = 2048;

/// Global socket-read timeout. Refill workers are exempt.
const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Everything that can cut an exchange short, classified for the wire.
#[derive(Debug)]
enum Fault {
    /// Rate limited; payload is the back-off in seconds.
    SlowDown(u64),
    Request(RequestError),
    /// Request bytes were not valid UTF-8.
    Decode,
    ConnectionReset,
    BrokenPipe,
    /// TLS-level failure while sending: the session is beyond saving.
    TlsSend(std::io::Error),
    /// I/O failure while reading the request.
    ReadIo(std::io::Error),
    /// Any other OS-level failure while sending.
    SendIo(std::io::Error),
}

pub(crate) async fn handle(
    ctx: Arc<WorkerContext>,
    acceptor: TlsAcceptor,
    stream: TcpStream,
    peer: SocketAddr,
) {
    let client = peer.ip();
    let mut tls = match acceptor.accept(stream).await {
        Ok(tls) => tls,
        Err(e) => {
            warn!(%peer, error = %e, "TLS handshake failed");
            return;
        }
    };
    serve(&ctx, &mut tls, client).await;
    teardown(&mut tls, client).await;
}

async fn serve(ctx: &WorkerContext, tls: &mut TlsStream<TcpStream>, client: IpAddr) {
    let mut raw_url = String::new();
    match exchange(ctx, tls, client, &mut raw_url).await {
        Ok(response) => access_log(client, &raw_url, &response),
        Err(fault) => {
            let response = classify_fault(ctx, client, &fault);
            if let Some(response) = response {
                if send(tls, response.wire()).await.is_ok() {
                    access_log(client, &raw_url, &response);
                }
            }
        }
    }
}

/// The happy path; any deviation returns a [`Fault`].
async fn exchange(
    ctx: &WorkerContext,
    tls: &mut TlsStream<TcpStream>,
    client: IpAddr,
    raw_url: &mut String,
) -> Result<Arc<Response>, Fault> {
    if !ctx.limiter.admit(client) {
        return Err(Fault::SlowDown(ctx.limiter.penalty_secs(client)));
    }

    let raw = read_request(tls).await?;
    raw_url.push_str(raw.trim());

    let request = check_url(&raw, ctx.port, Some(ctx.identity.as_ref())).map_err(Fault::Request)?;
    let response = get_response(ctx, &request, raw_url);

    // The quota is charged before the payload leaves: a client already over
    // budget gets status 44, not the bytes.
    let tokens = response.len() as u64;
    if !ctx.limiter.consume(client, tokens) {
        return Err(Fault::SlowDown(ctx.limiter.penalty_secs(client)));
    }

    send(tls, response.wire()).await?;
    Ok(response)
}

/// Accumulate request bytes in up-to-2048-byte reads until the buffer holds
/// CRLF, the peer stops sending, or the buffer is full.
async fn read_request<R>(stream: &mut R) -> Result<String, Fault>
where
    R: AsyncRead + Unpin,
{
    let mut buf: Vec<u8> = Vec::with_capacity(READ_CHUNK);
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        if contains_crlf(&buf) || buf.len() >= MAX_REQUEST_BYTES {
            break;
        }
        let n = match tokio::time::timeout(READ_TIMEOUT, stream.read(&mut chunk)).await {
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(read_fault(e)),
            // A stalled client is indistinguishable from a missing CRLF.
            Err(_) => return Err(Fault::Request(RequestError::Unterminated)),
        };
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    String::from_utf8(buf).map_err(|_| Fault::Decode)
}

fn contains_crlf(buf: &[u8]) -> bool {
    buf.windows(2).any(|w| w == b"\r\n")
}

/// Route the request and materialize a response. Handler failures degrade to
/// error responses here; only transport faults propagate.
fn get_response(ctx: &WorkerContext, request: &GeminiRequest, raw_url: &str) -> Arc<Response> {
    let Some((prefix, target)) = ctx.router.route(&request.path) else {
        return Arc::new(Response::not_found(""));
    };
    match target {
        RouteTarget::Fixed(response) => Arc::clone(response),
        RouteTarget::Handler(handler) => match handler.handle(prefix, &request.path) {
            Ok(response) => Arc::new(response),
            Err(HandlerError::Template(TemplateError::MissingKey(key))) => {
                Arc::new(Response::permanent_failure(key))
            }
            Err(HandlerError::Template(e)) => Arc::new(Response::permanent_failure(e.to_string())),
            Err(e) => {
                warn!(url = %scrub(raw_url), error = ?e, "handler error");
                Arc::new(Response::not_found(e.to_string()))
            }
        },
    }
}

/// The central fault table: which wire response (if any) a fault earns, plus
/// its limiter side effects.
fn classify_fault(ctx: &WorkerContext, client: IpAddr, fault: &Fault) -> Option<Response> {
    match fault {
        Fault::SlowDown(secs) => Some(Response::slow_down(*secs)),
        Fault::Request(RequestError::Unterminated) => None,
        Fault::Request(RequestError::BadRequest | RequestError::Invalid(_)) => {
            Some(Response::bad_request())
        }
        Fault::Request(RequestError::ProxyRefused | RequestError::CertificateMismatch(_)) => {
            Some(Response::proxy_request_refused())
        }
        Fault::Decode => {
            ctx.limiter.penalize(client);
            Some(Response::bad_request())
        }
        Fault::ConnectionReset => {
            warn!(%client, "connection reset by peer");
            None
        }
        Fault::BrokenPipe => None,
        Fault::TlsSend(e) => {
            warn!(%client, error = %e, "TLS failure while sending; dropping");
            None
        }
        Fault::ReadIo(e) => {
            warn!(%client, error = %e, "connection error while reading");
            ctx.limiter.penalize(client);
            Some(Response::permanent_failure("Connection Error"))
        }
        Fault::SendIo(e) => {
            warn!(%client, error = %e, "OS error while sending");
            Some(Response::permanent_failure("OS Error"))
        }
    }
}

fn read_fault(e: std::io::Error) -> Fault {
    match e.kind() {
        ErrorKind::ConnectionReset => Fault::ConnectionReset,
        ErrorKind::TimedOut | ErrorKind::WouldBlock => Fault::Request(RequestError::Unterminated),
        _ => Fault::ReadIo(e),
    }
}

fn send_fault(e: std::io::Error) -> Fault {
    match e.kind() {
        ErrorKind::BrokenPipe => Fault::BrokenPipe,
        ErrorKind::ConnectionReset => Fault::ConnectionReset,
        _ if e
            .get_ref()
            .is_some_and(|inner| inner.is::<rustls::Error>()) =>
        {
            Fault::TlsSend(e)
        }
        _ => Fault::SendIo(e),
    }
}

async fn send<W>(stream: &mut W, bytes: &[u8]) -> Result<(), Fault>
where
    W: AsyncWrite + Unpin,
{
    stream.write_all(bytes).await.map_err(send_fault)?;
    stream.flush().await.map_err(send_fault)
}

/// Close the TLS session and the socket underneath it. Every step tolerates
/// a peer that is already gone.
async fn teardown(tls: &mut TlsStream<TcpStream>, client: IpAddr) {
    if let Err(e) = tls.shutdown().await {
        match e.kind() {
            ErrorKind::NotConnected | ErrorKind::BrokenPipe | ErrorKind::ConnectionReset => {}
            _ => warn!(%client, error = %e, "error during connection teardown"),
        }
    }
}

/// One line per completed exchange: client, request, status, bytes.
fn access_log(client: IpAddr, raw_url: &str, response: &Response) {
    let url = scrub(raw_url);
    let status = response.status();
    let length = response.len();
    if status == 20 {
        info!("{client} \"{url}\" {status} {length}");
    } else {
        warn!("{client} \"{url}\" {status} {length}");
    }
}

/// Strip control characters so a hostile request line cannot corrupt logs.
fn scrub(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_control()).collect()
}
