//! Test doubles shared by the integration tests

#![allow(dead_code)]

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use conduit_client::config::DnsConfig;
use conduit_client::dns::{
    DnsQuestion, DnsRecord, DnsResolver, DnsResponse, DnsTransport, HostsFile, ResolverError,
    ResponseCode,
};
use conduit_client::endpoint::Endpoint;
use conduit_client::http::{ClientRequest, ClientResponse};
use conduit_client::client::Transport;
use futures::future::BoxFuture;
use parking_lot::Mutex;

/// How a scripted DNS server reacts to one query.
#[derive(Debug, Clone)]
pub enum Reply {
    Answer(DnsResponse),
    Error(io::ErrorKind),
    /// Never answers.
    Silent,
}

type ReplyFn = dyn Fn(SocketAddr, &DnsQuestion, usize) -> Reply + Send + Sync;

/// DNS transport answering from a closure and counting queries.
pub struct MockDns {
    reply: Box<ReplyFn>,
    calls: AtomicUsize,
    log: Mutex<Vec<(SocketAddr, DnsQuestion)>>,
}

impl MockDns {
    /// The closure receives the server, the question and the zero-based call index.
    pub fn new<F>(reply: F) -> Arc<Self>
    where
        F: Fn(SocketAddr, &DnsQuestion, usize) -> Reply + Send + Sync + 'static,
    {
        Arc::new(Self {
            reply: Box::new(reply),
            calls: AtomicUsize::new(0),
            log: Mutex::new(Vec::new()),
        })
    }

    pub fn always(reply: Reply) -> Arc<Self> {
        Self::new(move |_, _, _| reply.clone())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn servers_asked(&self) -> Vec<SocketAddr> {
        self.log.lock().iter().map(|(server, _)| *server).collect()
    }

    pub fn questions(&self) -> Vec<DnsQuestion> {
        self.log.lock().iter().map(|(_, question)| question.clone()).collect()
    }
}

impl fmt::Debug for MockDns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockDns").field("calls", &self.calls()).finish()
    }
}

impl DnsTransport for MockDns {
    fn exchange(
        &self,
        server: SocketAddr,
        question: &DnsQuestion,
    ) -> BoxFuture<'static, Result<DnsResponse, ResolverError>> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        self.log.lock().push((server, question.clone()));
        let reply = (self.reply)(server, question, index);
        Box::pin(async move {
            match reply {
                Reply::Answer(response) => Ok(response),
                Reply::Error(kind) => Err(ResolverError::Io(io::Error::new(kind, "scripted failure"))),
                Reply::Silent => futures::future::pending().await,
            }
        })
    }
}

pub fn a(name: &str, ip: &str, ttl_secs: u64) -> DnsRecord {
    DnsRecord::addr(name, ip.parse().expect("test ip"), Duration::from_secs(ttl_secs))
}

pub fn server(n: u8) -> SocketAddr {
    SocketAddr::from(([10, 0, 0, n], 53))
}

/// Resolver that knows only `hosts`; every other name is NXDOMAIN.
pub fn hosts_resolver(hosts: &[(&str, &str)]) -> DnsResolver {
    let hosts = hosts.iter().fold(HostsFile::default(), |file, (name, ip)| {
        file.with_entry(name, ip.parse().expect("test ip"))
    });
    let nxdomain = MockDns::always(Reply::Answer(DnsResponse::with_code(ResponseCode::NxDomain)));
    DnsResolver::with_transports(
        DnsConfig::default().with_servers([server(1)]),
        nxdomain,
        MockDns::always(Reply::Silent),
    )
    .expect("valid resolver config")
    .with_hosts(hosts)
}

type HandleFn = dyn Fn(&Endpoint, &ClientRequest) -> conduit_client::Result<ClientResponse> + Send + Sync;

/// HTTP transport answering from a closure and recording what it was asked.
pub struct MockTransport {
    handle: Box<HandleFn>,
    seen: Mutex<Vec<(Endpoint, ClientRequest)>>,
}

impl MockTransport {
    pub fn new<F>(handle: F) -> Arc<Self>
    where
        F: Fn(&Endpoint, &ClientRequest) -> conduit_client::Result<ClientResponse>
            + Send
            + Sync
            + 'static,
    {
        Arc::new(Self {
            handle: Box::new(handle),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn ok() -> Arc<Self> {
        Self::new(|_, _| Ok(ClientResponse::new(http::StatusCode::OK)))
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().len()
    }

    pub fn seen(&self) -> Vec<(Endpoint, ClientRequest)> {
        self.seen.lock().clone()
    }
}

impl Transport for MockTransport {
    fn execute(
        &self,
        endpoint: Endpoint,
        request: ClientRequest,
    ) -> BoxFuture<'static, conduit_client::Result<ClientResponse>> {
        let result = (self.handle)(&endpoint, &request);
        self.seen.lock().push((endpoint, request));
        Box::pin(async move { result })
    }
}
