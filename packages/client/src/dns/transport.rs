//! DNS exchanges over UDP and TCP
//!
//! Messages are encoded and decoded with the protocol types hickory-resolver
//! re-exports. Timeouts are applied by the caller.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use futures::future::BoxFuture;
use hickory_resolver::proto::op::{Message, MessageType, OpCode, Query};
use hickory_resolver::proto::op::ResponseCode as WireResponseCode;
use hickory_resolver::proto::rr::{Name, RData, RecordType};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tracing::trace;

use super::error::ResolverError;
use super::question::{DnsQuestion, DnsRecord, DnsResponse, RecordData, RecordKind, ResponseCode};

/// Largest UDP payload accepted, matching the advertised EDNS size.
pub const MAX_UDP_PAYLOAD: usize = 4096;

/// One way of exchanging a question with a name server.
pub trait DnsTransport: Send + Sync + fmt::Debug {
    fn exchange(
        &self,
        server: SocketAddr,
        question: &DnsQuestion,
    ) -> BoxFuture<'static, Result<DnsResponse, ResolverError>>;
}

/// Connectionless transport, used first.
#[derive(Debug, Default, Clone, Copy)]
pub struct UdpTransport;

impl DnsTransport for UdpTransport {
    fn exchange(
        &self,
        server: SocketAddr,
        question: &DnsQuestion,
    ) -> BoxFuture<'static, Result<DnsResponse, ResolverError>> {
        let question = question.clone();
        Box::pin(async move {
            let id = fastrand::u16(..);
            let query = encode_query(id, &question)?;

            let local: SocketAddr = match server.ip() {
                IpAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
                IpAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
            };
            let socket = UdpSocket::bind(local).await?;
            socket.connect(server).await?;
            socket.send(&query).await?;
            trace!("sent UDP query {} for {} to {}", id, question, server);

            let mut buf = vec![0u8; MAX_UDP_PAYLOAD];
            loop {
                let len = socket.recv(&mut buf).await?;
                match decode_response(&buf[..len], &question) {
                    Ok((received, response)) if received == id => return Ok(response),
                    Ok((received, _)) => {
                        trace!("ignoring UDP response {} while waiting for {}", received, id);
                    }
                    Err(e) => return Err(e),
                }
            }
        })
    }
}

/// Connection-oriented transport, used when UDP is truncated or unusable.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpTransport;

impl DnsTransport for TcpTransport {
    fn exchange(
        &self,
        server: SocketAddr,
        question: &DnsQuestion,
    ) -> BoxFuture<'static, Result<DnsResponse, ResolverError>> {
        let question = question.clone();
        Box::pin(async move {
            let id = fastrand::u16(..);
            let query = encode_query(id, &question)?;
            let len = u16::try_from(query.len())
                .map_err(|_| ResolverError::Proto("query exceeds 65535 bytes".to_string()))?;

            let mut stream = TcpStream::connect(server).await?;
            stream.write_u16(len).await?;
            stream.write_all(&query).await?;
            stream.flush().await?;
            trace!("sent TCP query {} for {} to {}", id, question, server);

            let len = stream.read_u16().await?;
            let mut buf = vec![0u8; usize::from(len)];
            stream.read_exact(&mut buf).await?;

            let (received, response) = decode_response(&buf, &question)?;
            if received != id {
                return Err(ResolverError::IdMismatch {
                    expected: id,
                    received,
                });
            }
            Ok(response)
        })
    }
}

fn record_type(kind: RecordKind) -> RecordType {
    match kind {
        RecordKind::A => RecordType::A,
        RecordKind::Aaaa => RecordType::AAAA,
        RecordKind::Cname => RecordType::CNAME,
        RecordKind::Srv => RecordType::SRV,
        RecordKind::Txt => RecordType::TXT,
    }
}

fn proto_error(e: impl fmt::Display) -> ResolverError {
    ResolverError::Proto(e.to_string())
}

fn encode_query(id: u16, question: &DnsQuestion) -> Result<Vec<u8>, ResolverError> {
    let name = Name::from_ascii(format!("{}.", question.name())).map_err(proto_error)?;

    let mut message = Message::new();
    message
        .set_id(id)
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(true);
    message.add_query(Query::query(name, record_type(question.kind())));

    message.to_vec().map_err(proto_error)
}

fn decode_response(
    buf: &[u8],
    question: &DnsQuestion,
) -> Result<(u16, DnsResponse), ResolverError> {
    let message = Message::from_vec(buf).map_err(proto_error)?;

    let code = match message.response_code() {
        WireResponseCode::NoError => ResponseCode::NoError,
        WireResponseCode::NXDomain => ResponseCode::NxDomain,
        WireResponseCode::ServFail => ResponseCode::ServFail,
        WireResponseCode::Refused => ResponseCode::Refused,
        other => ResponseCode::Other(u16::from(other)),
    };

    let records = message
        .answers()
        .iter()
        .filter_map(|record| {
            let (kind, data) = match record.data() {
                RData::A(a) => (RecordKind::A, RecordData::Addr(IpAddr::V4(a.0))),
                RData::AAAA(aaaa) => (RecordKind::Aaaa, RecordData::Addr(IpAddr::V6(aaaa.0))),
                RData::CNAME(cname) => (RecordKind::Cname, RecordData::Cname(cname.0.to_ascii())),
                RData::SRV(srv) => (
                    RecordKind::Srv,
                    RecordData::Srv {
                        priority: srv.priority(),
                        weight: srv.weight(),
                        port: srv.port(),
                        target: srv.target().to_ascii(),
                    },
                ),
                RData::TXT(txt) => (
                    RecordKind::Txt,
                    RecordData::Txt(
                        txt.txt_data()
                            .iter()
                            .map(|d| String::from_utf8_lossy(d).into_owned())
                            .collect(),
                    ),
                ),
                _ => return None,
            };
            Some(DnsRecord {
                name: DnsQuestion::new(record.name().to_ascii(), kind).name().to_owned(),
                kind,
                ttl: std::time::Duration::from_secs(u64::from(record.ttl())),
                data,
            })
        })
        .collect::<Vec<_>>();

    trace!(
        "decoded {} answers for {} (truncated: {})",
        records.len(),
        question,
        message.truncated()
    );

    Ok((
        message.id(),
        DnsResponse {
            records,
            truncated: message.truncated(),
            code,
        },
    ))
}
