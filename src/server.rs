use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tracing::{error, info};

use crate::errors::ServerError;
use crate::processor::process_dns_query;
use crate::protocol::MAX_UDP_MESSAGE_SIZE;
use crate::zone::ZoneTable;

/// A UDP socket bound for serving, together with the zone it answers from.
pub struct DnsServer {
    sock: Arc<UdpSocket>,
    zone: Arc<ZoneTable>,
}

impl DnsServer {
    /// Bind the UDP socket. Failing here is fatal for the caller.
    pub async fn bind(addr: SocketAddr, zone: Arc<ZoneTable>) -> Result<Self, ServerError> {
        let sock = UdpSocket::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        Ok(Self {
            sock: Arc::new(sock),
            zone,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.sock.local_addr()
    }

    /// Receive and answer datagrams until `shutdown` completes.
    ///
    /// Every datagram is handled on its own task; the zone is shared read-only
    /// and replies go out through the shared socket.
    pub async fn run<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut buf = [0u8; MAX_UDP_MESSAGE_SIZE];
        tokio::pin!(shutdown);

        match self.local_addr() {
            Ok(addr) => info!("DNS server listening on {}", addr),
            Err(e) => info!("DNS server listening (local address unavailable: {})", e),
        }

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutting down DNS server");
                    break;
                }
                received = self.sock.recv_from(&mut buf) => {
                    match received {
                        Ok((len, addr)) => {
                            tokio::spawn(process_dns_query(
                                buf[..len].to_vec(),
                                addr,
                                Arc::clone(&self.zone),
                                Arc::clone(&self.sock),
                            ));
                        }
                        Err(e) => {
                            // e.g. ICMP port unreachable reported on the socket
                            error!("{}", ServerError::Receive(e));
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zone::parse_zone;
    use hickory_resolver::proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
    use hickory_resolver::proto::rr::{Name, RData, RecordType};
    use std::net::Ipv4Addr;
    use std::time::Duration;
    use tokio::sync::oneshot;
    use tokio::time::timeout;

    async fn start_server() -> (SocketAddr, oneshot::Sender<()>, tokio::task::JoinHandle<()>) {
        let zone = Arc::new(parse_zone("example.com.   300   IN   A   93.184.216.34\n"));
        let server = DnsServer::bind("127.0.0.1:0".parse().unwrap(), zone)
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(server.run(async {
            let _ = shutdown_rx.await;
        }));

        (addr, shutdown_tx, handle)
    }

    async fn query(server: SocketAddr, id: u16, name: &str) -> Message {
        let mut message = Message::new();
        message
            .set_id(id)
            .set_message_type(MessageType::Query)
            .set_op_code(OpCode::Query)
            .add_query(Query::query(Name::from_ascii(name).unwrap(), RecordType::A));

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        client
            .send_to(&message.to_vec().unwrap(), server)
            .await
            .unwrap();

        let mut buf = [0u8; 512];
        let (len, _) = timeout(Duration::from_secs(2), client.recv_from(&mut buf))
            .await
            .expect("no reply from server")
            .unwrap();

        Message::from_vec(&buf[..len]).unwrap()
    }

    #[tokio::test]
    async fn test_known_name_resolves() {
        let (addr, shutdown_tx, handle) = start_server().await;

        let reply = query(addr, 0x1111, "example.com.").await;
        assert_eq!(reply.id(), 0x1111);
        assert_eq!(reply.response_code(), ResponseCode::NoError);
        assert!(reply.authoritative());
        assert_eq!(reply.answers().len(), 1);
        match reply.answers()[0].data() {
            RData::A(a) => assert_eq!(a.0, Ipv4Addr::new(93, 184, 216, 34)),
            other => panic!("unexpected record data {:?}", other),
        }

        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_unknown_name_is_nxdomain() {
        let (addr, shutdown_tx, handle) = start_server().await;

        let reply = query(addr, 0x2222, "no.such.name.").await;
        assert_eq!(reply.id(), 0x2222);
        assert_eq!(reply.response_code(), ResponseCode::NXDomain);
        assert!(reply.answers().is_empty());

        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_malformed_datagram_gets_no_reply() {
        let (addr, shutdown_tx, handle) = start_server().await;

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        client.send_to(&[0xde, 0xad], addr).await.unwrap();

        let mut buf = [0u8; 512];
        let silent = timeout(Duration::from_millis(200), client.recv_from(&mut buf)).await;
        assert!(silent.is_err());

        // the loop keeps serving after the bad packet
        let reply = query(addr, 0x3333, "EXAMPLE.COM.").await;
        assert_eq!(reply.response_code(), ResponseCode::NoError);

        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let taken = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = taken.local_addr().unwrap();

        let result = DnsServer::bind(addr, Arc::new(ZoneTable::new())).await;
        assert!(matches!(result, Err(ServerError::Bind { .. })));
    }
}
