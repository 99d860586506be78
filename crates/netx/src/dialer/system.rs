use async_trait::async_trait;
use netx_core::{Context, NetxError, Operation, Result};
use tokio::net::TcpStream;

use super::{BoxConn, Dialer};

/// Leaf dialer opening a plain TCP connection
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemDialer;

#[async_trait]
impl Dialer for SystemDialer {
    async fn dial(&self, ctx: &Context, network: &str, address: &str) -> Result<BoxConn> {
        if !matches!(network, "tcp" | "tcp4" | "tcp6") {
            return Err(NetxError::UnsupportedNetwork(network.to_string()));
        }
        let stream = ctx
            .run(Operation::Connect, async {
                Ok(TcpStream::connect(address).await?)
            })
            .await?;
        stream.set_nodelay(true)?;
        Ok(Box::new(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netx_core::Failure;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_dial_local_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let conn = SystemDialer
            .dial(&Context::new(), "tcp", &addr.to_string())
            .await
            .unwrap();
        assert_eq!(conn.remote_addr(), Some(addr));
    }

    #[tokio::test]
    async fn test_refused_is_classifiable() {
        // bind then drop to get a port nobody listens on
        let addr = TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap()
            .local_addr()
            .unwrap();
        let err = SystemDialer
            .dial(&Context::new(), "tcp", &addr.to_string())
            .await
            .err()
            .unwrap();
        assert_eq!(err.to_failure(), Failure::ConnectionRefused);
    }

    #[tokio::test]
    async fn test_unsupported_network() {
        let err = SystemDialer
            .dial(&Context::new(), "udp", "1.1.1.1:53")
            .await
            .err()
            .unwrap();
        assert!(matches!(err, NetxError::UnsupportedNetwork(_)));
    }
}
