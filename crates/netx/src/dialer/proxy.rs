//! SOCKS5 proxying (RFC 1928, RFC 1929 for username/password).

use async_trait::async_trait;
use netx_core::{Context, Endpoint, Failure, NetxError, Operation, Result};
use std::net::IpAddr;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use url::Url;

use super::{BoxConn, Dialer};

const SOCKS_VERSION: u8 = 0x05;
const AUTH_NONE: u8 = 0x00;
const AUTH_PASSWORD: u8 = 0x02;
const AUTH_UNACCEPTABLE: u8 = 0xff;
const CMD_CONNECT: u8 = 0x01;
const ATYP_IPV4: u8 = 0x01;
const ATYP_DOMAIN: u8 = 0x03;
const ATYP_IPV6: u8 = 0x04;
const DEFAULT_SOCKS_PORT: u16 = 1080;

/// Redirects dials through a SOCKS5 proxy when one is configured.
///
/// The proxy itself is reached through the inner dialer, then a CONNECT to
/// the original target is negotiated on that connection. Without a proxy
/// URL the dial passes through unchanged.
///
/// Only `socks5://` is accepted. This layer sits below name resolution, so
/// the proxy always receives an IP address and `socks5h://` (resolution by
/// the proxy) cannot be honoured.
#[derive(Debug, Clone)]
pub struct ProxyDialer<D> {
    dialer: D,
    proxy_url: Option<Url>,
}

impl<D> ProxyDialer<D> {
    /// Reach targets through `proxy_url`, or directly when it is `None`
    #[must_use]
    pub const fn new(dialer: D, proxy_url: Option<Url>) -> Self {
        Self { dialer, proxy_url }
    }
}

struct Credentials {
    username: String,
    password: String,
}

fn proxy_endpoint(url: &Url) -> Result<(String, Option<Credentials>)> {
    match url.scheme() {
        "socks5" => {}
        "socks5h" => {
            return Err(NetxError::InvalidUrl(
                "socks5h proxies are not supported: names are resolved locally".into(),
            ))
        }
        other => {
            return Err(NetxError::InvalidUrl(format!(
                "unsupported proxy scheme {other:?}"
            )))
        }
    }
    let host = url
        .host_str()
        .ok_or_else(|| NetxError::InvalidUrl(format!("proxy URL without host: {url}")))?;
    let host = host.trim_start_matches('[').trim_end_matches(']');
    let endpoint = Endpoint::new(host, url.port().unwrap_or(DEFAULT_SOCKS_PORT));
    let credentials = (!url.username().is_empty()).then(|| Credentials {
        username: url.username().to_string(),
        password: url.password().unwrap_or_default().to_string(),
    });
    Ok((endpoint.to_string(), credentials))
}

#[async_trait]
impl<D: Dialer> Dialer for ProxyDialer<D> {
    async fn dial(&self, ctx: &Context, network: &str, address: &str) -> Result<BoxConn> {
        let Some(url) = &self.proxy_url else {
            return self.dialer.dial(ctx, network, address).await;
        };
        let (proxy, credentials) = proxy_endpoint(url)?;
        let target: Endpoint = address.parse()?;
        let mut conn = self.dialer.dial(ctx, network, &proxy).await?;
        ctx.run(
            Operation::Connect,
            socks5_connect(&mut conn, &target, credentials.as_ref()),
        )
        .await
        .map_err(|err| err.classify(Operation::Connect))?;
        Ok(conn)
    }
}

fn protocol_error(message: &str) -> NetxError {
    NetxError::other(format!("socks5: {message}"))
}

async fn socks5_connect<S>(
    stream: &mut S,
    target: &Endpoint,
    credentials: Option<&Credentials>,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + ?Sized,
{
    let method = if credentials.is_some() {
        AUTH_PASSWORD
    } else {
        AUTH_NONE
    };
    stream.write_all(&[SOCKS_VERSION, 1, method]).await?;

    let mut reply = [0u8; 2];
    stream.read_exact(&mut reply).await?;
    if reply[0] != SOCKS_VERSION {
        return Err(protocol_error("unexpected protocol version"));
    }
    match (reply[1], credentials) {
        (AUTH_NONE, _) => {}
        (AUTH_PASSWORD, Some(creds)) => authenticate(stream, creds).await?,
        (AUTH_UNACCEPTABLE, _) => return Err(protocol_error("no acceptable auth method")),
        _ => return Err(protocol_error("unexpected auth method")),
    }

    let mut request = vec![SOCKS_VERSION, CMD_CONNECT, 0x00];
    match target.ip() {
        Some(IpAddr::V4(v4)) => {
            request.push(ATYP_IPV4);
            request.extend_from_slice(&v4.octets());
        }
        Some(IpAddr::V6(v6)) => {
            request.push(ATYP_IPV6);
            request.extend_from_slice(&v6.octets());
        }
        None => {
            let host = target.host().as_bytes();
            let len = u8::try_from(host.len()).map_err(|_| protocol_error("hostname too long"))?;
            request.push(ATYP_DOMAIN);
            request.push(len);
            request.extend_from_slice(host);
        }
    }
    request.extend_from_slice(&target.port().to_be_bytes());
    stream.write_all(&request).await?;

    let mut header = [0u8; 4];
    stream.read_exact(&mut header).await?;
    if header[0] != SOCKS_VERSION {
        return Err(protocol_error("unexpected protocol version"));
    }
    match header[1] {
        0x00 => {}
        code => {
            return Err(reply_failure(code).map_or_else(
                || protocol_error(&format!("request rejected with code {code:#04x}")),
                |failure| NetxError::failure(failure, Operation::Connect),
            ))
        }
    }

    // skip the bound address
    let remaining = match header[3] {
        ATYP_IPV4 => 4,
        ATYP_IPV6 => 16,
        ATYP_DOMAIN => usize::from(stream.read_u8().await?),
        _ => return Err(protocol_error("unexpected address type")),
    };
    let mut bound = vec![0u8; remaining + 2];
    stream.read_exact(&mut bound).await?;
    Ok(())
}

async fn authenticate<S>(stream: &mut S, creds: &Credentials) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + ?Sized,
{
    let username = creds.username.as_bytes();
    let password = creds.password.as_bytes();
    let ulen = u8::try_from(username.len()).map_err(|_| protocol_error("username too long"))?;
    let plen = u8::try_from(password.len()).map_err(|_| protocol_error("password too long"))?;

    let mut request = Vec::with_capacity(3 + username.len() + password.len());
    request.push(0x01);
    request.push(ulen);
    request.extend_from_slice(username);
    request.push(plen);
    request.extend_from_slice(password);
    stream.write_all(&request).await?;

    let mut reply = [0u8; 2];
    stream.read_exact(&mut reply).await?;
    if reply[1] != 0x00 {
        return Err(protocol_error("authentication failed"));
    }
    Ok(())
}

/// Reply codes that have a direct counterpart in the taxonomy
const fn reply_failure(code: u8) -> Option<Failure> {
    match code {
        0x03 => Some(Failure::NetworkUnreachable),
        0x04 => Some(Failure::HostUnreachable),
        0x05 => Some(Failure::ConnectionRefused),
        0x06 => Some(Failure::GenericTimeoutError),
        _ => None,
    }
}
