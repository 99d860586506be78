//! Test doubles for the dialer and resolver chains.

use async_trait::async_trait;
use netx_core::{Context, NetxError, Result};
use std::collections::VecDeque;
use std::io;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::dialer::{BoxConn, Dialer};
use crate::resolver::Resolver;

/// Every dial fails with an unexpected EOF
pub struct EofDialer;

#[async_trait]
impl Dialer for EofDialer {
    async fn dial(&self, _ctx: &Context, _network: &str, _address: &str) -> Result<BoxConn> {
        Err(io::Error::from(io::ErrorKind::UnexpectedEof).into())
    }
}

/// Every dial succeeds with a connection whose peer is already gone
pub struct EofConnDialer;

#[async_trait]
impl Dialer for EofConnDialer {
    async fn dial(&self, _ctx: &Context, _network: &str, _address: &str) -> Result<BoxConn> {
        let (conn, peer) = tokio::io::duplex(64);
        drop(peer);
        Ok(Box::new(conn))
    }
}

/// Resolver returning a fixed answer or a fixed error
pub struct MockableResolver {
    addresses: Vec<IpAddr>,
    error: Option<String>,
}

impl MockableResolver {
    pub const fn answering(addresses: Vec<IpAddr>) -> Self {
        Self {
            addresses,
            error: None,
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            addresses: Vec::new(),
            error: Some(message.to_string()),
        }
    }
}

#[async_trait]
impl Resolver for MockableResolver {
    async fn lookup_host(&self, _ctx: &Context, _hostname: &str) -> Result<Vec<IpAddr>> {
        match &self.error {
            Some(message) => Err(NetxError::other(message.clone())),
            None => Ok(self.addresses.clone()),
        }
    }
}

/// Plays back scripted outcomes in order and records every target
pub struct ScriptedDialer {
    outcomes: Mutex<VecDeque<Result<()>>>,
    attempts: Mutex<Vec<String>>,
}

impl ScriptedDialer {
    pub fn new(outcomes: Vec<Result<()>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            attempts: Mutex::new(Vec::new()),
        }
    }

    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Dialer for ScriptedDialer {
    async fn dial(&self, _ctx: &Context, _network: &str, address: &str) -> Result<BoxConn> {
        self.attempts.lock().unwrap().push(address.to_string());
        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(NetxError::other("no scripted outcome left")));
        outcome.map(|()| {
            let (conn, _peer) = tokio::io::duplex(64);
            Box::new(conn) as BoxConn
        })
    }
}

/// Dialer that never completes before `delay` and counts live attempts
pub struct SlowDialer {
    delay: Duration,
    live: Arc<AtomicUsize>,
}

struct LiveGuard(Arc<AtomicUsize>);

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl SlowDialer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of attempts currently pending
    pub fn live_attempts(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.live)
    }
}

#[async_trait]
impl Dialer for SlowDialer {
    async fn dial(&self, _ctx: &Context, _network: &str, _address: &str) -> Result<BoxConn> {
        self.live.fetch_add(1, Ordering::SeqCst);
        let _guard = LiveGuard(Arc::clone(&self.live));
        tokio::time::sleep(self.delay).await;
        let (conn, _peer) = tokio::io::duplex(64);
        Ok(Box::new(conn))
    }
}
