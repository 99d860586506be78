//! Transport configuration.
//!
//! [`Config`] is what [`crate::httptransport::new`] consumes; every unset
//! field falls back to a documented default. [`Settings`] is the on-disk
//! form, loadable from TOML.

use netx_core::{ByteCounter, Logger, NetxError, Result};
use rustls::ClientConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::dialer::{Dialer, DEFAULT_DIAL_TIMEOUT};
use crate::resolver::{HickoryResolver, Resolver};
use crate::tls::{tls_config_with_alpn, TlsDialer, DEFAULT_NEXT_PROTOS, DEFAULT_TLS_HANDSHAKE_TIMEOUT};

/// Configuration for building a transport
#[derive(Clone)]
pub struct Config {
    /// Byte counter (default: no byte counting)
    pub byte_counter: Option<Arc<ByteCounter>>,

    /// Dialer override (default: the full DNS dialer chain)
    pub dialer: Option<Arc<dyn Dialer>>,

    /// Logger (default: no logging)
    pub logger: Option<Arc<dyn Logger>>,

    /// SOCKS5 proxy (default: direct connections)
    pub proxy_url: Option<Url>,

    /// Resolver override (default: bogon, error and logging layers over
    /// the leaf resolver)
    pub resolver: Option<Arc<dyn Resolver>>,

    /// Leaf of the default resolver chain (default: system resolver)
    pub leaf_resolver: Option<Arc<dyn Resolver>>,

    /// TLS client configuration (default: webpki roots, h2 then http/1.1)
    pub tls_config: Option<Arc<ClientConfig>>,

    /// TLS dialer override (default: the full TLS chain)
    pub tls_dialer: Option<Arc<dyn TlsDialer>>,

    /// Per-attempt connect timeout
    pub dial_timeout: Duration,

    /// TLS handshake timeout
    pub tls_handshake_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            byte_counter: None,
            dialer: None,
            logger: None,
            proxy_url: None,
            resolver: None,
            leaf_resolver: None,
            tls_config: None,
            tls_dialer: None,
            dial_timeout: DEFAULT_DIAL_TIMEOUT,
            tls_handshake_timeout: DEFAULT_TLS_HANDSHAKE_TIMEOUT,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("byte_counter", &self.byte_counter)
            .field("dialer", &self.dialer.is_some())
            .field("logger", &self.logger.is_some())
            .field("proxy_url", &self.proxy_url.as_ref().map(Url::as_str))
            .field("resolver", &self.resolver.is_some())
            .field("leaf_resolver", &self.leaf_resolver.is_some())
            .field("tls_config", &self.tls_config.is_some())
            .field("tls_dialer", &self.tls_dialer.is_some())
            .field("dial_timeout", &self.dial_timeout)
            .field("tls_handshake_timeout", &self.tls_handshake_timeout)
            .finish()
    }
}

impl Config {
    /// Create a configuration with every default
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count bytes sent and received
    #[must_use]
    pub fn with_byte_counter(mut self, counter: Arc<ByteCounter>) -> Self {
        self.byte_counter = Some(counter);
        self
    }

    /// Replace the whole dialer chain
    #[must_use]
    pub fn with_dialer(mut self, dialer: Arc<dyn Dialer>) -> Self {
        self.dialer = Some(dialer);
        self
    }

    /// Enable the logging layers
    #[must_use]
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Route connections through a SOCKS5 proxy
    #[must_use]
    pub fn with_proxy_url(mut self, url: Url) -> Self {
        self.proxy_url = Some(url);
        self
    }

    /// Replace the whole resolver chain
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn Resolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Replace the leaf of the default resolver chain
    #[must_use]
    pub fn with_leaf_resolver(mut self, resolver: Arc<dyn Resolver>) -> Self {
        self.leaf_resolver = Some(resolver);
        self
    }

    /// Use a custom TLS client configuration
    #[must_use]
    pub fn with_tls_config(mut self, config: Arc<ClientConfig>) -> Self {
        self.tls_config = Some(config);
        self
    }

    /// Replace the whole TLS dialer chain
    #[must_use]
    pub fn with_tls_dialer(mut self, dialer: Arc<dyn TlsDialer>) -> Self {
        self.tls_dialer = Some(dialer);
        self
    }

    /// Set the per-attempt connect timeout
    #[must_use]
    pub const fn with_dial_timeout(mut self, timeout: Duration) -> Self {
        self.dial_timeout = timeout;
        self
    }

    /// Set the TLS handshake timeout
    #[must_use]
    pub const fn with_tls_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.tls_handshake_timeout = timeout;
        self
    }
}

/// Leaf resolver selected by [`Settings`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolverKind {
    /// Platform `getaddrinfo`
    #[default]
    System,
    /// hickory with the system configuration
    Hickory,
}

/// On-disk transport settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// SOCKS5 proxy URL, e.g. `socks5://127.0.0.1:9050`
    #[serde(default)]
    pub proxy_url: Option<String>,

    /// Leaf resolver (default: system)
    #[serde(default)]
    pub resolver: ResolverKind,

    /// Per-attempt connect timeout in seconds (default: 15)
    #[serde(default = "default_dial_timeout_secs")]
    pub dial_timeout_secs: u64,

    /// TLS handshake timeout in seconds (default: 10)
    #[serde(default = "default_tls_handshake_timeout_secs")]
    pub tls_handshake_timeout_secs: u64,

    /// ALPN protocols to offer (default: h2, http/1.1)
    #[serde(default = "default_next_protos")]
    pub next_protos: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            proxy_url: None,
            resolver: ResolverKind::default(),
            dial_timeout_secs: default_dial_timeout_secs(),
            tls_handshake_timeout_secs: default_tls_handshake_timeout_secs(),
            next_protos: default_next_protos(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml(&content)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse settings from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| NetxError::Config(e.to_string()))
    }

    /// Build the runtime configuration
    pub fn into_config(self) -> Result<Config> {
        let mut config = Config::new()
            .with_dial_timeout(Duration::from_secs(self.dial_timeout_secs))
            .with_tls_handshake_timeout(Duration::from_secs(self.tls_handshake_timeout_secs))
            .with_tls_config(tls_config_with_alpn(&self.next_protos)?);
        if let Some(proxy) = self.proxy_url {
            let url = Url::parse(&proxy).map_err(|e| NetxError::InvalidUrl(format!("{proxy}: {e}")))?;
            config = config.with_proxy_url(url);
        }
        if self.resolver == ResolverKind::Hickory {
            config = config.with_leaf_resolver(Arc::new(HickoryResolver::from_system_conf()?));
        }
        Ok(config)
    }
}

// Default value functions for serde.
const fn default_dial_timeout_secs() -> u64 {
    DEFAULT_DIAL_TIMEOUT.as_secs()
}

const fn default_tls_handshake_timeout_secs() -> u64 {
    DEFAULT_TLS_HANDSHAKE_TIMEOUT.as_secs()
}

fn default_next_protos() -> Vec<String> {
    DEFAULT_NEXT_PROTOS.iter().map(ToString::to_string).collect()
}
