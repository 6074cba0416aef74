//! Fixed-window rate limiting for content routes.
//!
//! Content routes can be reached without a session (via content tokens), so
//! they are gated by a per-client budget before any credential evaluation: a
//! fixed window per key, and once the budget is spent inside a window every
//! further request is rejected until the window elapses.
//!
//! # Memory safety
//!
//! The counter map is bounded: a configurable maximum number of tracked keys
//! (new keys are rejected at capacity) and a background cleanup task that
//! evicts windows idle past a TTL.
//!
//! # Security note
//!
//! X-Forwarded-For and X-Real-IP headers are NOT trusted unless the request
//! arrives from a configured trusted proxy:
//!
//! - Empty list (default): only the direct connection IP is used
//! - List of IPs/CIDRs: headers trusted only from these addresses
//! - ["*"]: trust headers from all sources (NOT recommended for production)

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::Request;
use dashmap::{DashMap, mapref::entry::Entry};
use gangway_core::config::RateLimitConfig;
use ipnet::IpNet;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// A per-key fixed window counter.
///
/// `count` is the number of requests admitted since `start`; it is never
/// advanced past the budget, so rejected requests do not extend the window.
struct Window {
    start: Instant,
    count: u32,
    last_access: Instant,
}

/// Rate limiter state shared across requests.
#[derive(Clone)]
pub struct RateLimitState {
    inner: Option<Arc<RateLimitStateInner>>,
}

/// Inner state that's only allocated when rate limiting is enabled.
struct RateLimitStateInner {
    windows: DashMap<String, Window>,
    max_requests: u32,
    window: Duration,
    trusted_proxies: TrustedProxies,
    max_entries: u32,
    entry_ttl: Duration,
    /// Whether ConnectInfo missing warning has been logged.
    connect_info_warned: AtomicBool,
    /// Whether at-capacity warning has been logged (prevents log spam).
    at_capacity_warned: AtomicBool,
}

/// A parsed trusted proxy entry (either an IP or CIDR range).
#[derive(Clone, Debug)]
enum TrustedEntry {
    Ip(IpAddr),
    Cidr(IpNet),
}

/// Trusted proxy configuration for client IP extraction.
#[derive(Clone, Debug)]
enum TrustedProxies {
    /// Never trust forwarded headers (default, most secure).
    None,
    /// Trust headers from all sources (development only).
    All,
    /// Trust headers only from specific IPs/CIDRs.
    List(Vec<TrustedEntry>),
}

impl TrustedProxies {
    fn from_config(proxies: &[String]) -> Self {
        if proxies.is_empty() {
            Self::None
        } else if proxies.len() == 1 && proxies[0] == "*" {
            Self::All
        } else {
            let entries: Vec<TrustedEntry> = proxies
                .iter()
                .filter_map(|p| {
                    if p.contains('/') {
                        match p.parse::<IpNet>() {
                            Ok(net) => Some(TrustedEntry::Cidr(net)),
                            Err(e) => {
                                tracing::warn!("Invalid CIDR in trusted_proxies: '{}': {}", p, e);
                                None
                            }
                        }
                    } else {
                        match p.parse::<IpAddr>() {
                            Ok(ip) => Some(TrustedEntry::Ip(ip)),
                            Err(e) => {
                                tracing::warn!("Invalid IP in trusted_proxies: '{}': {}", p, e);
                                None
                            }
                        }
                    }
                })
                .collect();
            Self::List(entries)
        }
    }

    /// Check if the given connection IP is a trusted proxy.
    fn is_trusted(&self, connection_ip: &str) -> bool {
        match self {
            Self::None => false,
            Self::All => true,
            Self::List(entries) => {
                let ip: IpAddr = match connection_ip.parse() {
                    Ok(ip) => ip,
                    Err(_) => return false,
                };
                entries.iter().any(|entry| match entry {
                    TrustedEntry::Ip(trusted) => *trusted == ip,
                    TrustedEntry::Cidr(network) => network.contains(&ip),
                })
            }
        }
    }
}

impl RateLimitState {
    /// Create a new rate limit state from configuration.
    pub fn new(config: &RateLimitConfig) -> Self {
        if !config.enabled {
            return Self { inner: None };
        }

        Self {
            inner: Some(Arc::new(RateLimitStateInner {
                windows: DashMap::new(),
                max_requests: config.max_requests,
                window: Duration::from_secs(config.window_secs),
                trusted_proxies: TrustedProxies::from_config(&config.trusted_proxies),
                max_entries: config.max_entries,
                entry_ttl: Duration::from_secs(config.entry_ttl_secs),
                connect_info_warned: AtomicBool::new(false),
                at_capacity_warned: AtomicBool::new(false),
            })),
        }
    }

    /// Check whether a request from the given client key is within budget,
    /// consuming one unit on success.
    ///
    /// Check-and-increment runs under the entry lock for the key, so
    /// concurrent requests on the same key cannot undercount; window reset
    /// happens in the same critical section.
    pub fn check(&self, key: &str) -> Result<(), RateLimitError> {
        let inner = match &self.inner {
            Some(inner) => inner,
            None => return Ok(()),
        };

        let now = Instant::now();

        // Check capacity before acquiring the entry lock: DashMap's len()
        // can deadlock if called while holding an entry lock. Slightly racy,
        // but worst case the map briefly exceeds max_entries.
        let current_len = inner.windows.len();
        let at_capacity = current_len >= inner.max_entries as usize;

        match inner.windows.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                let window = entry.get_mut();
                window.last_access = now;

                if now.duration_since(window.start) >= inner.window {
                    // Window elapsed: reset and admit.
                    window.start = now;
                    window.count = 1;
                    return Ok(());
                }

                if window.count >= inner.max_requests {
                    let elapsed = now.duration_since(window.start);
                    let remaining = inner.window.saturating_sub(elapsed);
                    return Err(RateLimitError {
                        retry_after_secs: remaining.as_secs() + 1,
                        reason: RateLimitReason::RateLimited,
                    });
                }

                window.count += 1;
                Ok(())
            }
            Entry::Vacant(entry) => {
                if at_capacity {
                    Self::warn_at_capacity(
                        &inner.at_capacity_warned,
                        current_len,
                        inner.max_entries,
                    );
                    return Err(RateLimitError {
                        retry_after_secs: 60, // Suggest retry after cleanup
                        reason: RateLimitReason::AtCapacity,
                    });
                }
                entry.insert(Window {
                    start: now,
                    count: 1,
                    last_access: now,
                });
                Ok(())
            }
        }
    }

    /// Check if rate limiting is enabled.
    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Get the current number of tracked client keys.
    pub fn entry_count(&self) -> usize {
        match &self.inner {
            Some(inner) => inner.windows.len(),
            None => 0,
        }
    }

    /// Evict windows idle past the entry TTL.
    /// Returns the number of entries evicted.
    ///
    /// Uses atomic `remove_if` so a window accessed between collection and
    /// removal is not evicted.
    pub fn cleanup(&self) -> usize {
        let inner = match &self.inner {
            Some(inner) => inner,
            None => return 0,
        };

        let now = Instant::now();
        let ttl = inner.entry_ttl;

        let stale_keys: Vec<String> = inner
            .windows
            .iter()
            .filter(|entry| now.duration_since(entry.value().last_access) > ttl)
            .map(|entry| entry.key().clone())
            .collect();

        let mut evicted = 0;
        for key in stale_keys {
            if inner
                .windows
                .remove_if(&key, |_, window| {
                    now.duration_since(window.last_access) > ttl
                })
                .is_some()
            {
                evicted += 1;
            }
        }

        if evicted > 0 {
            // Allow the at-capacity warning to fire again if we fill back up.
            inner.at_capacity_warned.store(false, Ordering::Relaxed);
            tracing::debug!(
                evicted = evicted,
                remaining = inner.windows.len(),
                "Rate limiter cleanup evicted stale windows"
            );
        }

        evicted
    }

    /// Log a warning if ConnectInfo is not available (only once).
    fn warn_connect_info_missing(&self) {
        if let Some(inner) = &self.inner
            && !inner.connect_info_warned.swap(true, Ordering::Relaxed)
        {
            tracing::warn!(
                "ConnectInfo not available for rate limiting. All requests will share a single \
                 rate limit bucket ('unknown' key). Add .into_make_service_with_connect_info::<SocketAddr>() \
                 to your server configuration to enable per-client rate limiting."
            );
        }
    }

    /// Log a warning when the limiter is at capacity (once per capacity
    /// event), so a key-spraying client cannot also spam the logs.
    fn warn_at_capacity(warned_flag: &AtomicBool, current_entries: usize, max_entries: u32) {
        if !warned_flag.swap(true, Ordering::Relaxed) {
            tracing::warn!(
                current_entries = current_entries,
                max_entries = max_entries,
                "Rate limiter at capacity, rejecting new client keys"
            );
        }
    }
}

/// Reason for rate limit rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitReason {
    /// Request exceeded the in-window budget.
    RateLimited,
    /// Limiter at capacity, cannot track new client keys.
    AtCapacity,
}

/// Error returned when a request is rejected by the limiter.
#[derive(Debug)]
pub struct RateLimitError {
    /// Number of seconds to wait before retrying.
    pub retry_after_secs: u64,
    /// Reason for the rejection.
    pub reason: RateLimitReason,
}

/// Extract a forwarded client IP from request headers (caller must have
/// decided the headers are trustworthy).
fn extract_forwarded_ip(req: &Request<Body>) -> Option<String> {
    if let Some(forwarded) = req.headers().get("x-forwarded-for")
        && let Ok(s) = forwarded.to_str()
    {
        // Take the first IP in the chain (client IP)
        if let Some(ip) = s.split(',').next() {
            return Some(ip.trim().to_string());
        }
    }

    if let Some(real_ip) = req.headers().get("x-real-ip")
        && let Ok(s) = real_ip.to_str()
    {
        return Some(s.trim().to_string());
    }

    None
}

/// Extract connection IP from request extensions (set by ConnectInfo).
fn extract_connection_ip(req: &Request<Body>) -> Option<String> {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
}

/// Extract the client key for rate limiting.
///
/// Respects the trusted_proxies configuration: forwarded headers are only
/// read when the direct connection comes from a trusted proxy.
pub fn extract_client_key(req: &Request<Body>, state: &RateLimitState) -> String {
    let inner = match &state.inner {
        Some(inner) => inner,
        None => return "unknown".to_string(),
    };

    let connection_ip = extract_connection_ip(req);

    let trust_headers = match (&connection_ip, &inner.trusted_proxies) {
        (None, TrustedProxies::All) => true,
        // Can't verify the proxy without a connection IP.
        (None, TrustedProxies::List(_)) => false,
        (None, TrustedProxies::None) => false,
        (Some(conn_ip), trusted_proxies) => trusted_proxies.is_trusted(conn_ip),
    };

    if trust_headers && let Some(forwarded_ip) = extract_forwarded_ip(req) {
        return forwarded_ip;
    }

    match connection_ip {
        Some(ip) => ip,
        None => {
            state.warn_connect_info_missing();
            "unknown".to_string()
        }
    }
}

/// Spawn a background task that periodically evicts stale windows.
pub fn spawn_cleanup_task(
    state: RateLimitState,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let evicted = state.cleanup();
            if evicted > 0 {
                tracing::info!(
                    evicted = evicted,
                    "Rate limiter cleanup task evicted stale windows"
                );
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_requests: u32, window_secs: u64) -> RateLimitConfig {
        RateLimitConfig {
            enabled: true,
            max_requests,
            window_secs,
            ..Default::default()
        }
    }

    #[test]
    fn disabled_state_always_admits() {
        let state = RateLimitState::new(&RateLimitConfig {
            enabled: false,
            ..Default::default()
        });
        assert!(!state.is_enabled());
        for _ in 0..1000 {
            assert!(state.check("10.0.0.1").is_ok());
        }
    }

    #[test]
    fn budget_is_exact() {
        let state = RateLimitState::new(&config(100, 300));

        for i in 0..100 {
            assert!(state.check("10.0.0.1").is_ok(), "request {} should pass", i + 1);
        }

        let rejected = state.check("10.0.0.1").unwrap_err();
        assert_eq!(rejected.reason, RateLimitReason::RateLimited);
        assert!(rejected.retry_after_secs > 0 && rejected.retry_after_secs <= 301);
    }

    #[test]
    fn rejections_do_not_consume_budget_after_reset() {
        let state = RateLimitState::new(&config(2, 300));

        assert!(state.check("k").is_ok());
        assert!(state.check("k").is_ok());
        assert!(state.check("k").is_err());
        assert!(state.check("k").is_err());
    }

    #[test]
    fn keys_are_independent() {
        let state = RateLimitState::new(&config(1, 300));

        assert!(state.check("10.0.0.1").is_ok());
        assert!(state.check("10.0.0.1").is_err());
        assert!(state.check("10.0.0.2").is_ok());
    }

    #[test]
    fn window_elapse_resets_budget() {
        let state = RateLimitState::new(&config(1, 1));

        assert!(state.check("k").is_ok());
        assert!(state.check("k").is_err());

        std::thread::sleep(Duration::from_millis(1100));
        assert!(state.check("k").is_ok());
    }

    #[test]
    fn at_capacity_rejects_new_keys_only() {
        let state = RateLimitState::new(&RateLimitConfig {
            enabled: true,
            max_requests: 5,
            window_secs: 300,
            max_entries: 2,
            ..Default::default()
        });

        assert!(state.check("1.1.1.1").is_ok());
        assert!(state.check("2.2.2.2").is_ok());

        let rejected = state.check("3.3.3.3").unwrap_err();
        assert_eq!(rejected.reason, RateLimitReason::AtCapacity);

        // Existing keys keep working.
        assert!(state.check("1.1.1.1").is_ok());
    }

    #[test]
    fn cleanup_evicts_idle_windows() {
        let state = RateLimitState::new(&RateLimitConfig {
            enabled: true,
            max_requests: 5,
            window_secs: 300,
            entry_ttl_secs: 0, // Immediate expiry for testing
            ..Default::default()
        });

        assert!(state.check("1.1.1.1").is_ok());
        assert!(state.check("2.2.2.2").is_ok());
        assert_eq!(state.entry_count(), 2);

        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(state.cleanup(), 2);
        assert_eq!(state.entry_count(), 0);
    }

    #[test]
    fn concurrent_checks_never_undercount() {
        let state = RateLimitState::new(&config(100, 300));
        let state = Arc::new(state);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let state = state.clone();
                std::thread::spawn(move || {
                    let mut admitted = 0u32;
                    for _ in 0..25 {
                        if state.check("shared").is_ok() {
                            admitted += 1;
                        }
                    }
                    admitted
                })
            })
            .collect();

        let admitted: u32 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admitted, 100);
    }

    #[test]
    fn trusted_proxies_none() {
        let proxies = TrustedProxies::from_config(&[]);
        assert!(!proxies.is_trusted("127.0.0.1"));
        assert!(!proxies.is_trusted("10.0.0.1"));
    }

    #[test]
    fn trusted_proxies_all() {
        let proxies = TrustedProxies::from_config(&["*".to_string()]);
        assert!(proxies.is_trusted("127.0.0.1"));
        assert!(proxies.is_trusted("10.0.0.1"));
    }

    #[test]
    fn trusted_proxies_list() {
        let proxies =
            TrustedProxies::from_config(&["127.0.0.1".to_string(), "10.0.0.0/8".to_string()]);
        assert!(proxies.is_trusted("127.0.0.1"));
        assert!(proxies.is_trusted("10.0.0.1"));
        assert!(proxies.is_trusted("10.255.255.255"));
        assert!(!proxies.is_trusted("192.168.1.1"));
        assert!(!proxies.is_trusted("11.0.0.1"));
    }
}
