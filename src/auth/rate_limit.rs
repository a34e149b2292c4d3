use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const MAX_ATTEMPTS: usize = 5;
const WINDOW_SECS: u64 = 900; // 15 minutes

/// Failed-login counter per client IP, shared across workers.
#[derive(Clone)]
pub struct RateLimiter {
    attempts: Arc<Mutex<HashMap<IpAddr, Vec<Instant>>>>,
    max_attempts: usize,
    window: Duration,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_limits(MAX_ATTEMPTS, Duration::from_secs(WINDOW_SECS))
    }

    pub fn with_limits(max_attempts: usize, window: Duration) -> Self {
        Self {
            attempts: Arc::new(Mutex::new(HashMap::new())),
            max_attempts,
            window,
        }
    }

    /// Check if the given IP is rate-limited. Returns true if blocked.
    /// Also lazily cleans up stale entries for the checked IP.
    pub fn is_blocked(&self, ip: IpAddr) -> bool {
        let mut map = self.attempts.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        let window = self.window;

        let blocked = match map.get_mut(&ip) {
            Some(timestamps) => {
                timestamps.retain(|t| now.duration_since(*t) < window);
                timestamps.len() >= self.max_attempts
            }
            None => false,
        };
        if map.get(&ip).is_some_and(|t| t.is_empty()) {
            map.remove(&ip);
        }
        blocked
    }

    /// Record a failed login attempt for the given IP. Every IP whose
    /// attempts have all left the window is dropped on the way.
    pub fn record_failure(&self, ip: IpAddr) {
        let mut map = self.attempts.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        let window = self.window;
        map.retain(|_, timestamps| {
            timestamps.retain(|t| now.duration_since(*t) < window);
            !timestamps.is_empty()
        });
        map.entry(ip).or_default().push(now);
    }

    #[cfg(test)]
    fn tracked_ips(&self) -> usize {
        self.attempts.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Clear all recorded attempts for the given IP (call on successful login).
    pub fn clear(&self, ip: IpAddr) {
        let mut map = self.attempts.lock().unwrap_or_else(|e| e.into_inner());
        map.remove(&ip);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    const IP: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
    const OTHER: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));

    #[test]
    fn blocks_after_max_failures() {
        let limiter = RateLimiter::with_limits(3, Duration::from_secs(60));
        for _ in 0..2 {
            limiter.record_failure(IP);
        }
        assert!(!limiter.is_blocked(IP));
        limiter.record_failure(IP);
        assert!(limiter.is_blocked(IP));
        assert!(!limiter.is_blocked(OTHER));
    }

    #[test]
    fn clear_unblocks() {
        let limiter = RateLimiter::with_limits(1, Duration::from_secs(60));
        limiter.record_failure(IP);
        assert!(limiter.is_blocked(IP));
        limiter.clear(IP);
        assert!(!limiter.is_blocked(IP));
    }

    #[test]
    fn failures_expire_after_window() {
        let limiter = RateLimiter::with_limits(1, Duration::from_millis(20));
        limiter.record_failure(IP);
        assert!(limiter.is_blocked(IP));
        std::thread::sleep(Duration::from_millis(40));
        assert!(!limiter.is_blocked(IP));
    }

    #[test]
    fn stale_ips_are_dropped_on_next_failure() {
        let limiter = RateLimiter::with_limits(5, Duration::from_millis(200));
        for last in 1..=50u8 {
            limiter.record_failure(IpAddr::V4(Ipv4Addr::new(192, 168, 0, last)));
        }
        assert_eq!(limiter.tracked_ips(), 50);

        std::thread::sleep(Duration::from_millis(300));
        limiter.record_failure(IP);
        assert_eq!(limiter.tracked_ips(), 1);
        assert!(!limiter.is_blocked(OTHER));
    }
}
