//! Request throttling
//!
//! Enforces a minimum interval between consecutive requests when a
//! requests-per-minute cap is configured. The quota has a burst of one, so
//! no more than one request is ever let through per interval. Waiting is a
//! blocking sleep.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::clock::{Clock, DefaultClock};
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use log::info;

type Sleep = Box<dyn Fn(Duration) + Send + Sync>;

type DirectLimiter<C> = RateLimiter<NotKeyed, InMemoryState, C, NoOpMiddleware<<C as Clock>::Instant>>;

/// Blocking pacer for outbound requests.
pub struct RequestThrottle<C: Clock = DefaultClock> {
    limiter: Option<DirectLimiter<C>>,
    interval: Option<Duration>,
    clock: C,
    sleep: Sleep,
}

impl RequestThrottle {
    /// Throttle on the system clock, sleeping the current thread.
    ///
    /// `None` or zero disables throttling.
    pub fn per_minute(requests_per_minute: Option<u32>) -> Self {
        Self::with_clock(
            requests_per_minute,
            DefaultClock::default(),
            std::thread::sleep,
        )
    }

    /// Throttle that never waits.
    pub fn unlimited() -> Self {
        Self::per_minute(None)
    }
}

impl<C: Clock> RequestThrottle<C> {
    /// Throttle on an explicit clock and sleep function.
    pub fn with_clock<F>(requests_per_minute: Option<u32>, clock: C, sleep: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        let interval = requests_per_minute
            .and_then(NonZeroU32::new)
            .map(|rpm| Duration::from_secs_f64(60.0 / f64::from(rpm.get())));

        let limiter = interval
            .and_then(Quota::with_period)
            .map(|quota| RateLimiter::direct_with_clock(quota, &clock));

        Self {
            limiter,
            interval,
            clock,
            sleep: Box::new(sleep),
        }
    }

    /// Minimum time between two requests, if throttling is active.
    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    pub fn is_active(&self) -> bool {
        self.limiter.is_some()
    }

    /// Block until the next request may be sent. Returns the time slept.
    pub fn wait(&self) -> Duration {
        let Some(limiter) = &self.limiter else {
            return Duration::ZERO;
        };

        let mut slept = Duration::ZERO;
        while let Err(not_until) = limiter.check() {
            let wait = not_until.wait_time_from(self.clock.now());
            info!("Enforcing {:.3}s throttling", wait.as_secs_f64());
            (self.sleep)(wait);
            slept += wait;
        }
        slept
    }
}

impl<C: Clock> std::fmt::Debug for RequestThrottle<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestThrottle")
            .field("interval", &self.interval)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use governor::clock::FakeRelativeClock;
    use std::sync::{Arc, Mutex};

    /// Throttle whose sleeps advance a fake clock and are recorded.
    fn fake_throttle(
        requests_per_minute: Option<u32>,
    ) -> (RequestThrottle<FakeRelativeClock>, FakeRelativeClock, Arc<Mutex<Vec<Duration>>>) {
        let clock = FakeRelativeClock::default();
        let sleeps = Arc::new(Mutex::new(Vec::new()));

        let sleep_clock = clock.clone();
        let recorded = Arc::clone(&sleeps);
        let throttle = RequestThrottle::with_clock(requests_per_minute, clock.clone(), move |d| {
            recorded.lock().unwrap().push(d);
            sleep_clock.advance(d);
        });

        (throttle, clock, sleeps)
    }

    #[test]
    fn test_unlimited_never_waits() {
        let throttle = RequestThrottle::unlimited();
        assert!(!throttle.is_active());
        assert_eq!(throttle.interval(), None);
        for _ in 0..5 {
            assert_eq!(throttle.wait(), Duration::ZERO);
        }
    }

    #[test]
    fn test_zero_rate_is_unlimited() {
        let throttle = RequestThrottle::per_minute(Some(0));
        assert!(!throttle.is_active());
    }

    #[test]
    fn test_interval_from_rate() {
        assert_eq!(
            RequestThrottle::per_minute(Some(60)).interval(),
            Some(Duration::from_secs(1))
        );
        assert_eq!(
            RequestThrottle::per_minute(Some(120)).interval(),
            Some(Duration::from_millis(500))
        );
    }

    #[test]
    fn test_consecutive_calls_are_one_interval_apart() {
        let (throttle, _clock, sleeps) = fake_throttle(Some(60));

        assert_eq!(throttle.wait(), Duration::ZERO);
        let slept = throttle.wait();

        assert!(slept >= Duration::from_secs(1));
        let total: Duration = sleeps.lock().unwrap().iter().sum();
        assert_eq!(total, slept);
    }

    #[test]
    fn test_no_wait_when_interval_already_elapsed() {
        let (throttle, clock, sleeps) = fake_throttle(Some(60));

        throttle.wait();
        clock.advance(Duration::from_secs(2));
        assert_eq!(throttle.wait(), Duration::ZERO);
        assert!(sleeps.lock().unwrap().is_empty());
    }

    #[test]
    fn test_partial_wait() {
        let (throttle, clock, _sleeps) = fake_throttle(Some(60));

        throttle.wait();
        clock.advance(Duration::from_millis(400));
        let slept = throttle.wait();

        assert!(slept >= Duration::from_millis(599));
        assert!(slept <= Duration::from_millis(600));
    }
}
