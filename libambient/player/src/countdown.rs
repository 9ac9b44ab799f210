use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};

use crate::listener_registry::{ListenerRegistry, Subscription};

/// Sleep-timer countdown with one-second granularity.
///
/// The countdown doesn't spawn anything. Whoever owns it drives it by awaiting
/// [`Countdown::tick`], which keeps all state changes on the owner's task.
pub struct Countdown {
    remaining: u32,
    period: Duration,
    // At most one interval exists, restarting replaces it
    interval: Option<Interval>,
    listeners: ListenerRegistry<u32>,
}

impl Countdown {
    pub fn new(period: Duration) -> Self {
        Self::with_listeners(period, ListenerRegistry::new())
    }

    pub fn with_listeners(period: Duration, listeners: ListenerRegistry<u32>) -> Self {
        Self {
            remaining: 0,
            period,
            interval: None,
            listeners,
        }
    }

    pub fn start(&mut self) {
        if self.remaining == 0 {
            self.interval = None;
            return;
        }
        let mut interval = interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.interval = Some(interval);
    }

    pub fn stop(&mut self) {
        self.interval = None;
        self.notify();
    }

    pub fn set_remaining_time(&mut self, seconds: i64) {
        self.remaining = seconds.clamp(0, u32::MAX as i64) as u32;
        if self.remaining == 0 {
            self.stop();
        } else {
            self.notify();
        }
    }

    pub fn remaining_time(&self) -> u32 {
        self.remaining
    }

    pub fn is_running(&self) -> bool {
        self.interval.is_some()
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&u32) + Send + Sync + 'static,
    {
        self.listeners.subscribe(listener)
    }

    /// Waits for the next tick and applies it. Never resolves while the countdown is
    /// stopped. Returns the remaining seconds after the tick.
    pub async fn tick(&mut self) -> u32 {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => std::future::pending::<()>().await,
        }

        if self.remaining > 0 {
            self.remaining -= 1;
            self.notify();
        }
        if self.remaining == 0 {
            self.stop();
        }
        self.remaining
    }

    fn notify(&self) {
        self.listeners.notify(&self.remaining);
    }
}

#[cfg(test)]
#[path = "./countdown_test.rs"]
mod countdown_test;
