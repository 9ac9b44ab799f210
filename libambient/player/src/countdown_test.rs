use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use rstest::rstest;
use tokio::time::{Instant, sleep_until};

use super::Countdown;
use crate::listener_registry::Subscription;

const SECOND: Duration = Duration::from_secs(1);

fn record(countdown: &Countdown) -> (Arc<Mutex<Vec<u32>>>, Subscription) {
    let seen = Arc::new(Mutex::new(vec![]));
    let seen_ = seen.clone();
    let subscription = countdown.subscribe(move |remaining| seen_.lock().unwrap().push(*remaining));
    (seen, subscription)
}

// Drives the countdown for the given amount of virtual time and returns the number of ticks
async fn run_for(countdown: &mut Countdown, duration: Duration) -> usize {
    let deadline = Instant::now() + duration;
    let mut ticks = 0;
    loop {
        tokio::select! {
            _ = countdown.tick() => ticks += 1,
            _ = sleep_until(deadline) => return ticks,
        }
    }
}

#[tokio::test(start_paused = true)]
async fn counts_down_to_zero_and_stops() {
    let mut countdown = Countdown::new(SECOND);
    countdown.set_remaining_time(5);
    let (seen, _subscription) = record(&countdown);

    countdown.start();
    let ticks = run_for(&mut countdown, Duration::from_millis(5500)).await;

    assert_eq!(5, ticks);
    assert_eq!(0, countdown.remaining_time());
    assert!(!countdown.is_running());
    // Five decrements plus the terminal stop
    assert_eq!(vec![4, 3, 2, 1, 0, 0], *seen.lock().unwrap());
}

#[tokio::test(start_paused = true)]
async fn does_not_tick_past_zero() {
    let mut countdown = Countdown::new(SECOND);
    countdown.set_remaining_time(2);
    let (seen, _subscription) = record(&countdown);

    countdown.start();
    run_for(&mut countdown, Duration::from_secs(10)).await;

    assert_eq!(vec![1, 0, 0], *seen.lock().unwrap());
}

#[tokio::test(start_paused = true)]
async fn start_without_time_is_noop() {
    let mut countdown = Countdown::new(SECOND);
    countdown.start();
    assert!(!countdown.is_running());
    assert_eq!(0, run_for(&mut countdown, Duration::from_secs(3)).await);
}

#[tokio::test(start_paused = true)]
async fn stop_suspends_without_reset() {
    let mut countdown = Countdown::new(SECOND);
    countdown.set_remaining_time(10);
    countdown.start();
    run_for(&mut countdown, Duration::from_millis(3500)).await;

    let (seen, _subscription) = record(&countdown);
    countdown.stop();
    run_for(&mut countdown, Duration::from_secs(5)).await;

    assert_eq!(7, countdown.remaining_time());
    assert_eq!(vec![7], *seen.lock().unwrap());

    countdown.start();
    run_for(&mut countdown, Duration::from_millis(2500)).await;
    assert_eq!(5, countdown.remaining_time());
}

#[tokio::test(start_paused = true)]
async fn restart_replaces_interval() {
    let mut countdown = Countdown::new(SECOND);
    countdown.set_remaining_time(10);
    countdown.start();
    run_for(&mut countdown, Duration::from_millis(600)).await;

    // Re-arming restarts the period instead of adding a second interval
    countdown.start();
    assert_eq!(0, run_for(&mut countdown, Duration::from_millis(600)).await);
    assert_eq!(1, run_for(&mut countdown, Duration::from_millis(600)).await);
    assert_eq!(9, countdown.remaining_time());
}

#[rstest]
#[case(0, 0)]
#[case(-20, 0)]
#[case(90, 90)]
fn set_remaining_time_clamps(#[case] input: i64, #[case] expected: u32) {
    let mut countdown = Countdown::new(SECOND);
    let (seen, _subscription) = record(&countdown);

    countdown.set_remaining_time(input);

    assert_eq!(expected, countdown.remaining_time());
    assert_eq!(vec![expected], *seen.lock().unwrap());
}

#[tokio::test(start_paused = true)]
async fn zero_stops_running_countdown() {
    let mut countdown = Countdown::new(SECOND);
    countdown.set_remaining_time(30);
    countdown.start();
    assert!(countdown.is_running());

    countdown.set_remaining_time(0);

    assert!(!countdown.is_running());
    assert_eq!(0, run_for(&mut countdown, Duration::from_secs(3)).await);
}
