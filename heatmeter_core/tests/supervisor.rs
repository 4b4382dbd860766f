//! Link supervision scenarios driven by a scripted device on a test clock.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use heatmeter_core::mocks::{LinkEvent, ScriptedConnector, Step};
use heatmeter_core::{LinkState, RawSample, Supervisor, SupervisorCfg, SupervisorHandle};
use heatmeter_traits::clock::MonotonicClock;
use heatmeter_traits::clock::test_clock::TestClock;

const VALID: &str = ";  225 ;  84 ; 10570 ; 52.37 ; 47.02 ; 43.94 ; 37.66 ; 18.15 ; 48.62 ; 47.08 ;";
const GARBAGE: &str = "; 52.37 ; 46.52 ; 22.83 ;";

fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}

fn cfg() -> SupervisorCfg {
    SupervisorCfg {
        fresh_data_timeout: secs(10),
        reconnect_backoff: secs(15),
        reset_pause: secs(1),
    }
}

fn rig() -> (TestClock, ScriptedConnector<TestClock>, Supervisor<ScriptedConnector<TestClock>, TestClock>) {
    let clock = TestClock::new();
    let device = ScriptedConnector::new(clock.clone());
    let supervisor = Supervisor::new(device.clone(), clock.clone(), cfg());
    device.stop_when_done(supervisor.shutdown_flag());
    (clock, device, supervisor)
}

#[test]
fn silent_device_is_reset_once_per_deadline() {
    let (clock, device, mut supervisor) = rig();
    device.push(Step::Silence).push(Step::Silence).push(Step::Silence);

    let stats = supervisor.run(|_| panic!("no sample expected"));

    assert_eq!(stats.stalls, 3);
    assert_eq!(stats.samples, 0);
    assert_eq!(stats.link_losses, 0);
    assert_eq!(
        device.events(),
        vec![
            (secs(0), LinkEvent::Connect),
            (secs(0), LinkEvent::Read(secs(10))),
            (secs(10), LinkEvent::Reset(false)),
            (secs(11), LinkEvent::Flush),
            (secs(11), LinkEvent::Reset(true)),
            (secs(11), LinkEvent::Read(secs(10))),
            (secs(21), LinkEvent::Reset(false)),
            (secs(22), LinkEvent::Flush),
            (secs(22), LinkEvent::Reset(true)),
            (secs(22), LinkEvent::Read(secs(10))),
            (secs(32), LinkEvent::Reset(false)),
            (secs(33), LinkEvent::Flush),
            (secs(33), LinkEvent::Reset(true)),
        ]
    );
    assert_eq!(clock.elapsed(), secs(33));
    assert_eq!(supervisor.state(), LinkState::Disconnected);
}

#[test]
fn garbage_does_not_push_the_deadline_back() {
    let (_clock, device, mut supervisor) = rig();
    device
        .push(Step::line(secs(3), GARBAGE))
        .push(Step::line(secs(1), VALID))
        .push(Step::Silence);

    let mut samples: Vec<RawSample> = Vec::new();
    let stats = supervisor.run(|s| samples.push(s));

    assert_eq!(device.read_timeouts(), vec![secs(10), secs(7), secs(10)]);
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].pulses(), [225, 84, 10570]);
    assert_eq!(stats.samples, 1);
    assert_eq!(stats.parse_failures, 1);
    assert_eq!(stats.stalls, 1);
}

#[test]
fn endless_garbage_counts_as_silence() {
    let (_clock, device, mut supervisor) = rig();
    device
        .push(Step::line(secs(5), GARBAGE))
        .push(Step::line(secs(5), GARBAGE))
        .push(Step::Silence);

    let stats = supervisor.run(|_| panic!("no sample expected"));

    // Second garbage line lands on the deadline: reset without another read.
    assert_eq!(device.read_timeouts(), vec![secs(10), secs(5), secs(10)]);
    assert_eq!(stats.parse_failures, 2);
    assert_eq!(stats.stalls, 2);
}

#[test]
fn valid_samples_keep_the_link_alive() {
    let (clock, device, mut supervisor) = rig();
    for _ in 0..5 {
        device.push(Step::line(secs(9), VALID));
    }

    let mut count = 0;
    let stats = supervisor.run(|_| count += 1);

    assert_eq!(count, 5);
    assert_eq!(stats.stalls, 0);
    assert_eq!(device.read_timeouts(), vec![secs(10); 5]);
    assert_eq!(clock.elapsed(), secs(45));
    // Stopping never resets the device.
    assert!(
        !device
            .events()
            .iter()
            .any(|(_, e)| matches!(e, LinkEvent::Reset(_) | LinkEvent::Flush))
    );
}

#[test]
fn unplugged_link_is_reopened_after_backoff() {
    let (clock, device, mut supervisor) = rig();
    device
        .push(Step::line(secs(1), VALID))
        .push(Step::Unplug)
        .push(Step::line(secs(1), VALID));

    let stats = supervisor.run(|_| {});

    assert_eq!(stats.samples, 2);
    assert_eq!(stats.link_losses, 1);
    assert_eq!(stats.connect_attempts, 2);
    assert_eq!(stats.stalls, 0);
    let connects: Vec<Duration> = device
        .events()
        .into_iter()
        .filter(|(_, e)| *e == LinkEvent::Connect)
        .map(|(at, _)| at)
        .collect();
    assert_eq!(connects, vec![secs(0), secs(16)]);
    assert_eq!(clock.elapsed(), secs(17));
}

#[test]
fn open_failures_back_off_and_retry() {
    let (clock, device, mut supervisor) = rig();
    device.fail_connects(2).push(Step::line(Duration::ZERO, VALID));

    let stats = supervisor.run(|_| {});

    assert_eq!(stats.connect_attempts, 3);
    assert_eq!(stats.connect_failures, 2);
    assert_eq!(stats.samples, 1);
    assert_eq!(
        device.events()[..3],
        [
            (secs(0), LinkEvent::ConnectFailed),
            (secs(15), LinkEvent::ConnectFailed),
            (secs(30), LinkEvent::Connect),
        ]
    );
    assert_eq!(clock.elapsed(), secs(30));
}

#[test]
fn stop_before_run_never_connects() {
    let (_clock, device, mut supervisor) = rig();
    supervisor.shutdown_flag().store(true, Ordering::Relaxed);

    let stats = supervisor.run(|_| {});

    assert_eq!(stats.connect_attempts, 0);
    assert!(device.events().is_empty());
}

#[test]
fn stop_interrupts_backoff() {
    let clock = TestClock::new();
    let device = ScriptedConnector::new(clock.clone());
    device.fail_connects(u32::MAX);
    let supervisor = Supervisor::new(device.clone(), MonotonicClock::new(), cfg());

    let handle = SupervisorHandle::spawn(supervisor, |_| {});
    std::thread::sleep(Duration::from_millis(200));
    let stats = handle.stop().expect("supervisor thread joined");

    // Backoff is 15 s; the stop was honored within one poll slice.
    assert_eq!(stats.connect_failures, 1);
    assert_eq!(stats.samples, 0);
}

#[test]
fn handle_streams_until_stopped() {
    let clock = MonotonicClock::new();
    let device = ScriptedConnector::new(clock);
    device.repeat_when_done(Duration::from_millis(2), VALID);
    let supervisor = Supervisor::new(device, clock, cfg());

    let seen = Arc::new(std::sync::atomic::AtomicU64::new(0));
    let counter = Arc::clone(&seen);
    let handle = SupervisorHandle::spawn(supervisor, move |_| {
        counter.fetch_add(1, Ordering::Relaxed);
    });

    let start = std::time::Instant::now();
    while seen.load(Ordering::Relaxed) < 5 && start.elapsed() < Duration::from_secs(5) {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(!handle.is_finished());

    let stats = handle.stop().expect("supervisor thread joined");
    assert!(stats.samples >= 5);
    assert_eq!(stats.samples, seen.load(Ordering::Relaxed));
    assert_eq!(stats.stalls, 0);
}

#[test]
fn dropping_the_handle_joins_the_thread() {
    let clock = MonotonicClock::new();
    let device = ScriptedConnector::new(clock);
    device.repeat_when_done(Duration::from_millis(2), VALID);
    let handle = SupervisorHandle::spawn(Supervisor::new(device.clone(), clock, cfg()), |_| {});
    std::thread::sleep(Duration::from_millis(20));
    drop(handle);

    let reads = device.read_timeouts().len();
    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(device.read_timeouts().len(), reads);
}
