// SPDX-License-Identifier: MPL-2.0

//! Integration tests for capture sessions over the simulator backend
//!
//! The simulator's fail-after-N-frames injection stops delivery at a known
//! frame count, which makes queue and drop accounting exact instead of
//! racing against a live thread.

use decklink_media::backends::CaptureBackend;
use decklink_media::backends::simulator::{SimulatorBackend, SimulatorOptions};
use decklink_media::capture::{
    CaptureSession, DeviceId, SessionOptions, SessionState, SignalMode,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn sim_backend(options: SimulatorOptions) -> Arc<dyn CaptureBackend> {
    Arc::new(SimulatorBackend::new(options))
}

fn test_mode() -> SignalMode {
    SignalMode::from_shorthand("720p60").expect("standard mode")
}

/// Block until the injected fault lands; delivery is quiescent afterwards
fn wait_for_fault(session: &CaptureSession) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while session.fault().is_none() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(session.fault().is_some(), "capture fault never surfaced");
}

#[test]
fn test_slow_consumer_keeps_newest_frames() {
    // Six frames into a two-deep queue with nobody polling
    let backend = sim_backend(SimulatorOptions {
        fail_after_frames: Some(6),
        ..SimulatorOptions::default()
    });
    let options = SessionOptions {
        queue_capacity: 2,
        ..SessionOptions::default()
    };
    let session = CaptureSession::open(
        backend,
        &DeviceId::new("simulator", 0),
        Some(test_mode()),
        options,
    )
    .expect("open succeeds");
    wait_for_fault(&session);

    let stats = session.stats();
    assert_eq!(stats.delivered, 6);
    assert_eq!(stats.dropped, 4, "oldest frames are evicted first");
    assert_eq!(stats.last_sequence, Some(6));

    // The survivors are the two newest frames
    let first = session.poll_frame().expect("a frame survived");
    let second = session.poll_frame().expect("two frames survived");
    assert_eq!((first.sequence, second.sequence), (5, 6));
    assert!(session.poll_frame().is_none());

    // The sequence gap in front of the first survivor accounts for
    // every dropped frame
    assert_eq!(first.sequence - 1, stats.dropped);

    session.close();
}

#[test]
fn test_fast_consumer_sees_every_frame_in_order() {
    let backend = sim_backend(SimulatorOptions {
        fail_after_frames: Some(5),
        ..SimulatorOptions::default()
    });
    let options = SessionOptions {
        queue_capacity: 8,
        ..SessionOptions::default()
    };
    let mode = test_mode();
    let session = CaptureSession::open(
        backend,
        &DeviceId::new("simulator", 0),
        Some(mode),
        options,
    )
    .expect("open succeeds");
    wait_for_fault(&session);

    let interval_ns = mode.frame_interval().as_nanos() as u64;
    for expected in 1..=5u64 {
        let frame = session.poll_frame().expect("all frames fit the queue");
        assert_eq!(frame.sequence, expected);
        assert_eq!(frame.pts_ns, (expected - 1) * interval_ns);
        assert_eq!(frame.data().len(), mode.frame_bytes());
    }
    assert!(session.poll_frame().is_none());
    assert_eq!(session.stats().dropped, 0);

    session.close();
}

#[test]
fn test_signal_loss_advances_the_clock_without_frames() {
    // Every third interval has no input; delivery fails after four frames,
    // so the run is exactly: frame, frame, loss, frame, frame, fault
    let backend = sim_backend(SimulatorOptions {
        fail_after_frames: Some(4),
        signal_loss_cycle: Some(3),
        ..SimulatorOptions::default()
    });
    let options = SessionOptions {
        queue_capacity: 8,
        ..SessionOptions::default()
    };
    let mode = test_mode();
    let session = CaptureSession::open(
        backend,
        &DeviceId::new("simulator", 0),
        Some(mode),
        options,
    )
    .expect("open succeeds");
    wait_for_fault(&session);

    let stats = session.stats();
    assert_eq!(stats.delivered, 4);
    assert_eq!(stats.no_signal, 1);
    assert_eq!(stats.dropped, 0);
    assert_eq!(session.state(), SessionState::Error);

    // Sequences stay dense while presentation time skips the lost interval
    let interval_ns = mode.frame_interval().as_nanos() as u64;
    let frames: Vec<_> = std::iter::from_fn(|| session.poll_frame()).collect();
    let sequences: Vec<u64> = frames.iter().map(|f| f.sequence).collect();
    let pts: Vec<u64> = frames.iter().map(|f| f.pts_ns).collect();
    assert_eq!(sequences, vec![1, 2, 3, 4]);
    assert_eq!(
        pts,
        vec![0, interval_ns, 3 * interval_ns, 4 * interval_ns]
    );

    session.close();
}

#[test]
fn test_sessions_on_different_devices_run_independently() {
    let backend = sim_backend(SimulatorOptions::default());
    let mode = test_mode();

    let first = CaptureSession::open(
        Arc::clone(&backend),
        &DeviceId::new("simulator", 0),
        Some(mode),
        SessionOptions::default(),
    )
    .expect("first device opens");
    let second = CaptureSession::open(
        Arc::clone(&backend),
        &DeviceId::new("simulator", 1),
        Some(mode),
        SessionOptions::default(),
    )
    .expect("second device opens alongside the first");

    // Both streams deliver, each with its own sequence numbering
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut frames = (None, None);
    while (frames.0.is_none() || frames.1.is_none()) && Instant::now() < deadline {
        if frames.0.is_none() {
            frames.0 = first.poll_frame();
        }
        if frames.1.is_none() {
            frames.1 = second.poll_frame();
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    let (a, b) = (
        frames.0.expect("first device delivered"),
        frames.1.expect("second device delivered"),
    );
    assert_eq!(a.sequence, 1);
    assert_eq!(b.sequence, 1);

    assert_eq!(first.state(), SessionState::Streaming);
    assert_eq!(second.state(), SessionState::Streaming);

    first.close();
    second.close();
}
