// SPDX-License-Identifier: MPL-2.0

//! Integration tests for the tick-driven media source facade

use decklink_media::backends::CaptureBackend;
use decklink_media::backends::simulator::{SimulatorBackend, SimulatorOptions};
use decklink_media::capture::SessionOptions;
use decklink_media::errors::{CaptureError, ConvertError, MediaError};
use decklink_media::media::{
    FrameInfo, MediaEvent, MediaSource, PlaybackState, TargetFormat, TextureTarget,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn source_with(options: SimulatorOptions) -> MediaSource {
    let backend = Arc::new(SimulatorBackend::new(options)) as Arc<dyn CaptureBackend>;
    MediaSource::new(backend, SessionOptions::default())
}

/// Tick until a frame renders; panics if none arrives in five seconds
fn tick_until_frame(source: &mut MediaSource, target: &mut TextureTarget) -> FrameInfo {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        match source.tick(target).expect("tick succeeds") {
            Some(info) => return info,
            None => {
                assert!(Instant::now() < deadline, "no frame within five seconds");
                std::thread::sleep(Duration::from_millis(5));
            }
        }
    }
}

/// Target sized for whatever mode the source negotiated
fn target_for(source: &MediaSource) -> TextureTarget {
    let mode = source.video_format().expect("open source has a format");
    TextureTarget::new(TargetFormat::Bgra8, mode.width, mode.height)
}

#[test]
fn test_open_url_renders_frames() {
    let mut source = source_with(SimulatorOptions::default());
    source.open_url("sdi://device/1").expect("first device opens");

    assert_eq!(source.state(), PlaybackState::Playing);
    let format = source.video_format().expect("mode was negotiated");
    assert_eq!((format.width, format.height), (1920, 1080));
    assert_eq!(source.poll_events(), vec![MediaEvent::Opened]);

    let mut target = target_for(&source);
    let info = tick_until_frame(&mut source, &mut target);
    assert!(info.sequence >= 1);
    assert_eq!(info.mode, format);
    assert!(
        target.data().iter().any(|b| *b != 0),
        "rendered target should carry pattern pixels"
    );

    source.close();
    assert_eq!(source.state(), PlaybackState::Closed);
    assert_eq!(source.poll_events(), vec![MediaEvent::Closed]);
}

#[test]
fn test_pause_gates_frame_consumption() {
    let mut source = source_with(SimulatorOptions::default());
    source.open_url("sdi://device/1").expect("device opens");
    let mut target = target_for(&source);

    source.pause();
    assert_eq!(source.state(), PlaybackState::Paused);

    // Delivery keeps running while paused; ticks consume nothing
    let deadline = Instant::now() + Duration::from_secs(5);
    while source.stats().expect("source is open").delivered < 2 {
        assert!(Instant::now() < deadline, "delivery stalled while paused");
        assert!(
            source.tick(&mut target).expect("tick succeeds").is_none(),
            "paused source must not render"
        );
        std::thread::sleep(Duration::from_millis(5));
    }

    source.resume();
    assert_eq!(source.state(), PlaybackState::Playing);
    tick_until_frame(&mut source, &mut target);

    source.close();
}

#[test]
fn test_fractional_rates_are_rejected() {
    let mut source = source_with(SimulatorOptions::default());
    source.open_url("sdi://device/1").expect("device opens");

    assert!(!source.set_rate(0.5), "live capture has no half speed");
    assert!(!source.set_rate(-1.0));
    assert_eq!(source.state(), PlaybackState::Playing);

    assert!(source.set_rate(0.0));
    assert_eq!(source.state(), PlaybackState::Paused);

    source.close();
}

#[test]
fn test_fault_moves_source_to_error_state() {
    let mut source = source_with(SimulatorOptions {
        fail_after_frames: Some(2),
        ..SimulatorOptions::default()
    });
    source.open_url("sdi://device/1").expect("device opens");
    let mut target = target_for(&source);

    // Render until the injected fault surfaces
    let deadline = Instant::now() + Duration::from_secs(5);
    let error = loop {
        match source.tick(&mut target) {
            Ok(_) => {
                assert!(Instant::now() < deadline, "fault never surfaced");
                std::thread::sleep(Duration::from_millis(5));
            }
            Err(e) => break e,
        }
    };
    assert!(matches!(
        error,
        MediaError::Capture(CaptureError::HardwareError(_))
    ));
    assert_eq!(source.state(), PlaybackState::Error);

    let entered: Vec<_> = source
        .poll_events()
        .into_iter()
        .filter(|e| *e == MediaEvent::EnteredError)
        .collect();
    assert_eq!(entered.len(), 1, "error is announced exactly once");

    // Further ticks keep failing without repeating the event
    assert!(source.tick(&mut target).is_err());
    assert!(source.poll_events().is_empty());

    // Recovery is close and reopen
    source.close();
    source.open_url("sdi://device/1").expect("reopen after error");
    assert_eq!(source.state(), PlaybackState::Playing);
    source.close();
}

#[test]
fn test_bad_urls_leave_the_source_closed() {
    let mut source = source_with(SimulatorOptions::default());

    assert!(matches!(
        source.open_url("rtsp://device/1"),
        Err(MediaError::InvalidUrl(_))
    ));
    assert!(matches!(
        source.open_url("sdi://card/1"),
        Err(MediaError::InvalidUrl(_))
    ));
    assert!(matches!(
        source.open_url("sdi://device/0"),
        Err(MediaError::InvalidUrl(_))
    ));
    assert!(matches!(
        source.open_url("sdi://device/99"),
        Err(MediaError::Capture(CaptureError::DeviceNotFound(_)))
    ));

    assert_eq!(source.state(), PlaybackState::Closed);
    let mut target = TextureTarget::new(TargetFormat::Bgra8, 16, 16);
    assert!(matches!(
        source.tick(&mut target),
        Err(MediaError::NotOpen)
    ));
}

#[test]
fn test_mismatched_target_geometry_is_reported() {
    let mut source = source_with(SimulatorOptions::default());
    source.open_url("sdi://device/1").expect("device opens");

    let mut small = TextureTarget::new(TargetFormat::Bgra8, 320, 240);
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        match source.tick(&mut small) {
            Ok(None) => {
                assert!(Instant::now() < deadline, "no frame within five seconds");
                std::thread::sleep(Duration::from_millis(5));
            }
            Ok(Some(_)) => panic!("a 1080p frame cannot render into 320x240"),
            Err(e) => {
                assert!(matches!(
                    e,
                    MediaError::Convert(ConvertError::GeometryMismatch { .. })
                ));
                break;
            }
        }
    }

    // A render mismatch is not a capture fault; the session stays healthy
    assert_eq!(source.state(), PlaybackState::Playing);
    let mut target = target_for(&source);
    tick_until_frame(&mut source, &mut target);

    source.close();
}

#[test]
fn test_rendered_rgba_frame_encodes_as_png() {
    let mut source = source_with(SimulatorOptions::default());
    source.open_url("sdi://device/1").expect("device opens");

    let mode = source.video_format().expect("mode was negotiated");
    let mut target = TextureTarget::new(TargetFormat::Rgba8, mode.width, mode.height);
    tick_until_frame(&mut source, &mut target);
    source.close();

    // The converted buffer is exactly one RGBA image worth of bytes
    let image =
        image::RgbaImage::from_raw(target.width(), target.height(), target.data().to_vec())
            .expect("buffer length matches the target geometry");

    let mut encoded = std::io::Cursor::new(Vec::new());
    image
        .write_to(&mut encoded, image::ImageFormat::Png)
        .expect("PNG encoding succeeds");
    let decoded = image::load_from_memory(encoded.get_ref()).expect("PNG decodes");
    assert_eq!((decoded.width(), decoded.height()), (mode.width, mode.height));
}

#[test]
fn test_reopen_replaces_the_open_session() {
    let mut source = source_with(SimulatorOptions::default());
    source.open_url("sdi://device/1").expect("first device opens");
    source.open_url("sdi://device/2").expect("second device opens");

    assert_eq!(
        source.poll_events(),
        vec![MediaEvent::Opened, MediaEvent::Closed, MediaEvent::Opened]
    );
    assert_eq!(source.state(), PlaybackState::Playing);

    let mut target = target_for(&source);
    tick_until_frame(&mut source, &mut target);
    source.close();
}
