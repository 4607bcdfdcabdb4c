//! Polling tests against scripted captures

use super::{DEBUG_TEMPLATE_NAME, MatchPoller, MatchPolicy, PollOutcome};
use crate::config::TesterConfig;
use crate::diagnostics::MemorySink;
use crate::error::TesterError;
use crate::test_support::{
    Frame, ScriptedCapture, embed_rgb, noise_rgb, textured_rgb, write_reference,
};
use image::{DynamicImage, Rgb, RgbImage};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

const POLL: Duration = Duration::from_millis(20);

fn fast_config() -> TesterConfig {
    TesterConfig {
        poll_interval: POLL,
        backoff_interval: Duration::from_millis(10),
        ..TesterConfig::default()
    }
}

fn poller_with(capture: ScriptedCapture) -> (MatchPoller, Rc<RefCell<MemorySink>>) {
    let sink = Rc::new(RefCell::new(MemorySink::new("virtual")));
    let poller = MatchPoller::new(&fast_config(), Box::new(capture), Box::new(Rc::clone(&sink)));
    (poller, sink)
}

fn reference() -> RgbImage {
    textured_rgb(16, 12, 7)
}

/// Reference with every other column blacked out
fn damaged_reference() -> RgbImage {
    let mut img = reference();
    for (x, _, px) in img.enumerate_pixels_mut() {
        if x % 2 == 0 {
            *px = Rgb([0, 0, 0]);
        }
    }
    img
}

fn blank_screen() -> RgbImage {
    RgbImage::from_pixel(120, 80, Rgb([200, 200, 200]))
}

#[test]
fn test_exact_copy_found_on_first_attempt() {
    let tmp = tempfile::tempdir().unwrap();
    let path = write_reference(tmp.path(), "button.png", &reference());
    let capture = ScriptedCapture::repeating(embed_rgb(120, 80, &reference(), 50, 30));
    let calls = capture.calls();
    let (mut poller, _) = poller_with(capture);

    let found = poller
        .wait_for_match(&path, Duration::from_secs(2), 0.99)
        .unwrap()
        .expect("reference should be found");

    assert_eq!(found.coords(), (50, 30, 16, 12));
    assert!(found.score >= 0.99);
    assert_eq!(calls.get(), 1);
}

#[test]
fn test_never_matching_stops_at_timeout() {
    let tmp = tempfile::tempdir().unwrap();
    let path = write_reference(tmp.path(), "button.png", &reference());
    let capture = ScriptedCapture::repeating(blank_screen());
    let calls = capture.calls();
    let (mut poller, _) = poller_with(capture);

    let timeout = Duration::from_millis(300);
    let start = Instant::now();
    let result = poller.wait_for_match(&path, timeout, 0.8).unwrap();
    let elapsed = start.elapsed();

    assert!(result.is_none());
    assert!(elapsed >= timeout, "returned early after {elapsed:?}");
    // One poll interval plus scheduling slack
    assert!(elapsed < timeout + POLL + Duration::from_millis(250));
    assert!(calls.get() > 1);
}

#[test]
fn test_zero_timeout_makes_single_attempt() {
    let tmp = tempfile::tempdir().unwrap();
    let path = write_reference(tmp.path(), "button.png", &reference());
    let capture = ScriptedCapture::repeating(blank_screen());
    let calls = capture.calls();
    let (mut poller, _) = poller_with(capture);

    let outcome = poller.poll(&path, Duration::ZERO, 0.8).unwrap();

    assert_eq!(calls.get(), 1);
    match outcome {
        PollOutcome::NotFound {
            attempts, captures, ..
        } => {
            assert_eq!(attempts, 1);
            assert_eq!(captures, 1);
        }
        PollOutcome::Found(m) => panic!("unexpected match {m:?}"),
    }
}

#[test]
fn test_missing_reference_fails_before_capturing() {
    let tmp = tempfile::tempdir().unwrap();
    let capture = ScriptedCapture::repeating(blank_screen());
    let calls = capture.calls();
    let (mut poller, sink) = poller_with(capture);

    let err = poller
        .wait_for_match(&tmp.path().join("missing.png"), Duration::from_secs(1), 0.8)
        .unwrap_err();

    assert!(matches!(err, TesterError::ResourceNotFound { .. }));
    assert_eq!(calls.get(), 0);
    assert!(sink.borrow().artifacts().is_empty());
}

#[test]
fn test_corrupt_reference_is_decode_error() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("broken.png");
    std::fs::write(&path, b"not a png at all").unwrap();
    let capture = ScriptedCapture::repeating(blank_screen());
    let calls = capture.calls();
    let (mut poller, _) = poller_with(capture);

    let err = poller
        .wait_for_match(&path, Duration::from_secs(1), 0.8)
        .unwrap_err();

    assert!(matches!(err, TesterError::DecodeError { .. }));
    assert_eq!(calls.get(), 0);
}

#[test]
fn test_transient_capture_failures_are_retried() {
    let tmp = tempfile::tempdir().unwrap();
    let path = write_reference(tmp.path(), "button.png", &reference());
    let screen = embed_rgb(120, 80, &reference(), 20, 40);
    let capture = ScriptedCapture::new(vec![Frame::Garbage, Frame::Error, Frame::Image(screen)]);
    let calls = capture.calls();
    let (mut poller, _) = poller_with(capture);

    let found = poller
        .wait_for_match(&path, Duration::from_secs(2), 0.99)
        .unwrap()
        .expect("third capture holds the reference");

    assert_eq!((found.x, found.y), (20, 40));
    assert_eq!(calls.get(), 3);
    // Failed captures still count
    assert_eq!(poller.capture_count(), 3);
}

#[test]
fn test_no_usable_capture_is_capture_unavailable() {
    let tmp = tempfile::tempdir().unwrap();
    let path = write_reference(tmp.path(), "button.png", &reference());
    let (mut poller, _) = poller_with(ScriptedCapture::new(vec![Frame::Garbage]));

    let err = poller
        .wait_for_match(&path, Duration::from_millis(100), 0.8)
        .unwrap_err();

    match err {
        TesterError::CaptureUnavailable {
            attempts,
            last_error,
        } => {
            assert!(attempts >= 1);
            assert!(last_error.contains("decode"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_best_seen_reported_and_threshold_is_monotonic() {
    let tmp = tempfile::tempdir().unwrap();
    let path = write_reference(tmp.path(), "button.png", &reference());
    let screen = embed_rgb(120, 80, &damaged_reference(), 50, 30);
    let (mut poller, _) = poller_with(ScriptedCapture::repeating(screen));

    let best = match poller.poll(&path, Duration::ZERO, 1.0).unwrap() {
        PollOutcome::NotFound { best_seen, .. } => best_seen.expect("one capture was scored"),
        PollOutcome::Found(m) => panic!("damaged copy should not reach 1.0: {m:?}"),
    };
    assert_eq!(best.attempt, 1);
    assert!(best.score < 1.0);

    let below = poller
        .wait_for_match(&path, Duration::ZERO, best.score - 0.01)
        .unwrap()
        .expect("lower threshold must still match");
    assert_eq!((below.x, below.y), (best.x, best.y));
    assert_eq!(below.score, best.score);

    let above = poller
        .wait_for_match(&path, Duration::ZERO, best.score + 0.01)
        .unwrap();
    assert!(above.is_none());
}

#[test]
fn test_policy_selects_first_or_best_capture() {
    let tmp = tempfile::tempdir().unwrap();
    let path = write_reference(tmp.path(), "button.png", &reference());
    let frames = vec![
        Frame::Image(embed_rgb(120, 80, &damaged_reference(), 10, 10)),
        Frame::Image(embed_rgb(120, 80, &reference(), 50, 30)),
        Frame::Image(embed_rgb(120, 80, &damaged_reference(), 10, 10)),
    ];

    let (mut first, _) = poller_with(ScriptedCapture::new(frames.clone()));
    assert_eq!(first.policy(), MatchPolicy::FirstQualifying);
    let found = first
        .wait_for_match(&path, Duration::from_millis(200), 0.1)
        .unwrap()
        .unwrap();
    assert!(found.score < 0.99);

    let (mut best, _) = poller_with(ScriptedCapture::new(frames));
    best.set_policy(MatchPolicy::BestQualifying);
    let start = Instant::now();
    let found = best
        .wait_for_match(&path, Duration::from_millis(200), 0.1)
        .unwrap()
        .unwrap();
    assert_eq!((found.x, found.y), (50, 30));
    assert!(found.score >= 0.99);
    // Best-of-N always polls the full window
    assert!(start.elapsed() >= Duration::from_millis(200));
}

#[test]
fn test_artifacts_written_per_attempt() {
    let tmp = tempfile::tempdir().unwrap();
    let path = write_reference(tmp.path(), "button.png", &reference());
    let screen = embed_rgb(120, 80, &reference(), 50, 30);
    let (mut poller, sink) = poller_with(ScriptedCapture::repeating(screen));

    poller
        .wait_for_match(&path, Duration::from_secs(1), 0.99)
        .unwrap()
        .unwrap();

    let sink = sink.borrow();
    let names = sink.names();
    assert_eq!(names.len(), 2);
    assert_eq!(names[0], DEBUG_TEMPLATE_NAME);
    assert!(names[1].starts_with("debug_match_") && names[1].ends_with(".png"));
    assert_eq!(sink.get(DEBUG_TEMPLATE_NAME).unwrap().dimensions(), (16, 12));
    assert_eq!(sink.artifacts()[1].1.dimensions(), (120, 80));
}

#[test]
fn test_reference_larger_than_capture_is_not_found() {
    let tmp = tempfile::tempdir().unwrap();
    let path = write_reference(tmp.path(), "button.png", &reference());
    let tiny = RgbImage::from_pixel(8, 8, Rgb([0, 0, 0]));
    let (mut poller, _) = poller_with(ScriptedCapture::repeating(tiny));

    match poller.poll(&path, Duration::ZERO, 0.0).unwrap() {
        PollOutcome::NotFound {
            best_seen,
            captures,
            ..
        } => {
            assert!(best_seen.is_none());
            assert_eq!(captures, 1);
        }
        PollOutcome::Found(m) => panic!("unexpected match {m:?}"),
    }
}

#[test]
fn test_desktop_screenshot_names() {
    let (mut poller, sink) = poller_with(ScriptedCapture::repeating(blank_screen()));

    let named = poller.take_desktop_screenshot(Some("after_click")).unwrap();
    assert_eq!(named, std::path::PathBuf::from("virtual/after_click.png"));

    let stamped = poller.take_desktop_screenshot(None).unwrap();
    let file = stamped.file_name().unwrap().to_string_lossy().into_owned();
    assert!(file.starts_with("desktop_screenshot_") && file.ends_with(".png"));

    assert_eq!(sink.borrow().artifacts().len(), 2);
    assert_eq!(poller.capture_count(), 2);
}

#[test]
fn test_desaturated_or_recoloured_copy_is_not_a_match() {
    let tmp = tempfile::tempdir().unwrap();
    let colourful = noise_rgb(16, 12, 21);
    let path = write_reference(tmp.path(), "badge.png", &colourful);
    let desaturated = DynamicImage::ImageLuma8(image::imageops::grayscale(&colourful)).to_rgb8();
    let recoloured = RgbImage::from_fn(16, 12, |x, y| {
        let [r, g, b] = colourful.get_pixel(x, y).0;
        Rgb([g, b, r])
    });

    let mut screen = blank_screen();
    image::imageops::replace(&mut screen, &desaturated, 10, 10);
    image::imageops::replace(&mut screen, &recoloured, 60, 40);
    let (mut poller, _) = poller_with(ScriptedCapture::repeating(screen.clone()));

    match poller.poll(&path, Duration::ZERO, 0.9).unwrap() {
        PollOutcome::NotFound { best_seen, .. } => {
            let best = best_seen.expect("one capture was scored");
            assert!(best.score < 0.9, "off-colour copy scored {}", best.score);
        }
        PollOutcome::Found(m) => panic!("off-colour copy matched: {m:?}"),
    }

    image::imageops::replace(&mut screen, &colourful, 90, 20);
    let (mut poller, _) = poller_with(ScriptedCapture::repeating(screen));
    let found = poller
        .wait_for_match(&path, Duration::ZERO, 0.9)
        .unwrap()
        .expect("true-colour copy should match");
    assert_eq!((found.x, found.y), (90, 20));
}
