//! Fakes for the component traits, shared by unit tests

use crate::browser::Browser;
use crate::capture::{ScreenCapture, encode_png};
use crate::error::{TesterError, TesterResult};
use crate::input::PointerInput;
use image::{Rgb, RgbImage};
use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// One scripted capture result
#[derive(Clone)]
pub enum Frame {
    Image(RgbImage),
    /// Bytes that do not decode
    Garbage,
    /// Capture call itself fails
    Error,
}

/// Replays frames in order, then repeats the last one forever
pub struct ScriptedCapture {
    frames: Vec<Frame>,
    next: usize,
    calls: Rc<Cell<u32>>,
}

impl ScriptedCapture {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            frames,
            next: 0,
            calls: Rc::new(Cell::new(0)),
        }
    }

    pub fn repeating(image: RgbImage) -> Self {
        Self::new(vec![Frame::Image(image)])
    }

    /// Shared counter of capture calls
    pub fn calls(&self) -> Rc<Cell<u32>> {
        Rc::clone(&self.calls)
    }
}

impl ScreenCapture for ScriptedCapture {
    fn capture_bytes(&mut self) -> TesterResult<Vec<u8>> {
        self.calls.set(self.calls.get() + 1);
        let idx = self.next.min(self.frames.len().saturating_sub(1));
        self.next += 1;
        match self.frames.get(idx) {
            Some(Frame::Image(img)) => encode_png(img),
            Some(Frame::Garbage) => Ok(b"not an image".to_vec()),
            Some(Frame::Error) | None => Err(TesterError::CaptureFailed {
                description: "scripted failure".to_string(),
            }),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PointerEvent {
    Move(f64, f64),
    Click,
}

/// Records pointer calls instead of moving the real cursor
#[derive(Default)]
pub struct RecordingPointer {
    events: Rc<RefCell<Vec<PointerEvent>>>,
    fail: bool,
}

impl RecordingPointer {
    pub fn failing() -> Self {
        Self {
            events: Rc::default(),
            fail: true,
        }
    }

    pub fn events(&self) -> Rc<RefCell<Vec<PointerEvent>>> {
        Rc::clone(&self.events)
    }
}

impl PointerInput for RecordingPointer {
    fn move_to(&mut self, x: f64, y: f64) -> TesterResult<()> {
        if self.fail {
            return Err(TesterError::PointerFailed {
                description: "scripted failure".to_string(),
            });
        }
        self.events.borrow_mut().push(PointerEvent::Move(x, y));
        Ok(())
    }

    fn click(&mut self) -> TesterResult<()> {
        self.events.borrow_mut().push(PointerEvent::Click);
        Ok(())
    }
}

/// What a [`FakeBrowser`] was asked to do
#[derive(Debug, Default)]
pub struct BrowserLog {
    pub visited: Vec<String>,
    pub closes: u32,
    /// Reported by `current_url`; follows navigation unless overridden
    pub current: String,
}

#[derive(Default)]
pub struct FakeBrowser {
    log: Rc<RefCell<BrowserLog>>,
    closed: bool,
    fail_close: bool,
}

impl FakeBrowser {
    /// Browser whose session teardown errors
    pub fn failing_close() -> Self {
        Self {
            fail_close: true,
            ..Self::default()
        }
    }

    pub fn log(&self) -> Rc<RefCell<BrowserLog>> {
        Rc::clone(&self.log)
    }
}

impl Browser for FakeBrowser {
    fn navigate(&mut self, url: &str) -> TesterResult<()> {
        let mut log = self.log.borrow_mut();
        log.visited.push(url.to_string());
        log.current = url.to_string();
        Ok(())
    }

    fn current_url(&mut self) -> TesterResult<String> {
        Ok(self.log.borrow().current.clone())
    }

    fn close(&mut self) -> TesterResult<()> {
        if !self.closed {
            self.closed = true;
            self.log.borrow_mut().closes += 1;
            if self.fail_close {
                return Err(TesterError::browser("close", "session already gone"));
            }
        }
        Ok(())
    }
}

/// Deterministic non-repeating texture so every window has its own content
pub fn textured_rgb(width: u32, height: u32, seed: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let v = x
            .wrapping_mul(73)
            .wrapping_add(y.wrapping_mul(151))
            .wrapping_add(seed.wrapping_mul(31))
            ^ (x * y).wrapping_mul(17);
        let v = (v % 251) as u8;
        Rgb([v, v.wrapping_mul(3), v.wrapping_add(40)])
    })
}

/// Pseudo-random colour noise with the three channels drawn independently
pub fn noise_rgb(width: u32, height: u32, seed: u32) -> RgbImage {
    let hash = |x: u32, y: u32, c: u32| {
        let mut h = x
            .wrapping_mul(0x9E37_79B1)
            ^ y.wrapping_mul(0x85EB_CA77)
            ^ c.wrapping_mul(0xC2B2_AE3D)
            ^ seed.wrapping_mul(0x27D4_EB2F);
        h ^= h >> 15;
        h = h.wrapping_mul(0x2C1B_3C6D);
        h ^= h >> 12;
        h = h.wrapping_mul(0x297A_2D39);
        h ^= h >> 15;
        (h >> 24) as u8
    };
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([hash(x, y, 0), hash(x, y, 1), hash(x, y, 2)])
    })
}

/// Plain background with `patch` copied at (x, y)
pub fn embed_rgb(width: u32, height: u32, patch: &RgbImage, x: u32, y: u32) -> RgbImage {
    let mut canvas = RgbImage::from_pixel(width, height, Rgb([128, 128, 128]));
    image::imageops::replace(&mut canvas, patch, x as i64, y as i64);
    canvas
}

pub fn write_reference(dir: &Path, name: &str, image: &RgbImage) -> PathBuf {
    let path = dir.join(name);
    image.save(&path).unwrap();
    path
}
