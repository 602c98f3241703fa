//! Pointer and key gestures forwarded to the host shell.
//!
//! Timestamps are milliseconds from any monotonic origin. Long presses are
//! detected by polling once per frame rather than with a timer.

use crate::constants::{DOUBLE_TAP_MS, LONG_PRESS_MS};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Gesture {
    DoubleTap,
    LongPress,
    /// The `h` key.
    ToggleKey,
}

impl Gesture {
    pub fn as_str(self) -> &'static str {
        match self {
            Gesture::DoubleTap => "doubleTap",
            Gesture::LongPress => "longPress",
            Gesture::ToggleKey => "toggleKey",
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct GestureTracker {
    last_down: Option<f64>,
    press_started: Option<f64>,
}

impl GestureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn down(&mut self, now_ms: f64) -> Option<Gesture> {
        let double = self
            .last_down
            .is_some_and(|prev| now_ms - prev < DOUBLE_TAP_MS);
        self.last_down = Some(now_ms);
        self.press_started = Some(now_ms);
        double.then_some(Gesture::DoubleTap)
    }

    /// Pointer up or leave: cancels a pending long press.
    pub fn up(&mut self) {
        self.press_started = None;
    }

    pub fn poll(&mut self, now_ms: f64) -> Option<Gesture> {
        match self.press_started {
            Some(start) if now_ms - start >= LONG_PRESS_MS => {
                self.press_started = None;
                Some(Gesture::LongPress)
            }
            _ => None,
        }
    }

    pub fn key(&self, key: &str) -> Option<Gesture> {
        key.eq_ignore_ascii_case("h").then_some(Gesture::ToggleKey)
    }
}
