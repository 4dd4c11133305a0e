//! Navigation mode state machine.
//!
//! Switching modes is not a plain field write: entering turntable mode
//! schedules an animated swing of the up vector onto the configured vertical.

use glam::Vec3;
use settings::NavigationMode;
use tracing::debug;

use crate::log::{CameraState, Command, RotationFrame};

/// Duration of the up-vector reorientation when entering turntable mode.
pub const TURNTABLE_TRANSITION_MS: f64 = 500.0;

/// A command to append at a given time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scheduled {
    pub time: f64,
    pub command: Command,
}

#[derive(Debug, Clone)]
pub struct ModeMachine {
    mode: NavigationMode,
    vertical: Vec3,
}

impl ModeMachine {
    pub fn new(mode: NavigationMode, vertical: Vec3) -> Self {
        Self {
            mode,
            vertical: vertical.try_normalize().unwrap_or(Vec3::Z),
        }
    }

    pub fn mode(&self) -> NavigationMode {
        self.mode
    }

    pub fn rotation_frame(&self) -> RotationFrame {
        match self.mode {
            NavigationMode::Turntable => RotationFrame::Turntable,
            _ => RotationFrame::Trackball,
        }
    }

    /// Pointer and wheel input is ignored while the matrix is assigned directly.
    pub fn interprets_input(&self) -> bool {
        self.mode != NavigationMode::Matrix
    }

    /// Switch to `to` and return the commands the switch schedules.
    ///
    /// `current` is the camera state at `now`. Entering turntable mode anchors
    /// the current view at `now` and reaches the vertical up at
    /// `now + TURNTABLE_TRANSITION_MS`; leaving it anchors the view so any
    /// transition still in flight stops where it is.
    pub fn transition(
        &mut self,
        to: NavigationMode,
        now: f64,
        current: &CameraState,
    ) -> Vec<Scheduled> {
        let from = self.mode;
        if to == from {
            return Vec::new();
        }
        self.mode = to;
        debug!(%from, %to, "camera navigation mode changed");

        let anchor = Scheduled {
            time: now,
            command: Command::LookAt {
                center: current.center,
                eye: current.eye,
                up: current.up,
            },
        };
        match to {
            NavigationMode::Turntable => vec![
                anchor,
                Scheduled {
                    time: now + TURNTABLE_TRANSITION_MS,
                    command: Command::LookAt {
                        center: current.center,
                        eye: current.eye,
                        up: self.vertical,
                    },
                },
            ],
            _ if from == NavigationMode::Turntable => vec![anchor],
            _ => Vec::new(),
        }
    }
}
