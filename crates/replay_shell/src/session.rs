//! Scripted input sessions replayed against a simulated clock.

use glam::Vec3;
use scene_camera::{Camera, CameraState, Clock, Modifiers, PointerButtons, PointerEvent};
use serde::{Deserialize, Serialize};
use settings::CameraConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Session {
    pub config: CameraConfig,
    pub viewport: [u32; 2],
    pub frame_ms: f64,
    pub duration_ms: f64,
    pub events: Vec<TimedEvent>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            config: CameraConfig::default(),
            viewport: [800, 600],
            frame_ms: 16.0,
            duration_ms: 1_000.0,
            events: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimedEvent {
    /// Milliseconds from the start of the session.
    pub at: f64,
    #[serde(flatten)]
    pub event: InputEvent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputEvent {
    Pointer {
        buttons: u8,
        x: f32,
        y: f32,
        #[serde(default)]
        ctrl: bool,
        #[serde(default)]
        alt: bool,
        #[serde(default)]
        shift: bool,
    },
    Wheel {
        dx: f32,
        dy: f32,
    },
    Mode {
        mode: String,
    },
    Resize {
        width: u32,
        height: u32,
    },
    LookAt {
        center: [f32; 3],
        eye: [f32; 3],
        up: [f32; 3],
    },
    DistanceLimits {
        min: f32,
        max: f32,
    },
}

impl InputEvent {
    pub fn apply<C: Clock>(&self, camera: &mut Camera<C>) {
        match self {
            InputEvent::Pointer {
                buttons,
                x,
                y,
                ctrl,
                alt,
                shift,
            } => {
                camera.on_pointer_move(&PointerEvent {
                    buttons: PointerButtons(*buttons),
                    x: *x,
                    y: *y,
                    modifiers: Modifiers {
                        ctrl: *ctrl,
                        alt: *alt,
                        shift: *shift,
                    },
                });
            }
            InputEvent::Wheel { dx, dy } => {
                camera.on_wheel(*dx, *dy);
            }
            InputEvent::Mode { mode } => camera.set_mode_by_name(mode),
            InputEvent::Resize { width, height } => camera.resize(*width, *height),
            InputEvent::LookAt { center, eye, up } => {
                camera.look_at(Vec3::from(*center), Vec3::from(*eye), Vec3::from(*up))
            }
            InputEvent::DistanceLimits { min, max } => camera.set_distance_limits(*min, *max),
        }
    }
}

/// One rendered frame, printed as a JSON line.
#[derive(Debug, Clone, Serialize)]
pub struct FrameRecord {
    pub t: f64,
    pub dirty: bool,
    pub mode: String,
    #[serde(flatten)]
    pub state: CameraState,
}

impl FrameRecord {
    pub fn capture<C: Clock>(t: f64, dirty: bool, camera: &Camera<C>) -> Self {
        Self {
            t,
            dirty,
            mode: camera.mode().to_string(),
            state: *camera.state(),
        }
    }
}

/// Built-in session: an orbit drag, a wheel zoom, then a switch to turntable.
pub fn demo(config: CameraConfig) -> Session {
    let mut events = Vec::new();
    events.push(TimedEvent {
        at: 0.0,
        event: InputEvent::Pointer {
            buttons: 0,
            x: 400.0,
            y: 300.0,
            ctrl: false,
            alt: false,
            shift: false,
        },
    });
    for step in 0..12 {
        events.push(TimedEvent {
            at: 50.0 + 16.0 * step as f64,
            event: InputEvent::Pointer {
                buttons: 1,
                x: 400.0 + 8.0 * step as f32,
                y: 300.0 + 2.0 * step as f32,
                ctrl: false,
                alt: false,
                shift: false,
            },
        });
    }
    events.push(TimedEvent {
        at: 300.0,
        event: InputEvent::Pointer {
            buttons: 0,
            x: 488.0,
            y: 322.0,
            ctrl: false,
            alt: false,
            shift: false,
        },
    });
    for step in 0..4 {
        events.push(TimedEvent {
            at: 450.0 + 16.0 * step as f64,
            event: InputEvent::Wheel { dx: 0.0, dy: 100.0 },
        });
    }
    events.push(TimedEvent {
        at: 700.0,
        event: InputEvent::Mode {
            mode: "turntable".into(),
        },
    });

    Session {
        config,
        duration_ms: 1_400.0,
        events,
        ..Session::default()
    }
}
