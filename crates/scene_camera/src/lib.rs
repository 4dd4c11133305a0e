//! Damped orbit / turntable / pan camera controller for an interactive 3D viewport.
//!
//! Input handlers append timestamped intents to a [`TemporalLog`]; the host
//! render loop calls [`Camera::tick`] once per frame, which reconstructs the
//! view slightly behind real time so the log can smooth jittery input, and
//! reports whether a redraw is needed.

mod camera;
pub mod clock;
pub mod input;
pub mod log;
pub mod math;
pub mod mode;
pub mod uniform;
#[cfg(feature = "winit")]
pub mod winit_input;

pub use camera::Camera;
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use input::{
    translate_pointer_event, translate_wheel_event, Extent, Gesture, InputTranslatorState,
    Modifiers, PointerButtons, PointerEvent, TranslationContext,
};
pub use log::{CameraState, Command, Pose, RotationFrame, TemporalLog};
pub use mode::{ModeMachine, TURNTABLE_TRANSITION_MS};
pub use settings::{CameraConfig, ConfigError, DistanceLimits, NavigationMode, VerticalAxis};
pub use uniform::CameraPushConstants;
#[cfg(feature = "winit")]
pub use winit_input::WinitInput;
