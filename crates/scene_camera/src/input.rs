//! Pointer and wheel translation into log commands.
//!
//! Deltas are normalised by the viewport so interaction speed does not depend
//! on the surface's pixel density.

use std::f32::consts::PI;

use glam::{Vec2, Vec3};
use settings::NavigationMode;
use tracing::trace;

use crate::log::{Command, RotationFrame};

/// Zoom exponent per normalised unit of motion per millisecond.
const ZOOM_TIME_SCALE: f32 = 1.0 / 20.0;
/// Interval assumed for the first event of a gesture.
const DEFAULT_EVENT_INTERVAL_MS: f64 = 16.0;
/// Upper bound on the interval fed into time-scaled zoom.
const MAX_EVENT_INTERVAL_MS: f64 = 100.0;

/// Pressed pointer buttons, DOM-style bitmask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointerButtons(pub u8);

impl PointerButtons {
    pub const NONE: Self = Self(0);
    pub const PRIMARY: Self = Self(1);
    pub const SECONDARY: Self = Self(2);
    pub const MIDDLE: Self = Self(4);

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub buttons: PointerButtons,
    /// Position in surface pixels.
    pub x: f32,
    pub y: f32,
    pub modifiers: Modifiers,
}

/// Surface size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    fn width_f32(self) -> f32 {
        self.width.max(1) as f32
    }

    fn height_f32(self) -> f32 {
        self.height.max(1) as f32
    }
}

/// What a drag does, before scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    Rotate,
    Pan,
    Zoom,
}

/// Everything the translator reads from the camera for one event.
#[derive(Debug, Clone, Copy)]
pub struct TranslationContext {
    pub mode: NavigationMode,
    pub frame: RotationFrame,
    /// Current eye-center distance; pan and zoom scale with it.
    pub distance: f32,
    pub viewport: Extent,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub translate_speed: f32,
    pub flip_x: bool,
    pub flip_y: bool,
}

impl TranslationContext {
    fn flip_x_sign(&self) -> f32 {
        if self.flip_x {
            1.0
        } else {
            -1.0
        }
    }

    fn flip_y_sign(&self) -> f32 {
        if self.flip_y {
            1.0
        } else {
            -1.0
        }
    }
}

/// Pointer bookkeeping carried between events.
#[derive(Debug, Clone, Default)]
pub struct InputTranslatorState {
    last_position: Option<Vec2>,
    last_buttons: PointerButtons,
    last_pointer_ms: Option<f64>,
    last_wheel_ms: Option<f64>,
}

impl InputTranslatorState {
    pub fn last_position(&self) -> Option<Vec2> {
        self.last_position
    }

    /// Forget the cursor so the next move starts a fresh gesture.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Which gesture a pressed-button combination performs in `mode`.
pub fn classify(
    buttons: PointerButtons,
    modifiers: Modifiers,
    mode: NavigationMode,
) -> Option<Gesture> {
    if buttons.is_empty() || mode == NavigationMode::Matrix {
        return None;
    }
    let primary = buttons.contains(PointerButtons::PRIMARY);
    if primary && modifiers.shift {
        return Some(Gesture::Rotate);
    }
    if buttons.contains(PointerButtons::MIDDLE) || (primary && modifiers.alt) {
        return Some(Gesture::Zoom);
    }
    if buttons.contains(PointerButtons::SECONDARY)
        || (primary && modifiers.ctrl)
        || mode == NavigationMode::Pan
    {
        return Some(Gesture::Pan);
    }
    primary.then_some(Gesture::Rotate)
}

fn elapsed_since(last: Option<f64>, now_ms: f64) -> f32 {
    last.map_or(DEFAULT_EVENT_INTERVAL_MS, |last| {
        (now_ms - last).clamp(0.0, MAX_EVENT_INTERVAL_MS)
    }) as f32
}

fn zoom_command(distance: f32, exponent: f32) -> Command {
    Command::Pan(Vec3::new(0.0, 0.0, distance * (exponent.exp() - 1.0)))
}

/// Translate a pointer move into at most one command.
pub fn translate_pointer_event(
    state: &mut InputTranslatorState,
    ctx: &TranslationContext,
    event: &PointerEvent,
    now_ms: f64,
) -> Option<Command> {
    let position = Vec2::new(event.x, event.y);
    let previous = state.last_position.replace(position);
    let elapsed = elapsed_since(state.last_pointer_ms, now_ms);
    let pressed_before = state.last_buttons;
    state.last_pointer_ms = Some(now_ms);
    state.last_buttons = event.buttons;

    // A press starts a new gesture from the current position.
    let previous = previous.filter(|_| !pressed_before.is_empty())?;
    let gesture = classify(event.buttons, event.modifiers, ctx.mode)?;

    let height = ctx.viewport.height_f32();
    let dx = (position.x - previous.x) / height;
    let dy = (position.y - previous.y) / height;
    if dx == 0.0 && dy == 0.0 {
        return None;
    }

    let command = match gesture {
        Gesture::Rotate => {
            let angle = ctx.rotate_speed * PI;
            Command::Rotate {
                yaw: ctx.flip_x_sign() * angle * dx,
                pitch: -ctx.flip_y_sign() * angle * dy,
                roll: 0.0,
                frame: ctx.frame,
            }
        }
        Gesture::Pan => {
            let scale = ctx.translate_speed * ctx.distance;
            Command::Pan(Vec3::new(-scale * dx, scale * dy, 0.0))
        }
        Gesture::Zoom => zoom_command(
            ctx.distance,
            -ctx.zoom_speed * dy * elapsed * ZOOM_TIME_SCALE,
        ),
    };
    trace!(?gesture, dx, dy, "pointer drag");
    Some(command)
}

/// Translate a wheel event. Mostly-horizontal scrolls roll about the view
/// axis, everything else zooms.
pub fn translate_wheel_event(
    state: &mut InputTranslatorState,
    ctx: &TranslationContext,
    dx: f32,
    dy: f32,
    now_ms: f64,
) -> Option<Command> {
    let elapsed = elapsed_since(state.last_wheel_ms, now_ms);
    state.last_wheel_ms = Some(now_ms);
    if ctx.mode == NavigationMode::Matrix || !(dx.is_finite() && dy.is_finite()) {
        return None;
    }

    if dx.abs() > dy.abs() {
        if ctx.frame == RotationFrame::Turntable {
            return None;
        }
        let roll = -dx * ctx.flip_x_sign() * PI * ctx.rotate_speed / ctx.viewport.width_f32();
        return Some(Command::Rotate {
            yaw: 0.0,
            pitch: 0.0,
            roll,
            frame: ctx.frame,
        });
    }
    if dy == 0.0 {
        return None;
    }
    let exponent =
        -ctx.zoom_speed * ctx.flip_y_sign() * dy / ctx.viewport.height_f32() * elapsed
            * ZOOM_TIME_SCALE;
    Some(zoom_command(ctx.distance, exponent))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(mode: NavigationMode) -> TranslationContext {
        TranslationContext {
            mode,
            frame: RotationFrame::Trackball,
            distance: 10.0,
            viewport: Extent::new(200, 100),
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            translate_speed: 1.0,
            flip_x: false,
            flip_y: false,
        }
    }

    fn event(buttons: PointerButtons, x: f32, y: f32) -> PointerEvent {
        PointerEvent {
            buttons,
            x,
            y,
            modifiers: Modifiers::default(),
        }
    }

    /// Press at the origin, then drag to `(x, y)`.
    fn drag(ctx: &TranslationContext, buttons: PointerButtons, x: f32, y: f32) -> Option<Command> {
        let mut state = InputTranslatorState::default();
        assert_eq!(
            translate_pointer_event(&mut state, ctx, &event(buttons, 0.0, 0.0), 0.0),
            None
        );
        translate_pointer_event(&mut state, ctx, &event(buttons, x, y), 16.0)
    }

    fn pan_x(command: Option<Command>) -> f32 {
        match command {
            Some(Command::Pan(offset)) => offset.x,
            other => panic!("expected pan, got {other:?}"),
        }
    }

    #[test]
    fn classification_table() {
        let none = Modifiers::default();
        let shift = Modifiers {
            shift: true,
            ..none
        };
        let ctrl = Modifiers { ctrl: true, ..none };
        let alt = Modifiers { alt: true, ..none };
        use NavigationMode::*;
        use PointerButtons as B;

        assert_eq!(classify(B::PRIMARY, none, Orbit), Some(Gesture::Rotate));
        assert_eq!(classify(B::PRIMARY, none, Turntable), Some(Gesture::Rotate));
        assert_eq!(classify(B::PRIMARY, none, Pan), Some(Gesture::Pan));
        assert_eq!(classify(B::PRIMARY, shift, Pan), Some(Gesture::Rotate));
        assert_eq!(classify(B::PRIMARY, ctrl, Orbit), Some(Gesture::Pan));
        assert_eq!(classify(B::SECONDARY, none, Orbit), Some(Gesture::Pan));
        assert_eq!(classify(B::MIDDLE, none, Orbit), Some(Gesture::Zoom));
        assert_eq!(classify(B::PRIMARY, alt, Orbit), Some(Gesture::Zoom));
        assert_eq!(classify(B::NONE, shift, Orbit), None);
        assert_eq!(classify(B::PRIMARY, shift, Matrix), None);
    }

    #[test]
    fn hover_only_tracks_the_cursor() {
        let mut state = InputTranslatorState::default();
        let c = ctx(NavigationMode::Orbit);
        for (i, x) in [0.0, 10.0, 30.0].into_iter().enumerate() {
            let hover = event(PointerButtons::NONE, x, 5.0);
            let out = translate_pointer_event(&mut state, &c, &hover, i as f64);
            assert_eq!(out, None);
        }
        assert_eq!(state.last_position(), Some(Vec2::new(30.0, 5.0)));
    }

    #[test]
    fn pan_scales_with_distance_and_speed() {
        let mut c = ctx(NavigationMode::Pan);
        // dx = 10 px / 100 px height = 0.1
        let base = pan_x(drag(&c, PointerButtons::PRIMARY, 10.0, 0.0));
        assert!((base.abs() - 10.0 * 0.1 * 1.0).abs() < 1e-5);

        c.distance = 20.0;
        let far = pan_x(drag(&c, PointerButtons::PRIMARY, 10.0, 0.0));
        assert!((far / base - 2.0).abs() < 1e-5);

        c.distance = 10.0;
        c.translate_speed = 3.0;
        let fast = pan_x(drag(&c, PointerButtons::PRIMARY, 10.0, 0.0));
        assert!((fast / base - 3.0).abs() < 1e-5);

        c.translate_speed = 1.0;
        let wide = pan_x(drag(&c, PointerButtons::PRIMARY, 20.0, 0.0));
        assert!((wide / base - 2.0).abs() < 1e-5);
    }

    #[test]
    fn rotate_uses_speed_and_flips() {
        let mut c = ctx(NavigationMode::Orbit);
        let Some(Command::Rotate { yaw, pitch, roll, .. }) =
            drag(&c, PointerButtons::PRIMARY, 10.0, 5.0)
        else {
            panic!("expected rotate");
        };
        assert!((yaw + PI * 0.1).abs() < 1e-5);
        assert!((pitch - PI * 0.05).abs() < 1e-5);
        assert_eq!(roll, 0.0);

        c.flip_x = true;
        c.rotate_speed = 2.0;
        let Some(Command::Rotate { yaw, .. }) = drag(&c, PointerButtons::PRIMARY, 10.0, 5.0)
        else {
            panic!("expected rotate");
        };
        assert!((yaw - 2.0 * PI * 0.1).abs() < 1e-5);
    }

    #[test]
    fn pointer_zoom_is_exponential_in_drag() {
        let c = ctx(NavigationMode::Orbit);
        let Some(Command::Pan(down)) = drag(&c, PointerButtons::MIDDLE, 0.0, 10.0) else {
            panic!("expected zoom");
        };
        assert_eq!((down.x, down.y), (0.0, 0.0));
        // Dragging down zooms in.
        assert!(down.z < 0.0);
        let Some(Command::Pan(up)) = drag(&c, PointerButtons::MIDDLE, 0.0, -10.0) else {
            panic!("expected zoom");
        };
        assert!(up.z > 0.0);
        assert!(((10.0 + down.z) * (10.0 + up.z) - 100.0).abs() < 1e-3);
    }

    #[test]
    fn matrix_mode_suspends_translation() {
        let c = ctx(NavigationMode::Matrix);
        assert_eq!(drag(&c, PointerButtons::PRIMARY, 10.0, 10.0), None);
        let mut state = InputTranslatorState::default();
        assert_eq!(translate_wheel_event(&mut state, &c, 0.0, 50.0, 0.0), None);
    }

    #[test]
    fn wheel_rolls_or_zooms() {
        let c = ctx(NavigationMode::Orbit);
        let mut state = InputTranslatorState::default();
        let Some(Command::Rotate { roll, yaw, pitch, .. }) =
            translate_wheel_event(&mut state, &c, 40.0, 5.0, 0.0)
        else {
            panic!("expected roll");
        };
        assert_eq!((yaw, pitch), (0.0, 0.0));
        assert!((roll - 40.0 * PI / 200.0).abs() < 1e-5);

        let Some(Command::Pan(out)) = translate_wheel_event(&mut state, &c, 0.0, 10.0, 16.0) else {
            panic!("expected zoom");
        };
        assert!(out.z > 0.0);

        // No time elapsed since the previous wheel event: no zoom.
        let Some(Command::Pan(none)) = translate_wheel_event(&mut state, &c, 0.0, 10.0, 16.0)
        else {
            panic!("expected zoom");
        };
        assert_eq!(none.z, 0.0);
    }

    #[test]
    fn turntable_ignores_wheel_roll() {
        let mut c = ctx(NavigationMode::Turntable);
        c.frame = RotationFrame::Turntable;
        let mut state = InputTranslatorState::default();
        assert_eq!(translate_wheel_event(&mut state, &c, 40.0, 0.0, 0.0), None);
    }

    #[test]
    fn zero_height_viewport_stays_finite() {
        let mut c = ctx(NavigationMode::Orbit);
        c.viewport = Extent::new(0, 0);
        let Some(Command::Rotate { yaw, pitch, .. }) = drag(&c, PointerButtons::PRIMARY, 3.0, 4.0)
        else {
            panic!("expected rotate");
        };
        assert!(yaw.is_finite() && pitch.is_finite());
    }
}
