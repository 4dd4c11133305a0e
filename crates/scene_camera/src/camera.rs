use glam::{Mat4, Vec3};
use settings::{CameraConfig, DistanceLimits, NavigationMode};
use tracing::{debug, warn};

use crate::{
    clock::{Clock, MonotonicClock},
    input::{
        translate_pointer_event, translate_wheel_event, Extent, InputTranslatorState,
        PointerEvent, TranslationContext,
    },
    log::{CameraState, Command, Pose, TemporalLog},
    mode::{ModeMachine, Scheduled},
    uniform::CameraPushConstants,
};

/// Extra history kept behind the render time before flushing, in milliseconds.
const FLUSH_SLACK_MS: f64 = 100.0;
/// Element-wise tolerance of the redraw check.
const MATRIX_TOLERANCE: f32 = 1e-5;

/// The camera controller. Owns the command log and the last rendered state.
///
/// Setters and input handlers enqueue commands at the clock's current time;
/// getters report the state computed by the most recent [`Camera::tick`].
/// Invalid values are logged and ignored, never returned as errors.
#[derive(Debug)]
pub struct Camera<C: Clock = MonotonicClock> {
    clock: C,
    config: CameraConfig,
    modes: ModeMachine,
    history: TemporalLog,
    input: InputTranslatorState,
    state: CameraState,
    surface: Extent,
    observed_surface: Option<Extent>,
}

impl Camera<MonotonicClock> {
    pub fn with_config(config: CameraConfig) -> Self {
        Self::new(config, MonotonicClock::new())
    }
}

impl Default for Camera<MonotonicClock> {
    fn default() -> Self {
        Self::with_config(CameraConfig::default())
    }
}

impl<C: Clock> Camera<C> {
    pub fn new(mut config: CameraConfig, clock: C) -> Self {
        for issue in config.sanitize() {
            warn!(%issue, "replacing invalid camera option with its default");
        }
        let limits = config.resolved_limits().unwrap_or_default();
        let initial = Pose::looking_at(
            Vec3::from(config.center),
            Vec3::from(config.eye),
            Vec3::from(config.up),
        );
        let history = TemporalLog::new(initial, limits);
        let state = history.state_at(clock.now_ms());
        let modes = ModeMachine::new(config.mode, Vec3::from(config.turntable_up.vector()));

        Self {
            clock,
            config,
            modes,
            history,
            input: InputTranslatorState::default(),
            state,
            surface: Extent::new(0, 0),
            observed_surface: None,
        }
    }

    /// Per-frame update. Returns `true` when the view matrix or the surface
    /// size changed since the previous tick, i.e. a redraw is warranted.
    pub fn tick(&mut self) -> bool {
        let now = self.clock.now_ms();
        let delay = self.config.delay;

        self.history.idle(now - delay);
        let next = self.history.state_at(now - 2.0 * delay);
        // Strictly behind the query above.
        self.history.flush(now - (FLUSH_SLACK_MS + 2.0 * delay));

        let moved = !next.matrix.abs_diff_eq(self.state.matrix, MATRIX_TOLERANCE);
        let resized = self.observed_surface != Some(self.surface);
        self.observed_surface = Some(self.surface);
        self.state = next;
        moved || resized
    }

    pub fn state(&self) -> &CameraState {
        &self.state
    }

    pub fn matrix(&self) -> Mat4 {
        self.state.matrix
    }

    pub fn center(&self) -> Vec3 {
        self.state.center
    }

    pub fn eye(&self) -> Vec3 {
        self.state.eye
    }

    pub fn up(&self) -> Vec3 {
        self.state.up
    }

    pub fn distance(&self) -> f32 {
        self.state.distance
    }

    pub fn distance_limits(&self) -> DistanceLimits {
        self.history.limits()
    }

    pub fn mode(&self) -> NavigationMode {
        self.modes.mode()
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    pub fn history(&self) -> &TemporalLog {
        &self.history
    }

    pub fn log_len(&self) -> usize {
        self.history.len()
    }

    pub fn surface_size(&self) -> Extent {
        self.surface
    }

    /// Record the host surface size; compared against the last observed size on the next tick.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.surface = Extent::new(width, height);
    }

    /// Switch navigation mode. Entering turntable mode animates `up` onto the
    /// configured vertical over the following 500ms.
    pub fn set_mode(&mut self, mode: NavigationMode) {
        let now = self.clock.now_ms();
        let current = self.history.state_at(now);
        for Scheduled { time, command } in self.modes.transition(mode, now, &current) {
            self.history.append(time, command);
        }
    }

    /// Like [`Camera::set_mode`], for a mode name such as `"turntable"`.
    /// Unknown names keep the current mode.
    pub fn set_mode_by_name(&mut self, name: &str) {
        match name.parse::<NavigationMode>() {
            Ok(mode) => self.set_mode(mode),
            Err(err) => warn!(%err, current = %self.modes.mode(), "keeping camera navigation mode"),
        }
    }

    /// Replace the distance limits. Ranges with `min <= 0` or `min > max` are
    /// rejected and the previous limits stay in force.
    pub fn set_distance_limits(&mut self, min: f32, max: f32) {
        match DistanceLimits::new(min, max) {
            Ok(limits) => {
                debug!(min, max, "camera distance limits changed");
                self.history.set_distance_limits(limits);
            }
            Err(err) => warn!(%err, "keeping previous camera distance limits"),
        }
    }

    pub fn set_matrix(&mut self, matrix: Mat4) {
        self.enqueue(Command::SetMatrix(matrix));
    }

    pub fn look_at(&mut self, center: Vec3, eye: Vec3, up: Vec3) {
        self.enqueue(Command::LookAt { center, eye, up });
    }

    /// Move the center, keeping the eye where it is.
    pub fn set_center(&mut self, center: Vec3) {
        let current = self.history.state_at(self.clock.now_ms());
        self.look_at(center, current.eye, current.up);
    }

    /// Move the eye, keeping the center where it is.
    pub fn set_eye(&mut self, eye: Vec3) {
        let current = self.history.state_at(self.clock.now_ms());
        self.look_at(current.center, eye, current.up);
    }

    pub fn set_up(&mut self, up: Vec3) {
        let current = self.history.state_at(self.clock.now_ms());
        self.look_at(current.center, current.eye, up);
    }

    pub fn set_distance(&mut self, distance: f32) {
        self.enqueue(Command::SetDistance(distance));
    }

    /// Rotate in the current mode's frame; angles in radians.
    pub fn rotate(&mut self, yaw: f32, pitch: f32, roll: f32) {
        self.enqueue(Command::Rotate {
            yaw,
            pitch,
            roll,
            frame: self.modes.rotation_frame(),
        });
    }

    /// Camera-space translation; `offset.z` is added to the distance.
    pub fn pan(&mut self, offset: Vec3) {
        self.enqueue(Command::Pan(offset));
    }

    /// Multiply the distance by `scale`.
    pub fn zoom(&mut self, scale: f32) {
        let distance = self.history.state_at(self.clock.now_ms()).distance;
        self.pan(Vec3::new(0.0, 0.0, distance * (scale - 1.0)));
    }

    /// Feed a pointer move. Returns whether a command was enqueued.
    pub fn on_pointer_move(&mut self, event: &PointerEvent) -> bool {
        if !self.accepts_input() {
            return false;
        }
        let now = self.clock.now_ms();
        let ctx = self.translation_context(now);
        match translate_pointer_event(&mut self.input, &ctx, event, now) {
            Some(command) => {
                self.history.append(now, command);
                true
            }
            None => false,
        }
    }

    /// Feed a wheel event in pixels (positive `dy` scrolls down / zooms out).
    pub fn on_wheel(&mut self, dx: f32, dy: f32) -> bool {
        if !self.accepts_input() {
            return false;
        }
        let now = self.clock.now_ms();
        let ctx = self.translation_context(now);
        match translate_wheel_event(&mut self.input, &ctx, dx, dy, now) {
            Some(command) => {
                self.history.append(now, command);
                true
            }
            None => false,
        }
    }

    pub fn push_constants(&self, projection: Mat4) -> CameraPushConstants {
        CameraPushConstants::new(&self.state, projection)
    }

    /// Whether input is interpreted in the current mode. While it is not, the
    /// translator forgets the cursor so the first move afterwards starts a new gesture.
    fn accepts_input(&mut self) -> bool {
        let live = self.modes.interprets_input();
        if !live {
            self.input.reset();
        }
        live
    }

    fn enqueue(&mut self, command: Command) {
        let now = self.clock.now_ms();
        self.history.append(now, command);
    }

    fn translation_context(&self, now: f64) -> TranslationContext {
        TranslationContext {
            mode: self.modes.mode(),
            frame: self.modes.rotation_frame(),
            distance: self.history.state_at(now).distance,
            viewport: self.surface,
            rotate_speed: self.config.rotate_speed,
            zoom_speed: self.config.zoom_speed,
            translate_speed: self.config.translate_speed,
            flip_x: self.config.flip_x,
            flip_y: self.config.flip_y,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        clock::ManualClock,
        input::{Modifiers, PointerButtons},
    };

    use super::*;

    fn camera(config: CameraConfig) -> (Camera<ManualClock>, ManualClock) {
        let clock = ManualClock::new(0.0);
        (Camera::new(config, clock.clone()), clock)
    }

    fn settle(camera: &mut Camera<ManualClock>, clock: &ManualClock) {
        for _ in 0..20 {
            clock.advance(16.0);
            camera.tick();
        }
    }

    #[test]
    fn defaults_describe_the_initial_view() {
        let (camera, _) = camera(CameraConfig::default());
        assert_eq!(camera.mode(), NavigationMode::Orbit);
        assert_eq!(camera.center(), Vec3::ZERO);
        assert!(camera.eye().abs_diff_eq(Vec3::new(0.0, 0.0, 10.0), 1e-4));
        assert_eq!(camera.up(), Vec3::Y);
        assert!((camera.distance() - 10.0).abs() < 1e-4);
        assert_eq!(camera.distance_limits(), DistanceLimits::default());
        assert_eq!(camera.log_len(), 0);
    }

    #[test]
    fn invalid_config_values_fall_back() {
        let (camera, _) = camera(CameraConfig {
            distance_limits: Some([5.0, 1.0]),
            rotate_speed: 0.0,
            ..CameraConfig::default()
        });
        assert_eq!(camera.distance_limits(), DistanceLimits::default());
        assert_eq!(camera.config().rotate_speed, 1.0);
    }

    #[test]
    fn first_tick_and_resize_are_dirty() {
        let (mut camera, clock) = camera(CameraConfig::default());
        assert!(camera.tick());
        clock.advance(16.0);
        assert!(!camera.tick());
        camera.resize(800, 600);
        clock.advance(16.0);
        assert!(camera.tick());
        clock.advance(16.0);
        assert!(!camera.tick());
        assert_eq!(camera.surface_size(), Extent::new(800, 600));
    }

    #[test]
    fn setters_reach_the_rendered_state() {
        let (mut camera, clock) = camera(CameraConfig::default());
        camera.set_center(Vec3::new(1.0, 0.0, 0.0));
        settle(&mut camera, &clock);
        assert!(camera.center().abs_diff_eq(Vec3::new(1.0, 0.0, 0.0), 1e-5));
        assert!(camera.eye().abs_diff_eq(Vec3::new(0.0, 0.0, 10.0), 1e-4));

        camera.set_distance(4.0);
        settle(&mut camera, &clock);
        assert!((camera.distance() - 4.0).abs() < 1e-4);

        camera.set_eye(Vec3::new(1.0, 0.0, 6.0));
        settle(&mut camera, &clock);
        assert!((camera.distance() - 6.0).abs() < 1e-4);

        camera.set_up(Vec3::new(1.0, 1.0, 0.0));
        settle(&mut camera, &clock);
        assert!(camera.up().abs_diff_eq(Vec3::new(1.0, 1.0, 0.0).normalize(), 1e-5));
    }

    #[test]
    fn zoom_multiplies_distance() {
        let (mut camera, clock) = camera(CameraConfig::default());
        camera.zoom(0.5);
        settle(&mut camera, &clock);
        assert!((camera.distance() - 5.0).abs() < 1e-3);
    }

    #[test]
    fn invalid_limits_are_rejected() {
        let (mut camera, _) = camera(CameraConfig::default());
        camera.set_distance_limits(2.0, 1.0);
        camera.set_distance_limits(0.0, 1.0);
        camera.set_distance_limits(f32::NAN, 1.0);
        assert_eq!(camera.distance_limits(), DistanceLimits::default());
        assert_eq!(camera.log_len(), 0);

        camera.set_distance_limits(1.0, 5.0);
        assert_eq!(camera.distance_limits().to_array(), [1.0, 5.0]);
        assert_eq!(camera.log_len(), 0);
    }

    #[test]
    fn loosened_limits_restore_the_requested_distance() {
        let (mut camera, clock) = camera(CameraConfig::default());
        camera.set_distance_limits(1.0, 5.0);
        settle(&mut camera, &clock);
        assert!((camera.distance() - 5.0).abs() < 1e-4);

        camera.set_distance_limits(1.0, 100.0);
        settle(&mut camera, &clock);
        assert!((camera.distance() - 10.0).abs() < 1e-3);
    }

    #[test]
    fn matrix_mode_ignores_pointer_input() {
        let (mut camera, clock) = camera(CameraConfig {
            mode: NavigationMode::Matrix,
            ..CameraConfig::default()
        });
        camera.resize(100, 100);
        let mut event = PointerEvent {
            buttons: PointerButtons::PRIMARY,
            x: 0.0,
            y: 0.0,
            modifiers: Modifiers::default(),
        };
        assert!(!camera.on_pointer_move(&event));
        clock.advance(5.0);
        event.x = 30.0;
        assert!(!camera.on_pointer_move(&event));
        assert!(!camera.on_wheel(0.0, 100.0));
        assert_eq!(camera.log_len(), 0);
    }

    #[test]
    fn leaving_matrix_mode_starts_a_fresh_gesture() {
        let (mut camera, clock) = camera(CameraConfig {
            mode: NavigationMode::Matrix,
            ..CameraConfig::default()
        });
        camera.resize(100, 100);
        let mut event = PointerEvent {
            buttons: PointerButtons::PRIMARY,
            x: 0.0,
            y: 0.0,
            modifiers: Modifiers::default(),
        };
        assert!(!camera.on_pointer_move(&event));

        camera.set_mode(NavigationMode::Orbit);
        clock.advance(16.0);
        event.x = 40.0;
        assert!(!camera.on_pointer_move(&event));
        clock.advance(16.0);
        event.x = 50.0;
        assert!(camera.on_pointer_move(&event));
        assert_eq!(camera.log_len(), 1);
    }

    #[test]
    fn orbit_drag_moves_the_eye() {
        let (mut camera, clock) = camera(CameraConfig::default());
        camera.resize(100, 100);
        let mut event = PointerEvent {
            buttons: PointerButtons::PRIMARY,
            x: 50.0,
            y: 50.0,
            modifiers: Modifiers::default(),
        };
        camera.on_pointer_move(&event);
        for _ in 0..5 {
            clock.advance(16.0);
            event.x += 5.0;
            assert!(camera.on_pointer_move(&event));
        }
        settle(&mut camera, &clock);
        // Dragging right swings the eye left around the center.
        assert!(camera.eye().x < -1.0);
        assert!((camera.distance() - 10.0).abs() < 1e-3);
    }

    #[test]
    fn set_matrix_is_reproduced_and_decomposed() {
        let (mut camera, clock) = camera(CameraConfig::default());
        let matrix = Mat4::look_at_rh(Vec3::new(4.0, 4.0, 4.0), Vec3::ZERO, Vec3::Z);
        camera.set_mode(NavigationMode::Matrix);
        camera.set_matrix(matrix);
        settle(&mut camera, &clock);
        assert_eq!(camera.matrix(), matrix);
        assert!(camera.eye().abs_diff_eq(Vec3::new(4.0, 4.0, 4.0), 1e-4));

        // Leaving matrix mode, orbit interpretation continues from the decomposed view.
        camera.set_mode(NavigationMode::Orbit);
        camera.rotate(0.0, 0.0, 0.0);
        settle(&mut camera, &clock);
        assert!(camera.matrix().abs_diff_eq(matrix, 1e-4));
    }

    #[test]
    fn push_constants_follow_the_state() {
        let (mut camera, _) = camera(CameraConfig::default());
        camera.tick();
        let block = camera.push_constants(Mat4::IDENTITY);
        assert_eq!(block.view, camera.matrix().to_cols_array_2d());
        assert!((block.eye[3] - camera.distance()).abs() < 1e-6);
    }
}
