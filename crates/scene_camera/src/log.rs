//! Temporal command log and the damped recalculator that reads it.
//!
//! Every command is resolved against the state at its own timestamp and stored
//! together with the absolute [`Pose`] it produces. Reading the camera at an
//! arbitrary time blends the stored poses with a piecewise cubic Hermite curve:
//! motion entries (rotate/pan) carry Catmull-Rom tangents so a drag reads as one
//! continuous gesture, while rest entries (idle samples and absolute commands)
//! have zero tangents so motion eases in and out of them.

use std::{collections::VecDeque, f32::consts::PI};

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};
use settings::DistanceLimits;
use tracing::{trace, warn};

use crate::math::{self, hermite_basis, DEGENERATE_LENGTH_SQ};

/// Smallest distance a pose stores; output is clamped into the live limits anyway.
const MIN_STORED_DISTANCE: f32 = 1e-6;
/// Closest a turntable rotation may tilt towards either pole, in radians.
const POLE_MARGIN: f32 = 1e-3;
/// Entries older than the flush horizon that survive a flush.
const RETAINED_BEFORE_HORIZON: usize = 2;
const MIN_MATRIX_DETERMINANT: f32 = 1e-12;

const POSE_DIM: usize = 11;
type Coords = [f32; POSE_DIM];

/// How a rotate command turns the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationFrame {
    /// Free rotation about the camera's own axes; the declared up follows.
    Trackball,
    /// Yaw about the declared up, pitch limited short of the poles, no roll.
    Turntable,
}

/// A camera intent appended to the log.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Angles in radians. Positive yaw swings the eye to the right, positive
    /// pitch lifts it, positive roll turns about the view axis.
    Rotate {
        yaw: f32,
        pitch: f32,
        roll: f32,
        frame: RotationFrame,
    },
    /// Camera-space translation of the center; `z` is added to the distance.
    Pan(Vec3),
    LookAt {
        center: Vec3,
        eye: Vec3,
        up: Vec3,
    },
    SetDistance(f32),
    /// World-to-view matrix.
    SetMatrix(Mat4),
    SetDistanceLimits(DistanceLimits),
}

impl Command {
    pub fn kind(&self) -> &'static str {
        match self {
            Command::Rotate { .. } => "rotate",
            Command::Pan(_) => "pan",
            Command::LookAt { .. } => "lookAt",
            Command::SetDistance(_) => "setDistance",
            Command::SetMatrix(_) => "setMatrix",
            Command::SetDistanceLimits(_) => "setDistanceLimits",
        }
    }

    /// Motion commands are smoothed through; everything else pins the pose.
    pub fn is_motion(&self) -> bool {
        matches!(self, Command::Rotate { .. } | Command::Pan(_))
    }

    fn is_finite(&self) -> bool {
        match *self {
            Command::Rotate {
                yaw, pitch, roll, ..
            } => yaw.is_finite() && pitch.is_finite() && roll.is_finite(),
            Command::Pan(offset) => offset.is_finite(),
            Command::LookAt { center, eye, up } => {
                center.is_finite() && eye.is_finite() && up.is_finite()
            }
            Command::SetDistance(distance) => distance.is_finite(),
            Command::SetMatrix(matrix) => matrix.is_finite(),
            Command::SetDistanceLimits(_) => true,
        }
    }
}

/// Absolute camera placement stored with each log entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub center: Vec3,
    /// Camera-to-world rotation; the camera looks down its local `-Z`.
    pub rotation: Quat,
    /// Declared up vector. The turntable spins about it; it need not be
    /// orthogonal to the view direction.
    pub up: Vec3,
    /// Natural log of the eye-center distance, so zoom blends multiplicatively.
    pub log_distance: f32,
}

impl Pose {
    pub fn looking_at(center: Vec3, eye: Vec3, up: Vec3) -> Self {
        let offset = eye - center;
        let rotation = math::look_rotation(offset, up, Vec3::Y, Quat::IDENTITY);
        Self {
            center,
            rotation,
            up: up.try_normalize().unwrap_or(rotation * Vec3::Y),
            log_distance: offset.length().max(MIN_STORED_DISTANCE).ln(),
        }
    }

    pub fn distance(&self) -> f32 {
        self.log_distance.exp()
    }

    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    pub fn camera_up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    /// Unit vector from the center towards the eye.
    pub fn back(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }

    fn with_distance(mut self, distance: f32) -> Self {
        self.log_distance = distance.max(MIN_STORED_DISTANCE).ln();
        self
    }

    fn clamped(self, limits: &DistanceLimits) -> Self {
        let distance = self.distance();
        let clamped = limits.clamp(distance);
        if clamped == distance {
            self
        } else {
            self.with_distance(clamped)
        }
    }

    /// Resolve `command` against this pose. `None` for payloads that cannot
    /// produce a valid pose (non-finite values, singular matrices).
    pub fn apply(&self, command: &Command) -> Option<Pose> {
        if !command.is_finite() {
            warn!(kind = command.kind(), "ignoring camera command with non-finite payload");
            return None;
        }

        let mut next = *self;
        match *command {
            Command::Rotate {
                yaw,
                pitch,
                roll,
                frame: RotationFrame::Trackball,
            } => {
                let delta = Quat::from_axis_angle(self.camera_up(), yaw)
                    * Quat::from_axis_angle(self.right(), -pitch)
                    * Quat::from_axis_angle(self.back(), roll);
                next.rotation = (delta * self.rotation).normalize();
                next.up = (delta * self.up).try_normalize().unwrap_or(self.up);
            }
            Command::Rotate {
                yaw,
                pitch,
                frame: RotationFrame::Turntable,
                ..
            } => {
                let axis = self.up;
                let back = self.back();
                // 0 when the eye sits on the axis above the center.
                let elevation = back.dot(axis).clamp(-1.0, 1.0).acos();
                let lo = POLE_MARGIN.min(elevation);
                let hi = (PI - POLE_MARGIN).max(elevation);
                let applied = elevation - (elevation - pitch).clamp(lo, hi);

                let right = axis
                    .cross(back)
                    .try_normalize()
                    .unwrap_or_else(|| self.right());
                let swung = (Quat::from_axis_angle(axis, yaw)
                    * Quat::from_axis_angle(right, -applied)
                    * self.rotation)
                    .normalize();
                next.rotation =
                    math::look_rotation(swung * Vec3::Z, axis, swung * Vec3::Y, swung);
            }
            Command::Pan(offset) => {
                next.center = self.center + self.right() * offset.x + self.camera_up() * offset.y;
                next = next.with_distance(self.distance() + offset.z);
            }
            Command::LookAt { center, eye, up } => {
                let offset = eye - center;
                next.center = center;
                next.rotation =
                    math::look_rotation(offset, up, self.camera_up(), self.rotation);
                next.up = up.try_normalize().unwrap_or(self.up);
                next = next.with_distance(offset.length());
            }
            Command::SetDistance(distance) => {
                next = next.with_distance(distance);
            }
            Command::SetMatrix(matrix) => {
                if matrix.determinant().abs() < MIN_MATRIX_DETERMINANT {
                    warn!("ignoring singular camera matrix");
                    return None;
                }
                let inverse = matrix.inverse();
                let eye = inverse.w_axis.truncate();
                let rotation = math::look_rotation(
                    inverse.z_axis.truncate(),
                    inverse.y_axis.truncate(),
                    self.camera_up(),
                    self.rotation,
                );
                next.rotation = rotation;
                next.center = eye - rotation * Vec3::Z * self.distance();
                next.up = rotation * Vec3::Y;
            }
            // Limits constrain output only; the stored distance is kept.
            Command::SetDistanceLimits(_) => {}
        }
        Some(next)
    }

    /// Derive the renderable state, clamping the distance into `limits`.
    pub fn state(&self, limits: &DistanceLimits) -> CameraState {
        let distance = limits.clamp(self.distance());
        let eye = self.center + self.back() * distance;
        CameraState {
            center: self.center,
            eye,
            up: self.up,
            distance,
            matrix: math::view_matrix(eye, self.center, self.camera_up()),
        }
    }

    fn to_coords(self) -> Coords {
        let Pose {
            center: c,
            up: u,
            rotation: q,
            log_distance,
        } = self;
        [
            c.x,
            c.y,
            c.z,
            u.x,
            u.y,
            u.z,
            q.x,
            q.y,
            q.z,
            q.w,
            log_distance,
        ]
    }

    /// Rebuild a pose from blended coordinates, keeping `fallback`'s value for
    /// any component that came out degenerate.
    fn from_coords(coords: &Coords, fallback: &Pose) -> Pose {
        let center = Vec3::new(coords[0], coords[1], coords[2]);
        let up = Vec3::new(coords[3], coords[4], coords[5]);
        let rotation = Quat::from_xyzw(coords[6], coords[7], coords[8], coords[9]);
        let log_distance = coords[10];

        Pose {
            center: if center.is_finite() {
                center
            } else {
                fallback.center
            },
            rotation: if rotation.is_finite() && rotation.length_squared() > DEGENERATE_LENGTH_SQ
            {
                rotation.normalize()
            } else {
                fallback.rotation
            },
            up: up.try_normalize().unwrap_or(fallback.up),
            log_distance: if log_distance.is_finite() {
                log_distance
            } else {
                fallback.log_distance
            },
        }
    }
}

/// Camera state derived at a query time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraState {
    pub center: Vec3,
    pub eye: Vec3,
    pub up: Vec3,
    /// Always inside the distance limits in force when the state was derived.
    pub distance: f32,
    pub matrix: Mat4,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// Milliseconds on the controller's clock.
    pub time: f64,
    /// `None` for idle samples.
    pub command: Option<Command>,
    pub pose: Pose,
}

impl Entry {
    fn is_rest(&self) -> bool {
        self.command.map_or(true, |command| !command.is_motion())
    }
}

/// Append-only, time-ordered record of camera intents bounded by a flush horizon.
#[derive(Debug, Clone)]
pub struct TemporalLog {
    initial: Pose,
    entries: VecDeque<Entry>,
    limits: DistanceLimits,
}

impl TemporalLog {
    pub fn new(initial: Pose, limits: DistanceLimits) -> Self {
        Self {
            initial,
            entries: VecDeque::with_capacity(64),
            limits,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    pub fn last_time(&self) -> Option<f64> {
        self.entries.back().map(|entry| entry.time)
    }

    pub fn limits(&self) -> DistanceLimits {
        self.limits
    }

    /// Record `command` at `time`. Entries scheduled after `time` are superseded.
    ///
    /// [`Command::SetDistanceLimits`] is not recorded: it replaces the live
    /// limits and leaves every entry, scheduled ones included, untouched.
    pub fn append(&mut self, time: f64, command: Command) {
        if let Command::SetDistanceLimits(limits) = command {
            self.set_distance_limits(limits);
            return;
        }
        if !time.is_finite() {
            warn!(kind = command.kind(), "ignoring camera command with non-finite time");
            return;
        }
        let Some(pose) = self.pose_at(time).apply(&command) else {
            return;
        };
        let scheduled = self.entries.len() - self.entries.partition_point(|e| e.time <= time);
        if scheduled > 0 {
            self.entries.truncate(self.entries.len() - scheduled);
            trace!(scheduled, time, kind = command.kind(), "superseded scheduled camera entries");
        }
        self.push(time, Some(command), pose);
    }

    /// Tighten or relax the output limits. Applies to every query from now on,
    /// including times already logged.
    pub fn set_distance_limits(&mut self, limits: DistanceLimits) {
        trace!(min = limits.min(), max = limits.max(), "camera log limits replaced");
        self.limits = limits;
    }

    /// Bring the latest motion to rest: hold the last committed pose at `time`.
    pub fn idle(&mut self, time: f64) {
        let len = self.entries.len();
        let Some(last) = self.entries.back() else {
            return;
        };
        if !(time > last.time) {
            return;
        }
        let pose = last.pose;
        let holding = last.command.is_none()
            && len >= 2
            && self.entries[len - 2].is_rest()
            && self.entries[len - 2].pose == pose;
        if holding {
            if let Some(last) = self.entries.back_mut() {
                last.time = time;
            }
        } else {
            self.push(time, None, pose);
        }
    }

    /// Discard entries older than `horizon`, keeping the two newest of them so
    /// the segment straddling the horizon keeps its shape. Returns the number discarded.
    pub fn flush(&mut self, horizon: f64) -> usize {
        let older = self.entries.partition_point(|e| e.time < horizon);
        let discard = older.saturating_sub(RETAINED_BEFORE_HORIZON);
        if discard > 0 {
            self.entries.drain(..discard);
            trace!(discard, horizon, remaining = self.entries.len(), "flushed camera log");
        }
        discard
    }

    /// Pose at `time` with the distance clamped into the current limits.
    pub fn pose_at(&self, time: f64) -> Pose {
        let Some(first) = self.entries.front() else {
            return self.initial.clamped(&self.limits);
        };
        let next = self.entries.partition_point(|e| e.time <= time);
        let pose = if next == 0 {
            // Before everything retained: hold the earliest state.
            first.pose
        } else if next == self.entries.len() {
            self.entries[next - 1].pose
        } else {
            self.blend(next - 1, time)
        };
        pose.clamped(&self.limits)
    }

    pub fn state_at(&self, time: f64) -> CameraState {
        let mut state = self.pose_at(time).state(&self.limits);
        if let Some(matrix) = self.assigned_matrix(time) {
            state.matrix = matrix;
        }
        state
    }

    pub fn recalc_matrix(&self, time: f64) -> Mat4 {
        self.state_at(time).matrix
    }

    /// A directly assigned matrix is reproduced verbatim while it is the latest
    /// command (idle samples only hold its pose) and the limits leave its
    /// distance alone.
    fn assigned_matrix(&self, time: f64) -> Option<Mat4> {
        let held = self.entries.iter().rev().find(|e| e.command.is_some())?;
        let Some(Command::SetMatrix(matrix)) = held.command else {
            return None;
        };
        let distance = held.pose.distance();
        (time >= held.time && self.limits.clamp(distance) == distance).then_some(matrix)
    }

    fn push(&mut self, time: f64, command: Option<Command>, mut pose: Pose) {
        // Keep the quaternion chain in one hemisphere so blends take the short way.
        if let Some(last) = self.entries.back() {
            if pose.rotation.dot(last.pose.rotation) < 0.0 {
                pose.rotation = -pose.rotation;
            }
        }
        self.entries.push_back(Entry {
            time,
            command,
            pose,
        });
    }

    fn blend(&self, index: usize, time: f64) -> Pose {
        let a = &self.entries[index];
        let b = &self.entries[index + 1];
        if a.pose == b.pose {
            return a.pose;
        }
        let span = b.time - a.time;
        let s = ((time - a.time) / span) as f32;
        let h = span as f32;
        let [h00, h10, h01, h11] = hermite_basis(s);
        let (pa, pb) = (a.pose.to_coords(), b.pose.to_coords());
        let (ma, mb) = (self.tangent(index), self.tangent(index + 1));
        let coords: Coords = std::array::from_fn(|k| {
            h00 * pa[k] + h10 * h * ma[k] + h01 * pb[k] + h11 * h * mb[k]
        });
        Pose::from_coords(&coords, &a.pose)
    }

    fn tangent(&self, index: usize) -> Coords {
        let entry = &self.entries[index];
        if entry.is_rest() || index == 0 || index + 1 >= self.entries.len() {
            return [0.0; POSE_DIM];
        }
        let prev = &self.entries[index - 1];
        let next = &self.entries[index + 1];
        let span = (next.time - prev.time) as f32;
        if span <= 0.0 {
            return [0.0; POSE_DIM];
        }
        let (p, n) = (prev.pose.to_coords(), next.pose.to_coords());
        std::array::from_fn(|k| (n[k] - p[k]) / span)
    }
}
