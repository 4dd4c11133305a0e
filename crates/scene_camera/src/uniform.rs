use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::log::CameraState;

/// Per-frame camera block handed to the renderer as push constants.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CameraPushConstants {
    pub view_proj: [[f32; 4]; 4], // 64 bytes
    pub view: [[f32; 4]; 4],      // 64 bytes
    pub eye: [f32; 4],            // 16 bytes - xyz = position, w = distance
}

impl CameraPushConstants {
    pub fn new(state: &CameraState, projection: Mat4) -> Self {
        Self {
            view_proj: (projection * state.matrix).to_cols_array_2d(),
            view: state.matrix.to_cols_array_2d(),
            eye: state.eye.extend(state.distance).to_array(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}
