//! Adapter from winit window events to the camera's pointer and wheel handlers.

use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    keyboard::ModifiersState,
};

use crate::{
    camera::Camera,
    clock::Clock,
    input::{Modifiers, PointerButtons, PointerEvent},
};

/// Pixels per scrolled line for line-based wheels.
const LINE_HEIGHT_PX: f32 = 40.0;

/// Pointer state winit reports piecemeal (buttons, modifiers and motion arrive
/// as separate events).
#[derive(Debug, Clone, Default)]
pub struct WinitInput {
    buttons: PointerButtons,
    modifiers: Modifiers,
    cursor: Option<PhysicalPosition<f64>>,
}

impl WinitInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buttons(&self) -> PointerButtons {
        self.buttons
    }

    /// Route `event` to `camera`. Returns whether the camera enqueued a command
    /// or the event changed pointer state.
    pub fn handle_event<C: Clock>(&mut self, camera: &mut Camera<C>, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::MouseInput { state, button, .. } => {
                self.mouse_input(camera, *state, *button)
            }
            WindowEvent::CursorMoved { position, .. } => self.cursor_moved(camera, *position),
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                self.buttons = PointerButtons::NONE;
                false
            }
            WindowEvent::MouseWheel { delta, .. } => self.wheel(camera, *delta),
            WindowEvent::ModifiersChanged(modifiers) => {
                self.modifiers_changed(modifiers.state());
                false
            }
            WindowEvent::Resized(size) => {
                camera.resize(size.width, size.height);
                false
            }
            _ => false,
        }
    }

    pub fn mouse_input<C: Clock>(
        &mut self,
        camera: &mut Camera<C>,
        state: ElementState,
        button: MouseButton,
    ) -> bool {
        let Some(bit) = button_bit(button) else {
            return false;
        };
        self.buttons = match state {
            ElementState::Pressed => self.buttons.with(bit),
            ElementState::Released => self.buttons.without(bit),
        };
        // Re-sync so the next move measures from where the press happened.
        if let Some(position) = self.cursor {
            camera.on_pointer_move(&self.event(position));
        }
        true
    }

    pub fn cursor_moved<C: Clock>(
        &mut self,
        camera: &mut Camera<C>,
        position: PhysicalPosition<f64>,
    ) -> bool {
        self.cursor = Some(position);
        camera.on_pointer_move(&self.event(position))
    }

    pub fn wheel<C: Clock>(&mut self, camera: &mut Camera<C>, delta: MouseScrollDelta) -> bool {
        let (dx, dy) = match delta {
            MouseScrollDelta::LineDelta(x, y) => (x * LINE_HEIGHT_PX, y * LINE_HEIGHT_PX),
            MouseScrollDelta::PixelDelta(pos) => (pos.x as f32, pos.y as f32),
        };
        // winit reports content motion; the camera expects scroll direction.
        camera.on_wheel(-dx, -dy)
    }

    pub fn modifiers_changed(&mut self, state: ModifiersState) {
        self.modifiers = Modifiers {
            ctrl: state.control_key(),
            alt: state.alt_key(),
            shift: state.shift_key(),
        };
    }

    fn event(&self, position: PhysicalPosition<f64>) -> PointerEvent {
        PointerEvent {
            buttons: self.buttons,
            x: position.x as f32,
            y: position.y as f32,
            modifiers: self.modifiers,
        }
    }
}

fn button_bit(button: MouseButton) -> Option<PointerButtons> {
    match button {
        MouseButton::Left => Some(PointerButtons::PRIMARY),
        MouseButton::Right => Some(PointerButtons::SECONDARY),
        MouseButton::Middle => Some(PointerButtons::MIDDLE),
        _ => None,
    }
}
