/// Input types that are independent of any specific windowing library.
/// Hosts translate their native events into [`InputEvent`] and hand them to
/// the operators.

/// Element state (pressed or released)
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ElementState {
    Pressed,
    Released,
}

/// Mouse button identifier
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Back,
    Forward,
    Other(u16),
}

/// Mouse scroll delta
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum MouseScrollDelta {
    /// Scroll delta in lines
    LineDelta(f32, f32),
    /// Scroll delta in pixels
    PixelDelta(f32, f32),
}

impl MouseScrollDelta {
    /// Vertical scroll in line units; pixel deltas count 100 pixels per line.
    pub fn lines_y(&self) -> f32 {
        match *self {
            MouseScrollDelta::LineDelta(_, y) => y,
            MouseScrollDelta::PixelDelta(_, y) => y / 100.0,
        }
    }
}

/// Pointer and viewport events consumed by operators.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum InputEvent {
    /// Viewport was resized to the given physical size (width, height)
    Resized((u32, u32)),
    /// Cursor position changed, in physical pixels from the top-left corner
    CursorMoved { position: (f32, f32) },
    /// Mouse button was pressed or released at the last known cursor position
    MouseInput {
        state: ElementState,
        button: MouseButton,
    },
    /// Mouse wheel was scrolled; positive y zooms in
    MouseWheel { delta: MouseScrollDelta },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scroll_lines() {
        assert_eq!(MouseScrollDelta::LineDelta(0.0, 2.0).lines_y(), 2.0);
        assert!((MouseScrollDelta::PixelDelta(0.0, 50.0).lines_y() - 0.5).abs() < 1e-6);
    }
}
