//! The windowing primitives a popup stack drives.

use thiserror::Error;

use super::model::Notification;

/// Usable screen area, excluding docks and task bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkArea {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Initial placement and size of a popup window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowOptions {
    pub focusable: bool,
    pub always_on_top: bool,
    pub skip_taskbar: bool,
    pub frameless: bool,
}

impl WindowOptions {
    /// Frameless, always on top, and unable to take input focus.
    pub fn popup() -> Self {
        Self {
            focusable: false,
            always_on_top: true,
            skip_taskbar: true,
            frameless: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum WindowError {
    #[error("window already destroyed")]
    Destroyed,
    #[error("window system error: {0}")]
    Backend(String),
}

impl WindowError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}

/// A single popup window owned by the stack.
pub trait PopupWindow: Send + 'static {
    fn set_position(&mut self, x: i32, y: i32) -> Result<(), WindowError>;
    fn render(&mut self, notification: &Notification) -> Result<(), WindowError>;
    /// Reveal the window without stealing input focus.
    fn show_inactive(&mut self) -> Result<(), WindowError>;
    /// Start the exit animation; the stack destroys the window afterwards.
    fn begin_exit(&mut self) -> Result<(), WindowError>;

    fn show_acknowledged(&mut self) -> Result<(), WindowError> {
        Ok(())
    }

    fn destroy(&mut self);
    fn is_destroyed(&self) -> bool;
}

pub trait WindowSystem: Send + Sync + 'static {
    type Window: PopupWindow;

    fn work_area(&self) -> WorkArea;
    fn create(
        &self,
        geometry: Geometry,
        options: &WindowOptions,
    ) -> Result<Self::Window, WindowError>;
}
