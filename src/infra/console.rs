//! A [`WindowSystem`] for terminals: every popup becomes log lines.

use tracing::info;

use crate::notify::{
    Geometry, Notification, PopupWindow, WindowError, WindowOptions, WindowSystem, WorkArea,
};

const TARGET: &str = "freshstack::popup";

/// Pretends to be a screen of the given size.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleWindows {
    area: WorkArea,
}

impl ConsoleWindows {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            area: WorkArea {
                x: 0,
                y: 0,
                width,
                height,
            },
        }
    }
}

impl Default for ConsoleWindows {
    fn default() -> Self {
        Self::new(1920, 1080)
    }
}

#[derive(Debug)]
pub struct ConsoleWindow {
    geometry: Geometry,
    id: Option<String>,
    destroyed: bool,
}

impl WindowSystem for ConsoleWindows {
    type Window = ConsoleWindow;

    fn work_area(&self) -> WorkArea {
        self.area
    }

    fn create(
        &self,
        geometry: Geometry,
        _options: &WindowOptions,
    ) -> Result<ConsoleWindow, WindowError> {
        Ok(ConsoleWindow {
            geometry,
            id: None,
            destroyed: false,
        })
    }
}

impl ConsoleWindow {
    fn id(&self) -> &str {
        self.id.as_deref().unwrap_or("-")
    }

    fn ensure_live(&self) -> Result<(), WindowError> {
        if self.destroyed {
            return Err(WindowError::Destroyed);
        }
        Ok(())
    }
}

impl PopupWindow for ConsoleWindow {
    fn set_position(&mut self, x: i32, y: i32) -> Result<(), WindowError> {
        self.ensure_live()?;
        self.geometry.x = x;
        self.geometry.y = y;
        Ok(())
    }

    fn render(&mut self, notification: &Notification) -> Result<(), WindowError> {
        self.ensure_live()?;
        self.id = Some(notification.id.clone());
        info!(
            target: TARGET,
            id = %notification.id,
            kind = ?notification.kind,
            priority = ?notification.priority,
            body = %notification.body,
            "{}",
            notification.title
        );
        Ok(())
    }

    fn show_inactive(&mut self) -> Result<(), WindowError> {
        self.ensure_live()?;
        info!(
            target: TARGET,
            id = self.id(),
            x = self.geometry.x,
            y = self.geometry.y,
            "Popup shown"
        );
        Ok(())
    }

    fn begin_exit(&mut self) -> Result<(), WindowError> {
        self.ensure_live()?;
        info!(target: TARGET, id = self.id(), "Popup closing");
        Ok(())
    }

    fn destroy(&mut self) {
        self.destroyed = true;
    }

    fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destroyed_windows_reject_further_calls() {
        let windows = ConsoleWindows::new(800, 600);
        let geometry = Geometry {
            x: 404,
            y: 464,
            width: 380,
            height: 120,
        };
        let mut window = windows
            .create(geometry, &WindowOptions::popup())
            .expect("create");
        window.set_position(404, 300).expect("live window moves");

        window.destroy();

        assert!(window.is_destroyed());
        assert!(matches!(
            window.set_position(0, 0),
            Err(WindowError::Destroyed)
        ));
        assert!(matches!(window.begin_exit(), Err(WindowError::Destroyed)));
    }
}
