#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use freshstack::cache::FetchError;
use freshstack::notify::{
    Geometry, Notification, PopupEvent, PopupWindow, WindowError, WindowOptions, WindowSystem,
    WorkArea,
};
use freshstack::transport::{ApiRequest, Transport};
use serde_json::Value;
use tokio::sync::mpsc::UnboundedReceiver;

pub const SCREEN: WorkArea = WorkArea {
    x: 0,
    y: 0,
    width: 1920,
    height: 1080,
};

/// What happened to one fake window.
#[derive(Debug, Clone, Default)]
pub struct WindowRecord {
    pub id: Option<String>,
    pub created_at: Option<Geometry>,
    pub position: (i32, i32),
    pub shown: bool,
    pub exits: usize,
    pub acknowledged: bool,
    pub destroy_calls: usize,
    pub destroyed: bool,
}

#[derive(Clone)]
pub struct FakeWindows {
    records: Arc<Mutex<Vec<Arc<Mutex<WindowRecord>>>>>,
    area: WorkArea,
    fail_create: Arc<AtomicBool>,
    fail_ops: Arc<AtomicBool>,
}

impl Default for FakeWindows {
    fn default() -> Self {
        Self {
            records: Arc::default(),
            area: SCREEN,
            fail_create: Arc::default(),
            fail_ops: Arc::default(),
        }
    }
}

impl FakeWindows {
    /// Make `create` return a backend error until switched back.
    pub fn fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    /// Make every fallible call on existing and new windows return a backend
    /// error. `destroy` still works.
    pub fn fail_window_ops(&self, fail: bool) {
        self.fail_ops.store(fail, Ordering::SeqCst);
    }

    pub fn created(&self) -> usize {
        self.records.lock().expect("lock").len()
    }

    /// The most recent window rendered for `id`.
    pub fn record(&self, id: &str) -> WindowRecord {
        self.handle(id).lock().expect("lock").clone()
    }

    /// Simulate the window being closed behind the stack's back.
    pub fn destroy_externally(&self, id: &str) {
        self.handle(id).lock().expect("lock").destroyed = true;
    }

    fn handle(&self, id: &str) -> Arc<Mutex<WindowRecord>> {
        let records = self.records.lock().expect("lock");
        records
            .iter()
            .rev()
            .find(|record| record.lock().expect("lock").id.as_deref() == Some(id))
            .cloned()
            .unwrap_or_else(|| panic!("no window rendered for {id}"))
    }
}

pub struct FakeWindow {
    record: Arc<Mutex<WindowRecord>>,
    fail_ops: Arc<AtomicBool>,
}

impl WindowSystem for FakeWindows {
    type Window = FakeWindow;

    fn work_area(&self) -> WorkArea {
        self.area
    }

    fn create(
        &self,
        geometry: Geometry,
        options: &WindowOptions,
    ) -> Result<FakeWindow, WindowError> {
        assert!(!options.focusable, "popups must not take focus");
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(WindowError::backend("compositor unavailable"));
        }
        let record = Arc::new(Mutex::new(WindowRecord {
            created_at: Some(geometry),
            position: (geometry.x, geometry.y),
            ..WindowRecord::default()
        }));
        self.records.lock().expect("lock").push(Arc::clone(&record));
        Ok(FakeWindow {
            record,
            fail_ops: Arc::clone(&self.fail_ops),
        })
    }
}

impl FakeWindow {
    fn with<R>(&self, f: impl FnOnce(&mut WindowRecord) -> R) -> R {
        f(&mut self.record.lock().expect("lock"))
    }

    /// Apply `f` unless failures are switched on.
    fn op(&self, f: impl FnOnce(&mut WindowRecord)) -> Result<(), WindowError> {
        if self.fail_ops.load(Ordering::SeqCst) {
            return Err(WindowError::backend("ipc channel closed"));
        }
        self.with(f);
        Ok(())
    }
}

impl PopupWindow for FakeWindow {
    fn set_position(&mut self, x: i32, y: i32) -> Result<(), WindowError> {
        self.op(|record| record.position = (x, y))
    }

    fn render(&mut self, notification: &Notification) -> Result<(), WindowError> {
        // The id is recorded even on failure so tests can find the window.
        self.with(|record| record.id = Some(notification.id.clone()));
        self.op(|_| {})
    }

    fn show_inactive(&mut self) -> Result<(), WindowError> {
        self.op(|record| record.shown = true)
    }

    fn begin_exit(&mut self) -> Result<(), WindowError> {
        self.op(|record| record.exits += 1)
    }

    fn show_acknowledged(&mut self) -> Result<(), WindowError> {
        self.op(|record| record.acknowledged = true)
    }

    fn destroy(&mut self) {
        self.with(|record| {
            record.destroy_calls += 1;
            record.destroyed = true;
        });
    }

    fn is_destroyed(&self) -> bool {
        self.with(|record| record.destroyed)
    }
}

pub fn drain(events: &mut UnboundedReceiver<PopupEvent>) -> Vec<PopupEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}

/// Let paused time run forward by `duration` and give woken tasks a chance
/// to finish.
pub async fn wait(duration: Duration) {
    tokio::time::sleep(duration).await;
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

/// Transport that answers every request with a canned body and records what
/// it was asked.
pub struct FakeTransport {
    response: Mutex<Result<Value, FetchError>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl FakeTransport {
    pub fn new(response: Result<Value, FetchError>) -> Self {
        Self {
            response: Mutex::new(response),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn respond_with(&self, response: Result<Value, FetchError>) {
        *self.response.lock().expect("lock") = response;
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().expect("lock").clone()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn fetch(&self, request: ApiRequest) -> Result<Value, FetchError> {
        self.requests.lock().expect("lock").push(request);
        self.response.lock().expect("lock").clone()
    }
}
