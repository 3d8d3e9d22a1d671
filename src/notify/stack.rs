//! The bounded popup stack.
//!
//! All mutations go through one mutex, so `show`, `dismiss` and the timer
//! callbacks never interleave. Timer tasks hold a weak reference to the stack
//! and re-check the entry they were armed for before acting.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use metrics::{counter, gauge};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::util::lock;

use super::config::PopupConfig;
use super::countdown::Countdown;
use super::events::{DismissReason, PopupEvent};
use super::geometry::{next_offset, stack_offsets, window_origin};
use super::model::Notification;
use super::window::{Geometry, PopupWindow, WindowError, WindowOptions, WindowSystem};

const SOURCE: &str = "notify::stack";

pub(crate) const METRIC_POPUP_EVICT: &str = "freshstack_popup_evict_total";
pub(crate) const METRIC_POPUP_VISIBLE: &str = "freshstack_popup_visible";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Counting,
    Paused,
    Acknowledged,
    Dismissing,
}

struct Entry<H> {
    serial: u64,
    id: String,
    window: H,
    height: u32,
    offset: u32,
    phase: Phase,
    countdown: Countdown,
    timer: Option<Timer>,
}

struct Timer {
    seq: u64,
    handle: JoinHandle<()>,
}

impl<H: PopupWindow> Entry<H> {
    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.handle.abort();
        }
    }

    /// Run `op` on the window unless it is already gone. Failures are logged.
    fn with_window(&mut self, op: &'static str, f: impl FnOnce(&mut H) -> Result<(), WindowError>) {
        if self.window.is_destroyed() {
            debug!(id = %self.id, op, "Skipping destroyed popup window");
            return;
        }
        if let Err(error) = f(&mut self.window) {
            warn!(id = %self.id, op, error = %error, "Popup window operation failed");
        }
    }

    fn destroy_window(&mut self) {
        if !self.window.is_destroyed() {
            self.window.destroy();
        }
    }
}

struct State<H> {
    /// Newest first.
    entries: VecDeque<Entry<H>>,
}

impl<H> State<H> {
    fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id == id)
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut Entry<H>> {
        self.entries.iter_mut().find(|entry| entry.id == id)
    }
}

struct Inner<W: WindowSystem> {
    windows: W,
    config: PopupConfig,
    state: Mutex<State<W::Window>>,
    events: mpsc::UnboundedSender<PopupEvent>,
    next_serial: AtomicU64,
    next_timer: AtomicU64,
}

/// Up to `max_visible` popups stacked upward from the bottom-right corner.
///
/// Every operation that starts a timer (`show`, `dismiss`, `hover_leave`,
/// `click`, `acknowledge`) must run inside a tokio runtime.
pub struct PopupStack<W: WindowSystem> {
    inner: Arc<Inner<W>>,
}

impl<W: WindowSystem> Clone for PopupStack<W> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<W: WindowSystem> PopupStack<W> {
    /// Create a stack and the receiver for its outbound signals.
    pub fn new(windows: W, config: PopupConfig) -> (Self, mpsc::UnboundedReceiver<PopupEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let stack = Self {
            inner: Arc::new(Inner {
                windows,
                config,
                state: Mutex::new(State {
                    entries: VecDeque::new(),
                }),
                events,
                next_serial: AtomicU64::new(0),
                next_timer: AtomicU64::new(0),
            }),
        };
        (stack, receiver)
    }

    pub fn config(&self) -> &PopupConfig {
        &self.inner.config
    }

    pub fn windows(&self) -> &W {
        &self.inner.windows
    }

    pub fn count(&self) -> usize {
        self.state("count").entries.len()
    }

    /// Visible popup ids, newest first.
    pub fn ids(&self) -> Vec<String> {
        self.state("ids")
            .entries
            .iter()
            .map(|entry| entry.id.clone())
            .collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.state("contains").position(id).is_some()
    }

    /// Distance from the bottom of the work area to the top of the popup.
    pub fn offset_of(&self, id: &str) -> Option<u32> {
        let state = self.state("offset_of");
        state.entries.iter().find(|entry| entry.id == id).map(|entry| entry.offset)
    }

    /// Time left before the popup dismisses itself, if it is counting down
    /// or paused.
    pub fn remaining(&self, id: &str) -> Option<Duration> {
        let state = self.state("remaining");
        let entry = state.entries.iter().find(|entry| entry.id == id)?;
        match entry.phase {
            Phase::Counting | Phase::Paused => Some(entry.countdown.remaining(Instant::now())),
            Phase::Acknowledged | Phase::Dismissing => None,
        }
    }

    pub fn is_dismissing(&self, id: &str) -> bool {
        self.state("is_dismissing")
            .entries
            .iter()
            .any(|entry| entry.id == id && entry.phase == Phase::Dismissing)
    }

    /// Display `notification`, evicting the oldest popups first if the stack
    /// is full. A notification whose id is already on screen is ignored.
    pub fn show(&self, notification: &Notification) -> Result<(), WindowError> {
        let config = &self.inner.config;
        let mut state = self.state("show");

        if state.position(&notification.id).is_some() {
            debug!(id = %notification.id, "Popup already visible");
            return Ok(());
        }

        while state.entries.len() >= config.max_visible.max(1) {
            let Some(mut oldest) = state.entries.pop_back() else {
                break;
            };
            oldest.cancel_timer();
            oldest.destroy_window();
            counter!(METRIC_POPUP_EVICT).increment(1);
            debug!(id = %oldest.id, "Evicted oldest popup");
            self.emit(PopupEvent::Dismissed {
                id: oldest.id,
                reason: DismissReason::Evicted,
            });
        }

        let height = config.heights.for_kind(notification.kind);
        let offset = next_offset(
            state.entries.iter().rev().map(|entry| entry.height),
            height,
            config.margin_bottom_px,
            config.gap_px,
        );
        let area = self.inner.windows.work_area();
        let (x, y) = window_origin(area, config.width_px, config.margin_right_px, offset);
        let geometry = Geometry {
            x,
            y,
            width: config.width_px,
            height,
        };

        let window = match self.inner.windows.create(geometry, &WindowOptions::popup()) {
            Ok(window) => window,
            Err(error) => {
                warn!(id = %notification.id, error = %error, "Failed to create popup window");
                self.publish_visible(&state);
                return Err(error);
            }
        };

        let duration = config.durations.for_kind(notification.kind);
        let mut entry = Entry {
            serial: self.inner.next_serial.fetch_add(1, Ordering::Relaxed),
            id: notification.id.clone(),
            window,
            height,
            offset,
            phase: Phase::Counting,
            countdown: Countdown::start(duration, Instant::now()),
            timer: None,
        };
        entry.with_window("render", |window| window.render(notification));
        entry.with_window("show_inactive", |window| window.show_inactive());
        entry.timer = Some(self.arm(entry.serial, &entry.id, duration, DismissReason::Timeout));

        state.entries.push_front(entry);
        self.reposition_locked(&mut state);
        self.publish_visible(&state);
        info!(id = %notification.id, kind = ?notification.kind, height, offset, "Showing popup");
        Ok(())
    }

    /// Start dismissing `id`. Returns `false` if it is unknown or already
    /// dismissing.
    pub fn dismiss(&self, id: &str) -> bool {
        let mut state = self.state("dismiss");
        self.begin_dismiss(&mut state, id, DismissReason::Closed)
    }

    /// The user clicked the popup body.
    pub fn click(&self, id: &str) -> bool {
        let mut state = self.state("click");
        match state.find_mut(id) {
            Some(entry) if entry.phase != Phase::Dismissing => {}
            _ => return false,
        }
        self.emit(PopupEvent::Clicked { id: id.to_string() });
        self.begin_dismiss(&mut state, id, DismissReason::Clicked)
    }

    /// Mark the popup acknowledged and dismiss it once `ack_linger` passes.
    pub fn acknowledge(&self, id: &str) -> bool {
        let linger = self.inner.config.ack_linger();
        let mut state = self.state("acknowledge");
        let Some(entry) = state.find_mut(id) else {
            return false;
        };
        if matches!(entry.phase, Phase::Dismissing | Phase::Acknowledged) {
            return false;
        }

        entry.cancel_timer();
        entry.phase = Phase::Acknowledged;
        entry.with_window("show_acknowledged", |window| window.show_acknowledged());
        let serial = entry.serial;
        let timer = self.arm(serial, id, linger, DismissReason::Acknowledged);
        entry.timer = Some(timer);

        self.emit(PopupEvent::Acknowledged { id: id.to_string() });
        true
    }

    /// Pause the countdown while the pointer is over the popup.
    pub fn hover_enter(&self, id: &str) -> bool {
        let mut state = self.state("hover_enter");
        let Some(entry) = state.find_mut(id) else {
            return false;
        };
        if entry.phase != Phase::Counting {
            return false;
        }

        entry.cancel_timer();
        entry.countdown.pause(Instant::now());
        entry.phase = Phase::Paused;
        true
    }

    /// Resume the countdown with the time that was left when hovering began.
    pub fn hover_leave(&self, id: &str) -> bool {
        let floor = self.inner.config.min_resume();
        let mut state = self.state("hover_leave");
        let Some(entry) = state.find_mut(id) else {
            return false;
        };
        if entry.phase != Phase::Paused {
            return false;
        }

        let left = entry.countdown.resume(Instant::now(), floor);
        entry.phase = Phase::Counting;
        let serial = entry.serial;
        let timer = self.arm(serial, id, left, DismissReason::Timeout);
        entry.timer = Some(timer);
        true
    }

    /// Recompute every offset from the bottom margin up and move the windows.
    pub fn reposition(&self) {
        let mut state = self.state("reposition");
        self.reposition_locked(&mut state);
    }

    /// Destroy every popup immediately. No animation and no signals.
    pub fn shutdown(&self) {
        let mut state = self.state("shutdown");
        let closed = state.entries.len();
        for mut entry in state.entries.drain(..) {
            entry.cancel_timer();
            entry.destroy_window();
        }
        gauge!(METRIC_POPUP_VISIBLE).set(0.0);
        info!(closed, "Popup stack shut down");
    }

    fn state(&self, op: &'static str) -> std::sync::MutexGuard<'_, State<W::Window>> {
        lock::lock(&self.inner.state, SOURCE, op)
    }

    fn emit(&self, event: PopupEvent) {
        if self.inner.events.send(event).is_err() {
            debug!("Popup event receiver dropped");
        }
    }

    fn publish_visible(&self, state: &State<W::Window>) {
        gauge!(METRIC_POPUP_VISIBLE).set(state.entries.len() as f64);
    }

    fn begin_dismiss(&self, state: &mut State<W::Window>, id: &str, reason: DismissReason) -> bool {
        let Some(entry) = state.find_mut(id) else {
            return false;
        };
        if entry.phase == Phase::Dismissing {
            return false;
        }

        entry.phase = Phase::Dismissing;
        entry.cancel_timer();
        entry.with_window("begin_exit", |window| window.begin_exit());
        debug!(id, ?reason, "Dismissing popup");

        let serial = entry.serial;
        let delay = self.inner.config.dismiss_animation();
        let weak = Arc::downgrade(&self.inner);
        // Detached: once the exit animation starts the destroy runs to completion.
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(stack) = upgrade(&weak) {
                stack.finish_dismiss(serial, reason);
            }
        });
        true
    }

    fn finish_dismiss(&self, serial: u64, reason: DismissReason) {
        let mut state = self.state("finish_dismiss");
        let Some(index) = state
            .entries
            .iter()
            .position(|entry| entry.serial == serial && entry.phase == Phase::Dismissing)
        else {
            return;
        };
        let Some(mut entry) = state.entries.remove(index) else {
            return;
        };

        entry.destroy_window();
        self.reposition_locked(&mut state);
        self.publish_visible(&state);
        self.emit(PopupEvent::Dismissed {
            id: entry.id,
            reason,
        });
    }

    /// Start a countdown task for the entry with `serial`.
    fn arm(&self, serial: u64, id: &str, after: Duration, reason: DismissReason) -> Timer {
        let seq = self.inner.next_timer.fetch_add(1, Ordering::Relaxed);
        let weak = Arc::downgrade(&self.inner);
        let id = id.to_string();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            if let Some(stack) = upgrade(&weak) {
                stack.expire(serial, seq, &id, reason);
            }
        });
        Timer { seq, handle }
    }

    fn expire(&self, serial: u64, seq: u64, id: &str, reason: DismissReason) {
        let mut state = self.state("expire");
        let armed = state.entries.iter().any(|entry| {
            entry.serial == serial
                && entry.timer.as_ref().is_some_and(|timer| timer.seq == seq)
                && matches!(entry.phase, Phase::Counting | Phase::Acknowledged)
        });
        if armed {
            self.begin_dismiss(&mut state, id, reason);
        }
    }

    fn reposition_locked(&self, state: &mut State<W::Window>) {
        let config = &self.inner.config;
        let offsets = stack_offsets(
            state.entries.iter().rev().map(|entry| entry.height),
            config.margin_bottom_px,
            config.gap_px,
        );
        let area = self.inner.windows.work_area();

        for (entry, offset) in state.entries.iter_mut().rev().zip(offsets) {
            entry.offset = offset;
            let (x, y) = window_origin(area, config.width_px, config.margin_right_px, offset);
            entry.with_window("set_position", |window| window.set_position(x, y));
        }
    }
}

fn upgrade<W: WindowSystem>(weak: &Weak<Inner<W>>) -> Option<PopupStack<W>> {
    weak.upgrade().map(|inner| PopupStack { inner })
}
