//! Desktop notification popups.
//!
//! [`PopupStack`] owns a bounded set of popup windows created through an
//! injected [`WindowSystem`]. [`NotificationFeed`] polls the notifications
//! API and hands unseen items to the stack.

mod config;
mod countdown;
mod events;
mod feed;
mod geometry;
mod model;
mod stack;
mod window;

pub use config::{PopupConfig, PopupConfigError, PopupDurations, PopupHeights};
pub use events::{DismissReason, PopupEvent};
pub use feed::{FeedConfig, NotificationFeed, PollReport};
pub use geometry::{next_offset, stack_offsets, window_origin};
pub use model::{Notification, NotificationKind, Priority};
pub use stack::PopupStack;
pub use window::{Geometry, PopupWindow, WindowError, WindowOptions, WindowSystem, WorkArea};

pub(crate) use stack::{METRIC_POPUP_EVICT, METRIC_POPUP_VISIBLE};
