pub(crate) mod lock;
pub mod millis;
