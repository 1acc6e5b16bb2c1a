//! Background tasks.

pub mod looper;

pub use crate::task::looper::Looper;
