//! botkit - An extensible Discord bot runtime.
//!
//! This crate provides:
//! - A plugin system of extensions switched on per configuration, with lifecycle hooks
//! - A reactive cooldown engine with per-bucket sliding windows
//! - Locale-aware translation trees and command localization
//! - A companion web server extensions attach routes to

pub mod bot;
pub mod cache;
pub mod config;
pub mod cooldown;
pub mod error;
pub mod extension;
pub mod extensions;
pub mod i18n;
pub mod logging;
pub mod task;
pub mod web;
