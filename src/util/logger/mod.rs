//! Logger module for Steprun
//!
//! Go-style simple logging: `[LEVEL] message`
//!
//! The runtime itself only emits `tracing` events (transitions at DEBUG,
//! faults at WARN, panicking listeners at ERROR); hosts decide whether and
//! how to subscribe.
//!
//! # Usage
//!
//! ```rust
//! use steprun::util::logger;
//!
//! logger::init();
//! tracing::info!("Hello, {}", "world");
//! ```

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer, Registry};

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Initialize logger with default configuration (INFO level)
pub fn init() {
    init_with_level(LogLevel::Info);
}

/// Initialize logger with custom level (Go style: `[LEVEL] message`)
///
/// Panics if a global subscriber is already installed.
pub fn init_with_level(level: LogLevel) {
    subscriber(level).init();
}

/// Like [`init_with_level`], but returns `false` instead of panicking when a
/// subscriber is already installed (test binaries call this repeatedly).
pub fn try_init_with_level(level: LogLevel) -> bool {
    subscriber(level).try_init().is_ok()
}

/// Initialize logger for debug use (DEBUG level)
pub fn init_debug() {
    init_with_level(LogLevel::Debug);
}

fn subscriber(level: LogLevel) -> impl SubscriberInitExt {
    let filter = tracing_subscriber::filter::LevelFilter::from_level(level.into());

    // 显示 [LEVEL] 前缀，不显示时间、不显示模块路径、无颜色
    let layer = tracing_subscriber::fmt::layer()
        .without_time()
        .with_target(false)
        .with_level(true)
        .with_ansi(false)
        .compact()
        .with_filter(filter);

    Registry::default().with(layer)
}
