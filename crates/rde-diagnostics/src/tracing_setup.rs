//! Tracing/miette initialization shared by every `rde-cli` subcommand.

use tracing_subscriber::prelude::*;

/// Log verbosity requested on the command line, or `None` to defer to the
/// `RDE_LOG` environment variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    #[default]
    None,
    Debug,
    Info,
    Warn,
    Error,
}

impl core::str::FromStr for LogLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(format!("expected 'none', 'debug', 'info', 'warn', or 'error', got '{s}'")),
        }
    }
}

impl core::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Installs a [`tracing_tree`] hierarchical subscriber. `level` comes from
/// `--log-level`; when `None`, falls back to the `RDE_LOG` env filter, and if
/// that is unset too, tracing stays uninitialized (no output).
pub fn init_tracing(level: LogLevel) {
    let filter = match level {
        LogLevel::None => match tracing_subscriber::EnvFilter::try_from_env("RDE_LOG") {
            Ok(f) => f,
            Err(_) => return,
        },
        LogLevel::Debug => tracing_subscriber::EnvFilter::new("debug"),
        LogLevel::Info => tracing_subscriber::EnvFilter::new("info"),
        LogLevel::Warn => tracing_subscriber::EnvFilter::new("warn"),
        LogLevel::Error => tracing_subscriber::EnvFilter::new("error"),
    };

    tracing_subscriber::registry()
        .with(
            tracing_tree::HierarchicalLayer::new(2)
                .with_targets(true)
                .with_bracketed_fields(true)
                .with_indent_lines(true)
                .with_timer(tracing_tree::time::Uptime::default())
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

/// Installs the `miette` panic/error report handler with the given color
/// preference. `force_colors = None` lets miette auto-detect a tty.
pub fn init_miette(force_colors: Option<bool>) {
    let theme = match force_colors {
        Some(false) => miette::GraphicalTheme::none(),
        Some(true) => miette::GraphicalTheme::unicode(),
        None => miette::GraphicalTheme::unicode(),
    };
    let _ = miette::set_hook(Box::new(move |_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .graphical_theme(theme.clone())
                .build(),
        )
    }));
}
