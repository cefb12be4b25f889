//! ANSI styling for the status line and the markdown renderer.
//!
//! A `Style` is resolved once at startup from `NO_COLOR` and threaded
//! through; when disabled, every method returns an empty sequence so call
//! sites never branch on color themselves.

/// True unless the `NO_COLOR` convention asks for plain output.
pub fn color_enabled() -> bool {
    std::env::var_os("NO_COLOR").is_none()
}

#[derive(Debug, Clone, Copy)]
pub struct Style {
    enabled: bool,
}

impl Default for Style {
    fn default() -> Self {
        Self::new()
    }
}

impl Style {
    pub fn new() -> Self {
        Self {
            enabled: color_enabled(),
        }
    }

    /// Colors on, regardless of environment. Tests assert exact escapes.
    pub fn force_enabled() -> Self {
        Self { enabled: true }
    }

    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn seq(&self, code: &'static str) -> &'static str {
        if self.enabled {
            code
        } else {
            ""
        }
    }

    pub fn bold_start(&self) -> &'static str {
        self.seq("\x1b[1m")
    }

    pub fn dim_start(&self) -> &'static str {
        self.seq("\x1b[2m")
    }

    pub fn red_start(&self) -> &'static str {
        self.seq("\x1b[31m")
    }

    pub fn yellow_start(&self) -> &'static str {
        self.seq("\x1b[33m")
    }

    /// 256-color foreground for the code themes.
    pub fn fg256(&self, color: u8) -> String {
        if self.enabled {
            format!("\x1b[38;5;{color}m")
        } else {
            String::new()
        }
    }

    pub fn reset(&self) -> &'static str {
        self.seq("\x1b[0m")
    }
}

/// Compact token count for the usage footer: counts under 1000 print as-is,
/// larger ones as tenths of a thousand (`1234` -> `1.2k`).
pub fn format_tokens(n: u32) -> String {
    if n < 1000 {
        n.to_string()
    } else {
        format!("{:.1}k", f64::from(n) / 1000.0)
    }
}
