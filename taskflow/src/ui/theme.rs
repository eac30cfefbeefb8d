//! Theme and styling for the TUI.
//!
//! Two built-in palettes (dark and light) switchable at runtime, crossed
//! with a named accent color cycled by the theme picker. Category colors
//! come from the store as `#rrggbb` strings and are parsed into RGB colors
//! at render time.

use ratatui::style::{Color, Modifier, Style};

/// Named accent colors the theme picker cycles through, teal first.
pub const ACCENT_PALETTE: [(&str, Color); 6] = [
    ("teal", Color::Rgb(0x20, 0xc9, 0x97)),
    ("blue", Color::Rgb(0x0d, 0x6e, 0xfd)),
    ("purple", Color::Rgb(0x6f, 0x42, 0xc1)),
    ("pink", Color::Rgb(0xd6, 0x33, 0x84)),
    ("orange", Color::Rgb(0xfd, 0x7e, 0x14)),
    ("green", Color::Rgb(0x19, 0x87, 0x54)),
];

/// A resolved color palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    /// Palette name shown in the status bar.
    pub name: &'static str,
    /// Accent color name from [`ACCENT_PALETTE`].
    pub accent: &'static str,
    /// Primary foreground color.
    pub fg: Color,
    /// Dimmed foreground (completed tasks, metadata).
    pub fg_dim: Color,
    /// Background color.
    pub bg: Color,
    /// Highlight color for the focused panel and selections.
    pub highlight: Color,
    /// Completed checkmark color.
    pub success: Color,
    /// Warning color (pending writes, notices).
    pub warning: Color,
    /// Error color.
    pub error: Color,
    /// Locked task color.
    pub locked: Color,
}

impl Theme {
    /// The default dark palette.
    #[must_use]
    pub const fn dark() -> Self {
        Self {
            name: "dark",
            accent: "teal",
            fg: Color::White,
            fg_dim: Color::Gray,
            bg: Color::Black,
            highlight: Color::Rgb(0x20, 0xc9, 0x97),
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
            locked: Color::DarkGray,
        }
    }

    /// The light palette.
    #[must_use]
    pub const fn light() -> Self {
        Self {
            name: "light",
            accent: "teal",
            fg: Color::Black,
            fg_dim: Color::DarkGray,
            bg: Color::White,
            highlight: Color::Rgb(0x20, 0xc9, 0x97),
            success: Color::Green,
            warning: Color::Rgb(180, 120, 0),
            error: Color::Red,
            locked: Color::Gray,
        }
    }

    /// Looks a palette up by name, defaulting to dark.
    #[must_use]
    pub fn by_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("light") {
            Self::light()
        } else {
            Self::dark()
        }
    }

    /// The other palette, keeping the current accent.
    #[must_use]
    pub fn toggled(self) -> Self {
        let other = if matches!(self.bg, Color::Black) {
            Self::light()
        } else {
            Self::dark()
        };
        other.with_accent(self.accent)
    }

    /// Recolors the theme to the named accent. Unknown names leave the
    /// theme unchanged.
    #[must_use]
    pub fn with_accent(mut self, name: &str) -> Self {
        if let Some((accent, color)) = ACCENT_PALETTE
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            self.accent = accent;
            self.highlight = *color;
        }
        self
    }

    /// The next accent color in the palette, wrapping at the end.
    #[must_use]
    pub fn next_accent(self) -> Self {
        let index = ACCENT_PALETTE
            .iter()
            .position(|(name, _)| *name == self.accent)
            .map_or(0, |i| (i + 1) % ACCENT_PALETTE.len());
        let (accent, color) = ACCENT_PALETTE[index];
        Self {
            accent,
            highlight: color,
            ..self
        }
    }

    /// Normal text style.
    #[must_use]
    pub fn normal(&self) -> Style {
        Style::default().fg(self.fg)
    }

    /// Dimmed text style.
    #[must_use]
    pub fn dimmed(&self) -> Style {
        Style::default().fg(self.fg_dim)
    }

    /// Locked task style.
    #[must_use]
    pub fn locked_style(&self) -> Style {
        Style::default().fg(self.locked)
    }

    /// Focused panel border style.
    #[must_use]
    pub fn focused_border(&self) -> Style {
        Style::default().fg(self.highlight).add_modifier(Modifier::BOLD)
    }

    /// Selected list item style.
    #[must_use]
    pub fn selected(&self) -> Style {
        Style::default()
            .fg(self.bg)
            .bg(self.highlight)
            .add_modifier(Modifier::BOLD)
    }

    /// Status bar style.
    #[must_use]
    pub fn status_bar(&self) -> Style {
        Style::default().fg(self.fg).bg(Color::Rgb(30, 30, 50))
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

/// Parses a `#rrggbb` string into a terminal color.
///
/// Unparseable values fall back to `fallback` so a corrupt stored color can
/// never break rendering.
#[must_use]
pub fn hex_color(hex: &str, fallback: Color) -> Color {
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if hex.len() != 6 || !hex.is_ascii() {
        return fallback;
    }
    let Ok(r) = u8::from_str_radix(&hex[0..2], 16) else {
        return fallback;
    };
    let Ok(g) = u8::from_str_radix(&hex[2..4], 16) else {
        return fallback;
    };
    let Ok(b) = u8::from_str_radix(&hex[4..6], 16) else {
        return fallback;
    };
    Color::Rgb(r, g, b)
}
