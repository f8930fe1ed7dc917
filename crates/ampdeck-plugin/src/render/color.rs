use image::Rgba;

/// Plain RGB color.  Settings carry colors as `#RRGGBB` strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub u8, pub u8, pub u8);

/// Brand accent, used whenever no artwork color is available.
pub const DEFAULT_ACCENT: Color = Color(0xE5, 0xA0, 0x0D);
pub const WHITE: Color = Color(0xFF, 0xFF, 0xFF);
pub const BLACK: Color = Color(0, 0, 0);
/// Inactive icons and placeholders.
pub const DIM: Color = Color(0x33, 0x33, 0x33);
/// Unfilled progress track.
pub const TRACK_BG: Color = Color(0x33, 0x33, 0x33);

impl Color {
    /// Parse `#RRGGBB` (leading `#` optional, case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(Self(r, g, b))
    }

    pub fn hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }

    pub fn rgba(&self) -> Rgba<u8> {
        Rgba([self.0, self.1, self.2, 255])
    }
}

/// Parse a user color, falling back to white.
pub fn parse_or_white(s: &str) -> Color {
    Color::parse(s).unwrap_or(WHITE)
}

/// Dimmer companion shade used for secondary text on keys.
pub fn secondary_for_key(text: &str) -> Color {
    match text.to_ascii_uppercase().as_str() {
        "#FFFFFF" => Color(0x88, 0x88, 0x88),
        "#BBBBBB" => Color(0x77, 0x77, 0x77),
        "#E5A00D" => Color(0xB0, 0x7A, 0x0A),
        "#FFBF00" => Color(0xB0, 0x86, 0x00),
        "#000000" => Color(0x44, 0x44, 0x44),
        _ => Color(0x88, 0x88, 0x88),
    }
}

/// Same table for the touch strip, which reads better a little lighter.
pub fn secondary_for_strip(text: &str) -> Color {
    match text.to_ascii_uppercase().as_str() {
        "#FFFFFF" => Color(0x99, 0x99, 0x99),
        "#BBBBBB" => Color(0x77, 0x77, 0x77),
        "#E5A00D" => Color(0xB0, 0x7A, 0x0A),
        "#FFBF00" => Color(0xB0, 0x86, 0x00),
        "#000000" => Color(0x44, 0x44, 0x44),
        _ => Color(0x99, 0x99, 0x99),
    }
}

/// Accent color: the artwork's dominant color unless dynamic colors are off.
pub fn accent(dynamic_colors: bool, dominant: Color) -> Color {
    if dynamic_colors {
        dominant
    } else {
        DEFAULT_ACCENT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_format() {
        assert_eq!(Color::parse("#e5a00d"), Some(DEFAULT_ACCENT));
        assert_eq!(Color::parse("FFFFFF"), Some(WHITE));
        assert_eq!(Color::parse("#FFF"), None);
        assert_eq!(Color::parse("#GG0000"), None);
        assert_eq!(DEFAULT_ACCENT.hex(), "#E5A00D");
    }

    #[test]
    fn test_secondary_tables() {
        assert_eq!(secondary_for_key("#FFFFFF").hex(), "#888888");
        assert_eq!(secondary_for_key("#FFBF00").hex(), "#B08600");
        assert_eq!(secondary_for_key("#123456").hex(), "#888888");
        assert_eq!(secondary_for_strip("#FFFFFF").hex(), "#999999");
        assert_eq!(secondary_for_strip("#000000").hex(), "#444444");
        assert_eq!(secondary_for_strip("#123456").hex(), "#999999");
    }

    #[test]
    fn test_accent_respects_toggle() {
        let art = Color(10, 200, 30);
        assert_eq!(accent(true, art), art);
        assert_eq!(accent(false, art), DEFAULT_ACCENT);
    }
}
