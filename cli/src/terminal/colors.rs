use colored::Color;

pub const PRIMARY: Color = Color::BrightWhite;
pub const ACCENT: Color = Color::BrightGreen;
pub const SEPARATOR: Color = Color::BrightBlack;
pub const TEXT_DEFAULT: Color = Color::White;

pub const IPV4_ADDR: Color = Color::BrightBlue;
pub const IPV6_ADDR: Color = Color::BrightMagenta;
pub const MAC_ADDR: Color = Color::Cyan;
pub const VENDOR: Color = Color::Yellow;
pub const PORT: Color = Color::Green;
pub const UNKNOWN: Color = Color::BrightBlack;
