//! FILENAME: core/engine/src/style.rs
//! PURPOSE: Style data and the per-sheet style registry.
//! CONTEXT: Flyweight storage: cells hold a `style_index` into the sheet's
//! `StyleRegistry`, so duplicating a row copies an index, not a style.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Horizontal alignment of cell content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TextAlign {
    #[default]
    General,
    Left,
    Center,
    Right,
}

/// RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b }
    }

    /// Parses "#RRGGBB" or "RRGGBB".
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        if hex.len() != 6 {
            return None;
        }
        let value = u32::from_str_radix(hex, 16).ok()?;
        Some(Color::from_rgb(value))
    }

    pub const fn from_rgb(value: u32) -> Self {
        Color {
            r: ((value >> 16) & 0xFF) as u8,
            g: ((value >> 8) & 0xFF) as u8,
            b: (value & 0xFF) as u8,
        }
    }

    /// Packed 0xRRGGBB value, the form xlsx writers take.
    pub const fn to_rgb(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }
}

/// Formatting attributes of one cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct CellStyle {
    pub bold: bool,
    pub italic: bool,
    pub font_color: Option<Color>,
    pub background: Option<Color>,
    /// Excel number format code, e.g. "#,##0".
    pub number_format: Option<String>,
    pub text_align: TextAlign,
    pub wrap_text: bool,
}

impl CellStyle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }

    pub fn with_background(mut self, color: Color) -> Self {
        self.background = Some(color);
        self
    }

    pub fn with_number_format(mut self, format: impl Into<String>) -> Self {
        self.number_format = Some(format.into());
        self
    }

    pub fn with_text_align(mut self, align: TextAlign) -> Self {
        self.text_align = align;
        self
    }

    pub fn is_default(&self) -> bool {
        *self == CellStyle::default()
    }
}

/// Unique styles of a sheet. Index 0 is always the default style.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleRegistry {
    styles: Vec<CellStyle>,
    #[serde(skip)]
    style_to_index: HashMap<CellStyle, usize>,
}

impl StyleRegistry {
    pub fn new() -> Self {
        let default_style = CellStyle::new();
        let mut style_to_index = HashMap::new();
        style_to_index.insert(default_style.clone(), 0);

        StyleRegistry {
            styles: vec![default_style],
            style_to_index,
        }
    }

    /// Returns the index of an equal style, registering it if unseen.
    pub fn get_or_create(&mut self, style: CellStyle) -> usize {
        if let Some(&index) = self.style_to_index.get(&style) {
            return index;
        }

        let index = self.styles.len();
        self.style_to_index.insert(style.clone(), index);
        self.styles.push(style);
        index
    }

    /// Out-of-range indices fall back to the default style.
    pub fn get(&self, index: usize) -> &CellStyle {
        self.styles.get(index).unwrap_or(&self.styles[0])
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    /// True when only the default style is registered.
    pub fn is_empty(&self) -> bool {
        self.styles.len() <= 1
    }

    /// Rebuilds the reverse lookup after deserialization.
    pub fn rebuild_index(&mut self) {
        self.style_to_index.clear();
        for (index, style) in self.styles.iter().enumerate() {
            self.style_to_index.insert(style.clone(), index);
        }
    }
}

impl Default for StyleRegistry {
    fn default() -> Self {
        StyleRegistry::new()
    }
}
