use std::str::FromStr;

use ratatui::style::Color;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

use crate::error::StoreError;

/// Closed set of colour themes. The string form is what gets persisted.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    AsRefStr,
    Display,
    EnumIter,
    EnumString,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum ThemeId {
    #[default]
    Sakura,
    DesertRose,
    CherryCola,
}

impl ThemeId {
    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        ThemeId::from_str(raw).map_err(|_| StoreError::UnknownTheme(raw.to_string()))
    }

    pub fn all() -> impl Iterator<Item = ThemeId> {
        ThemeId::iter()
    }

    pub fn display_name(self) -> &'static str {
        self.palette().name
    }

    pub fn palette(self) -> &'static ThemePalette {
        match self {
            ThemeId::Sakura => &SAKURA,
            ThemeId::DesertRose => &DESERT_ROSE,
            ThemeId::CherryCola => &CHERRY_COLA,
        }
    }
}

/// Style slots a presentation layer paints with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemePalette {
    pub name: &'static str,
    pub primary: Color,
    pub primary_hover: Color,
    pub sidebar: Color,
    pub accent: Color,
    pub accent_hover: Color,
    pub text: Color,
    pub folder_text: Color,
    pub note_background: Color,
    pub note_border: Color,
    pub note_text: Color,
    pub main_background: Color,
    pub input_border: Color,
    pub input_background: Color,
}

const WHITE: Color = Color::Rgb(0xff, 0xff, 0xff);

static SAKURA: ThemePalette = ThemePalette {
    name: "Sakura",
    primary: Color::Rgb(0xec, 0x48, 0x99),
    primary_hover: Color::Rgb(0xdb, 0x27, 0x77),
    sidebar: Color::Rgb(0xfd, 0xf2, 0xf8),
    accent: Color::Rgb(0xfc, 0xe7, 0xf3),
    accent_hover: Color::Rgb(0xfb, 0xcf, 0xe8),
    text: Color::Rgb(0x37, 0x41, 0x51),
    folder_text: Color::Rgb(0x4b, 0x55, 0x63),
    note_background: WHITE,
    note_border: Color::Rgb(0xf3, 0xf4, 0xf6),
    note_text: Color::Rgb(0x37, 0x41, 0x51),
    main_background: WHITE,
    input_border: Color::Rgb(0xe5, 0xe7, 0xeb),
    input_background: WHITE,
};

static DESERT_ROSE: ThemePalette = ThemePalette {
    name: "Desert Rose",
    primary: Color::Rgb(0xfb, 0x71, 0x85),
    primary_hover: Color::Rgb(0xf4, 0x3f, 0x5e),
    sidebar: Color::Rgb(0xff, 0xfb, 0xeb),
    accent: Color::Rgb(0xfe, 0xf3, 0xc7),
    accent_hover: Color::Rgb(0xfd, 0xe6, 0x8a),
    text: Color::Rgb(0x78, 0x35, 0x0f),
    folder_text: Color::Rgb(0xb4, 0x53, 0x09),
    note_background: Color::Rgb(0xff, 0xfb, 0xeb),
    note_border: Color::Rgb(0xfe, 0xf3, 0xc7),
    note_text: Color::Rgb(0x78, 0x35, 0x0f),
    main_background: WHITE,
    input_border: Color::Rgb(0xfd, 0xe6, 0x8a),
    input_background: WHITE,
};

static CHERRY_COLA: ThemePalette = ThemePalette {
    name: "Cherry Cola",
    primary: Color::Rgb(0x0f, 0x17, 0x2a),
    primary_hover: Color::Rgb(0x1e, 0x29, 0x3b),
    sidebar: Color::Rgb(0x0f, 0x17, 0x2a),
    accent: Color::Rgb(0x1e, 0x29, 0x3b),
    accent_hover: Color::Rgb(0x33, 0x41, 0x55),
    text: Color::Rgb(0xfb, 0xcf, 0xe8),
    folder_text: Color::Rgb(0xf9, 0xa8, 0xd4),
    note_background: Color::Rgb(0x0f, 0x17, 0x2a),
    note_border: Color::Rgb(0x1e, 0x29, 0x3b),
    note_text: Color::Rgb(0xfb, 0xcf, 0xe8),
    main_background: Color::Rgb(0x02, 0x06, 0x17),
    input_border: Color::Rgb(0x33, 0x41, 0x55),
    input_background: Color::Rgb(0x0f, 0x17, 0x2a),
};

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn identifiers_use_stored_spelling() {
        assert_eq!(ThemeId::Sakura.as_ref(), "sakura");
        assert_eq!(ThemeId::DesertRose.to_string(), "desertRose");
        assert_eq!(ThemeId::parse("cherryCola"), Ok(ThemeId::CherryCola));
        assert_eq!(ThemeId::default(), ThemeId::Sakura);
    }

    #[test]
    fn unknown_identifier_is_rejected() {
        assert_matches!(
            ThemeId::parse("midnight"),
            Err(StoreError::UnknownTheme(name)) if name == "midnight"
        );
        // identifiers are case-sensitive
        assert!(ThemeId::parse("DesertRose").is_err());
    }

    #[test]
    fn padded_identifier_is_rejected() {
        assert_matches!(
            ThemeId::parse(" sakura"),
            Err(StoreError::UnknownTheme(name)) if name == " sakura"
        );
        assert!(ThemeId::parse("cherryCola\n").is_err());
    }

    #[test]
    fn every_theme_has_a_distinct_palette() {
        let names: Vec<_> = ThemeId::all().map(ThemeId::display_name).collect();
        assert_eq!(names, vec!["Sakura", "Desert Rose", "Cherry Cola"]);
        assert_ne!(ThemeId::Sakura.palette(), ThemeId::CherryCola.palette());
    }
}
