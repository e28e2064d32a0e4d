use crate::engine::Element;
use ratatui::style::Color;
use std::collections::HashMap;

/// Style properties the engine accepts per structural element. Absent fields
/// fall through to document styling, then to engine defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StyleProps {
    pub color: Option<Color>,
    pub background: Option<Color>,
}

impl StyleProps {
    pub fn color(color: Color) -> Self {
        Self {
            color: Some(color),
            background: None,
        }
    }

    pub fn color_on(color: Color, background: Color) -> Self {
        Self {
            color: Some(color),
            background: Some(background),
        }
    }

    /// Overlay `self` on top of `under`: set fields win, unset fields show
    /// through.
    pub fn over(self, under: StyleProps) -> StyleProps {
        StyleProps {
            color: self.color.or(under.color),
            background: self.background.or(under.background),
        }
    }
}

/// A selector-to-properties mapping handed to the rendering engine's theming
/// hook. Keys are the structural text elements of the rendered content.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleRules {
    rules: HashMap<Element, StyleProps>,
}

pub const READABLE_TEXT: Color = Color::Rgb(0x11, 0x11, 0x11);
pub const READABLE_BACKGROUND: Color = Color::Rgb(0xff, 0xff, 0xff);

impl StyleRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, element: Element, props: StyleProps) {
        self.rules.insert(element, props);
    }

    pub fn get(&self, element: Element) -> Option<StyleProps> {
        self.rules.get(&element).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Fold `other` in underneath the existing rules: properties already set
    /// here win, gaps are filled from `other`.
    pub fn merge_under(&mut self, other: &StyleRules) {
        for (element, props) in &other.rules {
            let merged = self.get(*element).unwrap_or_default().over(*props);
            self.rules.insert(*element, merged);
        }
    }

    /// The forced readability palette: dark text on a light background for
    /// body and paragraphs, dark text for every heading level. Applied on
    /// every successful load, overriding whatever the document declares.
    /// This is not a user preference.
    pub fn readable() -> Self {
        let mut rules = Self::new();
        rules.set(
            Element::Body,
            StyleProps::color_on(READABLE_TEXT, READABLE_BACKGROUND),
        );
        rules.set(
            Element::Paragraph,
            StyleProps::color_on(READABLE_TEXT, READABLE_BACKGROUND),
        );
        for level in 1..=6 {
            rules.set(Element::Heading(level), StyleProps::color(READABLE_TEXT));
        }
        rules
    }
}

/// Fixed colors for the chrome around the content: borders, footer controls,
/// the error banner. Content colors come from `StyleRules`, never from here.
#[derive(Debug, Clone, Copy)]
pub struct InterfacePalette {
    pub text: Color,
    pub muted: Color,
    pub border: Color,
    pub error: Color,
    pub highlight_bg: Color,
    pub highlight_fg: Color,
}

pub const INTERFACE: InterfacePalette = InterfacePalette {
    text: Color::Rgb(0xc0, 0xc5, 0xce),
    muted: Color::Rgb(0x65, 0x73, 0x7e),
    border: Color::Rgb(0x4f, 0x5b, 0x66),
    error: Color::Rgb(0xec, 0x5f, 0x67),
    highlight_bg: Color::Rgb(0x4f, 0x5b, 0x66),
    highlight_fg: Color::Rgb(0xf0, 0xf4, 0xf8),
};
