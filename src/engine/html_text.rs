//! Chapter XHTML to plain text.
//!
//! The engine does not need a full DOM for paginated reading: structural
//! blocks (paragraphs, headings) and the embedded palette are enough. A
//! regex pass keeps this dependency-light.

use crate::engine::Element;
use crate::theme::{StyleProps, StyleRules};
use ratatui::style::Color;
use regex::Regex;
use std::sync::LazyLock;

/// One structural block of chapter text, in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub element: Element,
    pub text: String,
}

static BODY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<body[^>]*>(.*?)</body>").expect("body regex")
});
static STYLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style[^>]*>(.*?)</style>").expect("style regex"));
static SCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script[^>]*>.*?</script>").expect("script regex"));
// The regex crate has no backreferences; any block-level closing tag ends
// the block. Good enough for well-formed XHTML chapters.
static BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(h[1-6]|p)\b[^>]*>(.*?)</(?:h[1-6]|p)\s*>").expect("block regex")
});
static BR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").expect("br regex"));
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag regex"));
static SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+").expect("space regex"));
static CSS_RULE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)([^{}]+)\{([^}]*)\}").expect("css rule regex"));
static CSS_COLOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|;)\s*color\s*:\s*([^;]+)").expect("css color regex")
});
static CSS_BACKGROUND_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)background(?:-color)?\s*:\s*([^;]+)").expect("css background regex")
});

/// Flatten one chapter document into structural text blocks. Text outside
/// paragraph and heading markup is attributed to the body element.
pub fn flatten(html: &str) -> Vec<TextBlock> {
    let body = BODY_RE
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(html);
    let without_styles = STYLE_RE.replace_all(body, "");
    let without_scripts = SCRIPT_RE.replace_all(&without_styles, "");
    let body: &str = &without_scripts;

    let mut blocks = Vec::new();
    let mut last_end = 0;
    for caps in BLOCK_RE.captures_iter(body) {
        let whole = caps.get(0).expect("match");
        push_block(&mut blocks, Element::Body, &body[last_end..whole.start()]);

        let tag = caps.get(1).expect("tag").as_str().to_ascii_lowercase();
        let element = match tag.as_str() {
            "p" => Element::Paragraph,
            heading => {
                let level = heading.as_bytes()[1] - b'0';
                Element::Heading(level)
            }
        };
        push_block(&mut blocks, element, caps.get(2).expect("content").as_str());
        last_end = whole.end();
    }
    push_block(&mut blocks, Element::Body, &body[last_end..]);
    blocks
}

fn push_block(blocks: &mut Vec<TextBlock>, element: Element, fragment: &str) {
    let text = clean_inline(fragment);
    if !text.is_empty() {
        blocks.push(TextBlock { element, text });
    }
}

/// Strip inline markup from a block fragment, keeping emphasis markers and
/// explicit line breaks.
fn clean_inline(fragment: &str) -> String {
    let text = BR_RE.replace_all(fragment, "\n");
    let text = text
        .replace("<em>", "_")
        .replace("</em>", "_")
        .replace("<i>", "_")
        .replace("</i>", "_")
        .replace("<strong>", "**")
        .replace("</strong>", "**")
        .replace("<b>", "**")
        .replace("</b>", "**");
    let text = TAG_RE.replace_all(&text, "");
    let text = decode_entities(&text);
    let text = SPACE_RE.replace_all(&text, " ");

    text.lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

pub fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&mdash;", "\u{2014}")
        .replace("&ndash;", "\u{2013}")
        .replace("&hellip;", "...")
        .replace("&ldquo;", "\u{201C}")
        .replace("&rdquo;", "\u{201D}")
        .replace("&lsquo;", "\u{2018}")
        .replace("&rsquo;", "\u{2019}")
}

/// Palette the document itself declares in `<style>` blocks, keyed by the
/// structural elements the theming hook knows about. This is what the
/// readability override competes against.
pub fn document_styles(html: &str) -> StyleRules {
    let mut rules = StyleRules::new();
    for style in STYLE_RE.captures_iter(html) {
        let css = style.get(1).expect("style content").as_str();
        for rule in CSS_RULE_RE.captures_iter(css) {
            let selectors = rule.get(1).expect("selectors").as_str();
            let declarations = rule.get(2).expect("declarations").as_str();

            let props = StyleProps {
                color: capture_color(&CSS_COLOR_RE, declarations),
                background: capture_color(&CSS_BACKGROUND_RE, declarations),
            };
            if props == StyleProps::default() {
                continue;
            }

            for selector in selectors.split(',') {
                if let Some(element) = match_selector(selector.trim()) {
                    let merged = props.over(rules.get(element).unwrap_or_default());
                    rules.set(element, merged);
                }
            }
        }
    }
    rules
}

fn capture_color(re: &Regex, declarations: &str) -> Option<Color> {
    re.captures(declarations)
        .and_then(|c| c.get(1))
        .and_then(|m| parse_color(m.as_str()))
}

fn match_selector(selector: &str) -> Option<Element> {
    match selector.to_ascii_lowercase().as_str() {
        "body" => Some(Element::Body),
        "p" => Some(Element::Paragraph),
        s if s.len() == 2 && s.starts_with('h') => {
            let level = s.as_bytes()[1];
            (b'1'..=b'6').contains(&level).then(|| Element::Heading(level - b'0'))
        }
        _ => None,
    }
}

fn parse_color(value: &str) -> Option<Color> {
    let value = value.replace("!important", "");
    let value = value.trim().to_ascii_lowercase();
    if let Some(hex) = value.strip_prefix('#') {
        let expanded = match hex.len() {
            3 => hex
                .chars()
                .flat_map(|c| [c, c])
                .collect::<String>(),
            6 => hex.to_string(),
            _ => return None,
        };
        let r = u8::from_str_radix(&expanded[0..2], 16).ok()?;
        let g = u8::from_str_radix(&expanded[2..4], 16).ok()?;
        let b = u8::from_str_radix(&expanded[4..6], 16).ok()?;
        return Some(Color::Rgb(r, g, b));
    }
    match value.as_str() {
        "black" => Some(Color::Rgb(0, 0, 0)),
        "white" => Some(Color::Rgb(0xff, 0xff, 0xff)),
        "gray" | "grey" => Some(Color::Rgb(0x80, 0x80, 0x80)),
        _ => None,
    }
}
