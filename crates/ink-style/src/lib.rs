//! Stylesheet compilation and effective-style resolution.
//!
//! A compiled stylesheet is a flat table from selector key (`tag`, `.class`,
//! `#id`) to a declaration map of raw string values. Effective styles are
//! materialized per element by merging matched rules over the inheritable
//! subset of the parent's effective style.

use std::collections::HashMap;

use ink_core::ConvertResult;
use ink_core::Diagnostics;
use ink_core::Rgb;
use ink_css::CssParser;

/// Properties that propagate from parent to child unless overridden.
pub const INHERITABLE_PROPERTIES: [&str; 5] = [
    "color",
    "font-family",
    "font-weight",
    "font-style",
    "font-size",
];

/// Property name to raw string value.
pub type DeclarationMap = HashMap<String, String>;

/// Compiled mapping from selector key to declaration map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleTable {
    rules: HashMap<String, DeclarationMap>,
}

impl RuleTable {
    pub fn declarations(&self, selector_key: &str) -> Option<&DeclarationMap> {
        self.rules.get(selector_key)
    }

    /// Shallow-merges `declarations` into the entry for `selector_key`;
    /// later occurrences of a selector augment earlier ones per property.
    pub fn merge(&mut self, selector_key: String, declarations: &[(String, String)]) {
        let entry = self.rules.entry(selector_key).or_default();
        for (name, value) in declarations {
            entry.insert(name.clone(), value.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Compiles CSS source text into a [`RuleTable`].
#[derive(Debug, Default)]
pub struct StyleSheetCompiler {
    parser: CssParser,
}

impl StyleSheetCompiler {
    pub fn compile(
        &self,
        css_text: &str,
        diagnostics: &mut Diagnostics,
    ) -> ConvertResult<RuleTable> {
        let mut table = RuleTable::default();

        for rule in self.parser.parse(css_text)? {
            if rule.declarations.is_empty() {
                diagnostics.warn(
                    "style.empty_rule",
                    format!("rule `{}` has no usable declarations", rule.selector),
                );
                continue;
            }

            for part in rule.selector.split(',') {
                match selector_key(part) {
                    Some(key) => table.merge(key, &rule.declarations),
                    None => diagnostics.warn(
                        "style.unsupported_selector",
                        format!("selector `{}` is not a tag, class, or id", part.trim()),
                    ),
                }
            }
        }

        Ok(table)
    }
}

/// Normalizes one selector to its table key: a bare tag name (lowercased),
/// `.class`, or `#id`. Anything else (combinators, pseudo-classes, attribute
/// selectors) is unsupported.
fn selector_key(raw: &str) -> Option<String> {
    let token = raw.trim();
    let (prefix, name) = match token.strip_prefix('.') {
        Some(rest) => (".", rest),
        None => match token.strip_prefix('#') {
            Some(rest) => ("#", rest),
            None => ("", token),
        },
    };

    if name.is_empty() || !name.chars().all(is_name_char) {
        return None;
    }

    if prefix.is_empty() {
        Some(name.to_ascii_lowercase())
    } else {
        Some(format!("{prefix}{name}"))
    }
}

fn is_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_')
}

/// The fully resolved property set applicable to one element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectiveStyle {
    properties: DeclarationMap,
}

impl EffectiveStyle {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(name.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// The subset of properties that children inherit.
    pub fn inheritable_subset(&self) -> Self {
        let mut subset = Self::default();
        for name in INHERITABLE_PROPERTIES {
            if let Some(value) = self.properties.get(name) {
                subset.properties.insert(name.to_owned(), value.clone());
            }
        }
        subset
    }
}

/// Computes effective styles from matched rules and the parent context.
#[derive(Debug, Default)]
pub struct StyleResolver;

impl StyleResolver {
    /// Merge order: tag rule, then class rules in list order, then id rule,
    /// applied over the inheritable subset of the parent's effective style.
    /// Pure: identical inputs always produce an identical result.
    pub fn resolve(
        &self,
        tag: &str,
        class_attr: Option<&str>,
        id_attr: Option<&str>,
        table: &RuleTable,
        parent: &EffectiveStyle,
    ) -> EffectiveStyle {
        let mut own: DeclarationMap = table.declarations(tag).cloned().unwrap_or_default();

        if let Some(class_list) = class_attr {
            for class in class_list.split_whitespace() {
                if let Some(declarations) = table.declarations(&format!(".{class}")) {
                    for (name, value) in declarations {
                        own.insert(name.clone(), value.clone());
                    }
                }
            }
        }

        if let Some(id) = id_attr.map(str::trim).filter(|id| !id.is_empty()) {
            if let Some(declarations) = table.declarations(&format!("#{id}")) {
                for (name, value) in declarations {
                    own.insert(name.clone(), value.clone());
                }
            }
        }

        let mut resolved = parent.inheritable_subset();
        for (name, value) in own {
            resolved.properties.insert(name, value);
        }
        resolved
    }
}

/// Maps a CSS color token to a normalized RGB triple, recovering to opaque
/// black on anything unrecognized.
#[derive(Debug, Default)]
pub struct ColorResolver;

impl ColorResolver {
    pub fn resolve(&self, token: &str, diagnostics: &mut Diagnostics) -> Rgb {
        match parse_color(token) {
            Some(color) => color,
            None => {
                diagnostics.warn(
                    "style.unsupported_color",
                    format!("unrecognized color token `{}`; using black", token.trim()),
                );
                Rgb::BLACK
            }
        }
    }
}

/// Parses a named color or `#rgb`/`#rrggbb` hex token.
pub fn parse_color(token: &str) -> Option<Rgb> {
    let raw = token.trim().to_ascii_lowercase();

    if let Some(hex) = raw.strip_prefix('#') {
        return parse_hex(hex);
    }

    match raw.as_str() {
        "black" => Some(Rgb::BLACK),
        "white" => Some(Rgb::WHITE),
        "gray" | "grey" => Some(Rgb::new(0.5, 0.5, 0.5)),
        "red" => Some(Rgb::new(1.0, 0.0, 0.0)),
        "green" => Some(Rgb::new(0.0, 1.0, 0.0)),
        "blue" => Some(Rgb::new(0.0, 0.0, 1.0)),
        "yellow" => Some(Rgb::new(1.0, 1.0, 0.0)),
        _ => None,
    }
}

fn parse_hex(value: &str) -> Option<Rgb> {
    if value.len() == 3 {
        let r = u8::from_str_radix(&value[0..1].repeat(2), 16).ok()?;
        let g = u8::from_str_radix(&value[1..2].repeat(2), 16).ok()?;
        let b = u8::from_str_radix(&value[2..3].repeat(2), 16).ok()?;
        return Some(Rgb::from_rgb8(r, g, b));
    }

    if value.len() == 6 {
        let r = u8::from_str_radix(&value[0..2], 16).ok()?;
        let g = u8::from_str_radix(&value[2..4], 16).ok()?;
        let b = u8::from_str_radix(&value[4..6], 16).ok()?;
        return Some(Rgb::from_rgb8(r, g, b));
    }

    None
}

/// Leading-integer parse for pixel dimensions: `"200px"` is 200, `"auto"`
/// is unset.
pub fn parse_dimension(value: &str) -> Option<f32> {
    let trimmed = value.trim();
    let end = trimmed
        .bytes()
        .position(|byte| !byte.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let digits = &trimmed[..end];
    if digits.is_empty() {
        return None;
    }
    digits.parse::<u32>().ok().map(|parsed| parsed as f32)
}
