//! Recursive markup-to-scene mapping.
//!
//! The walk is a strict depth-first, document-order descent. Inherited style
//! is threaded as an explicit parameter; there is no ambient style state.
//! Locally recoverable conditions (bad colors, bad dimensions, missing fonts,
//! malformed nodes) are absorbed with safe defaults so a best-effort tree is
//! always produced.

use ink_core::ConvertResult;
use ink_core::Diagnostics;
use ink_core::Rgb;
use ink_dom::ElementNode;
use ink_dom::MarkupNode;
use ink_scene::Axis;
use ink_scene::FontStyle;
use ink_scene::NodeHandle;
use ink_scene::SceneHost;
use ink_scene::Sizing;
use ink_scene::Stacking;
use ink_style::ColorResolver;
use ink_style::EffectiveStyle;
use ink_style::RuleTable;
use ink_style::StyleResolver;
use ink_style::parse_dimension;

/// Family used when no usable `font-family` is inherited or a load fails.
pub const DEFAULT_FONT_FAMILY: &str = "Inter";

/// Fill applied to containers with no matched `background-color`.
pub const DEFAULT_CONTAINER_FILL: Rgb = Rgb::new(0.9, 0.9, 0.9);

/// Node counts produced by one mapping pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MapStats {
    pub containers: u32,
    pub text_leaves: u32,
}

impl MapStats {
    fn merge(&mut self, other: Self) {
        self.containers += other.containers;
        self.text_leaves += other.text_leaves;
    }
}

/// Walks a parsed markup forest and drives a [`SceneHost`].
#[derive(Debug, Default)]
pub struct TreeMapper {
    styles: StyleResolver,
    colors: ColorResolver,
}

impl TreeMapper {
    /// Maps `nodes` in document order into children of `host_parent`.
    pub fn map_nodes(
        &self,
        nodes: &[MarkupNode],
        host_parent: NodeHandle,
        table: &RuleTable,
        inherited: &EffectiveStyle,
        host: &mut dyn SceneHost,
        diagnostics: &mut Diagnostics,
    ) -> ConvertResult<MapStats> {
        let mut stats = MapStats::default();

        for node in nodes {
            match node {
                MarkupNode::Text(content) => {
                    if self.map_text(content, host_parent, inherited, host, diagnostics)? {
                        stats.text_leaves += 1;
                    }
                }
                MarkupNode::Element(element) => {
                    let child_stats = self.map_element(
                        element,
                        host_parent,
                        table,
                        inherited,
                        host,
                        diagnostics,
                    )?;
                    stats.merge(child_stats);
                }
            }
        }

        Ok(stats)
    }

    fn map_element(
        &self,
        element: &ElementNode,
        host_parent: NodeHandle,
        table: &RuleTable,
        inherited: &EffectiveStyle,
        host: &mut dyn SceneHost,
        diagnostics: &mut Diagnostics,
    ) -> ConvertResult<MapStats> {
        if element.tag.is_empty() {
            diagnostics.warn("map.malformed_node", "skipping element with no tag name");
            return Ok(MapStats::default());
        }

        // Structural tags are transparent: no node of their own, children
        // keep the current parent and inherited style.
        if is_structural_tag(&element.tag) {
            return self.map_nodes(
                &element.children,
                host_parent,
                table,
                inherited,
                host,
                diagnostics,
            );
        }

        let style = self.styles.resolve(
            &element.tag,
            element.attribute("class"),
            element.id(),
            table,
            inherited,
        );

        // A heading- or paragraph-shaped element (text children only) maps to
        // a single text leaf carrying the element's own effective style.
        if let Some(content) = text_only_content(element) {
            let produced = self.map_text(&content, host_parent, &style, host, diagnostics)?;
            return Ok(MapStats {
                containers: 0,
                text_leaves: u32::from(produced),
            });
        }

        let container = host.create_container()?;
        self.apply_container_style(container, &style, host, diagnostics)?;
        host.append_child(host_parent, container)?;

        let mut stats = MapStats {
            containers: 1,
            text_leaves: 0,
        };
        let child_stats =
            self.map_nodes(&element.children, container, table, &style, host, diagnostics)?;
        stats.merge(child_stats);
        Ok(stats)
    }

    /// Creates one text leaf under `host_parent` styled by `style`. Returns
    /// whether a leaf was produced (whitespace-only content yields none).
    fn map_text(
        &self,
        content: &str,
        host_parent: NodeHandle,
        style: &EffectiveStyle,
        host: &mut dyn SceneHost,
        diagnostics: &mut Diagnostics,
    ) -> ConvertResult<bool> {
        let characters = content.trim();
        if characters.is_empty() {
            return Ok(false);
        }

        let mut family = style
            .get("font-family")
            .map(primary_font_family)
            .filter(|family| !family.is_empty())
            .unwrap_or_else(|| DEFAULT_FONT_FAMILY.to_owned());
        let bold = style.get("font-weight").is_some_and(is_bold_weight);
        let italic = style
            .get("font-style")
            .is_some_and(|value| value.eq_ignore_ascii_case("italic"));
        let mut font_style = FontStyle::from_flags(bold, italic);

        // Awaited before any text property is finalized; a failed load falls
        // back to the default face instead of aborting the walk.
        if let Err(error) = host.ensure_font(&family, font_style) {
            diagnostics.warn(
                "map.font_fallback",
                format!("falling back to {DEFAULT_FONT_FAMILY} Regular: {error}"),
            );
            family = DEFAULT_FONT_FAMILY.to_owned();
            font_style = FontStyle::Regular;
            if let Err(fallback_error) = host.ensure_font(&family, font_style) {
                diagnostics.warn(
                    "map.font_fallback_unavailable",
                    format!("default face also failed to load: {fallback_error}"),
                );
            }
        }

        let leaf = host.create_text()?;
        host.set_font(leaf, &family, font_style)?;
        host.set_characters(leaf, characters)?;

        if let Some(raw) = style.get("font-size") {
            match parse_dimension(raw) {
                Some(size) => host.set_font_size(leaf, size)?,
                None => diagnostics.warn(
                    "style.malformed_dimension",
                    format!("font-size `{raw}` is not an integer"),
                ),
            }
        }

        host.set_sizing(leaf, Axis::Horizontal, Sizing::Auto)?;
        host.set_sizing(leaf, Axis::Vertical, Sizing::Auto)?;

        let fill = match style.get("color") {
            Some(token) => self.colors.resolve(token, diagnostics),
            None => Rgb::BLACK,
        };
        host.set_fill(leaf, fill)?;

        host.append_child(host_parent, leaf)?;
        Ok(true)
    }

    fn apply_container_style(
        &self,
        container: NodeHandle,
        style: &EffectiveStyle,
        host: &mut dyn SceneHost,
        diagnostics: &mut Diagnostics,
    ) -> ConvertResult<()> {
        let width = style
            .get("width")
            .and_then(|raw| parse_px(raw, "width", diagnostics));
        let height = style
            .get("height")
            .and_then(|raw| parse_px(raw, "height", diagnostics));

        host.set_sizing(
            container,
            Axis::Horizontal,
            if width.is_some() {
                Sizing::Fixed
            } else {
                Sizing::Auto
            },
        )?;
        host.set_sizing(
            container,
            Axis::Vertical,
            if height.is_some() {
                Sizing::Fixed
            } else {
                Sizing::Auto
            },
        )?;

        if let Some(new_width) = width {
            let (_, current_height) = host.size(container)?;
            host.resize(container, new_width, current_height)?;
        }
        if let Some(new_height) = height {
            let (current_width, _) = host.size(container)?;
            host.resize(container, current_width, new_height)?;
        }

        let is_flex = style
            .get("display")
            .is_some_and(|value| value.eq_ignore_ascii_case("flex"));
        if is_flex {
            let stacking = match style.get("flex-direction") {
                None => Stacking::Horizontal,
                Some(direction) if direction.eq_ignore_ascii_case("row") => Stacking::Horizontal,
                Some(_) => Stacking::Vertical,
            };
            host.set_stacking(container, stacking)?;

            if let Some(raw) = style.get("gap") {
                if let Some(gap) = parse_px(raw, "gap", diagnostics) {
                    host.set_item_spacing(container, gap)?;
                }
            }
        } else {
            host.set_stacking(container, Stacking::Vertical)?;
        }

        let fill = match style.get("background-color") {
            Some(token) => self.colors.resolve(token, diagnostics),
            None => DEFAULT_CONTAINER_FILL,
        };
        host.set_fill(container, fill)?;

        Ok(())
    }
}

/// For an element with text children only (and at least one non-blank one),
/// the concatenated text content. Elements with element children or no
/// visible text map to containers instead.
fn text_only_content(element: &ElementNode) -> Option<String> {
    let mut content = String::new();
    let mut has_visible_text = false;

    for child in &element.children {
        match child {
            MarkupNode::Element(_) => return None,
            MarkupNode::Text(text) => {
                has_visible_text = has_visible_text || !text.trim().is_empty();
                content.push_str(text);
            }
        }
    }

    if has_visible_text { Some(content) } else { None }
}

fn parse_px(raw: &str, property: &str, diagnostics: &mut Diagnostics) -> Option<f32> {
    let parsed = parse_dimension(raw);
    if parsed.is_none() {
        diagnostics.warn(
            "style.malformed_dimension",
            format!("{property} `{raw}` is not an integer"),
        );
    }
    parsed
}

/// First comma-separated family token, with surrounding quotes stripped.
fn primary_font_family(value: &str) -> String {
    let first = value.split(',').next().unwrap_or("").trim();
    first
        .trim_matches(|ch| ch == '"' || ch == '\'')
        .trim()
        .to_owned()
}

/// Numeric weights of 700 and up, or the `bold` keyword.
fn is_bold_weight(value: &str) -> bool {
    if value.eq_ignore_ascii_case("bold") {
        return true;
    }
    parse_dimension(value).is_some_and(|weight| weight >= 700.0)
}

/// Tags that structure a document without producing a visual node.
fn is_structural_tag(tag: &str) -> bool {
    matches!(
        tag,
        "html" | "head" | "meta" | "title" | "link" | "script" | "style"
    )
}
