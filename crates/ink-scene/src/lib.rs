//! Host scene-graph contract and an in-memory reference host.
//!
//! The converter only ever talks to a [`SceneHost`]; a design-authoring
//! application implements the trait over its real canvas API. [`MemoryScene`]
//! is the complete in-process implementation used by tests and the CLI.

use std::collections::HashMap;

use ink_core::ConvertError;
use ink_core::ConvertResult;
use ink_core::Rgb;

/// ID used to address nodes owned by a host.
pub type NodeHandle = u64;

/// Axis along which a container stacks its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stacking {
    Horizontal,
    Vertical,
}

impl Stacking {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Horizontal => "horizontal",
            Self::Vertical => "vertical",
        }
    }
}

/// One of a node's two layout axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// Whether a node sizes itself to content or keeps an explicit size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sizing {
    Auto,
    Fixed,
}

/// Named font style the host can resolve for a family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Regular,
    Bold,
    Italic,
    BoldItalic,
}

impl FontStyle {
    pub fn from_flags(bold: bool, italic: bool) -> Self {
        match (bold, italic) {
            (true, true) => Self::BoldItalic,
            (true, false) => Self::Bold,
            (false, true) => Self::Italic,
            (false, false) => Self::Regular,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Regular => "Regular",
            Self::Bold => "Bold",
            Self::Italic => "Italic",
            Self::BoldItalic => "Bold Italic",
        }
    }
}

/// Narrow node-factory interface the conversion drives.
///
/// Every operation may fail with a host fault; `ensure_font` is the one call
/// that may block while the host loads a face, and its failure is recoverable
/// by the caller.
pub trait SceneHost {
    fn document_root(&self) -> NodeHandle;
    fn create_container(&mut self) -> ConvertResult<NodeHandle>;
    fn create_text(&mut self) -> ConvertResult<NodeHandle>;
    fn append_child(&mut self, parent: NodeHandle, child: NodeHandle) -> ConvertResult<()>;
    fn set_stacking(&mut self, node: NodeHandle, stacking: Stacking) -> ConvertResult<()>;
    fn set_sizing(&mut self, node: NodeHandle, axis: Axis, mode: Sizing) -> ConvertResult<()>;
    fn set_fill(&mut self, node: NodeHandle, color: Rgb) -> ConvertResult<()>;
    fn size(&self, node: NodeHandle) -> ConvertResult<(f32, f32)>;
    fn resize(&mut self, node: NodeHandle, width: f32, height: f32) -> ConvertResult<()>;
    fn set_padding(&mut self, node: NodeHandle, padding: f32) -> ConvertResult<()>;
    fn set_item_spacing(&mut self, node: NodeHandle, spacing: f32) -> ConvertResult<()>;
    /// Makes `family` available in `style`, loading it if needed.
    fn ensure_font(&mut self, family: &str, style: FontStyle) -> ConvertResult<()>;
    fn set_characters(&mut self, node: NodeHandle, text: &str) -> ConvertResult<()>;
    fn set_font(&mut self, node: NodeHandle, family: &str, style: FontStyle) -> ConvertResult<()>;
    fn set_font_size(&mut self, node: NodeHandle, size: f32) -> ConvertResult<()>;
}

/// Container-node state tracked by the in-memory host.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerProps {
    pub stacking: Stacking,
    pub sizing_horizontal: Sizing,
    pub sizing_vertical: Sizing,
    pub item_spacing: f32,
    pub padding: f32,
    pub fill: Option<Rgb>,
    pub width: f32,
    pub height: f32,
}

impl Default for ContainerProps {
    fn default() -> Self {
        Self {
            stacking: Stacking::Vertical,
            sizing_horizontal: Sizing::Fixed,
            sizing_vertical: Sizing::Fixed,
            item_spacing: 0.0,
            padding: 0.0,
            fill: None,
            width: 100.0,
            height: 100.0,
        }
    }
}

/// Text-leaf state tracked by the in-memory host.
#[derive(Debug, Clone, PartialEq)]
pub struct TextProps {
    pub characters: String,
    pub font_family: String,
    pub font_style: FontStyle,
    pub font_size: f32,
    pub fill: Option<Rgb>,
    pub sizing_horizontal: Sizing,
    pub sizing_vertical: Sizing,
    pub width: f32,
    pub height: f32,
}

impl Default for TextProps {
    fn default() -> Self {
        Self {
            characters: String::new(),
            font_family: "Inter".to_owned(),
            font_style: FontStyle::Regular,
            font_size: 16.0,
            fill: None,
            sizing_horizontal: Sizing::Fixed,
            sizing_vertical: Sizing::Fixed,
            width: 0.0,
            height: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SceneNodeKind {
    Document,
    Container(ContainerProps),
    Text(TextProps),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub kind: SceneNodeKind,
    pub children: Vec<NodeHandle>,
}

const DEFAULT_FONT_FAMILIES: [&str; 3] = ["Inter", "Roboto", "Arial"];

/// In-memory scene host backed by a node arena.
#[derive(Debug)]
pub struct MemoryScene {
    nodes: HashMap<NodeHandle, SceneNode>,
    next_handle: NodeHandle,
    document: NodeHandle,
    font_families: Vec<String>,
    loaded_fonts: Vec<(String, FontStyle)>,
}

impl Default for MemoryScene {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryScene {
    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(
            1,
            SceneNode {
                kind: SceneNodeKind::Document,
                children: Vec::new(),
            },
        );

        Self {
            nodes,
            next_handle: 2,
            document: 1,
            font_families: DEFAULT_FONT_FAMILIES
                .iter()
                .map(|family| (*family).to_owned())
                .collect(),
            loaded_fonts: Vec::new(),
        }
    }

    /// Replaces the set of families `ensure_font` will accept.
    pub fn with_font_families<I, S>(families: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut scene = Self::new();
        scene.font_families = families.into_iter().map(Into::into).collect();
        scene
    }

    pub fn node(&self, handle: NodeHandle) -> Option<&SceneNode> {
        self.nodes.get(&handle)
    }

    pub fn children(&self, handle: NodeHandle) -> &[NodeHandle] {
        self.nodes
            .get(&handle)
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
    }

    pub fn container(&self, handle: NodeHandle) -> Option<&ContainerProps> {
        match self.nodes.get(&handle).map(|node| &node.kind) {
            Some(SceneNodeKind::Container(props)) => Some(props),
            _ => None,
        }
    }

    pub fn text(&self, handle: NodeHandle) -> Option<&TextProps> {
        match self.nodes.get(&handle).map(|node| &node.kind) {
            Some(SceneNodeKind::Text(props)) => Some(props),
            _ => None,
        }
    }

    /// Families/styles that went through `ensure_font`, in request order.
    pub fn loaded_fonts(&self) -> &[(String, FontStyle)] {
        &self.loaded_fonts
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Indented text dump of the tree under `handle`, for CLI output and
    /// debugging.
    pub fn outline(&self, handle: NodeHandle) -> String {
        let mut out = String::new();
        self.write_outline(handle, 0, &mut out);
        out
    }

    fn write_outline(&self, handle: NodeHandle, depth: usize, out: &mut String) {
        let Some(node) = self.nodes.get(&handle) else {
            return;
        };

        for _ in 0..depth {
            out.push_str("  ");
        }

        match &node.kind {
            SceneNodeKind::Document => out.push_str("document\n"),
            SceneNodeKind::Container(props) => {
                out.push_str(&format!(
                    "container stacking={} spacing={} size={}x{} fill={}\n",
                    props.stacking.as_str(),
                    props.item_spacing,
                    props.width,
                    props.height,
                    props.fill.map(rgb_hex).unwrap_or_else(|| "none".to_owned()),
                ));
            }
            SceneNodeKind::Text(props) => {
                out.push_str(&format!(
                    "text {:?} font=\"{} {}\" size={} fill={}\n",
                    props.characters,
                    props.font_family,
                    props.font_style.as_str(),
                    props.font_size,
                    props.fill.map(rgb_hex).unwrap_or_else(|| "none".to_owned()),
                ));
            }
        }

        for child in &node.children {
            self.write_outline(*child, depth + 1, out);
        }
    }

    fn insert(&mut self, kind: SceneNodeKind) -> NodeHandle {
        let handle = self.next_handle;
        self.next_handle += 1;
        self.nodes.insert(
            handle,
            SceneNode {
                kind,
                children: Vec::new(),
            },
        );
        handle
    }

    fn node_mut(&mut self, handle: NodeHandle) -> ConvertResult<&mut SceneNode> {
        self.nodes.get_mut(&handle).ok_or_else(|| {
            ConvertError::new("scene.unknown_node", format!("no node with handle {handle}"))
        })
    }

    fn container_mut(&mut self, handle: NodeHandle) -> ConvertResult<&mut ContainerProps> {
        match &mut self.node_mut(handle)?.kind {
            SceneNodeKind::Container(props) => Ok(props),
            _ => Err(ConvertError::new(
                "scene.not_a_container",
                format!("node {handle} is not a container"),
            )),
        }
    }

    fn text_mut(&mut self, handle: NodeHandle) -> ConvertResult<&mut TextProps> {
        match &mut self.node_mut(handle)?.kind {
            SceneNodeKind::Text(props) => Ok(props),
            _ => Err(ConvertError::new(
                "scene.not_a_text",
                format!("node {handle} is not a text leaf"),
            )),
        }
    }
}

impl SceneHost for MemoryScene {
    fn document_root(&self) -> NodeHandle {
        self.document
    }

    fn create_container(&mut self) -> ConvertResult<NodeHandle> {
        Ok(self.insert(SceneNodeKind::Container(ContainerProps::default())))
    }

    fn create_text(&mut self) -> ConvertResult<NodeHandle> {
        Ok(self.insert(SceneNodeKind::Text(TextProps::default())))
    }

    fn append_child(&mut self, parent: NodeHandle, child: NodeHandle) -> ConvertResult<()> {
        if child == self.document {
            return Err(ConvertError::new(
                "scene.document_not_attachable",
                "the document root cannot become a child",
            ));
        }
        if !self.nodes.contains_key(&child) {
            return Err(ConvertError::new(
                "scene.unknown_node",
                format!("no node with handle {child}"),
            ));
        }

        let parent_node = self.node_mut(parent)?;
        if matches!(parent_node.kind, SceneNodeKind::Text(_)) {
            return Err(ConvertError::new(
                "scene.not_a_container",
                format!("node {parent} cannot own children"),
            ));
        }

        parent_node.children.push(child);
        Ok(())
    }

    fn set_stacking(&mut self, node: NodeHandle, stacking: Stacking) -> ConvertResult<()> {
        self.container_mut(node)?.stacking = stacking;
        Ok(())
    }

    fn set_sizing(&mut self, node: NodeHandle, axis: Axis, mode: Sizing) -> ConvertResult<()> {
        match &mut self.node_mut(node)?.kind {
            SceneNodeKind::Container(props) => {
                match axis {
                    Axis::Horizontal => props.sizing_horizontal = mode,
                    Axis::Vertical => props.sizing_vertical = mode,
                }
                Ok(())
            }
            SceneNodeKind::Text(props) => {
                match axis {
                    Axis::Horizontal => props.sizing_horizontal = mode,
                    Axis::Vertical => props.sizing_vertical = mode,
                }
                Ok(())
            }
            SceneNodeKind::Document => Err(ConvertError::new(
                "scene.not_sizable",
                "the document root has no sizing modes",
            )),
        }
    }

    fn set_fill(&mut self, node: NodeHandle, color: Rgb) -> ConvertResult<()> {
        match &mut self.node_mut(node)?.kind {
            SceneNodeKind::Container(props) => {
                props.fill = Some(color);
                Ok(())
            }
            SceneNodeKind::Text(props) => {
                props.fill = Some(color);
                Ok(())
            }
            SceneNodeKind::Document => Err(ConvertError::new(
                "scene.not_fillable",
                "the document root has no fill",
            )),
        }
    }

    fn size(&self, node: NodeHandle) -> ConvertResult<(f32, f32)> {
        match self.nodes.get(&node).map(|entry| &entry.kind) {
            Some(SceneNodeKind::Container(props)) => Ok((props.width, props.height)),
            Some(SceneNodeKind::Text(props)) => Ok((props.width, props.height)),
            Some(SceneNodeKind::Document) => Err(ConvertError::new(
                "scene.not_sizable",
                "the document root has no size",
            )),
            None => Err(ConvertError::new(
                "scene.unknown_node",
                format!("no node with handle {node}"),
            )),
        }
    }

    fn resize(&mut self, node: NodeHandle, width: f32, height: f32) -> ConvertResult<()> {
        match &mut self.node_mut(node)?.kind {
            SceneNodeKind::Container(props) => {
                props.width = width;
                props.height = height;
                Ok(())
            }
            SceneNodeKind::Text(props) => {
                props.width = width;
                props.height = height;
                Ok(())
            }
            SceneNodeKind::Document => Err(ConvertError::new(
                "scene.not_sizable",
                "the document root cannot be resized",
            )),
        }
    }

    fn set_padding(&mut self, node: NodeHandle, padding: f32) -> ConvertResult<()> {
        self.container_mut(node)?.padding = padding;
        Ok(())
    }

    fn set_item_spacing(&mut self, node: NodeHandle, spacing: f32) -> ConvertResult<()> {
        self.container_mut(node)?.item_spacing = spacing;
        Ok(())
    }

    fn ensure_font(&mut self, family: &str, style: FontStyle) -> ConvertResult<()> {
        let known = self
            .font_families
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(family));
        if !known {
            return Err(ConvertError::new(
                "scene.font_unavailable",
                format!("font family `{family}` ({}) is not installed", style.as_str()),
            ));
        }

        let already = self
            .loaded_fonts
            .iter()
            .any(|(loaded, loaded_style)| loaded == family && *loaded_style == style);
        if !already {
            self.loaded_fonts.push((family.to_owned(), style));
        }
        Ok(())
    }

    fn set_characters(&mut self, node: NodeHandle, text: &str) -> ConvertResult<()> {
        self.text_mut(node)?.characters = text.to_owned();
        Ok(())
    }

    fn set_font(&mut self, node: NodeHandle, family: &str, style: FontStyle) -> ConvertResult<()> {
        let props = self.text_mut(node)?;
        props.font_family = family.to_owned();
        props.font_style = style;
        Ok(())
    }

    fn set_font_size(&mut self, node: NodeHandle, size: f32) -> ConvertResult<()> {
        self.text_mut(node)?.font_size = size;
        Ok(())
    }
}

fn rgb_hex(color: Rgb) -> String {
    let to_byte = |channel: f32| (channel.clamp(0.0, 1.0) * 255.0).round() as u8;
    format!(
        "#{:02x}{:02x}{:02x}",
        to_byte(color.r),
        to_byte(color.g),
        to_byte(color.b)
    )
}

#[cfg(test)]
mod tests {
    use super::FontStyle;
    use super::MemoryScene;
    use super::SceneHost;
    use super::Stacking;
    use ink_core::Rgb;

    #[test]
    fn font_style_combines_flags() {
        assert_eq!(FontStyle::from_flags(false, false), FontStyle::Regular);
        assert_eq!(FontStyle::from_flags(true, false), FontStyle::Bold);
        assert_eq!(FontStyle::from_flags(false, true), FontStyle::Italic);
        assert_eq!(FontStyle::from_flags(true, true), FontStyle::BoldItalic);
        assert_eq!(FontStyle::BoldItalic.as_str(), "Bold Italic");
    }

    #[test]
    fn children_keep_append_order() {
        let mut scene = MemoryScene::new();
        let parent = scene.create_container();
        assert!(parent.is_ok());
        let parent = parent.unwrap_or_else(|_| unreachable!());

        let first = scene.create_text();
        let second = scene.create_container();
        assert!(first.is_ok());
        assert!(second.is_ok());
        let first = first.unwrap_or_else(|_| unreachable!());
        let second = second.unwrap_or_else(|_| unreachable!());

        assert!(scene.append_child(parent, first).is_ok());
        assert!(scene.append_child(parent, second).is_ok());
        assert_eq!(scene.children(parent), &[first, second]);
    }

    #[test]
    fn container_setters_reject_text_nodes() {
        let mut scene = MemoryScene::new();
        let text = scene.create_text().unwrap_or_else(|_| unreachable!());

        let result = scene.set_stacking(text, Stacking::Horizontal);
        assert!(result.is_err());
        if let Err(error) = result {
            assert_eq!(error.code, "scene.not_a_container");
        }
    }

    #[test]
    fn text_nodes_cannot_own_children() {
        let mut scene = MemoryScene::new();
        let text = scene.create_text().unwrap_or_else(|_| unreachable!());
        let child = scene.create_container().unwrap_or_else(|_| unreachable!());
        assert!(scene.append_child(text, child).is_err());
    }

    #[test]
    fn unknown_families_fail_to_load() {
        let mut scene = MemoryScene::with_font_families(["Inter"]);
        assert!(scene.ensure_font("Inter", FontStyle::Bold).is_ok());

        let missing = scene.ensure_font("Comic Sans MS", FontStyle::Regular);
        assert!(missing.is_err());
        if let Err(error) = missing {
            assert_eq!(error.code, "scene.font_unavailable");
        }

        assert_eq!(scene.loaded_fonts().len(), 1);
    }

    #[test]
    fn resize_keeps_independent_axes_via_size_read() {
        let mut scene = MemoryScene::new();
        let node = scene.create_container().unwrap_or_else(|_| unreachable!());

        let size = scene.size(node);
        assert_eq!(size, Ok((100.0, 100.0)));

        assert!(scene.resize(node, 200.0, 100.0).is_ok());
        assert_eq!(scene.size(node), Ok((200.0, 100.0)));
    }

    #[test]
    fn outline_reports_fills_and_fonts() {
        let mut scene = MemoryScene::new();
        let container = scene.create_container().unwrap_or_else(|_| unreachable!());
        assert!(scene.set_fill(container, Rgb::from_rgb8(238, 238, 238)).is_ok());
        assert!(scene.append_child(scene.document_root(), container).is_ok());

        let outline = scene.outline(scene.document_root());
        assert!(outline.contains("document"));
        assert!(outline.contains("fill=#eeeeee"));
    }
}
