//! Conversion pipeline from request payload to populated scene tree.
//!
//! One call owns its rule table, diagnostics, and output tree exclusively;
//! concurrent conversions share nothing. Exactly one terminal outcome is
//! produced per call: a [`Conversion`] with a summary, or a failure. Partial
//! trees already appended to the host are not rolled back on failure.

use ink_core::ConvertError;
use ink_core::ConvertResult;
use ink_core::Diagnostics;
use ink_mapper::MapStats;
use ink_mapper::TreeMapper;
use ink_markup::MarkupParser;
use ink_scene::Axis;
use ink_scene::NodeHandle;
use ink_scene::SceneHost;
use ink_scene::Sizing;
use ink_scene::Stacking;
use ink_style::EffectiveStyle;
use ink_style::StyleSheetCompiler;
use serde::Deserialize;
use serde::Serialize;

/// The only request kind the converter understands.
pub const REQUEST_KIND_CONVERT: &str = "convert";

/// Uniform padding applied to the generated root container.
pub const ROOT_PADDING: f32 = 20.0;

/// Incoming command payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertRequest {
    pub kind: String,
    pub markup: String,
    pub stylesheet: String,
}

impl ConvertRequest {
    pub fn new(markup: impl Into<String>, stylesheet: impl Into<String>) -> Self {
        Self {
            kind: REQUEST_KIND_CONVERT.to_owned(),
            markup: markup.into(),
            stylesheet: stylesheet.into(),
        }
    }
}

/// Successful outcome of one conversion call.
#[derive(Debug)]
pub struct Conversion {
    /// The populated root container, already appended to the host's document.
    pub root: NodeHandle,
    pub stats: MapStats,
    pub summary: String,
    pub diagnostics: Diagnostics,
}

/// Orchestrates stylesheet compilation and tree mapping into a host.
#[derive(Debug, Default)]
pub struct ConversionPipeline {
    parser: MarkupParser,
    compiler: StyleSheetCompiler,
    mapper: TreeMapper,
}

impl ConversionPipeline {
    /// Decodes a JSON request payload and converts it.
    pub fn convert_payload(
        &self,
        payload: &str,
        host: &mut dyn SceneHost,
    ) -> ConvertResult<Conversion> {
        let request: ConvertRequest = serde_json::from_str(payload).map_err(|error| {
            ConvertError::new(
                "convert.invalid_request",
                format!("request payload is not valid JSON: {error}"),
            )
        })?;
        self.convert(&request, host)
    }

    pub fn convert(
        &self,
        request: &ConvertRequest,
        host: &mut dyn SceneHost,
    ) -> ConvertResult<Conversion> {
        if request.kind != REQUEST_KIND_CONVERT {
            return Err(ConvertError::new(
                "convert.unsupported_request",
                format!("unknown request kind `{}`", request.kind),
            ));
        }

        let mut diagnostics = Diagnostics::new();
        let table = self.compiler.compile(&request.stylesheet, &mut diagnostics)?;
        let nodes = self.parser.parse(&request.markup);

        let root = host.create_container()?;
        host.set_stacking(root, Stacking::Vertical)?;
        host.set_sizing(root, Axis::Horizontal, Sizing::Auto)?;
        host.set_sizing(root, Axis::Vertical, Sizing::Auto)?;
        host.set_padding(root, ROOT_PADDING)?;
        host.append_child(host.document_root(), root)?;

        let stats = self.mapper.map_nodes(
            &nodes,
            root,
            &table,
            &EffectiveStyle::default(),
            host,
            &mut diagnostics,
        )?;

        let summary = format!(
            "generated {} containers and {} text leaves from {} rules",
            stats.containers,
            stats.text_leaves,
            table.len()
        );

        Ok(Conversion {
            root,
            stats,
            summary,
            diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Conversion;
    use super::ConversionPipeline;
    use super::ConvertRequest;
    use super::ROOT_PADDING;
    use ink_core::Rgb;
    use ink_scene::FontStyle;
    use ink_scene::MemoryScene;
    use ink_scene::SceneHost;
    use ink_scene::Sizing;
    use ink_scene::Stacking;

    fn convert(markup: &str, css: &str, scene: &mut MemoryScene) -> Conversion {
        let request = ConvertRequest::new(markup, css);
        match ConversionPipeline::default().convert(&request, scene) {
            Ok(conversion) => conversion,
            Err(error) => unreachable!("conversion failed: {error}"),
        }
    }

    #[test]
    fn card_scenario_produces_expected_tree() {
        let mut scene = MemoryScene::new();
        let conversion = convert(
            r#"<div class="card"><h1>Title</h1><p>Body</p></div>"#,
            ".card{background-color:#eeeeee;display:flex;flex-direction:column;gap:10px} \
             h1{font-weight:bold}",
            &mut scene,
        );

        // Root container: vertical, auto-sized, fixed padding, on the
        // document.
        let Some(root) = scene.container(conversion.root) else {
            unreachable!();
        };
        assert_eq!(root.stacking, Stacking::Vertical);
        assert_eq!(root.sizing_horizontal, Sizing::Auto);
        assert_eq!(root.sizing_vertical, Sizing::Auto);
        assert_eq!(root.padding, ROOT_PADDING);
        assert_eq!(scene.children(scene.document_root()), &[conversion.root]);

        // One card container with the rule-matched fill, stacking, spacing.
        let children = scene.children(conversion.root);
        assert_eq!(children.len(), 1);
        let Some(card) = scene.container(children[0]) else {
            unreachable!();
        };
        let Some(card_fill) = card.fill else {
            unreachable!();
        };
        assert!(card_fill.approx_eq(Rgb::from_rgb8(238, 238, 238)));
        assert_eq!(card.stacking, Stacking::Vertical);
        assert_eq!(card.item_spacing, 10.0);

        // Two text leaves in document order, bold then regular, black fill.
        let card_children = scene.children(children[0]);
        assert_eq!(card_children.len(), 2);

        let Some(title) = scene.text(card_children[0]) else {
            unreachable!();
        };
        assert_eq!(title.characters, "Title");
        assert_eq!(title.font_style, FontStyle::Bold);
        assert_eq!(title.fill, Some(Rgb::BLACK));

        let Some(body) = scene.text(card_children[1]) else {
            unreachable!();
        };
        assert_eq!(body.characters, "Body");
        assert_eq!(body.font_style, FontStyle::Regular);
        assert_eq!(body.fill, Some(Rgb::BLACK));

        assert_eq!(conversion.stats.containers, 1);
        assert_eq!(conversion.stats.text_leaves, 2);
        assert!(conversion.diagnostics.is_empty());
    }

    #[test]
    fn summary_reports_counts() {
        let mut scene = MemoryScene::new();
        let conversion = convert(
            "<div><p>one</p><p>two</p></div>",
            "div { display: flex }",
            &mut scene,
        );
        assert_eq!(
            conversion.summary,
            "generated 1 containers and 2 text leaves from 1 rules"
        );
    }

    #[test]
    fn unknown_request_kinds_are_rejected() {
        let mut scene = MemoryScene::new();
        let request = ConvertRequest {
            kind: "inspect".to_owned(),
            markup: String::new(),
            stylesheet: String::new(),
        };

        let result = ConversionPipeline::default().convert(&request, &mut scene);
        assert!(result.is_err());
        if let Err(error) = result {
            assert_eq!(error.code, "convert.unsupported_request");
        }
    }

    #[test]
    fn stylesheet_parse_failure_aborts_the_conversion() {
        let mut scene = MemoryScene::new();
        let request = ConvertRequest::new("<p>hi</p>", "p { color: red");

        let result = ConversionPipeline::default().convert(&request, &mut scene);
        assert!(result.is_err());
        if let Err(error) = result {
            assert_eq!(error.code, "css.unbalanced_block");
        }

        // The failure happened before any node was created.
        assert!(scene.children(scene.document_root()).is_empty());
    }

    #[test]
    fn json_payload_round_trip() {
        let mut scene = MemoryScene::new();
        let payload = r#"{
            "kind": "convert",
            "markup": "<p>From JSON</p>",
            "stylesheet": "p { color: blue }"
        }"#;

        let conversion = ConversionPipeline::default().convert_payload(payload, &mut scene);
        assert!(conversion.is_ok());
        let conversion = conversion.unwrap_or_else(|_| unreachable!());
        assert_eq!(conversion.stats.text_leaves, 1);

        let leaf = scene.children(conversion.root)[0];
        let Some(text) = scene.text(leaf) else {
            unreachable!();
        };
        assert_eq!(text.fill, Some(Rgb::new(0.0, 0.0, 1.0)));
    }

    #[test]
    fn malformed_payload_is_a_single_failure() {
        let mut scene = MemoryScene::new();
        let result = ConversionPipeline::default().convert_payload("not json", &mut scene);
        assert!(result.is_err());
        if let Err(error) = result {
            assert_eq!(error.code, "convert.invalid_request");
        }
    }

    #[test]
    fn recoverable_conditions_accumulate_into_diagnostics() {
        let mut scene = MemoryScene::new();
        let conversion = convert(
            "<div><p>text</p></div>",
            "div { background-color: chartreuse; width: auto } div { } p:hover { color: red }",
            &mut scene,
        );

        assert!(conversion.diagnostics.contains_code("style.unsupported_color"));
        assert!(
            conversion
                .diagnostics
                .contains_code("style.malformed_dimension")
        );
        assert!(conversion.diagnostics.contains_code("style.empty_rule"));
        assert!(
            conversion
                .diagnostics
                .contains_code("style.unsupported_selector")
        );
    }

    #[test]
    fn identical_requests_produce_identical_trees() {
        let markup = "<div class=\"a b\" id=\"x\"><p>t</p></div>";
        let css = "div { color: red } .a { color: green } .b { color: blue } #x { color: white }";

        let mut first_scene = MemoryScene::new();
        let first = convert(markup, css, &mut first_scene);
        let mut second_scene = MemoryScene::new();
        let second = convert(markup, css, &mut second_scene);

        assert_eq!(
            first_scene.outline(first.root),
            second_scene.outline(second.root)
        );
    }
}
