//! Per-route head elements.
//!
//! The build records which scripts and stylesheets each route needs in a
//! [`RouteInfo`]. At request time those become [`SsrElement`]s with public
//! URLs resolved through the [`Environment`].

use indexmap::IndexMap;

use crate::environment::Environment;

/// An element injected into the document head.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SsrElement {
    /// Tag name.
    pub tag: &'static str,
    /// Attributes in insertion order.
    pub props: IndexMap<String, String>,
    /// Inline content.
    pub children: String,
}

impl SsrElement {
    /// Creates an element with no attributes.
    #[must_use]
    pub fn new(tag: &'static str) -> Self {
        Self {
            tag,
            ..Self::default()
        }
    }

    /// Adds an attribute.
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.props.insert(name.into(), value.into());
        self
    }

    /// Sets the inline content.
    #[must_use]
    pub fn children(mut self, children: impl Into<String>) -> Self {
        self.children = children.into();
        self
    }

    /// Serializes the element to HTML.
    #[must_use]
    pub fn to_html(&self) -> String {
        let mut html = format!("<{}", self.tag);
        for (name, value) in &self.props {
            html.push(' ');
            html.push_str(name);
            html.push_str("=\"");
            html.push_str(&value.replace('"', "&quot;"));
            html.push('"');
        }
        html.push('>');
        if self.tag != "link" {
            html.push_str(&self.children);
            html.push_str("</");
            html.push_str(self.tag);
            html.push('>');
        }
        html
    }
}

/// A script or stylesheet, inline or by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetRef {
    /// Inline source.
    Inline(String),
    /// Asset specifier resolved to a URL at request time.
    External(String),
}

/// Asset metadata recorded for one route.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RouteInfo {
    /// Route pattern this record belongs to.
    pub route: String,
    /// Stylesheets linked with `<link rel="stylesheet">`.
    pub links: Vec<String>,
    /// Module scripts.
    pub scripts: Vec<AssetRef>,
    /// Stylesheets.
    pub styles: Vec<AssetRef>,
}

impl RouteInfo {
    /// Creates an empty record for a route.
    #[must_use]
    pub fn new(route: impl Into<String>) -> Self {
        Self {
            route: route.into(),
            ..Self::default()
        }
    }

    /// Builds `<link>` elements.
    #[must_use]
    pub fn link_elements(&self, env: &Environment) -> Vec<SsrElement> {
        self.links
            .iter()
            .map(|href| {
                SsrElement::new("link")
                    .attr("rel", "stylesheet")
                    .attr("href", env.resolve(href))
            })
            .collect()
    }

    /// Builds `<script type="module">` elements.
    #[must_use]
    pub fn script_elements(&self, env: &Environment) -> Vec<SsrElement> {
        self.scripts
            .iter()
            .map(|script| match script {
                AssetRef::Inline(source) => SsrElement::new("script")
                    .attr("type", "module")
                    .children(source.clone()),
                AssetRef::External(specifier) => SsrElement::new("script")
                    .attr("type", "module")
                    .attr("src", env.resolve(specifier)),
            })
            .collect()
    }

    /// Builds style elements; external styles become stylesheet links.
    #[must_use]
    pub fn style_elements(&self, env: &Environment) -> Vec<SsrElement> {
        self.styles
            .iter()
            .map(|style| match style {
                AssetRef::Inline(css) => SsrElement::new("style").children(css.clone()),
                AssetRef::External(specifier) => SsrElement::new("link")
                    .attr("rel", "stylesheet")
                    .attr("href", env.resolve(specifier)),
            })
            .collect()
    }
}
