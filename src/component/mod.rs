//! Component rendering primitive.
//!
//! # Responsibilities
//! - Define the black-box contract the router drives:
//!   `render(props) → markup` on the server,
//!   `mount(node, props) → live instance` on the client
//! - Define the props every level of the page tree receives
//!
//! # Design Decisions
//! - The template language and reactivity model live behind these traits
//! - Layout nesting is expressed through `Props::slot` on the server and
//!   through one document node per depth on the client
//! - `from_fn` adapts a plain render function into a full component

use std::sync::Arc;

use thiserror::Error;

use crate::hydration::document::NodeId;
use crate::preload::outcome::ErrorPayload;
use crate::preload::store::StoreSnapshot;
use crate::preload::value::PreloadValue;
use crate::routing::params::{Params, Query};

/// Props handed to a component at one layout depth.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Props {
    /// In-app path of the page being shown.
    pub path: String,
    pub params: Params,
    pub query: Query,
    /// Value returned by this level's preload hook.
    pub data: PreloadValue,
    /// Path segment of the child level, for layouts.
    pub segment: Option<String>,
    /// Store contents at render/commit time.
    pub store: StoreSnapshot,
    /// Set when the page is an error page.
    pub error: Option<ErrorPayload>,
    /// Markup of the child level (server render only).
    pub slot: Option<String>,
}

/// Output of a server render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    pub html: String,
    pub head: String,
}

impl Rendered {
    pub fn html(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            head: String::new(),
        }
    }

    pub fn with_head(mut self, head: impl Into<String>) -> Self {
        self.head = head.into();
        self
    }
}

/// Where an instance is mounted on the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MountTarget {
    pub node: NodeId,
    pub depth: usize,
    /// Adopt the existing server-rendered node instead of rendering from scratch.
    pub hydrate: bool,
}

/// Error raised by a component while rendering or mounting.
#[derive(Debug, Clone, Error)]
#[error("component `{component}` failed: {message}")]
pub struct ComponentError {
    pub component: String,
    pub message: String,
}

impl ComponentError {
    pub fn new(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            message: message.into(),
        }
    }
}

/// A page or layout component.
pub trait Component: Send + Sync {
    /// Render to markup (server side).
    fn render(&self, props: &Props) -> Result<Rendered, ComponentError>;

    /// Create a live instance attached to `target` (client side).
    fn mount(&self, target: MountTarget, props: &Props) -> Result<Box<dyn Instance>, ComponentError>;
}

/// A mounted component.
pub trait Instance: Send {
    /// Apply new props without remounting.
    fn update(&mut self, props: &Props) -> Result<(), ComponentError>;

    /// Current markup of the instance.
    fn html(&self) -> String;

    /// Called before the instance is dropped from the tree.
    fn destroy(&mut self) {}
}

type RenderFn = dyn Fn(&Props) -> Result<Rendered, ComponentError> + Send + Sync;

/// Component backed by a stateless render function.
pub struct FnComponent {
    render: Arc<RenderFn>,
}

/// Build a [`Component`] from a render function. Instances re-render on
/// every props update.
pub fn from_fn<F>(render: F) -> Arc<dyn Component>
where
    F: Fn(&Props) -> Result<Rendered, ComponentError> + Send + Sync + 'static,
{
    Arc::new(FnComponent {
        render: Arc::new(render),
    })
}

impl Component for FnComponent {
    fn render(&self, props: &Props) -> Result<Rendered, ComponentError> {
        (self.render)(props)
    }

    fn mount(&self, _target: MountTarget, props: &Props) -> Result<Box<dyn Instance>, ComponentError> {
        let rendered = (self.render)(props)?;
        Ok(Box::new(FnInstance {
            render: self.render.clone(),
            html: rendered.html,
        }))
    }
}

struct FnInstance {
    render: Arc<RenderFn>,
    html: String,
}

impl Instance for FnInstance {
    fn update(&mut self, props: &Props) -> Result<(), ComponentError> {
        self.html = (self.render)(props)?.html;
        Ok(())
    }

    fn html(&self) -> String {
        self.html.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fn_component_render_and_update() {
        let component = from_fn(|props| {
            Ok(Rendered::html(format!("<h1>{}</h1>", props.data)))
        });

        let mut props = Props {
            data: PreloadValue::from("first"),
            ..Props::default()
        };
        assert_eq!(component.render(&props).unwrap().html, "<h1>first</h1>");

        let target = MountTarget { node: 0, depth: 0, hydrate: false };
        let mut instance = component.mount(target, &props).unwrap();
        assert_eq!(instance.html(), "<h1>first</h1>");

        props.data = PreloadValue::from("second");
        instance.update(&props).unwrap();
        assert_eq!(instance.html(), "<h1>second</h1>");
    }
}
