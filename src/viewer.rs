//! Bridge to the 3D molecular viewer.
//!
//! The viewer itself (a WebGL widget in the browser build) is an external
//! collaborator; the wizard only needs the calls on [`Viewer`].

use std::sync::{Arc, Mutex};

use crate::api::DockingClient;
use crate::error::Result;
use crate::ui::{Element, Tone, Ui};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Point3 { x, y, z }
    }
}

/// Solid axis-aligned box. `dimensions` is (w, h, d) along (x, y, z).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxShape {
    pub center: Point3,
    pub dimensions: [f64; 3],
    pub color: &'static str,
    pub opacity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineShape {
    pub start: Point3,
    pub end: Point3,
    pub color: &'static str,
    pub linewidth: f32,
    pub dashed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    /// Cartoon with a rainbow gradient along the chain.
    CartoonSpectrum,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoveredAtom {
    pub position: Point3,
}

pub type HoverCallback = Box<dyn Fn(&HoveredAtom) + Send + Sync>;

pub trait Viewer: Send + Sync {
    fn clear(&self);
    fn add_model(&self, data: &str, format: &str);
    fn set_style(&self, style: Style);
    fn zoom_to(&self);
    fn render(&self);
    fn resize(&self);
    fn add_box(&self, shape: &BoxShape);
    fn add_line(&self, shape: &LineShape);
    fn remove_all_shapes(&self);
    fn set_hover_callback(&self, callback: HoverCallback);
}

/// Fetch the uploaded structure and show it as a spectrum cartoon, with the
/// hovered atom's coordinates mirrored into the mouse readout.
pub async fn load_structure(
    client: &DockingClient,
    viewer: &Arc<dyn Viewer>,
    ui: &Arc<dyn Ui>,
    filepath: &str,
) -> Result<()> {
    let pdb = client.fetch_structure(filepath).await?;

    viewer.clear();
    viewer.add_model(&pdb, "pdb");
    viewer.set_style(Style::CartoonSpectrum);
    viewer.zoom_to();
    viewer.render();

    let readout = Arc::clone(ui);
    viewer.set_hover_callback(Box::new(move |atom: &HoveredAtom| {
        readout.set_text(Element::MouseCoords, &hover_text(atom), Tone::Plain);
    }));

    ui.set_visible(Element::Viewer, true);
    log::info!("loaded structure {filepath} ({} bytes)", pdb.len());
    Ok(())
}

pub fn hover_text(atom: &HoveredAtom) -> String {
    let p = atom.position;
    format!("X: {:.2} Y: {:.2} Z: {:.2}", p.x, p.y, p.z)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Box(BoxShape),
    Line(LineShape),
}

#[derive(Default)]
struct Scene {
    models: Vec<(String, String)>,
    style: Option<Style>,
    shapes: Vec<Shape>,
    renders: usize,
    resizes: usize,
    zooms: usize,
    hover: Option<Arc<HoverCallback>>,
}

/// Viewer without a canvas. Keeps the scene it was asked to draw so callers
/// can inspect it.
#[derive(Default)]
pub struct SceneViewer {
    scene: Mutex<Scene>,
}

impl SceneViewer {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R: Default>(&self, f: impl FnOnce(&mut Scene) -> R) -> R {
        match self.scene.lock() {
            Ok(mut scene) => f(&mut scene),
            Err(_) => {
                log::error!("scene viewer state poisoned");
                R::default()
            }
        }
    }

    pub fn shapes(&self) -> Vec<Shape> {
        self.with(|s| s.shapes.clone())
    }

    pub fn boxes(&self) -> Vec<BoxShape> {
        self.shapes()
            .into_iter()
            .filter_map(|s| match s {
                Shape::Box(b) => Some(b),
                Shape::Line(_) => None,
            })
            .collect()
    }

    pub fn lines(&self) -> Vec<LineShape> {
        self.shapes()
            .into_iter()
            .filter_map(|s| match s {
                Shape::Line(l) => Some(l),
                Shape::Box(_) => None,
            })
            .collect()
    }

    /// (format, data) of every loaded model.
    pub fn models(&self) -> Vec<(String, String)> {
        self.with(|s| s.models.clone())
    }

    pub fn style(&self) -> Option<Style> {
        self.with(|s| s.style)
    }

    pub fn render_count(&self) -> usize {
        self.with(|s| s.renders)
    }

    pub fn resize_count(&self) -> usize {
        self.with(|s| s.resizes)
    }

    pub fn zoom_count(&self) -> usize {
        self.with(|s| s.zooms)
    }

    /// Simulate the pointer resting on an atom. Returns false when no hover
    /// callback is registered.
    pub fn hover(&self, atom: &HoveredAtom) -> bool {
        let callback = self.with(|s| s.hover.clone());
        match callback {
            Some(cb) => {
                cb(atom);
                true
            }
            None => false,
        }
    }
}

impl Viewer for SceneViewer {
    fn clear(&self) {
        self.with(|s| {
            s.models.clear();
            s.shapes.clear();
            s.style = None;
        });
    }

    fn add_model(&self, data: &str, format: &str) {
        self.with(|s| s.models.push((format.to_string(), data.to_string())));
    }

    fn set_style(&self, style: Style) {
        self.with(|s| s.style = Some(style));
    }

    fn zoom_to(&self) {
        self.with(|s| s.zooms += 1);
    }

    fn render(&self) {
        self.with(|s| s.renders += 1);
    }

    fn resize(&self) {
        self.with(|s| s.resizes += 1);
    }

    fn add_box(&self, shape: &BoxShape) {
        self.with(|s| s.shapes.push(Shape::Box(*shape)));
    }

    fn add_line(&self, shape: &LineShape) {
        self.with(|s| s.shapes.push(Shape::Line(*shape)));
    }

    fn remove_all_shapes(&self) {
        self.with(|s| s.shapes.clear());
    }

    fn set_hover_callback(&self, callback: HoverCallback) {
        self.with(|s| s.hover = Some(Arc::new(callback)));
    }
}
