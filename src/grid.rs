//! Docking search box: geometry, slider ranges, the 3D overlay, and the
//! editor that keeps all of them in step with one live box.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::api::{DockingClient, GridMode};
use crate::error::{Result, WizardError};
use crate::ui::{Element, Tone, Ui};
use crate::viewer::{BoxShape, LineShape, Point3, Viewer};

/// Lowest value a size slider can take. Keeps the volume from collapsing.
pub const SIZE_MIN: f64 = 1.0;
/// Half-length of the center crosshair as a fraction of the smallest side.
pub const AXIS_STICK_FRACTION: f64 = 0.4;
pub const BOX_OPACITY: f32 = 0.3;
const BOX_COLOR: &str = "green";
const EDGE_WIDTH: f32 = 3.0;
const AXIS_WIDTH: f32 = 10.0;

/// Edges of a cuboid as index pairs into [`GridBox::corners`].
const EDGES: [(usize, usize); 12] = [
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 0),
    (4, 5),
    (5, 6),
    (6, 7),
    (7, 4),
    (0, 4),
    (1, 5),
    (2, 6),
    (3, 7),
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridBox {
    pub center_x: f64,
    pub center_y: f64,
    pub center_z: f64,
    pub size_x: f64,
    pub size_y: f64,
    pub size_z: f64,
}

impl GridBox {
    /// Box a slider edit starts from when nothing was generated yet.
    pub fn placeholder() -> Self {
        GridBox {
            center_x: 0.0,
            center_y: 0.0,
            center_z: 0.0,
            size_x: SIZE_MIN,
            size_y: SIZE_MIN,
            size_z: SIZE_MIN,
        }
    }

    pub fn center(&self) -> Point3 {
        Point3::new(self.center_x, self.center_y, self.center_z)
    }

    pub fn min_size(&self) -> f64 {
        self.size_x.min(self.size_y).min(self.size_z)
    }

    pub fn corners(&self) -> [Point3; 8] {
        let (x0, x1) = (self.center_x - self.size_x / 2.0, self.center_x + self.size_x / 2.0);
        let (y0, y1) = (self.center_y - self.size_y / 2.0, self.center_y + self.size_y / 2.0);
        let (z0, z1) = (self.center_z - self.size_z / 2.0, self.center_z + self.size_z / 2.0);
        [
            Point3::new(x0, y0, z0),
            Point3::new(x1, y0, z0),
            Point3::new(x1, y1, z0),
            Point3::new(x0, y1, z0),
            Point3::new(x0, y0, z1),
            Point3::new(x1, y0, z1),
            Point3::new(x1, y1, z1),
            Point3::new(x0, y1, z1),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GridAxis {
    CenterX,
    CenterY,
    CenterZ,
    SizeX,
    SizeY,
    SizeZ,
}

impl GridAxis {
    pub const ALL: [GridAxis; 6] = [
        GridAxis::CenterX,
        GridAxis::CenterY,
        GridAxis::CenterZ,
        GridAxis::SizeX,
        GridAxis::SizeY,
        GridAxis::SizeZ,
    ];

    pub fn is_size(self) -> bool {
        matches!(self, GridAxis::SizeX | GridAxis::SizeY | GridAxis::SizeZ)
    }

    pub fn get(self, grid: &GridBox) -> f64 {
        match self {
            GridAxis::CenterX => grid.center_x,
            GridAxis::CenterY => grid.center_y,
            GridAxis::CenterZ => grid.center_z,
            GridAxis::SizeX => grid.size_x,
            GridAxis::SizeY => grid.size_y,
            GridAxis::SizeZ => grid.size_z,
        }
    }

    pub fn set(self, grid: &mut GridBox, value: f64) {
        let field = match self {
            GridAxis::CenterX => &mut grid.center_x,
            GridAxis::CenterY => &mut grid.center_y,
            GridAxis::CenterZ => &mut grid.center_z,
            GridAxis::SizeX => &mut grid.size_x,
            GridAxis::SizeY => &mut grid.size_y,
            GridAxis::SizeZ => &mut grid.size_z,
        };
        *field = value;
    }
}

impl fmt::Display for GridAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GridAxis::CenterX => "center_x",
            GridAxis::CenterY => "center_y",
            GridAxis::CenterZ => "center_z",
            GridAxis::SizeX => "size_x",
            GridAxis::SizeY => "size_y",
            GridAxis::SizeZ => "size_z",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliderRange {
    pub min: f64,
    pub max: f64,
    pub value: f64,
}

/// Centers get a window of `buffer` either side; sizes run from
/// [`SIZE_MIN`] up to `buffer` above the value, whatever the value is.
pub fn slider_range(grid: &GridBox, axis: GridAxis, buffer: f64) -> SliderRange {
    let value = axis.get(grid);
    let min = if axis.is_size() { SIZE_MIN } else { value - buffer };
    SliderRange {
        min,
        max: value + buffer,
        value,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub solid: BoxShape,
    pub edges: Vec<LineShape>,
    pub axes: [LineShape; 3],
}

pub fn overlay(grid: &GridBox) -> Overlay {
    let center = grid.center();
    let solid = BoxShape {
        center,
        dimensions: [grid.size_x, grid.size_y, grid.size_z],
        color: BOX_COLOR,
        opacity: BOX_OPACITY,
    };

    let corners = grid.corners();
    let edges = EDGES
        .iter()
        .map(|&(a, b)| LineShape {
            start: corners[a],
            end: corners[b],
            color: BOX_COLOR,
            linewidth: EDGE_WIDTH,
            dashed: false,
        })
        .collect();

    let stick = grid.min_size() * AXIS_STICK_FRACTION;
    let axis = |dx: f64, dy: f64, dz: f64, color: &'static str| LineShape {
        start: Point3::new(center.x - dx, center.y - dy, center.z - dz),
        end: Point3::new(center.x + dx, center.y + dy, center.z + dz),
        color,
        linewidth: AXIS_WIDTH,
        dashed: false,
    };
    // y is blue so it does not vanish against the green box
    let axes = [
        axis(stick, 0.0, 0.0, "red"),
        axis(0.0, stick, 0.0, "blue"),
        axis(0.0, 0.0, stick, "orange"),
    ];

    Overlay { solid, edges, axes }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReadoutSpan {
    pub label: &'static str,
    pub value: String,
    pub color: &'static str,
}

pub fn readout(grid: &GridBox) -> [ReadoutSpan; 3] {
    [
        ReadoutSpan {
            label: "X",
            value: format!("{:.2}", grid.center_x),
            color: "#e34949",
        },
        ReadoutSpan {
            label: "Y",
            value: format!("{:.2}", grid.center_y),
            color: "#06a3e3",
        },
        ReadoutSpan {
            label: "Z",
            value: format!("{:.2}", grid.center_z),
            color: "#df8c22",
        },
    ]
}

/// Owns the live search box and its initial snapshot.
pub struct GridEditor {
    live: Option<GridBox>,
    initial: Option<GridBox>,
    viewer: Arc<dyn Viewer>,
    ui: Arc<dyn Ui>,
    slider_buffer: f64,
}

impl GridEditor {
    pub fn new(viewer: Arc<dyn Viewer>, ui: Arc<dyn Ui>, slider_buffer: f64) -> Self {
        GridEditor {
            live: None,
            initial: None,
            viewer,
            ui,
            slider_buffer,
        }
    }

    pub fn live(&self) -> Option<GridBox> {
        self.live
    }

    pub fn initial(&self) -> Option<GridBox> {
        self.initial
    }

    /// Ask the server for a box around the structure at `filepath`, either all
    /// of it or the residues named in `mode`. The outcome is reported on the
    /// grid status line; on failure the current box, overlay and sliders stay
    /// as they were.
    pub async fn auto_generate(
        &mut self,
        client: &DockingClient,
        filepath: &str,
        mode: &GridMode,
    ) -> Result<GridBox> {
        if filepath.is_empty() {
            log::error!("no filepath provided for grid generation");
            return Err(WizardError::Validation("no receptor uploaded".to_string()));
        }

        self.ui.set_text(Element::GridStatus, "Calculating grid dimensions...", Tone::Info);
        match client.generate_grid(filepath, mode).await {
            Ok(grid) => {
                self.apply_generated(grid);
                self.ui.set_text(Element::GridStatus, "Grid Auto-Generated Successfully", Tone::Success);
                Ok(grid)
            }
            Err(e) => {
                if e.is_network() {
                    log::error!("error during grid generation: {e}");
                }
                let text = e.status_text("Grid generation failed", "Error generating grid.");
                self.ui.set_text(Element::GridStatus, &text, Tone::Danger);
                Err(e)
            }
        }
    }

    /// Take `grid` as both the live box and the reset snapshot.
    pub fn apply_generated(&mut self, grid: GridBox) {
        self.live = Some(grid);
        self.initial = Some(grid);
        self.render(&grid);
        self.update_sliders(&grid);
        self.ui.set_visible(Element::SliderPanel, true);
        log::info!(
            "grid center ({:.2}, {:.2}, {:.2}) size ({:.2}, {:.2}, {:.2})",
            grid.center_x, grid.center_y, grid.center_z, grid.size_x, grid.size_y, grid.size_z
        );
    }

    pub fn on_slider_change(&mut self, axis: GridAxis, value: f64) -> Result<GridBox> {
        if !value.is_finite() {
            log::warn!("ignoring non-numeric value for {axis}");
            return Err(WizardError::Validation(format!("{axis} must be a number")));
        }
        let value = if axis.is_size() { value.max(SIZE_MIN) } else { value };

        let grid = self.live.get_or_insert_with(GridBox::placeholder);
        axis.set(grid, value);
        let grid = *grid;

        self.render(&grid);
        self.ui.set_text(Element::SliderValue(axis), &value.to_string(), Tone::Plain);
        Ok(grid)
    }

    pub fn reset(&mut self) -> Result<GridBox> {
        let Some(initial) = self.initial else {
            self.ui.alert("No initial grid found.");
            return Err(WizardError::Validation("No initial grid found.".to_string()));
        };
        self.live = Some(initial);
        self.render(&initial);
        self.update_sliders(&initial);
        Ok(initial)
    }

    pub fn render(&self, grid: &GridBox) {
        let Overlay { solid, edges, axes } = overlay(grid);
        self.viewer.remove_all_shapes();
        self.viewer.add_box(&solid);
        for line in edges.iter().chain(axes.iter()) {
            self.viewer.add_line(line);
        }
        self.ui.set_readout(&readout(grid));
        self.viewer.render();
    }

    fn update_sliders(&self, grid: &GridBox) {
        for axis in GridAxis::ALL {
            let range = slider_range(grid, axis, self.slider_buffer);
            self.ui.set_slider(axis, &range);
            self.ui.set_text(Element::SliderValue(axis), &format!("{:.5}", range.value), Tone::Plain);
        }
    }
}
