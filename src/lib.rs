//! Client side of a molecular-docking wizard: receptor upload and grid
//! placement, ligand upload, docking parameters, and a monitored run against
//! a docking server.

pub mod api;
pub mod config;
pub mod error;
pub mod flow;
pub mod grid;
pub mod monitor;
pub mod params;
pub mod session;
pub mod ui;
pub mod viewer;
pub mod wizard;

pub use api::{DockingClient, GridMode, JobStatus, RunSnapshot};
pub use config::Config;
pub use error::{Result, WizardError};
pub use grid::{GridAxis, GridBox, GridEditor, SliderRange};
pub use monitor::{RunOutcome, RunProgress};
pub use params::{ParamForm, ScoringMethod, SearchMode};
pub use session::WizardSession;
pub use ui::{Element, HeadlessUi, Tone, Ui};
pub use viewer::{SceneViewer, Viewer};
pub use wizard::{Navigation, Step, StepButtonState, WizardState};
