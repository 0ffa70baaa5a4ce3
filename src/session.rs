use std::sync::Arc;

use crate::api::DockingClient;
use crate::config::Config;
use crate::error::Result;
use crate::grid::{GridAxis, GridBox, GridEditor};
use crate::monitor::{RunMonitor, RunOutcome};
use crate::params::ParamForm;
use crate::ui::Ui;
use crate::viewer::Viewer;
use crate::wizard::{self, Navigation, SharedWizard, Step, WizardController, WizardState};

/// One wizard instance: everything a single page used to keep in globals.
/// Independent sessions share nothing.
pub struct WizardSession {
    pub(crate) config: Config,
    pub(crate) client: DockingClient,
    pub(crate) ui: Arc<dyn Ui>,
    pub(crate) viewer: Arc<dyn Viewer>,
    pub(crate) wizard: SharedWizard,
    pub(crate) grid: GridEditor,
    pub(crate) params: ParamForm,
    pub(crate) uploaded_receptor: Option<String>,
    monitor: RunMonitor,
}

impl WizardSession {
    pub fn new(config: Config, ui: Arc<dyn Ui>, viewer: Arc<dyn Viewer>) -> Result<Self> {
        let client = DockingClient::new(&config.server_url, config.request_timeout())?;
        let wizard = WizardController::shared(Arc::clone(&ui));
        let grid = GridEditor::new(Arc::clone(&viewer), Arc::clone(&ui), config.slider_buffer);
        let monitor = RunMonitor::new(
            client.clone(),
            Arc::clone(&ui),
            Arc::clone(&wizard),
            config.poll_interval(),
        );
        let session = WizardSession {
            config,
            client,
            ui,
            viewer,
            wizard,
            grid,
            params: ParamForm::default(),
            uploaded_receptor: None,
            monitor,
        };
        session.show_param_form();
        log::debug!("wizard session against {}", session.client.base_url());
        Ok(session)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn client(&self) -> &DockingClient {
        &self.client
    }

    pub fn state(&self) -> Result<WizardState> {
        Ok(wizard::lock(&self.wizard)?.state())
    }

    pub fn grid(&self) -> &GridEditor {
        &self.grid
    }

    pub fn params(&self) -> &ParamForm {
        &self.params
    }

    pub fn uploaded_receptor(&self) -> Option<&str> {
        self.uploaded_receptor.as_deref()
    }

    /// Move to `target` if it is unlocked. Landing on the receptor step
    /// resizes the viewer once the section is showing.
    pub async fn navigate(&mut self, target: Step) -> Result<Navigation> {
        let outcome = wizard::lock(&self.wizard)?.navigate(target);
        if outcome == Navigation::Moved(Step::Receptor) {
            tokio::time::sleep(self.config.resize_delay()).await;
            self.viewer.resize();
            self.viewer.render();
        }
        Ok(outcome)
    }

    /// Unlock `next` after a successful step, then move there once the
    /// configured pause has passed.
    pub async fn unlock(&mut self, next: Step) -> Result<Navigation> {
        wizard::lock(&self.wizard)?.raise_highest(next);
        tokio::time::sleep(self.config.unlock_delay()).await;
        self.navigate(next).await
    }

    pub fn on_slider_change(&mut self, axis: GridAxis, value: f64) -> Result<GridBox> {
        self.grid.on_slider_change(axis, value)
    }

    pub fn reset_grid(&mut self) -> Result<GridBox> {
        self.grid.reset()
    }

    pub async fn start_run(&mut self) -> Result<String> {
        self.monitor.start().await
    }

    pub fn is_polling(&self) -> bool {
        self.monitor.is_polling()
    }

    pub async fn wait_for_run(&mut self) -> Result<RunOutcome> {
        self.monitor.wait().await
    }

    /// Stop following the current run without touching the job itself.
    pub fn stop_following_run(&mut self) {
        self.monitor.cancel();
    }
}
