//! Upload and parameter steps. Each one disables its trigger while the
//! request is out, reports the result on its status line, and on success
//! unlocks the next wizard step.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::api::GridMode;
use crate::error::{Result, WizardError};
use crate::grid::GridBox;
use crate::params::{ScoringMethod, SearchMode};
use crate::session::WizardSession;
use crate::ui::{Element, Tone, Ui};
use crate::viewer;
use crate::wizard::Step;

/// Disable `control` with a busy label while `work` runs, then re-enable it
/// with `idle` whatever the outcome.
pub async fn while_busy<T>(
    ui: &dyn Ui,
    control: Element,
    busy: &str,
    idle: &str,
    work: impl Future<Output = T>,
) -> T {
    ui.set_control(control, false, Some(busy));
    let out = work.await;
    ui.set_control(control, true, Some(idle));
    out
}

impl WizardSession {
    pub async fn create_project(&mut self, name: &str) -> Result<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(WizardError::Validation("Project name is required".to_string()));
        }
        let message = self.client.create_project(name).await?;
        log::info!("{message}");
        Ok(message)
    }

    /// Upload the receptor, show it, and generate the blind grid for it.
    /// Returns the server-side path.
    pub async fn upload_receptor(&mut self, file: Option<&Path>) -> Result<String> {
        let Some(file) = file else {
            self.ui.set_text(Element::ReceptorStatus, "Please select a file.", Tone::Danger);
            return Err(WizardError::Validation("Please select a file.".to_string()));
        };
        let ui = Arc::clone(&self.ui);
        while_busy(
            ui.as_ref(),
            Element::ReceptorUploadButton,
            "Uploading...",
            "Upload",
            self.receptor_upload(file),
        )
        .await
    }

    async fn receptor_upload(&mut self, file: &Path) -> Result<String> {
        let filepath = match self.client.upload_receptor(file).await {
            Ok(filepath) => filepath,
            Err(e) => {
                if e.is_network() {
                    log::error!("receptor upload failed: {e}");
                }
                let text = e.status_text("Upload failed.", "Network error.");
                self.ui.set_text(Element::ReceptorStatus, &text, Tone::Danger);
                return Err(e);
            }
        };

        self.ui.set_text(Element::ReceptorStatus, "Upload Successful!", Tone::Success);
        self.uploaded_receptor = Some(filepath.clone());
        self.ui.set_visible(Element::Workspace, true);

        if let Err(e) = viewer::load_structure(&self.client, &self.viewer, &self.ui, &filepath).await {
            log::error!("error loading protein structure: {e}");
        }

        tokio::time::sleep(self.config.layout_settle()).await;
        // Reported on the grid status line; the upload itself succeeded.
        if let Err(e) = self.grid.auto_generate(&self.client, &filepath, &GridMode::Blind).await {
            log::warn!("grid generation for {filepath} failed: {e}");
        }
        self.viewer.resize();
        self.viewer.render();
        Ok(filepath)
    }

    /// Regenerate the box for the uploaded receptor, e.g. around a binding
    /// site with [`GridMode::targeted`]. The new box also becomes the reset
    /// snapshot.
    pub async fn generate_grid(&mut self, mode: &GridMode) -> Result<GridBox> {
        let Some(filepath) = self.uploaded_receptor.clone() else {
            self.ui.set_text(Element::GridStatus, "Please upload a receptor first.", Tone::Danger);
            return Err(WizardError::Validation("Please upload a receptor first.".to_string()));
        };
        self.grid.auto_generate(&self.client, &filepath, mode).await
    }

    /// Prepare the uploaded receptor inside the current grid. Unlocks step 2.
    pub async fn prepare_receptor(&mut self) -> Result<String> {
        let (Some(grid), Some(filepath)) = (self.grid.live(), self.uploaded_receptor.clone()) else {
            self.ui.alert("Please generate the grid first.");
            return Err(WizardError::Validation("Please generate the grid first.".to_string()));
        };

        let ui = Arc::clone(&self.ui);
        let client = self.client.clone();
        let result = while_busy(ui.as_ref(), Element::PrepareButton, "Preparing...", "Prepare Receptor", async {
            ui.set_text(Element::GridStatus, "Preparing receptor...", Tone::Warning);
            client.prepare_receptor(&filepath, &grid).await
        })
        .await;

        match result {
            Ok(message) => {
                log::info!("{message}");
                ui.set_text(Element::GridStatus, "Success!", Tone::Success);
                self.unlock(Step::Ligands).await?;
                Ok(message)
            }
            Err(e) => {
                if e.is_network() {
                    log::error!("prepare_receptor failed: {e}");
                    ui.alert("Network Error: Check console.");
                } else {
                    ui.alert(&format!("Error: {}", e.status_text("request rejected", "request failed")));
                    ui.set_text(Element::GridStatus, "Failed.", Tone::Danger);
                }
                Err(e)
            }
        }
    }

    /// Upload one or more ligand files. Unlocks step 3.
    pub async fn upload_ligands(&mut self, files: &[PathBuf]) -> Result<String> {
        if files.is_empty() {
            self.ui.alert("Select files.");
            return Err(WizardError::Validation("Select files.".to_string()));
        }

        let ui = Arc::clone(&self.ui);
        let client = self.client.clone();
        let result = while_busy(
            ui.as_ref(),
            Element::LigandUploadButton,
            "Uploading...",
            "Upload Ligands",
            client.upload_ligands(files),
        )
        .await;

        match result {
            Ok(message) => {
                ui.set_text(Element::LigandStatus, &message, Tone::Success);
                ui.set_visible(Element::ParamSetAction, true);
                self.unlock(Step::Parameters).await?;
                Ok(message)
            }
            Err(e) => {
                if e.is_network() {
                    log::error!("ligand upload failed: {e}");
                }
                let text = e.status_text("Ligand upload failed.", "Network error.");
                ui.set_text(Element::LigandStatus, &text, Tone::Danger);
                Err(e)
            }
        }
    }

    pub fn set_search_mode(&mut self, mode: SearchMode) {
        self.params.set_search_mode(mode);
        self.ui.set_text(
            Element::ExhaustivenessInput,
            &self.params.exhaustiveness().to_string(),
            Tone::Plain,
        );
    }

    pub fn set_exhaustiveness(&mut self, exhaustiveness: u32) -> Result<()> {
        self.params.set_exhaustiveness(exhaustiveness)?;
        self.ui.set_text(Element::ExhaustivenessInput, &exhaustiveness.to_string(), Tone::Plain);
        Ok(())
    }

    pub fn set_num_modes(&mut self, num_modes: u32) -> Result<()> {
        self.params.set_num_modes(num_modes)
    }

    pub fn set_gpu(&mut self, use_gpu: bool) {
        self.params.set_gpu(use_gpu);
        self.show_param_form();
    }

    pub fn set_scoring_method(&mut self, method: ScoringMethod) -> Result<()> {
        self.params.set_scoring_method(method)?;
        self.show_param_form();
        Ok(())
    }

    pub(crate) fn show_param_form(&self) {
        let params = &self.params;
        self.ui.set_control(
            Element::ScoringSelect,
            params.scoring_enabled(),
            Some(params.scoring_method().as_str()),
        );
        self.ui.set_text(Element::ScoringHelp, params.scoring_help(), Tone::Plain);
        self.ui.set_text(
            Element::ExhaustivenessInput,
            &params.exhaustiveness().to_string(),
            Tone::Plain,
        );
    }

    /// Send the parameter form. Unlocks step 4.
    pub async fn submit_params(&mut self) -> Result<String> {
        let fields = self.params.form_fields();
        let ui = Arc::clone(&self.ui);
        let client = self.client.clone();
        let result = while_busy(
            ui.as_ref(),
            Element::ParamSubmitButton,
            "Saving...",
            "Save Parameters",
            client.upload_params(&fields),
        )
        .await;

        match result {
            Ok(message) => {
                ui.set_text(Element::ParamStatus, &message, Tone::Success);
                ui.set_visible(Element::RunAction, true);
                self.unlock(Step::Run).await?;
                Ok(message)
            }
            Err(e) => {
                if e.is_network() {
                    log::error!("parameter upload failed: {e}");
                }
                let text = e.status_text("Saving parameters failed.", "Network error.");
                ui.set_text(Element::ParamStatus, &text, Tone::Danger);
                Err(e)
            }
        }
    }
}
