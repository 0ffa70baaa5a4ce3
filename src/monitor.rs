use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::api::{DockingClient, JobStatus, RunSnapshot};
use crate::error::{Result, WizardError};
use crate::ui::{Element, Tone, Ui};
use crate::wizard::{self, SharedWizard};

pub const BANNER_COMPLETED: &str = "Run Completed!";
pub const BANNER_FAILED: &str = "Run Failed. Check Log.";

// Emitted by the server-side batch script once per ligand.
static PROGRESS_LINE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?m)^Docking (\d+) of (\d+): (.+?)\.\.\.\s*$").ok());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunProgress {
    pub current: u32,
    pub total: u32,
    pub ligand: String,
}

/// Latest per-ligand progress line in a cumulative run log.
pub fn latest_progress(log: &str) -> Option<RunProgress> {
    let re = PROGRESS_LINE.as_ref()?;
    let cap = re.captures_iter(log).last()?;
    Some(RunProgress {
        current: cap.get(1)?.as_str().parse().ok()?,
        total: cap.get(2)?.as_str().parse().ok()?,
        ligand: cap.get(3)?.as_str().to_string(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    /// Terminal status other than completed.
    Failed(JobStatus),
    Cancelled,
    /// Polling stopped because the status request itself failed.
    Lost(String),
}

struct ActiveRun {
    cancel: oneshot::Sender<()>,
    task: JoinHandle<RunOutcome>,
}

/// Starts docking runs and follows them until the server reports a terminal
/// status. At most one poll task exists per monitor.
pub struct RunMonitor {
    client: DockingClient,
    ui: Arc<dyn Ui>,
    wizard: SharedWizard,
    poll_interval: Duration,
    active: Option<ActiveRun>,
}

impl RunMonitor {
    pub fn new(client: DockingClient, ui: Arc<dyn Ui>, wizard: SharedWizard, poll_interval: Duration) -> Self {
        RunMonitor {
            client,
            ui,
            wizard,
            poll_interval,
            active: None,
        }
    }

    pub fn is_polling(&self) -> bool {
        self.active.as_ref().is_some_and(|run| !run.task.is_finished())
    }

    pub async fn start(&mut self) -> Result<String> {
        if self.is_polling() || wizard::lock(&self.wizard)?.state().job_running {
            log::warn!("run start ignored: a run is already being monitored");
            return Err(WizardError::RunInProgress);
        }

        wizard::lock(&self.wizard)?.set_job_running(true);
        self.ui.set_visible(Element::RunLoader, true);
        self.ui.set_log("Initializing...");
        self.ui.set_text(Element::FinalStatus, "", Tone::Plain);
        self.ui.set_text(Element::RunProgress, "", Tone::Plain);
        self.ui.set_visible(Element::DownloadControl, false);

        match self.client.start_run().await {
            Ok(message) => {
                log::info!("{message}");
                let (cancel, cancelled) = oneshot::channel();
                let task = tokio::spawn(poll_until_done(
                    self.client.clone(),
                    Arc::clone(&self.ui),
                    Arc::clone(&self.wizard),
                    self.poll_interval,
                    cancelled,
                ));
                self.active = Some(ActiveRun { cancel, task });
                Ok(message)
            }
            Err(e) => {
                let text = if e.is_network() {
                    log::error!("run-docking failed: {e}");
                    "Network Error calling /run-docking".to_string()
                } else {
                    format!("Error starting run: {}", e.status_text("Unknown error", "Unknown error"))
                };
                self.ui.set_log(&text);
                finish_job_ui(&self.ui, &self.wizard);
                Err(e)
            }
        }
    }

    /// Stop polling. The job on the server keeps running.
    /// The stopped task never touches the UI again; it is reverted here.
    pub fn cancel(&mut self) {
        if let Some(run) = self.active.take() {
            if run.cancel.send(()).is_err() {
                log::debug!("poll task already finished");
            }
            run.task.abort();
            finish_job_ui(&self.ui, &self.wizard);
        }
    }

    pub async fn wait(&mut self) -> Result<RunOutcome> {
        let run = self.active.as_mut().ok_or(WizardError::NoActiveRun)?;
        let joined = (&mut run.task).await;
        self.active = None;
        joined.map_err(|e| WizardError::Task(e.to_string()))
    }
}

async fn poll_until_done(
    client: DockingClient,
    ui: Arc<dyn Ui>,
    wizard: SharedWizard,
    period: Duration,
    mut cancelled: oneshot::Receiver<()>,
) -> RunOutcome {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    loop {
        tokio::select! {
            _ = &mut cancelled => {
                log::info!("stopped following the run");
                return RunOutcome::Cancelled;
            }
            _ = ticker.tick() => {}
        }

        match client.run_status().await {
            Ok(snapshot) => {
                show_snapshot(&ui, &snapshot);
                if snapshot.status.is_terminal() {
                    let message = snapshot.message.as_deref().unwrap_or("no message");
                    if snapshot.status.succeeded() {
                        log::info!("run finished: {message}");
                    } else {
                        log::warn!("run ended as {:?}: {message}", snapshot.status);
                    }
                    finish_job_ui(&ui, &wizard);
                    return if snapshot.status.succeeded() {
                        ui.set_text(Element::FinalStatus, BANNER_COMPLETED, Tone::Success);
                        ui.set_visible(Element::DownloadControl, true);
                        RunOutcome::Completed
                    } else {
                        ui.set_text(Element::FinalStatus, BANNER_FAILED, Tone::Danger);
                        RunOutcome::Failed(snapshot.status)
                    };
                }
            }
            Err(e) => {
                log::error!("polling error: {e}");
                finish_job_ui(&ui, &wizard);
                ui.set_text(
                    Element::FinalStatus,
                    &format!("Lost contact with the run: {e}. The job may still be running on the server."),
                    Tone::Warning,
                );
                return RunOutcome::Lost(e.to_string());
            }
        }
    }
}

fn show_snapshot(ui: &Arc<dyn Ui>, snapshot: &RunSnapshot) {
    let Some(log) = snapshot.log.as_deref() else {
        return;
    };
    ui.set_log(log);
    if let Some(p) = latest_progress(log) {
        ui.set_text(
            Element::RunProgress,
            &format!("Docking {} of {}: {}", p.current, p.total, p.ligand),
            Tone::Info,
        );
    }
}

fn finish_job_ui(ui: &Arc<dyn Ui>, wizard: &SharedWizard) {
    ui.set_visible(Element::RunLoader, false);
    match wizard::lock(wizard) {
        Ok(mut w) => w.set_job_running(false),
        Err(e) => log::error!("could not clear the running flag: {e}"),
    }
}
