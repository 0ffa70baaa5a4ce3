use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Result, WizardError};
use crate::ui::{Element, Ui};

pub const RUN_LABEL_IDLE: &str = "Start Docking Simulation";
pub const RUN_LABEL_BUSY: &str = "Running...";
pub const LEAVE_RUNNING_PROMPT: &str = "Docking is currently running. Leaving this tab will not stop the process, but you might lose the live log view. Continue?";

/// The four wizard stages, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Step {
    Receptor = 1,
    Ligands = 2,
    Parameters = 3,
    Run = 4,
}

impl Step {
    pub const ALL: [Step; 4] = [Step::Receptor, Step::Ligands, Step::Parameters, Step::Run];

    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Step::Receptor),
            2 => Some(Step::Ligands),
            3 => Some(Step::Parameters),
            4 => Some(Step::Run),
            _ => None,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Receptor => "receptor",
            Step::Ligands => "ligands",
            Step::Parameters => "parameters",
            Step::Run => "run",
        };
        write!(f, "step {} ({name})", self.number())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepButtonState {
    Active,
    Completed,
    Disabled,
}

impl StepButtonState {
    pub fn clickable(self) -> bool {
        self != StepButtonState::Disabled
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WizardState {
    pub current_step: Step,
    /// Never decreases during a session.
    pub highest_reached_step: Step,
    pub job_running: bool,
}

impl Default for WizardState {
    fn default() -> Self {
        WizardState {
            current_step: Step::Receptor,
            highest_reached_step: Step::Receptor,
            job_running: false,
        }
    }
}

impl WizardState {
    pub fn button_state(&self, step: Step) -> StepButtonState {
        if step == self.current_step {
            StepButtonState::Active
        } else if step < self.current_step || step <= self.highest_reached_step {
            StepButtonState::Completed
        } else {
            StepButtonState::Disabled
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// Already on the requested step.
    Unchanged,
    /// The requested step has not been unlocked yet.
    Locked,
    /// The user declined to leave a running job.
    Declined,
    Moved(Step),
}

pub type SharedWizard = Arc<Mutex<WizardController>>;

pub fn lock(wizard: &SharedWizard) -> Result<MutexGuard<'_, WizardController>> {
    wizard.lock().map_err(|_| WizardError::Poisoned)
}

pub struct WizardController {
    state: WizardState,
    ui: Arc<dyn Ui>,
}

impl WizardController {
    pub fn new(ui: Arc<dyn Ui>) -> Self {
        let controller = WizardController {
            state: WizardState::default(),
            ui,
        };
        controller.render(controller.state.current_step);
        controller.ui.set_control(Element::RunButton, true, Some(RUN_LABEL_IDLE));
        controller
    }

    pub fn shared(ui: Arc<dyn Ui>) -> SharedWizard {
        Arc::new(Mutex::new(Self::new(ui)))
    }

    pub fn state(&self) -> WizardState {
        self.state
    }

    pub fn navigate(&mut self, target: Step) -> Navigation {
        if target == self.state.current_step {
            return Navigation::Unchanged;
        }
        if target > self.state.highest_reached_step {
            log::debug!("{target} is locked (highest reached: {})", self.state.highest_reached_step);
            return Navigation::Locked;
        }
        if self.state.current_step == Step::Run
            && self.state.job_running
            && !self.ui.confirm(LEAVE_RUNNING_PROMPT)
        {
            return Navigation::Declined;
        }
        self.state.current_step = target;
        self.render(target);
        log::debug!("navigated to {target}");
        Navigation::Moved(target)
    }

    /// Raise the highest reached step and refresh the buttons in place.
    /// Moving to the unlocked step is left to the caller, which may pause first.
    pub fn raise_highest(&mut self, next: Step) {
        if next > self.state.highest_reached_step {
            self.state.highest_reached_step = next;
            log::info!("unlocked {next}");
        }
        self.render_buttons();
    }

    pub fn set_job_running(&mut self, running: bool) {
        self.state.job_running = running;
        let label = if running { RUN_LABEL_BUSY } else { RUN_LABEL_IDLE };
        self.ui.set_control(Element::RunButton, !running, Some(label));
    }

    fn render(&self, step: Step) {
        self.ui.show_section(step);
        self.render_buttons();
    }

    fn render_buttons(&self) {
        for step in Step::ALL {
            self.ui.set_step_button(step, self.state.button_state(step));
        }
    }
}
