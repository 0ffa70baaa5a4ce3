//! The page the wizard draws on.
//!
//! Elements are addressed by [`Element`] rather than DOM ids. Implementations
//! take `&self` and keep their own interior state, the same way a page is
//! mutated through shared handles.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::grid::{GridAxis, ReadoutSpan, SliderRange};
use crate::wizard::{Step, StepButtonState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Element {
    ReceptorStatus,
    GridStatus,
    LigandStatus,
    ParamStatus,
    ReceptorUploadButton,
    PrepareButton,
    LigandUploadButton,
    ParamSubmitButton,
    RunButton,
    Workspace,
    Viewer,
    SliderPanel,
    SliderValue(GridAxis),
    MouseCoords,
    ParamSetAction,
    ScoringSelect,
    ScoringHelp,
    ExhaustivenessInput,
    RunAction,
    RunLoader,
    RunProgress,
    FinalStatus,
    DownloadControl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Plain,
    Info,
    Success,
    Warning,
    Danger,
}

pub trait Ui: Send + Sync {
    fn show_section(&self, step: Step);
    fn set_step_button(&self, step: Step, state: StepButtonState);
    fn set_text(&self, element: Element, text: &str, tone: Tone);
    fn set_visible(&self, element: Element, visible: bool);
    /// Enable or disable a control, optionally replacing its label.
    fn set_control(&self, element: Element, enabled: bool, label: Option<&str>);
    fn set_slider(&self, axis: GridAxis, range: &SliderRange);
    fn set_readout(&self, spans: &[ReadoutSpan]);
    /// Replace the run log and keep it scrolled to the end.
    fn set_log(&self, text: &str);
    fn alert(&self, message: &str);
    fn confirm(&self, message: &str) -> bool;
}

#[derive(Default)]
struct PageState {
    section: Option<Step>,
    step_buttons: HashMap<Step, StepButtonState>,
    texts: HashMap<Element, (String, Tone)>,
    visible: HashMap<Element, bool>,
    controls: HashMap<Element, (bool, String)>,
    sliders: HashMap<GridAxis, SliderRange>,
    readout: Vec<ReadoutSpan>,
    log: String,
    alerts: Vec<String>,
    confirm_answer: bool,
    confirmations: usize,
}

/// A [`Ui`] with no screen: remembers the last state of every element and
/// reports changes through the `log` facade. Used by the CLI and in tests.
pub struct HeadlessUi {
    state: Mutex<PageState>,
}

impl HeadlessUi {
    /// `confirm_answer` is what every confirmation prompt returns.
    pub fn new(confirm_answer: bool) -> Self {
        HeadlessUi {
            state: Mutex::new(PageState {
                confirm_answer,
                ..PageState::default()
            }),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut PageState) -> R) -> Option<R> {
        match self.state.lock() {
            Ok(mut state) => Some(f(&mut state)),
            Err(_) => {
                log::error!("headless ui state poisoned");
                None
            }
        }
    }

    pub fn set_confirm_answer(&self, answer: bool) {
        self.with(|s| s.confirm_answer = answer);
    }

    pub fn section(&self) -> Option<Step> {
        self.with(|s| s.section).flatten()
    }

    pub fn step_button(&self, step: Step) -> Option<StepButtonState> {
        self.with(|s| s.step_buttons.get(&step).copied()).flatten()
    }

    pub fn text(&self, element: Element) -> Option<(String, Tone)> {
        self.with(|s| s.texts.get(&element).cloned()).flatten()
    }

    pub fn is_visible(&self, element: Element) -> bool {
        self.with(|s| s.visible.get(&element).copied().unwrap_or(false))
            .unwrap_or(false)
    }

    pub fn control(&self, element: Element) -> Option<(bool, String)> {
        self.with(|s| s.controls.get(&element).cloned()).flatten()
    }

    pub fn slider(&self, axis: GridAxis) -> Option<SliderRange> {
        self.with(|s| s.sliders.get(&axis).copied()).flatten()
    }

    pub fn readout(&self) -> Vec<ReadoutSpan> {
        self.with(|s| s.readout.clone()).unwrap_or_default()
    }

    pub fn log(&self) -> String {
        self.with(|s| s.log.clone()).unwrap_or_default()
    }

    pub fn alerts(&self) -> Vec<String> {
        self.with(|s| s.alerts.clone()).unwrap_or_default()
    }

    pub fn confirmations(&self) -> usize {
        self.with(|s| s.confirmations).unwrap_or(0)
    }
}

impl Ui for HeadlessUi {
    fn show_section(&self, step: Step) {
        log::debug!("showing {step}");
        self.with(|s| s.section = Some(step));
    }

    fn set_step_button(&self, step: Step, state: StepButtonState) {
        self.with(|s| s.step_buttons.insert(step, state));
    }

    fn set_text(&self, element: Element, text: &str, tone: Tone) {
        if !text.is_empty() {
            match tone {
                Tone::Danger => log::warn!("[{element:?}] {text}"),
                Tone::Plain => log::debug!("[{element:?}] {text}"),
                _ => log::info!("[{element:?}] {text}"),
            }
        }
        self.with(|s| s.texts.insert(element, (text.to_string(), tone)));
    }

    fn set_visible(&self, element: Element, visible: bool) {
        self.with(|s| s.visible.insert(element, visible));
    }

    fn set_control(&self, element: Element, enabled: bool, label: Option<&str>) {
        self.with(|s| {
            let entry = s.controls.entry(element).or_insert((true, String::new()));
            entry.0 = enabled;
            if let Some(label) = label {
                entry.1 = label.to_string();
            }
        });
    }

    fn set_slider(&self, axis: GridAxis, range: &SliderRange) {
        self.with(|s| s.sliders.insert(axis, *range));
    }

    fn set_readout(&self, spans: &[ReadoutSpan]) {
        self.with(|s| s.readout = spans.to_vec());
    }

    fn set_log(&self, text: &str) {
        self.with(|s| {
            // The server resends the whole log; only echo what is new.
            let fresh = text.strip_prefix(s.log.as_str()).unwrap_or(text);
            for line in fresh.lines().filter(|l| !l.trim().is_empty()) {
                log::info!("| {line}");
            }
            s.log = text.to_string();
        });
    }

    fn alert(&self, message: &str) {
        log::warn!("alert: {message}");
        self.with(|s| s.alerts.push(message.to_string()));
    }

    fn confirm(&self, message: &str) -> bool {
        self.with(|s| {
            s.confirmations += 1;
            log::info!("confirm: {message} -> {}", s.confirm_answer);
            s.confirm_answer
        })
        .unwrap_or(false)
    }
}
