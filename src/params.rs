use std::fmt;
use std::str::FromStr;

use crate::error::{Result, WizardError};

pub const CPU_SCORING_HELP: &str = "CPU mode only supports Vina scoring.";
pub const GPU_SCORING_HELP: &str = "Select scoring method for GPU.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    Fast,
    #[default]
    Balanced,
    Detail,
}

impl SearchMode {
    /// Exhaustiveness preset applied when the mode is picked.
    pub fn exhaustiveness(self) -> u32 {
        match self {
            SearchMode::Fast => 4,
            SearchMode::Balanced => 8,
            SearchMode::Detail => 32,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SearchMode::Fast => "Fast",
            SearchMode::Balanced => "Balanced",
            SearchMode::Detail => "Detail",
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchMode {
    type Err = WizardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "fast" => Ok(SearchMode::Fast),
            "balanced" => Ok(SearchMode::Balanced),
            "detail" => Ok(SearchMode::Detail),
            _ => Err(WizardError::Validation(format!(
                "unknown search mode '{s}' (expected Fast, Balanced or Detail)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoringMethod {
    #[default]
    Vina,
    Vinardo,
    Ad4,
}

impl ScoringMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            ScoringMethod::Vina => "vina",
            ScoringMethod::Vinardo => "vinardo",
            ScoringMethod::Ad4 => "ad4",
        }
    }
}

impl fmt::Display for ScoringMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScoringMethod {
    type Err = WizardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "vina" => Ok(ScoringMethod::Vina),
            "vinardo" => Ok(ScoringMethod::Vinardo),
            "ad4" => Ok(ScoringMethod::Ad4),
            _ => Err(WizardError::Validation(format!(
                "unknown scoring method '{s}' (expected vina, vinardo or ad4)"
            ))),
        }
    }
}

/// The docking-parameter form. CPU docking runs Vina only, so the scoring
/// method is pinned to [`ScoringMethod::Vina`] whenever the GPU is off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamForm {
    search_mode: SearchMode,
    exhaustiveness: u32,
    num_modes: u32,
    use_gpu: bool,
    scoring_method: ScoringMethod,
}

impl Default for ParamForm {
    fn default() -> Self {
        ParamForm {
            search_mode: SearchMode::default(),
            exhaustiveness: SearchMode::default().exhaustiveness(),
            num_modes: 9,
            use_gpu: false,
            scoring_method: ScoringMethod::Vina,
        }
    }
}

impl ParamForm {
    pub fn search_mode(&self) -> SearchMode {
        self.search_mode
    }

    pub fn exhaustiveness(&self) -> u32 {
        self.exhaustiveness
    }

    pub fn num_modes(&self) -> u32 {
        self.num_modes
    }

    pub fn use_gpu(&self) -> bool {
        self.use_gpu
    }

    pub fn scoring_method(&self) -> ScoringMethod {
        self.scoring_method
    }

    pub fn scoring_enabled(&self) -> bool {
        self.use_gpu
    }

    pub fn scoring_help(&self) -> &'static str {
        if self.use_gpu {
            GPU_SCORING_HELP
        } else {
            CPU_SCORING_HELP
        }
    }

    /// Picks the mode and overwrites exhaustiveness with its preset.
    pub fn set_search_mode(&mut self, mode: SearchMode) {
        self.search_mode = mode;
        self.exhaustiveness = mode.exhaustiveness();
    }

    pub fn set_exhaustiveness(&mut self, exhaustiveness: u32) -> Result<()> {
        if exhaustiveness == 0 {
            return Err(WizardError::Validation("exhaustiveness must be at least 1".to_string()));
        }
        self.exhaustiveness = exhaustiveness;
        Ok(())
    }

    pub fn set_num_modes(&mut self, num_modes: u32) -> Result<()> {
        if num_modes == 0 {
            return Err(WizardError::Validation("number of modes must be at least 1".to_string()));
        }
        self.num_modes = num_modes;
        Ok(())
    }

    pub fn set_gpu(&mut self, use_gpu: bool) {
        self.use_gpu = use_gpu;
        if !use_gpu {
            self.scoring_method = ScoringMethod::Vina;
        }
    }

    pub fn set_scoring_method(&mut self, method: ScoringMethod) -> Result<()> {
        if !self.use_gpu && method != ScoringMethod::Vina {
            return Err(WizardError::Validation(CPU_SCORING_HELP.to_string()));
        }
        self.scoring_method = method;
        Ok(())
    }

    /// Multipart fields as the server reads them. `use_gpu` goes out as the
    /// string "true"/"false".
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let scoring = if self.use_gpu {
            self.scoring_method
        } else {
            ScoringMethod::Vina
        };
        vec![
            ("search_mode", self.search_mode.to_string()),
            ("scoring_method", scoring.to_string()),
            ("exhaustiveness", self.exhaustiveness.to_string()),
            ("num_modes", self.num_modes.to_string()),
            ("use_gpu", self.use_gpu.to_string()),
        ]
    }
}
