use crate::pair::DistanceFilter;
use crate::window::Windows;

/// Options for one statistics run. Integer options use `-1` for "unset".
#[derive(Debug, Clone)]
pub struct StatsConfig {
    pub win_size: i64,
    pub win_step: i64,
    pub filter: DistanceFilter,
    /// Whole-chromosome statistics instead of windows
    pub chromosome: bool,
    /// BED file of regions to report instead of windows
    pub region: Option<String>,
    pub no_fpkm: bool,
    pub separate_genomes: bool,
    /// Read length for overlap detection; `-1` disables it
    pub read_len: i64,
    /// Label appended as a final column
    pub name: Option<String>,
    pub json_out: bool,
}

impl Default for StatsConfig {
    fn default() -> Self {
        StatsConfig {
            win_size: -1,
            win_step: -1,
            filter: DistanceFilter::default(),
            chromosome: false,
            region: None,
            no_fpkm: false,
            separate_genomes: false,
            read_len: -1,
            name: None,
            json_out: false,
        }
    }
}

/// Statistics mode selected by a [`StatsConfig`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatsMode {
    Chromosome,
    Region(String),
    Window(Windows),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Window mode was selected but these options were not given
    MissingOptions(Vec<&'static str>),
    InvalidWindow { option: &'static str, value: i64 },
    ConflictingModes,
    JsonRequiresWindows,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingOptions(missing) => {
                write!(f, "Missing options for sliding-window statistics:")?;
                for option in missing {
                    write!(f, "\n  missing {}", option)?;
                }
                write!(
                    f,
                    "\nUse --chromosome or --region for whole-chromosome or region statistics"
                )
            }
            ConfigError::InvalidWindow { option, value } => {
                write!(f, "{} must be positive, got {}", option, value)
            }
            ConfigError::ConflictingModes => {
                write!(f, "--chromosome and --region cannot be used together")
            }
            ConfigError::JsonRequiresWindows => {
                write!(f, "--json is only available for sliding-window statistics")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl StatsConfig {
    /// Validate the options and pick the statistics mode
    pub fn mode(&self) -> Result<StatsMode, ConfigError> {
        if self.chromosome && self.region.is_some() {
            return Err(ConfigError::ConflictingModes);
        }

        if self.chromosome || self.region.is_some() {
            if self.json_out {
                return Err(ConfigError::JsonRequiresWindows);
            }
            return Ok(match &self.region {
                Some(path) => StatsMode::Region(path.clone()),
                None => StatsMode::Chromosome,
            });
        }

        let mut missing = Vec::new();
        if self.win_size == -1 {
            missing.push("-w/--win-size");
        }
        if self.win_step == -1 {
            missing.push("-s/--win-step");
        }
        if !missing.is_empty() {
            return Err(ConfigError::MissingOptions(missing));
        }

        if self.win_size <= 0 {
            return Err(ConfigError::InvalidWindow {
                option: "--win-size",
                value: self.win_size,
            });
        }
        if self.win_step <= 0 {
            return Err(ConfigError::InvalidWindow {
                option: "--win-step",
                value: self.win_step,
            });
        }

        Ok(StatsMode::Window(Windows::new(self.win_size, self.win_step)))
    }

    pub fn fpkm(&self) -> bool {
        !self.no_fpkm
    }

    pub fn overlaps(&self) -> bool {
        self.read_len != -1
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }
}
