//! Configuration types for the scheduling system.

use thiserror::Error;

use crate::scheduler::ResolveMode;

/// Default first working hour (inclusive).
pub const DEFAULT_WORK_START_HOUR: u32 = 9;
/// Default hour at which new work stops being started.
pub const DEFAULT_WORK_END_HOUR: u32 = 18;
/// Default pause inserted after every task.
pub const DEFAULT_GAP_MINUTES: u32 = 15;

/// Invalid configuration values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("work hours must satisfy start < end <= 24 (got {start}..{end})")]
    InvalidWorkHours { start: u32, end: u32 },
}

/// The daily interval during which tasks may be newly started.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkHours {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl WorkHours {
    pub fn new(start_hour: u32, end_hour: u32) -> Result<Self, ConfigError> {
        let hours = Self {
            start_hour,
            end_hour,
        };
        hours.validate()?;
        Ok(hours)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.start_hour >= self.end_hour || self.end_hour > 24 {
            return Err(ConfigError::InvalidWorkHours {
                start: self.start_hour,
                end: self.end_hour,
            });
        }
        Ok(())
    }

    /// Length of the working window in minutes.
    pub fn window_minutes(&self) -> u32 {
        (self.end_hour - self.start_hour) * 60
    }
}

impl Default for WorkHours {
    fn default() -> Self {
        Self {
            start_hour: DEFAULT_WORK_START_HOUR,
            end_hour: DEFAULT_WORK_END_HOUR,
        }
    }
}

/// Configuration for timeline packing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchedulingConfig {
    /// Hour of day the packer cursor starts at (and rolls over to).
    pub work_start_hour: u32,
    /// Cursor positions at or past this hour roll to the next day.
    pub work_end_hour: u32,
    /// Minutes inserted after each packed task.
    pub gap_minutes: u32,
    /// Verbosity level: 0=silent, 1=changes, 2=checks, 3=debug.
    pub verbosity: u8,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            work_start_hour: DEFAULT_WORK_START_HOUR,
            work_end_hour: DEFAULT_WORK_END_HOUR,
            gap_minutes: DEFAULT_GAP_MINUTES,
            verbosity: 0,
        }
    }
}

impl SchedulingConfig {
    /// Build a config, falling back to defaults for every unset field.
    pub fn new(
        work_start_hour: Option<u32>,
        work_end_hour: Option<u32>,
        gap_minutes: Option<u32>,
        verbosity: Option<u8>,
    ) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            work_start_hour: work_start_hour.unwrap_or(defaults.work_start_hour),
            work_end_hour: work_end_hour.unwrap_or(defaults.work_end_hour),
            gap_minutes: gap_minutes.unwrap_or(defaults.gap_minutes),
            verbosity: verbosity.unwrap_or(defaults.verbosity),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.work_hours().validate()
    }

    pub fn work_hours(&self) -> WorkHours {
        WorkHours {
            start_hour: self.work_start_hour,
            end_hour: self.work_end_hour,
        }
    }

    /// Resolver settings sharing this config's hours, gap and verbosity.
    pub fn resolver_config(&self, mode: ResolveMode) -> ResolverConfig {
        ResolverConfig {
            work_hours: self.work_hours(),
            gap_minutes: self.gap_minutes,
            mode,
            verbosity: self.verbosity,
        }
    }
}

/// Configuration for the conflict resolver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolverConfig {
    pub work_hours: WorkHours,
    /// Minutes between a pushed task and the one it collided with.
    pub gap_minutes: u32,
    pub mode: ResolveMode,
    pub verbosity: u8,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        SchedulingConfig::default().resolver_config(ResolveMode::default())
    }
}
