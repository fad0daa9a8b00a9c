use serde::{Deserialize, Serialize};

use crate::calibration::CalibrationConfig;
use crate::error::Result;
use crate::grid::GridShape;
use crate::trigger::TriggerConfig;

/// Everything the external driver configures: one calibration cycle and the
/// live trigger that follows it.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CoreConfig {
    #[serde(default)]
    pub calibration: CalibrationConfig,
    #[serde(default)]
    pub trigger: TriggerConfig,
}

impl CoreConfig {
    /// Fail fast on any inconsistency with the sensor grid.
    pub fn validate(&self, shape: GridShape) -> Result<()> {
        self.calibration.validate(shape)?;
        self.trigger.validate(shape)
    }
}
