use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GradeBand {
    Excellent,
    Good,
    Acceptable,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceHealth {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl AttendanceHealth {
    pub fn label(self) -> &'static str {
        match self {
            AttendanceHealth::Excellent => "excellent",
            AttendanceHealth::Good => "good",
            AttendanceHealth::Fair => "fair",
            AttendanceHealth::Poor => "poor",
        }
    }
}

/// Lower bounds of each grade band on a `0..=scale_max` scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradePolicy {
    pub excellent: f64,
    pub good: f64,
    pub acceptable: f64,
    pub scale_max: f64,
}

impl Default for GradePolicy {
    fn default() -> Self {
        Self {
            excellent: 18.0,
            good: 14.0,
            acceptable: 11.0,
            scale_max: 20.0,
        }
    }
}

impl GradePolicy {
    /// Scores that are not finite or fall outside the scale count as zero.
    pub fn clamp(&self, score: f64) -> f64 {
        if score.is_finite() && (0.0..=self.scale_max).contains(&score) {
            score
        } else {
            0.0
        }
    }

    pub fn band(&self, score: f64) -> GradeBand {
        let score = self.clamp(score);
        if score >= self.excellent {
            GradeBand::Excellent
        } else if score >= self.good {
            GradeBand::Good
        } else if score >= self.acceptable {
            GradeBand::Acceptable
        } else {
            GradeBand::Low
        }
    }
}

/// Lower bounds (percent) of each attendance health bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttendancePolicy {
    pub excellent: f64,
    pub good: f64,
    pub fair: f64,
}

impl Default for AttendancePolicy {
    fn default() -> Self {
        Self {
            excellent: 90.0,
            good: 75.0,
            fair: 60.0,
        }
    }
}

impl AttendancePolicy {
    pub fn health(&self, rate: f64) -> AttendanceHealth {
        if rate >= self.excellent {
            AttendanceHealth::Excellent
        } else if rate >= self.good {
            AttendanceHealth::Good
        } else if rate >= self.fair {
            AttendanceHealth::Fair
        } else {
            AttendanceHealth::Poor
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardPolicy {
    pub grades: GradePolicy,
    pub attendance: AttendancePolicy,
}

impl DashboardPolicy {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read policy file {}", path.display()))?;
        let policy: DashboardPolicy = serde_json::from_str(&raw)
            .with_context(|| format!("invalid policy file {}", path.display()))?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let g = &self.grades;
        if !(g.scale_max > 0.0 && g.scale_max.is_finite()) {
            anyhow::bail!("grade scale_max must be a positive number, got {}", g.scale_max);
        }
        if !(g.scale_max >= g.excellent && g.excellent > g.good && g.good > g.acceptable && g.acceptable > 0.0) {
            anyhow::bail!(
                "grade thresholds must descend within (0, {}]: excellent {} > good {} > acceptable {}",
                g.scale_max,
                g.excellent,
                g.good,
                g.acceptable
            );
        }

        let a = &self.attendance;
        if !(100.0 >= a.excellent && a.excellent > a.good && a.good > a.fair && a.fair > 0.0) {
            anyhow::bail!(
                "attendance thresholds must descend within (0, 100]: excellent {} > good {} > fair {}",
                a.excellent,
                a.good,
                a.fair
            );
        }

        Ok(())
    }
}
