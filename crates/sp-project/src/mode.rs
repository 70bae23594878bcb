//! Work modes, visible concentration columns and scan plans.

use crate::schema::{
    COL_C0, COL_CT, COL_SIGMA_C0, COL_SIGMA_CT, ConcentrationRow, ProblemDescriptor,
};
use crate::{ProjectError, ProjectResult};
use sp_core::{MAX_SCAN_POINTS, Real, stepped_points};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkMode {
    /// Scan over the free concentration of one component (pX axis).
    #[default]
    Distribution,
    /// Scan over added titrant volume.
    Titration,
}

impl WorkMode {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkMode::Distribution => "distribution",
            WorkMode::Titration => "titration",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            WorkMode::Distribution => "Species Distribution",
            WorkMode::Titration => "Titration Simulation",
        }
    }
}

impl fmt::Display for WorkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkMode {
    type Err = ProjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "distribution" | "species distribution" => Ok(WorkMode::Distribution),
            "titration" | "titration simulation" => Ok(WorkMode::Titration),
            _ => Err(ProjectError::UnknownMode {
                mode: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcColumn {
    C0,
    Ct,
    SigmaC0,
    SigmaCt,
}

impl ConcColumn {
    pub const ALL: [ConcColumn; 4] = [
        ConcColumn::C0,
        ConcColumn::Ct,
        ConcColumn::SigmaC0,
        ConcColumn::SigmaCt,
    ];

    pub fn header(self) -> &'static str {
        match self {
            ConcColumn::C0 => COL_C0,
            ConcColumn::Ct => COL_CT,
            ConcColumn::SigmaC0 => COL_SIGMA_C0,
            ConcColumn::SigmaCt => COL_SIGMA_CT,
        }
    }

    pub fn value(self, row: &ConcentrationRow) -> Real {
        match self {
            ConcColumn::C0 => row.c0,
            ConcColumn::Ct => row.ct,
            ConcColumn::SigmaC0 => row.sigma_c0,
            ConcColumn::SigmaCt => row.sigma_ct,
        }
    }
}

/// Display policy attached to a work mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModePolicy {
    pub mode: WorkMode,
    pub visible_columns: &'static [ConcColumn],
}

impl ModePolicy {
    pub fn for_mode(mode: WorkMode) -> Self {
        let visible_columns: &'static [ConcColumn] = match mode {
            WorkMode::Distribution => &[ConcColumn::C0, ConcColumn::SigmaC0],
            WorkMode::Titration => &[
                ConcColumn::C0,
                ConcColumn::Ct,
                ConcColumn::SigmaC0,
                ConcColumn::SigmaCt,
            ],
        };
        Self {
            mode,
            visible_columns,
        }
    }

    /// Whether the scan bounds (initial/final pX) are user-facing in this mode.
    pub fn shows_scan_bounds(&self) -> bool {
        self.mode == WorkMode::Distribution
    }
}

/// Scan points and per-point total concentrations for one calculation.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanPlan {
    Distribution {
        /// Index of the component whose free concentration is fixed to 10^-pX.
        independent: usize,
        px: Vec<Real>,
        /// Total concentrations (C0); the independent component's entry is unused.
        totals: Vec<Real>,
    },
    Titration {
        v0: Real,
        /// Titrant volume added at each point.
        volumes: Vec<Real>,
        c0: Vec<Real>,
        ct: Vec<Real>,
    },
}

impl ScanPlan {
    pub fn from_descriptor(descriptor: &ProblemDescriptor, mode: WorkMode) -> ProjectResult<Self> {
        match mode {
            WorkMode::Distribution => {
                let dist = &descriptor.distribution;
                if descriptor.nc() == 0 {
                    return Err(ProjectError::malformed(
                        "distribution mode needs at least one component",
                    ));
                }
                let px = stepped_points(dist.initial_log, dist.final_log, dist.log_increment)?;
                Ok(ScanPlan::Distribution {
                    independent: dist.independent_component,
                    px,
                    totals: descriptor.concentrations.c0(),
                })
            }
            WorkMode::Titration => {
                let t = &descriptor.titration;
                let v0 = t
                    .v0
                    .filter(|v| v.is_finite() && *v > 0.0)
                    .ok_or_else(|| ProjectError::malformed("titration needs a positive 'v0'"))?;
                let increment = t
                    .volume_increment
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| ProjectError::malformed("titration needs 'vinc'"))?;
                let points = t
                    .points
                    .filter(|n| *n > 0)
                    .ok_or_else(|| ProjectError::malformed("titration needs 'nop' >= 1"))?;
                if points > MAX_SCAN_POINTS {
                    return Err(ProjectError::malformed(format!(
                        "nop {points} exceeds the limit of {MAX_SCAN_POINTS} points"
                    )));
                }
                let volumes: Vec<Real> = (0..points)
                    .map(|k| t.initial_volume + increment * k as Real)
                    .collect();
                if let Some(v) = volumes.iter().find(|v| v0 + **v <= 0.0) {
                    return Err(ProjectError::malformed(format!(
                        "titrant volume {v} leaves no solution in the vessel"
                    )));
                }
                Ok(ScanPlan::Titration {
                    v0,
                    volumes,
                    c0: descriptor.concentrations.c0(),
                    ct: descriptor.concentrations.ct(),
                })
            }
        }
    }

    pub fn mode(&self) -> WorkMode {
        match self {
            ScanPlan::Distribution { .. } => WorkMode::Distribution,
            ScanPlan::Titration { .. } => WorkMode::Titration,
        }
    }

    /// Axis values: pX in distribution mode, titrant volume in titration mode.
    pub fn axis(&self) -> &[Real] {
        match self {
            ScanPlan::Distribution { px, .. } => px,
            ScanPlan::Titration { volumes, .. } => volumes,
        }
    }

    pub fn axis_label(&self) -> &'static str {
        match self {
            ScanPlan::Distribution { .. } => "pX",
            ScanPlan::Titration { .. } => "V. add.",
        }
    }

    pub fn len(&self) -> usize {
        self.axis().len()
    }

    pub fn is_empty(&self) -> bool {
        self.axis().is_empty()
    }

    /// Component whose free concentration is imposed, if any.
    pub fn fixed_component(&self) -> Option<usize> {
        match self {
            ScanPlan::Distribution { independent, .. } => Some(*independent),
            ScanPlan::Titration { .. } => None,
        }
    }

    /// Imposed log10 free concentration of the fixed component at `point`.
    pub fn fixed_log_concentration(&self, point: usize) -> Option<Real> {
        match self {
            ScanPlan::Distribution { px, .. } => px.get(point).map(|p| -p),
            ScanPlan::Titration { .. } => None,
        }
    }

    /// Analytical total concentrations at `point`.
    pub fn totals_at(&self, point: usize) -> Vec<Real> {
        match self {
            ScanPlan::Distribution { totals, .. } => totals.clone(),
            ScanPlan::Titration { v0, volumes, c0, ct } => {
                let v = volumes.get(point).copied().unwrap_or(0.0);
                c0.iter()
                    .zip(ct)
                    .map(|(c0, ct)| (c0 * v0 + ct * v) / (v0 + v))
                    .collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn descriptor() -> ProblemDescriptor {
        ProblemDescriptor::from_value(json!({
            "speciesModel": {
                "Name": {"0": "OH"},
                "LogB": {"0": -13.73},
                "H": {"0": -1},
            },
            "concModel": {
                "C0": {"0": 0.01},
                "CT": {"0": -0.1},
            },
            "v0": 20.0,
            "vinc": 0.5,
            "nop": 5,
        }))
        .unwrap()
    }

    #[test]
    fn parses_mode_names_and_labels() {
        assert_eq!("distribution".parse::<WorkMode>().unwrap(), WorkMode::Distribution);
        assert_eq!("Titration".parse::<WorkMode>().unwrap(), WorkMode::Titration);
        assert_eq!(
            "Species Distribution".parse::<WorkMode>().unwrap(),
            WorkMode::Distribution
        );
    }

    #[test]
    fn unknown_mode_is_reported_with_its_value() {
        match "foo".parse::<WorkMode>() {
            Err(ProjectError::UnknownMode { mode }) => assert_eq!(mode, "foo"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn visible_columns_follow_mode() {
        let headers = |m| {
            ModePolicy::for_mode(m)
                .visible_columns
                .iter()
                .map(|c| c.header())
                .collect::<Vec<_>>()
        };
        assert_eq!(headers(WorkMode::Distribution), vec!["C0", "Sigma C0"]);
        assert_eq!(
            headers(WorkMode::Titration),
            vec!["C0", "CT", "Sigma C0", "Sigma CT"]
        );
    }

    #[test]
    fn distribution_plan_uses_default_px_bounds() {
        let plan = ScanPlan::from_descriptor(&descriptor(), WorkMode::Distribution).unwrap();
        assert_eq!(plan.len(), 131);
        assert_eq!(plan.axis()[0], 1.0);
        assert_eq!(plan.fixed_component(), Some(0));
        assert_eq!(plan.fixed_log_concentration(0), Some(-1.0));
    }

    #[test]
    fn titration_totals_follow_dilution() {
        let plan = ScanPlan::from_descriptor(&descriptor(), WorkMode::Titration).unwrap();
        assert_eq!(plan.axis(), &[0.0, 0.5, 1.0, 1.5, 2.0]);
        assert_eq!(plan.totals_at(0), vec![0.01]);
        let t = plan.totals_at(4)[0];
        let expected = (0.01 * 20.0 - 0.1 * 2.0) / 22.0;
        assert!((t - expected).abs() < 1e-15);
    }

    #[test]
    fn oversized_scans_are_malformed() {
        let mut d = descriptor();
        d.titration.points = Some(usize::MAX);
        assert!(matches!(
            ScanPlan::from_descriptor(&d, WorkMode::Titration),
            Err(ProjectError::Malformed { .. })
        ));

        let mut d = descriptor();
        d.distribution.log_increment = 1e-300;
        assert!(matches!(
            ScanPlan::from_descriptor(&d, WorkMode::Distribution),
            Err(ProjectError::Malformed { .. })
        ));
    }

    #[test]
    fn titration_without_settings_is_malformed() {
        let mut d = descriptor();
        d.titration.points = None;
        assert!(matches!(
            ScanPlan::from_descriptor(&d, WorkMode::Titration),
            Err(ProjectError::Malformed { .. })
        ));
    }
}
