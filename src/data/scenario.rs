use std::fs;
use std::path::{Path, PathBuf};

use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ForecastError, Result};

/// One preprocessed scene, stored as a JSON file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ScenarioItem {
    pub polylines: Vec<Vec<Vec<f32>>>, // [P, L, F], polyline 0 is the agent
    pub anchors: Vec<[f32; 2]>,         // [A, 2]
    pub ground_truth: [f32; 2],         // final position
    pub gt_traj: Vec<[f32; 2]>,         // [T, 2]
}

impl ScenarioItem {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read(path.as_ref())?;
        let item: ScenarioItem = serde_json::from_slice(&content)?;
        item.validate()?;
        Ok(item)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, serde_json::to_vec(self)?)?;
        Ok(())
    }

    /// Checks the scene is rectangular: every polyline has the same number of vectors
    /// and every vector the same number of features.
    pub fn validate(&self) -> Result<()> {
        let first = self
            .polylines
            .first()
            .ok_or_else(|| ForecastError::InvalidScenario("scene has no polylines".into()))?;
        let polyline_length = first.len();
        let n_features = first.first().map(|v| v.len()).unwrap_or(0);

        if polyline_length == 0 || n_features == 0 {
            return Err(ForecastError::InvalidScenario("empty agent polyline".into()));
        }

        let ragged = self.polylines.iter().any(|polyline| {
            polyline.len() != polyline_length || polyline.iter().any(|v| v.len() != n_features)
        });
        if ragged {
            return Err(ForecastError::InvalidScenario(format!(
                "polylines must all be {polyline_length}x{n_features}"
            )));
        }

        if self.anchors.is_empty() {
            return Err(ForecastError::InvalidScenario("scene has no anchors".into()));
        }
        if self.gt_traj.is_empty() {
            return Err(ForecastError::InvalidScenario("empty ground truth trajectory".into()));
        }

        Ok(())
    }

    /// [n_polylines, polyline_length, n_features]
    pub fn polyline_shape(&self) -> [usize; 3] {
        let polyline_length = self.polylines.first().map(|p| p.len()).unwrap_or(0);
        let n_features = self
            .polylines
            .first()
            .and_then(|p| p.first())
            .map(|v| v.len())
            .unwrap_or(0);

        [self.polylines.len(), polyline_length, n_features]
    }
}

/// Scenes of a directory, read back from disk on every access.
pub struct ScenarioDataset {
    scenario_paths: Vec<PathBuf>,
}

impl ScenarioDataset {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut scenario_paths: Vec<PathBuf> = fs::read_dir(path.as_ref())?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().map(|ext| ext == "json").unwrap_or(false))
            .collect();
        scenario_paths.sort();

        Ok(Self { scenario_paths })
    }
}

impl Dataset<ScenarioItem> for ScenarioDataset {
    fn get(&self, index: usize) -> Option<ScenarioItem> {
        let path = self.scenario_paths.get(index)?;

        match ScenarioItem::load(path) {
            Ok(item) => Some(item),
            Err(err) => {
                warn!("Cannot read scenario {}: {}", path.display(), err);
                None
            }
        }
    }

    fn len(&self) -> usize {
        self.scenario_paths.len()
    }
}
