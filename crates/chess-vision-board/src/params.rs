use crate::classify::ClassifierParams;
use crate::cluster::ClusterParams;
use crate::detector::DetectorParams;
use crate::expand::CircleGapFillerParams;
use crate::warp::WarpParams;
use serde::{Deserialize, Serialize};

/// Configuration for the full frame-to-labels pipeline.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct BoardRecognitionParams {
    pub detector: DetectorParams,
    pub cluster: ClusterParams,
    pub gap_filler: CircleGapFillerParams,
    /// Run the gap filler when a border row or column is empty.
    pub fill_gaps: bool,
    pub warp: WarpParams,
    pub classifier: ClassifierParams,
}

impl Default for BoardRecognitionParams {
    fn default() -> Self {
        Self {
            detector: DetectorParams::default(),
            cluster: ClusterParams::default(),
            gap_filler: CircleGapFillerParams::default(),
            fill_gaps: true,
            warp: WarpParams::default(),
            classifier: ClassifierParams::default(),
        }
    }
}

impl BoardRecognitionParams {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
