//! Fixed classifier label set and display metadata.
//!
//! The label order here is the model's output order and is load-bearing:
//! scores are zipped with `LABELS` by index, and ties in the ranking are
//! broken by this declaration order. The `not_banana` sentinel means the
//! subject is not the expected object type at all.

use serde::{Deserialize, Serialize};

/// Output labels in model declaration order. Index i corresponds to the
/// i-th element of the model's score vector.
pub const LABELS: [&str; 8] = [
    "healthy",
    "black_sigatoka",
    "yellow_sigatoka",
    "panama_wilt",
    "moko",
    "bunchy_top",
    "cordana",
    "not_banana",
];

/// Sentinel label: the subject is not a banana plant.
pub const SENTINEL_LABEL: &str = "not_banana";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    None,
    Moderate,
    High,
    Critical,
}

/// Display metadata for one label. Tangential to the pipeline itself;
/// the decision gate only ever looks at label ids and confidences.
#[derive(Debug, Clone)]
pub struct LabelInfo {
    pub id: &'static str,
    pub display_name: &'static str,
    pub severity: Severity,
    pub recommendation: &'static str,
}

const LABEL_TABLE: [LabelInfo; 8] = [
    LabelInfo {
        id: "healthy",
        display_name: "Healthy",
        severity: Severity::None,
        recommendation: "No action needed. Keep monitoring the plantation regularly.",
    },
    LabelInfo {
        id: "black_sigatoka",
        display_name: "Black Sigatoka",
        severity: Severity::High,
        recommendation: "Remove infected leaves and apply a protectant fungicide rotation.",
    },
    LabelInfo {
        id: "yellow_sigatoka",
        display_name: "Yellow Sigatoka",
        severity: Severity::Moderate,
        recommendation: "Prune affected leaves and improve canopy airflow.",
    },
    LabelInfo {
        id: "panama_wilt",
        display_name: "Panama Disease (Fusarium Wilt)",
        severity: Severity::Critical,
        recommendation: "Quarantine the mat, disinfect tools, and avoid replanting susceptible cultivars.",
    },
    LabelInfo {
        id: "moko",
        display_name: "Moko Disease",
        severity: Severity::Critical,
        recommendation: "Destroy infected plants and control insect vectors around flower buds.",
    },
    LabelInfo {
        id: "bunchy_top",
        display_name: "Banana Bunchy Top",
        severity: Severity::Critical,
        recommendation: "Rogue infected plants immediately and manage aphid populations.",
    },
    LabelInfo {
        id: "cordana",
        display_name: "Cordana Leaf Spot",
        severity: Severity::Moderate,
        recommendation: "Improve drainage and remove heavily spotted leaves.",
    },
    LabelInfo {
        id: "not_banana",
        display_name: "Not a banana plant",
        severity: Severity::None,
        recommendation: "Retake the photo with a banana leaf or plant in frame.",
    },
];

/// Look up display metadata by label id.
pub fn label_info(id: &str) -> Option<&'static LabelInfo> {
    LABEL_TABLE.iter().find(|info| info.id == id)
}
