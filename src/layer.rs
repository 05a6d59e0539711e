//! Entity layer classification.

use serde::{Deserialize, Serialize};

/// Classification tag attached to services, instances, and endpoints.
///
/// Stored as its numeric value; the value mapping is part of the persisted
/// format and must not be reordered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Layer {
    #[default]
    Undefined,
    Mesh,
    General,
    OsLinux,
    K8s,
    Faas,
    MeshCp,
    MeshDp,
    Database,
    Cache,
    Browser,
    Mq,
}

impl Layer {
    /// Numeric value used in storage.
    pub fn value(self) -> i32 {
        match self {
            Layer::Undefined => 0,
            Layer::Mesh => 1,
            Layer::General => 2,
            Layer::OsLinux => 3,
            Layer::K8s => 4,
            Layer::Faas => 5,
            Layer::MeshCp => 6,
            Layer::MeshDp => 7,
            Layer::Database => 8,
            Layer::Cache => 9,
            Layer::Browser => 10,
            Layer::Mq => 13,
        }
    }

    /// Decode a stored numeric value; unknown values map to `Undefined`.
    pub fn from_value(value: i32) -> Self {
        match value {
            1 => Layer::Mesh,
            2 => Layer::General,
            3 => Layer::OsLinux,
            4 => Layer::K8s,
            5 => Layer::Faas,
            6 => Layer::MeshCp,
            7 => Layer::MeshDp,
            8 => Layer::Database,
            9 => Layer::Cache,
            10 => Layer::Browser,
            13 => Layer::Mq,
            _ => Layer::Undefined,
        }
    }

    /// Canonical name, as exposed to API consumers.
    pub fn name(self) -> &'static str {
        match self {
            Layer::Undefined => "UNDEFINED",
            Layer::Mesh => "MESH",
            Layer::General => "GENERAL",
            Layer::OsLinux => "OS_LINUX",
            Layer::K8s => "K8S",
            Layer::Faas => "FAAS",
            Layer::MeshCp => "MESH_CP",
            Layer::MeshDp => "MESH_DP",
            Layer::Database => "DATABASE",
            Layer::Cache => "CACHE",
            Layer::Browser => "BROWSER",
            Layer::Mq => "MQ",
        }
    }
}
