use serde::{Deserialize, Serialize};

use crate::client::{XDMF_STATIC_PATH, XDMF_TIMEVARYING_PATH};
use crate::mesh::Mesh;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XdmfKind {
    Static,
    TimeVarying,
}

impl XdmfKind {
    pub fn path(self) -> &'static str {
        match self {
            XdmfKind::Static => XDMF_STATIC_PATH,
            XdmfKind::TimeVarying => XDMF_TIMEVARYING_PATH,
        }
    }
}

/// ADCIRC/SWAN output files to describe, keyed by file name on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSelection {
    #[serde(rename = "fort.63")]
    pub fort63: bool,
    #[serde(rename = "fort.64")]
    pub fort64: bool,
    #[serde(rename = "fort.73")]
    pub fort73: bool,
    #[serde(rename = "fort.74")]
    pub fort74: bool,
    #[serde(rename = "maxele.63")]
    pub maxele: bool,
    #[serde(rename = "maxvel.63")]
    pub maxvel: bool,
    #[serde(rename = "maxwvel.63")]
    pub maxwvel: bool,
    #[serde(rename = "minpr.63")]
    pub minpr: bool,
    #[serde(rename = "swan_HS.63")]
    pub swan_hs: bool,
    #[serde(rename = "swan_TPS.63")]
    pub swan_tps: bool,
    #[serde(rename = "swan_DIR.63")]
    pub swan_dir: bool,
    #[serde(rename = "swan_HS_max.63")]
    pub swan_hs_max: bool,
    #[serde(rename = "swan_TPS_max.63")]
    pub swan_tps_max: bool,
}

/// Time axis for time-varying descriptions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeBlock {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cold_start_date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_start_date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_data_sets: Option<u32>,
    /// Seconds between data sets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_increment: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct XdmfRequest {
    pub mesh: Mesh,
    pub output: OutputSelection,
    pub paraview_version: String,
    pub adcirc_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<TimeBlock>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hsofs() -> Mesh {
        Mesh {
            name: "HSOFS".into(),
            nodes: 1_813_443,
            elements: 3_564_104,
        }
    }

    #[test]
    fn test_static_request_shape() {
        let req = XdmfRequest {
            mesh: hsofs(),
            output: OutputSelection {
                fort63: true,
                maxele: true,
                ..Default::default()
            },
            paraview_version: "5.11".into(),
            adcirc_version: "55".into(),
            time: None,
        };

        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(
            v["mesh"],
            json!({"name": "HSOFS", "nodes": 1_813_443, "elements": 3_564_104})
        );
        assert_eq!(v["output"]["fort.63"], true);
        assert_eq!(v["output"]["maxele.63"], true);
        assert_eq!(v["output"]["fort.64"], false);
        assert_eq!(v["paraviewVersion"], "5.11");
        assert_eq!(v["adcircVersion"], "55");
        assert!(v.get("time").is_none());
    }

    #[test]
    fn test_time_block_uses_camel_case() {
        let time = TimeBlock {
            cold_start_date_time: Some("2024-08-01T00:00:00Z".into()),
            output_start_date_time: Some("2024-08-15T00:00:00Z".into()),
            num_data_sets: Some(24),
            time_increment: Some(3600),
        };
        let v = serde_json::to_value(&time).unwrap();
        assert_eq!(
            v,
            json!({
                "coldStartDateTime": "2024-08-01T00:00:00Z",
                "outputStartDateTime": "2024-08-15T00:00:00Z",
                "numDataSets": 24,
                "timeIncrement": 3600
            })
        );
    }

    #[test]
    fn test_paths() {
        assert_eq!(XdmfKind::Static.path(), "/spa/paraview/XDMF/api/file/static");
        assert_eq!(
            XdmfKind::TimeVarying.path(),
            "/spa/paraview/XDMF/api/file/timevarying"
        );
    }
}
