//! 从 JSON 文件加载参考数据.
//!
//! 文件格式:
//!
//! ```json
//! {
//!   "age": [[0, 12.1], [1, 13.4], ...],
//!   "size": { "body": { "ap": [[x, y], ...], "lat": [...], "ap_lat": [...] }, "head": {...} },
//!   "conversion": { "body": { "ap": [...], "lat": [...], "effective": [...] }, "head": {...} },
//!   "effective_dose": { "Chest": { "alfa": -0.04, "beta": -3.1 }, ... },
//!   "organ_dose": { "Chest": [{ "organ": "Lung", "alfa": -0.05, "beta": 1.2 }, ...] },
//!   "scanners": [{ "manufacturer": "...", "model": "...", "ctdi": [...], "collimation": [...] }]
//! }
//! ```
//!
//! 除 `conversion` 外各项均可省略.

use super::{OrganRegression, Phantom, ProjectionKind, ReferenceData, Regression, Scanner, SizeKind};
use crate::config;
use crate::error::Result;
use crate::fitting::CalibrationTable;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawReference {
    #[serde(default)]
    age: Option<CalibrationTable>,
    #[serde(default)]
    size: BTreeMap<Phantom, BTreeMap<SizeKind, CalibrationTable>>,
    conversion: BTreeMap<Phantom, BTreeMap<ProjectionKind, CalibrationTable>>,
    #[serde(default)]
    effective_dose: BTreeMap<String, Regression>,
    #[serde(default)]
    organ_dose: BTreeMap<String, Vec<OrganRegression>>,
    #[serde(default)]
    scanners: Vec<Scanner>,
}

impl ReferenceData {
    /// 从 JSON 字符串加载.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let raw: RawReference = serde_json::from_str(s)?;
        let mut ans = ReferenceData::new();
        if let Some(t) = raw.age {
            ans = ans.with_age(t)?;
        }
        for (phantom, m) in raw.size {
            for (kind, t) in m {
                ans = ans.with_size(phantom, kind, t)?;
            }
        }
        for (phantom, m) in raw.conversion {
            for (kind, t) in m {
                ans = ans.with_conversion(phantom, kind, t)?;
            }
        }
        for (protocol, r) in raw.effective_dose {
            ans = ans.with_effective_dose(protocol, r);
        }
        for (protocol, organs) in raw.organ_dose {
            ans = ans.with_organ_dose(protocol, organs);
        }
        for s in raw.scanners {
            ans = ans.with_scanner(s);
        }
        log::debug!(
            "reference loaded: {} conversion tables, {} protocols, {} scanners",
            ans.conversion.len(),
            ans.effective_dose.len(),
            ans.scanners.len()
        );
        Ok(ans)
    }

    /// 从 JSON 文件加载.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path.as_ref())?;
        log::info!("loading reference data from {}", path.as_ref().display());
        Self::from_json_str(&s)
    }

    /// 从 `$CT_DOSE_REFERENCE` 或者 `$HOME/dataset/ct-dose/reference.json` 加载.
    #[inline]
    pub fn open_from_env_or_home() -> Result<Self> {
        Self::open(config::reference_path_from_env_or_home()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DoseError;

    const JSON: &str = r#"{
        "age": [[0, 12.0], [5, 16.0], [10, 20.0], [18, 27.0]],
        "size": {
            "head": { "ap_lat": [[20, 10], [30, 15], [40, 20], [50, 25]] }
        },
        "conversion": {
            "body": { "effective": [[10, 1.05], [20, 0.85], [30, 0.65], [40, 0.45]] },
            "head": { "ap": [[10, 1.2], [14, 1.1], [18, 1.0], [22, 0.9]] }
        },
        "effective_dose": { "Head": { "alfa": -0.01, "beta": -5.0 } },
        "organ_dose": { "Head": [ { "organ": "Brain", "alfa": -0.02, "beta": 0.1 } ] },
        "scanners": [
            {
                "manufacturer": "Acme",
                "model": "CT-64",
                "ctdi": [ { "voltage": 120, "head": 18.0, "body": 9.0 } ],
                "collimation": [ { "option": "64 x 0.6", "factor": 1.1 } ]
            }
        ]
    }"#;

    #[test]
    fn test_from_json() {
        let r = ReferenceData::from_json_str(JSON).unwrap();
        let c = r.conversion_curve(Phantom::Body, ProjectionKind::Effective).unwrap();
        assert!((c.evaluate(20.0) - 0.85).abs() < 1e-12);
        assert!(r.conversion_curve(Phantom::Head, ProjectionKind::Ap).is_ok());
        assert!(r.size_curve(Phantom::Head, SizeKind::ApLat).is_ok());
        assert!(r.age_curve().is_ok());
        assert_eq!(r.organ_dose("Head").unwrap()[0].organ, "Brain");
        let s = r.scanner("Acme", "CT-64").unwrap();
        assert_eq!(s.ctdi(120.0, Phantom::Head).unwrap(), 18.0);
        assert_eq!(s.collimation("64 x 0.6").unwrap(), 1.1);
    }

    #[test]
    fn test_malformed_table() {
        let bad = r#"{ "conversion": { "body": { "ap": [[1, 1], [3, 1], [2, 1], [4, 1]] } } }"#;
        assert!(matches!(
            ReferenceData::from_json_str(bad),
            Err(DoseError::Json(_))
        ));
        let few = r#"{ "conversion": { "body": { "ap": [[1, 1], [2, 1]] } } }"#;
        assert!(ReferenceData::from_json_str(few).is_err());
        let unknown = r#"{ "conversion": { "chest": {} } }"#;
        assert!(ReferenceData::from_json_str(unknown).is_err());
    }
}
