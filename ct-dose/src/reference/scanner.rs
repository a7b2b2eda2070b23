//! 扫描仪标准化 CTDI 与准直校正数据.

use super::Phantom;
use crate::error::{DoseError, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 某一管电压下的标准化 CTDI (mGy / 100 mAs).
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VoltageCtdi {
    /// 管电压 (kV).
    pub voltage: f64,

    /// 头部模体 CTDI. 部分扫描仪缺失.
    #[cfg_attr(feature = "serde", serde(default))]
    pub head: Option<f64>,

    /// 体部模体 CTDI. 部分扫描仪缺失.
    #[cfg_attr(feature = "serde", serde(default))]
    pub body: Option<f64>,
}

/// 准直选项及其校正系数.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Collimation {
    /// 选项名称, 例如 `"16 x 1.5"`.
    pub option: String,

    /// 乘到 CTDI 上的系数.
    pub factor: f64,
}

/// 一台扫描仪的全部参考数据.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Scanner {
    /// 厂商.
    pub manufacturer: String,

    /// 型号.
    pub model: String,

    /// 按管电压列出的 CTDI.
    #[cfg_attr(feature = "serde", serde(default))]
    pub ctdi: Vec<VoltageCtdi>,

    /// 准直选项.
    #[cfg_attr(feature = "serde", serde(default))]
    pub collimation: Vec<Collimation>,
}

impl Scanner {
    /// 全名, `"{厂商} {型号}"`.
    #[inline]
    pub fn name(&self) -> String {
        format!("{} {}", self.manufacturer, self.model)
    }

    /// 全部可选管电压.
    pub fn voltages(&self) -> impl Iterator<Item = f64> + '_ {
        self.ctdi.iter().map(|v| v.voltage)
    }

    /// 获取给定管电压与模体下的标准化 CTDI.
    pub fn ctdi(&self, voltage: f64, phantom: Phantom) -> Result<f64> {
        self.ctdi
            .iter()
            .find(|v| v.voltage == voltage)
            .and_then(|v| match phantom {
                Phantom::Head => v.head,
                Phantom::Body => v.body,
            })
            .ok_or_else(|| {
                DoseError::missing(format!("{} 在 {voltage}kV 下的 {phantom} CTDI", self.name()))
            })
    }

    /// 获取准直选项的校正系数.
    pub fn collimation(&self, option: &str) -> Result<f64> {
        self.collimation
            .iter()
            .find(|c| c.option == option)
            .map(|c| c.factor)
            .ok_or_else(|| DoseError::missing(format!("{} 的准直选项 {option:?}", self.name())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanner() -> Scanner {
        Scanner {
            manufacturer: "Acme".into(),
            model: "CT-16".into(),
            ctdi: vec![
                VoltageCtdi {
                    voltage: 120.0,
                    head: Some(20.1),
                    body: Some(9.8),
                },
                VoltageCtdi {
                    voltage: 80.0,
                    head: Some(6.9),
                    body: None,
                },
            ],
            collimation: vec![Collimation {
                option: "16 x 1.5".into(),
                factor: 1.04,
            }],
        }
    }

    #[test]
    fn test_lookup() {
        let s = scanner();
        assert_eq!(s.ctdi(120.0, Phantom::Body).unwrap(), 9.8);
        assert_eq!(s.ctdi(80.0, Phantom::Head).unwrap(), 6.9);
        assert_eq!(s.collimation("16 x 1.5").unwrap(), 1.04);
        assert_eq!(s.voltages().collect::<Vec<_>>(), vec![120.0, 80.0]);
    }

    #[test]
    fn test_missing() {
        let s = scanner();
        let e = s.ctdi(80.0, Phantom::Body).unwrap_err();
        assert!(matches!(e, DoseError::CalibrationMissing { .. }));
        assert!(e.to_string().contains("80kV"));
        assert!(s.ctdi(100.0, Phantom::Head).is_err());
        assert!(s.collimation("4 x 1").is_err());
    }
}
