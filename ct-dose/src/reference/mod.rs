//! 只读参考数据: 各类参考表, 回归系数, 扫描仪 CTDI.
//!
//! 参考数据在启动时加载一次, 之后只读, 可在多线程间共享而无需加锁.

#[cfg(feature = "serde")]
mod load;
mod scanner;

pub use scanner::{Collimation, Scanner, VoltageCtdi};

use crate::error::{DoseError, Result};
use crate::fitting::{CalibrationTable, Curve};
use std::collections::HashMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 剂量模体.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Phantom {
    /// 16cm 头部模体.
    Head,

    /// 32cm 体部模体. 体部参考表也用于胸部 (thorax).
    Body,
}

impl fmt::Display for Phantom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Head => "head",
            Self::Body => "body",
        })
    }
}

/// 手动测量的尺寸种类, 用于 "测量值 -> 有效直径" 参考表.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SizeKind {
    /// 前后径.
    Ap,

    /// 左右径.
    Lat,

    /// 前后径与左右径之和.
    ApLat,
}

/// 转换因子参考表的种类.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ProjectionKind {
    /// 以前后径为自变量.
    Ap,

    /// 以左右径为自变量.
    Lat,

    /// 以有效直径 (或水当量直径) 为自变量.
    Effective,
}

impl fmt::Display for ProjectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ap => "ap",
            Self::Lat => "lat",
            Self::Effective => "effective",
        })
    }
}

/// 指数回归系数, `f(d) = exp(alfa * d + beta)`.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Regression {
    /// 直径项系数.
    pub alfa: f64,

    /// 常数项.
    pub beta: f64,
}

impl Regression {
    /// 在直径 `d` (cm) 处求值.
    #[inline]
    pub fn eval(&self, d: f64) -> f64 {
        (self.alfa * d + self.beta).exp()
    }
}

/// 单个器官的回归系数.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OrganRegression {
    /// 器官名称.
    pub organ: String,

    /// 回归系数.
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub coefficients: Regression,
}

/// 全部参考数据.
///
/// 任何缺失的表都以 `CalibrationMissing` 报告, 从不使用默认表代替.
#[derive(Clone, Debug, Default)]
pub struct ReferenceData {
    age: Option<Curve>,
    size: HashMap<(Phantom, SizeKind), Curve>,
    conversion: HashMap<(Phantom, ProjectionKind), Curve>,
    effective_dose: HashMap<String, Regression>,
    organ_dose: HashMap<String, Vec<OrganRegression>>,
    scanners: Vec<Scanner>,
}

impl ReferenceData {
    /// 空参考数据.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置 "年龄 (岁) -> 有效直径 (cm)" 参考表.
    pub fn with_age(mut self, table: CalibrationTable) -> Result<Self> {
        self.age = Some(Curve::build(table)?);
        Ok(self)
    }

    /// 设置 "手动测量值 (cm) -> 有效直径 (cm)" 参考表.
    pub fn with_size(mut self, phantom: Phantom, kind: SizeKind, table: CalibrationTable) -> Result<Self> {
        self.size.insert((phantom, kind), Curve::build(table)?);
        Ok(self)
    }

    /// 设置 "直径 (cm) -> 转换因子" 参考表.
    pub fn with_conversion(
        mut self,
        phantom: Phantom,
        kind: ProjectionKind,
        table: CalibrationTable,
    ) -> Result<Self> {
        self.conversion.insert((phantom, kind), Curve::build(table)?);
        Ok(self)
    }

    /// 设置某一协议的有效剂量回归系数.
    pub fn with_effective_dose(mut self, protocol: impl Into<String>, r: Regression) -> Self {
        self.effective_dose.insert(protocol.into(), r);
        self
    }

    /// 设置某一协议的器官剂量回归系数. 器官顺序即输出顺序.
    pub fn with_organ_dose(mut self, protocol: impl Into<String>, organs: Vec<OrganRegression>) -> Self {
        self.organ_dose.insert(protocol.into(), organs);
        self
    }

    /// 添加扫描仪.
    pub fn with_scanner(mut self, scanner: Scanner) -> Self {
        self.scanners.push(scanner);
        self
    }

    /// "年龄 -> 有效直径" 曲线.
    pub fn age_curve(&self) -> Result<&Curve> {
        self.age.as_ref().ok_or_else(|| DoseError::missing("age"))
    }

    /// "手动测量值 -> 有效直径" 曲线.
    pub fn size_curve(&self, phantom: Phantom, kind: SizeKind) -> Result<&Curve> {
        self.size
            .get(&(phantom, kind))
            .ok_or_else(|| DoseError::missing(format!("{phantom}/{kind:?} 尺寸表")))
    }

    /// "直径 -> 转换因子" 曲线.
    pub fn conversion_curve(&self, phantom: Phantom, kind: ProjectionKind) -> Result<&Curve> {
        self.conversion
            .get(&(phantom, kind))
            .ok_or_else(|| DoseError::missing(format!("{phantom}/{kind} 转换因子表")))
    }

    /// 有效剂量回归系数.
    pub fn effective_dose(&self, protocol: &str) -> Result<Regression> {
        self.effective_dose
            .get(protocol)
            .copied()
            .ok_or_else(|| DoseError::missing(format!("协议 {protocol:?} 的有效剂量系数")))
    }

    /// 器官剂量回归系数.
    pub fn organ_dose(&self, protocol: &str) -> Result<&[OrganRegression]> {
        self.organ_dose
            .get(protocol)
            .filter(|v| !v.is_empty())
            .map(Vec::as_slice)
            .ok_or_else(|| DoseError::missing(format!("协议 {protocol:?} 的器官剂量系数")))
    }

    /// 按厂商与型号查找扫描仪.
    pub fn scanner(&self, manufacturer: &str, model: &str) -> Result<&Scanner> {
        self.scanners
            .iter()
            .find(|s| s.manufacturer == manufacturer && s.model == model)
            .ok_or_else(|| DoseError::missing(format!("扫描仪 {manufacturer} {model}")))
    }

    /// 全部扫描仪.
    #[inline]
    pub fn scanners(&self) -> &[Scanner] {
        &self.scanners
    }

    /// 全部带有效剂量系数的协议名, 按字典序.
    pub fn protocols(&self) -> Vec<&str> {
        let mut v: Vec<&str> = self.effective_dose.keys().map(String::as_str).collect();
        v.sort_unstable();
        v
    }
}
