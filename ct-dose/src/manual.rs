//! 手动给出的患者尺寸: 直接输入, 单向/双向径线, 年龄.
//!
//! 除直接输入的有效直径外, 其余来源都需要经参考表换算.

use crate::consts::MM_TO_CM;
use crate::error::{DoseError, Result};
use crate::fitting::DomainCheck;
use crate::reference::{Phantom, ProjectionKind, ReferenceData, SizeKind};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 手动尺寸来源. 长度单位为 cm.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ManualSource {
    /// 直接给出有效直径.
    Deff(f64),

    /// 前后径.
    Ap(f64),

    /// 左右径.
    Lat(f64),

    /// 前后径与左右径, 以二者之和查表.
    ApLat {
        /// 前后径.
        ap: f64,
        /// 左右径.
        lat: f64,
    },

    /// 年龄.
    Age {
        /// 岁.
        years: u32,
        /// 月, `0..12`.
        months: u32,
    },
}

/// 换算结果.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ManualEstimate {
    /// 有效直径 (cm).
    pub diameter: f64,

    /// 查表自变量相对于参考表定义域的位置. 直接输入时恒为 `Inside`.
    pub domain: DomainCheck,
}

impl ManualSource {
    /// 换算为有效直径.
    ///
    /// 查表自变量超出参考表范围时仍返回外推结果, 并记录警告.
    pub fn resolve(&self, phantom: Phantom, reference: &ReferenceData) -> Result<ManualEstimate> {
        let (x, curve) = match *self {
            Self::Deff(d) => {
                return Ok(ManualEstimate {
                    diameter: positive(d, "有效直径")?,
                    domain: DomainCheck::Inside,
                });
            }
            Self::Ap(v) => (positive(v, "前后径")?, reference.size_curve(phantom, SizeKind::Ap)?),
            Self::Lat(v) => (positive(v, "左右径")?, reference.size_curve(phantom, SizeKind::Lat)?),
            Self::ApLat { ap, lat } => {
                let x = positive(ap, "前后径")? + positive(lat, "左右径")?;
                (x, reference.size_curve(phantom, SizeKind::ApLat)?)
            }
            Self::Age { years, months } => {
                if months >= 12 {
                    return Err(DoseError::invalid(format!("月份必须小于 12: {months}")));
                }
                (years as f64 + months as f64 / 12.0, reference.age_curve()?)
            }
        };

        let domain = curve.check(x);
        if domain.is_extrapolated() {
            let (lo, hi) = curve.domain();
            log::warn!("{:?}: {x:.2} 超出参考表范围 [{lo}, {hi}], 结果为外推值", self);
        }
        Ok(ManualEstimate {
            diameter: curve.evaluate(x),
            domain,
        })
    }

    /// 剂量换算时应使用的转换因子表种类.
    #[inline]
    pub fn projection(&self) -> ProjectionKind {
        match self {
            Self::Ap(_) => ProjectionKind::Ap,
            Self::Lat(_) => ProjectionKind::Lat,
            _ => ProjectionKind::Effective,
        }
    }
}

fn positive(v: f64, what: &str) -> Result<f64> {
    if v.is_finite() && v > 0.0 {
        Ok(v)
    } else {
        Err(DoseError::invalid(format!("{what}必须为正: {v}")))
    }
}

/// 图像上两点 `(行, 列)` 之间线段的物理长度 (cm).
///
/// 像素尺寸取 `0.1 * rd / cols`, `rd` 为重建直径 (mm).
pub fn line_length_cm(p0: (f64, f64), p1: (f64, f64), cols: usize, rd: f64) -> Result<f64> {
    if cols == 0 || !rd.is_finite() || rd <= 0.0 {
        return Err(DoseError::invalid(format!("图像宽度 {cols} 或重建直径 {rd} 不合法")));
    }
    let (dr, dc) = (p1.0 - p0.0, p1.1 - p0.1);
    Ok(MM_TO_CM * rd / cols as f64 * dr.hypot(dc))
}
