//! 患者尺寸度量: 有效直径与水当量直径.
//!
//! 全部长度以厘米输出. 像素长度到物理长度的换算系数为
//! `0.1 * 重建直径(mm) / 该方向像素数`.

mod effective;
mod truncation;
mod water;

pub use effective::effective_diameter;
pub use truncation::truncation_percentage;
pub use water::water_equivalent_diameter;

use crate::data::{Frame, Mask};
use crate::error::{DoseError, Result};
use crate::segment::{segment_with, SegmentParams};
use crate::Idx2d;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 有效直径的三种估计方式.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum EffectiveMethod {
    /// 由前景面积推出等面积圆直径.
    Area,

    /// 过质心的水平线与竖直线上的前景长度的几何平均.
    Center,

    /// 最宽行与最高列 (二者独立选取) 的几何平均.
    Max,
}

/// 直径度量方法.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DiameterMethod {
    /// 有效直径 (只依赖掩码形状).
    Effective(EffectiveMethod),

    /// 水当量直径 (依赖掩码内平均 HU), 可选截断校正.
    WaterEquivalent {
        /// 是否做视野截断校正.
        truncated: bool,
    },
}

impl DiameterMethod {
    /// 全部方法, 按常用程度排列.
    pub const ALL: [Self; 5] = [
        Self::WaterEquivalent { truncated: false },
        Self::WaterEquivalent { truncated: true },
        Self::Effective(EffectiveMethod::Area),
        Self::Effective(EffectiveMethod::Center),
        Self::Effective(EffectiveMethod::Max),
    ];

    /// 简短名称, 用于日志和报表.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Effective(EffectiveMethod::Area) => "deff-area",
            Self::Effective(EffectiveMethod::Center) => "deff-center",
            Self::Effective(EffectiveMethod::Max) => "deff-max",
            Self::WaterEquivalent { truncated: false } => "dw",
            Self::WaterEquivalent { truncated: true } => "dw-truncated",
        }
    }

    /// 是否为水当量直径?
    #[inline]
    pub fn is_water_equivalent(&self) -> bool {
        matches!(self, Self::WaterEquivalent { .. })
    }
}

/// 截断校正信息.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Truncation {
    /// 位于图像边缘的边界像素百分比, `[0, 100]`.
    pub percentage: f64,

    /// 乘到水当量直径上的校正因子, `>= 1`.
    pub factor: f64,
}

/// 单张切片的直径度量结果.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DiameterResult {
    /// 直径 (cm).
    pub diameter: f64,

    /// 参考中心像素 `(行, 列)`. 仅 `center`/`max` 方法给出.
    pub center: Option<Idx2d>,

    /// 前后方向 (竖直) 长度 (cm). 仅 `center`/`max` 方法给出.
    pub ap: Option<f64>,

    /// 左右方向 (水平) 长度 (cm). 仅 `center`/`max` 方法给出.
    pub lat: Option<f64>,

    /// 截断校正. 仅带截断校正的水当量直径给出.
    pub truncation: Option<Truncation>,
}

impl DiameterResult {
    /// 只有直径的结果.
    #[inline]
    pub(crate) fn bare(diameter: f64) -> Self {
        Self {
            diameter,
            center: None,
            ap: None,
            lat: None,
            truncation: None,
        }
    }
}

/// 校验掩码与图像尺寸, 重建直径. 返回 `(行, 列)`.
pub(crate) fn check_input(mask: &Mask, dims: Idx2d, rd: f64) -> Result<Idx2d> {
    let (rows, cols) = dims;
    if rows == 0 || cols == 0 {
        return Err(DoseError::invalid(format!("图像尺寸为空: {rows} * {cols}")));
    }
    if mask.shape() != dims {
        return Err(DoseError::invalid(format!(
            "掩码形状 {:?} 与图像尺寸 {dims:?} 不一致",
            mask.shape()
        )));
    }
    if !rd.is_finite() || rd <= 0.0 {
        return Err(DoseError::invalid(format!("重建直径必须为正: {rd}")));
    }
    if mask.is_blank() {
        return Err(DoseError::SegmentationFailed { index: None });
    }
    Ok(dims)
}

/// 对已分割的切片按 `method` 度量直径.
pub fn measure(frame: &Frame, mask: &Mask, method: DiameterMethod) -> Result<DiameterResult> {
    let rd = frame.reconstruction_diameter();
    match method {
        DiameterMethod::Effective(m) => effective_diameter(mask, frame.shape(), rd, m),
        DiameterMethod::WaterEquivalent { truncated } => {
            water_equivalent_diameter(frame, mask, frame.shape(), rd, truncated)
        }
    }
}

/// 分割并度量单张切片. 分割失败时直接返回 `SegmentationFailed`.
pub fn measure_frame(
    frame: &Frame,
    method: DiameterMethod,
    params: &SegmentParams,
) -> Result<DiameterResult> {
    let mask = segment_with(frame, params)?;
    measure(frame, &mask, method)
}
