use super::{check_input, truncation_percentage, DiameterResult, Truncation};
use crate::consts::{MM_TO_CM, TRUNCATION_COEFFICIENT};
use crate::data::{Frame, Mask};
use crate::error::{DoseError, Result};
use crate::Idx2d;
use std::f64::consts::PI;

/// 计算水当量直径 (cm).
///
/// `dw = 0.2 * sqrt((mean_hu / 1000 + 1) * area / π)`, 其中 `mean_hu` 只统计前景像素,
/// `area` 为前景物理面积 (mm²). `truncated` 为真时再乘以
/// `exp(1.14e-6 * p^3)`, `p` 为截断百分比.
///
/// # 注意
///
/// 平均 HU 低于 -1000 (比空气还稀薄) 时, 密度项按 0 处理.
pub fn water_equivalent_diameter(
    frame: &Frame,
    mask: &Mask,
    dims: Idx2d,
    rd: f64,
    truncated: bool,
) -> Result<DiameterResult> {
    let (rows, cols) = check_input(mask, dims, rd)?;
    if frame.shape() != dims {
        return Err(DoseError::invalid(format!(
            "切片形状 {:?} 与图像尺寸 {dims:?} 不一致",
            frame.shape()
        )));
    }
    let mean_hu = frame
        .mean_hu_masked(mask)
        .ok_or(DoseError::SegmentationFailed { index: None })?;

    let area = mask.count() as f64 * rd * rd / (rows * cols) as f64;
    let density = (mean_hu / 1000.0 + 1.0).max(0.0);
    let dw = 2.0 * MM_TO_CM * (density * area / PI).sqrt();

    if !truncated {
        return Ok(DiameterResult::bare(dw));
    }
    let percentage = truncation_percentage(mask);
    let factor = (TRUNCATION_COEFFICIENT * percentage.powi(3)).exp();
    log::trace!("truncation {percentage:.2}% => factor {factor:.4}");
    Ok(DiameterResult {
        truncation: Some(Truncation { percentage, factor }),
        ..DiameterResult::bare(dw * factor)
    })
}
