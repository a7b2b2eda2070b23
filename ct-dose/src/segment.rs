//! 人体区域分割.
//!
//! 阈值化 -> 补边 -> 空洞填充 -> 最大连通域 -> 去边.

use crate::consts::DEFAULT_THRESHOLD;
use crate::data::{Connectivity, Frame, Mask};
use crate::error::{DoseError, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 分割参数.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SegmentParams {
    /// HU 阈值. 严格大于该值为物体.
    pub threshold: f32,

    /// 连通域标记所用的连通性.
    pub connectivity: Connectivity,
}

impl Default for SegmentParams {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            connectivity: Connectivity::Eight,
        }
    }
}

impl SegmentParams {
    /// 以给定阈值和默认 (8-) 连通性构造参数.
    #[inline]
    pub fn with_threshold(threshold: f32) -> Self {
        Self {
            threshold,
            ..Self::default()
        }
    }
}

/// 以默认 (8-) 连通性分割切片中的最大物体 (通常即患者身体).
///
/// 与切片同形. 切片中没有严格高于 `threshold` 的像素时返回
/// `SegmentationFailed`.
#[inline]
pub fn segment(frame: &Frame, threshold: f32) -> Result<Mask> {
    segment_with(frame, &SegmentParams::with_threshold(threshold))
}

/// 以给定参数分割切片中的最大物体.
///
/// # 注意
///
/// 1. 先在四周补一圈背景, 因此贴着图像边缘的物体内部空洞也能被正确填充;
/// 2. 多个连通域大小相同时, 取行优先扫描顺序下先被发现的那个.
pub fn segment_with(frame: &Frame, params: &SegmentParams) -> Result<Mask> {
    let (h, w) = frame.shape();
    let mut mask = Mask::from_fn((h + 2, w + 2), |(r, c)| {
        r >= 1 && c >= 1 && r <= h && c <= w && frame[(r - 1, c - 1)] > params.threshold
    });
    mask.fill_holes();

    let areas = mask.areas(true, params.connectivity);
    let mut largest: Option<&Vec<_>> = None;
    for a in areas.iter() {
        if largest.map_or(true, |l| a.len() > l.len()) {
            largest = Some(a);
        }
    }
    let largest = largest.ok_or(DoseError::SegmentationFailed { index: None })?;
    log::trace!(
        "segment: {} areas, largest has {} px",
        areas.len(),
        largest.len()
    );

    Ok(Mask::from_positions(mask.shape(), largest.iter().copied()).cropped())
}
