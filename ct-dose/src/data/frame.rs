//! 单张 CT 水平切片.

use crate::error::{DoseError, Result};
use crate::Idx2d;
use ndarray::{Array2, ArrayView2};
use std::ops::Index;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::mask::Mask;

/// 切片的几何信息. 所有长度以毫米为单位.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FrameGeometry {
    /// 像素间距, `(行方向, 列方向)`.
    pub pixel_spacing: (f64, f64),

    /// 重建视野直径.
    pub reconstruction_diameter: f64,

    /// 切片在扫描方向上的位置.
    pub slice_position: f64,

    /// 切片厚度.
    pub slice_thickness: f64,
}

impl FrameGeometry {
    /// 由重建视野直径和图像列数推出各向同性的像素间距.
    /// 切片位置和厚度置为 0.
    pub fn from_reconstruction(reconstruction_diameter: f64, cols: usize) -> Self {
        let px = reconstruction_diameter / cols.max(1) as f64;
        Self {
            pixel_spacing: (px, px),
            reconstruction_diameter,
            slice_position: 0.0,
            slice_thickness: 0.0,
        }
    }
}

/// CT 水平切片, 像素值为 HU.
///
/// 切片至少为 `1 * 1`, 且重建直径为正有限值.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Array2<f32>,
    geometry: FrameGeometry,
}

impl Index<Idx2d> for Frame {
    type Output = f32;

    #[inline]
    fn index(&self, index: Idx2d) -> &Self::Output {
        &self.data[index]
    }
}

impl Frame {
    /// 以 HU 矩阵和几何信息创建切片.
    pub fn new(data: Array2<f32>, geometry: FrameGeometry) -> Result<Self> {
        let (h, w) = data.dim();
        if h == 0 || w == 0 {
            return Err(DoseError::invalid(format!("切片尺寸为空: {h} * {w}")));
        }
        let rd = geometry.reconstruction_diameter;
        if !rd.is_finite() || rd <= 0.0 {
            return Err(DoseError::invalid(format!("重建直径必须为正: {rd}")));
        }
        Ok(Self { data, geometry })
    }

    /// 仅给出重建直径 (毫米) 的便捷构造, 像素间距由 `rd / cols` 推得.
    #[inline]
    pub fn with_reconstruction(data: Array2<f32>, reconstruction_diameter: f64) -> Result<Self> {
        let geometry = FrameGeometry::from_reconstruction(reconstruction_diameter, data.ncols());
        Self::new(data, geometry)
    }

    /// 设置切片位置与厚度 (毫米).
    #[inline]
    pub fn at_position(mut self, position: f64, thickness: f64) -> Self {
        self.geometry.slice_position = position;
        self.geometry.slice_thickness = thickness;
        self
    }

    /// 获取切片形状 `(行数, 列数)`.
    #[inline]
    pub fn shape(&self) -> Idx2d {
        self.data.dim()
    }

    /// 行数.
    #[inline]
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    /// 列数.
    #[inline]
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// 像素总数.
    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 几何信息.
    #[inline]
    pub fn geometry(&self) -> &FrameGeometry {
        &self.geometry
    }

    /// 重建直径 (毫米).
    #[inline]
    pub fn reconstruction_diameter(&self) -> f64 {
        self.geometry.reconstruction_diameter
    }

    /// 切片位置 (毫米).
    #[inline]
    pub fn slice_position(&self) -> f64 {
        self.geometry.slice_position
    }

    /// 只读视图.
    #[inline]
    pub fn view(&self) -> ArrayView2<f32> {
        self.data.view()
    }

    /// 获取像素值. 越界时返回 `None`.
    #[inline]
    pub fn get(&self, pos: Idx2d) -> Option<f32> {
        self.data.get(pos).copied()
    }

    /// 计算给定像素集合的平均 HU 值. 集合为空时返回 `None`.
    pub fn mean_hu<I: IntoIterator<Item = Idx2d>>(&self, it: I) -> Option<f64> {
        let (sum, cnt) = it
            .into_iter()
            .fold((0.0_f64, 0_usize), |(s, c), pos| (s + self[pos] as f64, c + 1));
        (cnt > 0).then(|| sum / cnt as f64)
    }

    /// 计算 `mask` 前景像素的平均 HU 值.
    ///
    /// # 注意
    ///
    /// 调用者需保证 `mask` 形状与切片相同. 前景为空时返回 `None`.
    pub fn mean_hu_masked(&self, mask: &Mask) -> Option<f64> {
        debug_assert_eq!(mask.shape(), self.shape());
        let (sum, cnt) = self
            .data
            .iter()
            .zip(mask.view().iter())
            .filter(|(_, &m)| m)
            .fold((0.0_f64, 0_usize), |(s, c), (&v, _)| (s + v as f64, c + 1));
        (cnt > 0).then(|| sum / cnt as f64)
    }
}
