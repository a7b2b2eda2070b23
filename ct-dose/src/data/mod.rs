//! CT 体数据与切片的基础数据结构.

mod frame;
mod mask;

pub use frame::{Frame, FrameGeometry};
pub use mask::{Connectivity, Mask};

use crate::error::{DoseError, Result};
use ndarray::{Axis, Ix3};
use nifti::{IntoNdArray, NiftiObject, ReaderOptions};
use std::path::Path;

/// 按扫描位置排好序的一组切片.
#[derive(Clone, Debug, Default)]
pub struct CtVolume {
    frames: Vec<Frame>,
}

impl CtVolume {
    /// 由若干切片构造体数据, 切片按 `slice_position` 升序重排.
    pub fn from_frames(mut frames: Vec<Frame>) -> Self {
        frames.sort_by(|a, b| a.slice_position().total_cmp(&b.slice_position()));
        Self { frames }
    }

    /// 打开 nii 文件格式的 3D CT 扫描.
    ///
    /// 1. 数据按 nifti 惯例以 `[W, H, z]` 存储, 读入后转换为 `[z, H, W]`;
    /// 2. 像素值经 `scl_slope/scl_inter` 变换后即为 HU;
    /// 3. 重建直径取 `列数 * 列方向像素间距`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let obj = ReaderOptions::new().read_file(path.as_ref())?;
        let [_, w_mm, h_mm, z_mm, ..] = obj.header().pixdim;
        let (w_mm, h_mm, z_mm) = (w_mm as f64, h_mm as f64, z_mm as f64);

        // [W, H, z] -> [z, H, W].
        let data = obj
            .into_volume()
            .into_ndarray::<f32>()?
            .permuted_axes([2, 1, 0].as_slice())
            .into_dimensionality::<Ix3>()
            .map_err(|e| DoseError::invalid(format!("体数据不是三维的: {e}")))?;

        let cols = data.len_of(Axis(2));
        let rd = cols as f64 * w_mm;
        let frames = data
            .axis_iter(Axis(0))
            .enumerate()
            .map(|(z, s)| {
                let geometry = FrameGeometry {
                    pixel_spacing: (h_mm, w_mm),
                    reconstruction_diameter: rd,
                    slice_position: z as f64 * z_mm,
                    slice_thickness: z_mm,
                };
                Frame::new(s.to_owned(), geometry)
            })
            .collect::<Result<Vec<_>>>()?;
        log::debug!(
            "opened {}: {} frames, {cols} cols, rd = {rd:.1}mm",
            path.as_ref().display(),
            frames.len()
        );
        Ok(Self::from_frames(frames))
    }

    /// 切片数.
    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// 是否不含切片?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// 全部切片.
    #[inline]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// 取出全部切片.
    #[inline]
    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }

    /// 各切片位置 (毫米), 升序.
    pub fn slice_positions(&self) -> Vec<f64> {
        self.frames.iter().map(Frame::slice_position).collect()
    }

    /// 首张切片的厚度 (毫米).
    #[inline]
    pub fn slice_thickness(&self) -> Option<f64> {
        self.frames.first().map(|f| f.geometry().slice_thickness)
    }
}
