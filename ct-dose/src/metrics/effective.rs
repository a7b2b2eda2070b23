use super::{check_input, DiameterResult, EffectiveMethod};
use crate::consts::MM_TO_CM;
use crate::data::Mask;
use crate::error::Result;
use crate::Idx2d;
use std::f64::consts::PI;

/// 计算有效直径 (cm).
///
/// - `mask` 必须与 `dims = (行, 列)` 同形且含有前景;
/// - `rd` 为重建直径 (mm).
///
/// 前景为空时返回 `SegmentationFailed`, 输入不一致时返回 `InvalidInput`.
pub fn effective_diameter(
    mask: &Mask,
    dims: Idx2d,
    rd: f64,
    method: EffectiveMethod,
) -> Result<DiameterResult> {
    let (rows, cols) = check_input(mask, dims, rd)?;
    // 单个像素在两个方向上的物理长度 (cm).
    let row_cm = MM_TO_CM * rd / rows as f64;
    let col_cm = MM_TO_CM * rd / cols as f64;

    let ans = match method {
        EffectiveMethod::Area => {
            let area = mask.count() as f64 * rd * rd / (rows * cols) as f64;
            DiameterResult::bare(2.0 * MM_TO_CM * (area / PI).sqrt())
        }
        EffectiveMethod::Center => {
            // 前景非空, 质心必然存在.
            let (ch, cw) = mask.centroid().unwrap_or_default();
            let center = (ch as usize, cw as usize);
            let ap_px = (0..rows).filter(|&r| mask[(r, center.1)]).count();
            let lat_px = (0..cols).filter(|&c| mask[(center.0, c)]).count();
            with_extents(center, ap_px as f64 * row_cm, lat_px as f64 * col_cm)
        }
        EffectiveMethod::Max => {
            let (max_r, lat_px) = first_max(&mask.row_counts());
            let (max_c, ap_px) = first_max(&mask.col_counts());
            with_extents((max_r, max_c), ap_px as f64 * row_cm, lat_px as f64 * col_cm)
        }
    };
    Ok(ans)
}

#[inline]
fn with_extents(center: Idx2d, ap: f64, lat: f64) -> DiameterResult {
    DiameterResult {
        diameter: (ap * lat).sqrt(),
        center: Some(center),
        ap: Some(ap),
        lat: Some(lat),
        truncation: None,
    }
}

/// 第一个最大值的 `(下标, 值)`.
fn first_max(v: &[usize]) -> (usize, usize) {
    v.iter()
        .enumerate()
        .fold((0, 0), |(bi, bv), (i, &x)| if x > bv { (i, x) } else { (bi, bv) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DoseError;

    fn f64_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    /// 10 * 10 图像, 重建直径 100mm => 每像素 1cm.
    fn rect(r0: usize, r1: usize, c0: usize, c1: usize) -> Mask {
        Mask::from_fn((10, 10), |(r, c)| (r0..=r1).contains(&r) && (c0..=c1).contains(&c))
    }

    #[test]
    fn test_area() {
        let m = rect(0, 3, 0, 3);
        let r = effective_diameter(&m, (10, 10), 100.0, EffectiveMethod::Area).unwrap();
        assert!(f64_eq(r.diameter, 2.0 * (16.0 / PI).sqrt()));
    }

    #[test]
    fn test_area_ignores_shape() {
        let a = rect(2, 5, 2, 5);
        // 同样 16 个像素, 但带有空洞并分成了两块.
        let mut b = rect(1, 3, 1, 5);
        b[(2, 3)] = false;
        b[(8, 8)] = true;
        b[(8, 9)] = true;
        assert_eq!(a.count(), b.count());
        let da = effective_diameter(&a, (10, 10), 123.0, EffectiveMethod::Area).unwrap();
        let db = effective_diameter(&b, (10, 10), 123.0, EffectiveMethod::Area).unwrap();
        assert!(f64_eq(da.diameter, db.diameter));
    }

    #[test]
    fn test_center() {
        // 4 行 * 6 列.
        let m = rect(2, 5, 1, 6);
        let r = effective_diameter(&m, (10, 10), 100.0, EffectiveMethod::Center).unwrap();
        assert_eq!(r.center, Some((3, 3)));
        assert!(f64_eq(r.ap.unwrap(), 4.0));
        assert!(f64_eq(r.lat.unwrap(), 6.0));
        assert!(f64_eq(r.diameter, 24.0_f64.sqrt()));
    }

    #[test]
    fn test_max_independent_axes() {
        // 一个 "L" 形: 最宽行与最高列不在同一处交叉.
        let mut m = rect(0, 7, 0, 0);
        for c in 0..5 {
            m[(9, c)] = true;
        }
        let r = effective_diameter(&m, (10, 10), 100.0, EffectiveMethod::Max).unwrap();
        assert_eq!(r.center, Some((9, 0)));
        assert!(f64_eq(r.ap.unwrap(), 9.0));
        assert!(f64_eq(r.lat.unwrap(), 5.0));
        assert!(f64_eq(r.diameter, 45.0_f64.sqrt()));
    }

    #[test]
    fn test_degenerate_masks_are_finite() {
        let one = Mask::from_positions((10, 10), [(4, 4)]);
        let full = rect(0, 9, 0, 9);
        for m in [one, full] {
            for method in [EffectiveMethod::Area, EffectiveMethod::Center, EffectiveMethod::Max] {
                let r = effective_diameter(&m, (10, 10), 250.0, method).unwrap();
                assert!(r.diameter.is_finite() && r.diameter > 0.0);
            }
        }
    }

    #[test]
    fn test_non_square_pixels() {
        // 5 行 * 10 列, 行方向像素更大.
        let m = Mask::from_fn((5, 10), |_| true);
        let r = effective_diameter(&m, (5, 10), 100.0, EffectiveMethod::Max).unwrap();
        assert!(f64_eq(r.ap.unwrap(), 10.0));
        assert!(f64_eq(r.lat.unwrap(), 10.0));
    }

    #[test]
    fn test_empty_mask() {
        let e = effective_diameter(&Mask::zeros((3, 3)), (3, 3), 10.0, EffectiveMethod::Area);
        assert!(matches!(e, Err(DoseError::SegmentationFailed { .. })));
    }
}
