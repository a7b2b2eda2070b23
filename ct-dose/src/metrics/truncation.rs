use crate::data::Mask;

/// 截断百分比: 位于图像最外圈的边界像素占全部边界像素的百分比.
///
/// 边界由 [`Mask::boundary`] 给出, 每个边界像素只计一次 (角点也不例外).
/// 掩码为空时返回 `0`.
pub fn truncation_percentage(mask: &Mask) -> f64 {
    let boundary = mask.boundary();
    let (total, on_border) = boundary
        .view()
        .indexed_iter()
        .filter(|(_, &b)| b)
        .fold((0_usize, 0_usize), |(t, o), (pos, _)| {
            (t + 1, o + mask.is_at_border(pos) as usize)
        });
    if total == 0 {
        0.0
    } else {
        100.0 * on_border as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(r0: usize, r1: usize, c0: usize, c1: usize) -> Mask {
        Mask::from_fn((10, 10), |(r, c)| (r0..=r1).contains(&r) && (c0..=c1).contains(&c))
    }

    #[test]
    fn test_monotonic_in_touched_edges() {
        let ps: Vec<f64> = [
            rect(2, 7, 2, 7),
            rect(0, 7, 2, 7),
            rect(0, 9, 2, 7),
            rect(0, 9, 0, 7),
            rect(0, 9, 0, 9),
        ]
        .iter()
        .map(truncation_percentage)
        .collect();

        assert_eq!(ps[0], 0.0);
        assert!((ps[1] - 25.0).abs() < 1e-9);
        assert!((ps[2] - 1200.0 / 28.0).abs() < 1e-9);
        assert!((ps[3] - 75.0).abs() < 1e-9);
        assert_eq!(ps[4], 100.0);
        assert!(ps.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_empty() {
        assert_eq!(truncation_percentage(&Mask::zeros((5, 5))), 0.0);
    }
}
