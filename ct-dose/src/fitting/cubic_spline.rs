//! 三次样条曲线.

use super::Boundary;
use crate::error::{DoseError, Result};
use nalgebra::{DMatrix, DVector};
use ndarray::{Array, Array1, Array2, ArrayView1};
use num::Float;

// ref: https://zhuanlan.zhihu.com/p/628508199
//
// 第 i 段: y = y_i + b_i * dx + c_i * dx^2 + d_i * dx^3, dx = x - x_i.
// `coe` 的三列依次为 b, c, d.

macro_rules! impl_cubic {
    ($fp: ty, $two: expr, $three: expr) => {
        impl CubicSpline<$fp> {
            /// 构造经过全部控制点的三次样条.
            ///
            /// `x` 必须严格递增或严格递减 (递减时内部会反转), 且与 `y` 一一对应.
            /// 控制点数不少于 `boundary.min_points()`.
            pub fn new(x: ArrayView1<$fp>, y: ArrayView1<$fp>, boundary: Boundary) -> Result<Self> {
                if x.len() != y.len() {
                    return Err(DoseError::invalid(format!(
                        "x 值和 y 值必须一一对应: {} != {}",
                        x.len(),
                        y.len()
                    )));
                }
                if x.len() < boundary.min_points() {
                    return Err(DoseError::invalid(format!(
                        "该样条曲线至少需要 {} 个点, 实际只有 {} 个",
                        boundary.min_points(),
                        x.len()
                    )));
                }
                if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
                    return Err(DoseError::invalid("控制点中存在非有限值"));
                }

                let (x, y) = if x.windows(2).into_iter().all(|v| v[0] < v[1]) {
                    (x.to_owned(), y.to_owned())
                } else if x.windows(2).into_iter().all(|v| v[0] > v[1]) {
                    (
                        x.iter().rev().copied().collect::<Array1<$fp>>(),
                        y.iter().rev().copied().collect::<Array1<$fp>>(),
                    )
                } else {
                    return Err(DoseError::invalid("x 值必须严格递减或严格递增"));
                };

                let coe = Self::spline_coefficient(x.view(), y.view(), boundary)
                    .ok_or_else(|| DoseError::invalid("样条方程组奇异"))?;
                Ok(Self { x, y, coe })
            }

            /// 在 `x` 处求值. 定义域外使用首/末段多项式外推.
            pub fn eval(&self, x: $fp) -> $fp {
                let last = self.x.len() - 2;
                let i = self
                    .x
                    .as_slice()
                    .map_or(0, |s| s.partition_point(|&v| v <= x))
                    .saturating_sub(1)
                    .min(last);
                let dx = x - self.x[i];
                let (b, c, d) = (self.coe[(i, 0)], self.coe[(i, 1)], self.coe[(i, 2)]);
                self.y[i] + dx * (b + dx * (c + dx * d))
            }

            /// 在每两个相邻控制点之间均匀采样 `k` 个点 (含左端点),
            /// 最后补上末尾控制点.
            pub fn sample(&self, k: u32) -> (Vec<$fp>, Vec<$fp>) {
                let k = k.max(1) as usize;
                let len = self.x.len();
                let mut xs = Vec::with_capacity(k * (len - 1) + 1);
                for i in 0..(len - 1) {
                    let seg = Array::linspace(self.x[i], self.x[i + 1], k + 1);
                    xs.extend(seg.iter().take(k).copied());
                }
                xs.push(self.x[len - 1]);
                let ys = xs.iter().map(|&v| self.eval(v)).collect();
                (xs, ys)
            }

            /// 控制点横坐标范围 `[min, max]`.
            #[inline]
            pub fn domain(&self) -> ($fp, $fp) {
                (self.x[0], self.x[self.x.len() - 1])
            }

            fn spline_coefficient(
                x: ArrayView1<$fp>,
                y: ArrayView1<$fp>,
                boundary: Boundary,
            ) -> Option<Array2<$fp>> {
                let len = x.len();
                let h: Vec<$fp> = x.windows(2).into_iter().map(|v| v[1] - v[0]).collect();
                let dy: Vec<$fp> = y.windows(2).into_iter().map(|v| v[1] - v[0]).collect();

                let mut a = DMatrix::<$fp>::zeros(len, len);
                let mut r = DVector::<$fp>::zeros(len);
                for i in 1..(len - 1) {
                    a[(i, i - 1)] = h[i - 1];
                    a[(i, i)] = $two * (h[i - 1] + h[i]);
                    a[(i, i + 1)] = h[i];
                    r[i] = $three * (dy[i] / h[i] - dy[i - 1] / h[i - 1]);
                }
                match boundary {
                    Boundary::Natural => {
                        a[(0, 0)] = 1.0;
                        a[(len - 1, len - 1)] = 1.0;
                    }
                    Boundary::NotAKnot => {
                        // 前两段 (及后两段) 的三次项系数相等.
                        a[(0, 0)] = -h[1];
                        a[(0, 1)] = h[0] + h[1];
                        a[(0, 2)] = -h[0];
                        let (p, q) = (h[len - 3], h[len - 2]);
                        a[(len - 1, len - 3)] = -q;
                        a[(len - 1, len - 2)] = p + q;
                        a[(len - 1, len - 1)] = -p;
                    }
                }

                let c = a.lu().solve(&r)?;
                if c.iter().any(|v| !v.is_finite()) {
                    return None;
                }
                let mut coe = Array2::<$fp>::zeros((len - 1, 3));
                for i in 0..(len - 1) {
                    coe[(i, 0)] = dy[i] / h[i] - h[i] * ($two * c[i] + c[i + 1]) / $three;
                    coe[(i, 1)] = c[i];
                    coe[(i, 2)] = (c[i + 1] - c[i]) / ($three * h[i]);
                }
                Some(coe)
            }
        }
    };
}

/// 分段三次样条. 构造后只读, 可在多线程间共享.
#[derive(Clone, Debug)]
pub struct CubicSpline<T: Float> {
    x: Array1<T>,
    y: Array1<T>,
    coe: Array2<T>,
}

impl_cubic!(f32, 2.0_f32, 3.0_f32);
impl_cubic!(f64, 2.0_f64, 3.0_f64);

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn cubic(x: f64) -> f64 {
        x * x * x - 2.0 * x * x + x + 1.0
    }

    #[test]
    fn test_passes_control_points() {
        let x = array![10.0, 14.0, 19.0, 25.0, 31.0, 40.0];
        let y = array![1.3, 1.15, 1.02, 0.91, 0.83, 0.72];
        for b in [Boundary::Natural, Boundary::NotAKnot] {
            let s = CubicSpline::<f64>::new(x.view(), y.view(), b).unwrap();
            for (&u, &v) in x.iter().zip(y.iter()) {
                assert!((s.eval(u) - v).abs() < 1e-10);
            }
        }
    }

    #[test]
    fn test_not_a_knot_reproduces_cubic() {
        let x = array![0.0, 1.0, 2.5, 3.0, 4.0, 6.0];
        let y = x.mapv(cubic);
        let s = CubicSpline::<f64>::new(x.view(), y.view(), Boundary::NotAKnot).unwrap();
        for t in [-1.0, 0.3, 1.7, 2.9, 5.0, 7.5] {
            assert!((s.eval(t) - cubic(t)).abs() < 1e-8, "t = {t}");
        }
    }

    #[test]
    fn test_four_points_is_single_cubic() {
        let x = array![0.0, 1.0, 2.0, 5.0];
        let y = x.mapv(cubic);
        let s = CubicSpline::<f64>::new(x.view(), y.view(), Boundary::NotAKnot).unwrap();
        assert!((s.eval(3.3) - cubic(3.3)).abs() < 1e-9);
    }

    #[test]
    fn test_descending_input() {
        let x = array![6.0, 4.0, 3.0, 2.5, 1.0];
        let y = x.mapv(cubic);
        let s = CubicSpline::<f64>::new(x.view(), y.view(), Boundary::NotAKnot).unwrap();
        assert_eq!(s.domain(), (1.0, 6.0));
        assert!((s.eval(2.0) - cubic(2.0)).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_bad_input() {
        let y = array![1.0, 2.0, 3.0, 4.0];
        let bad = [array![0.0, 1.0, 1.0, 2.0], array![0.0, 2.0, 1.0, 3.0]];
        for x in bad.iter() {
            assert!(CubicSpline::<f64>::new(x.view(), y.view(), Boundary::NotAKnot).is_err());
        }
        let x = array![0.0, 1.0, 2.0];
        let y3 = array![0.0, 1.0, 0.0];
        assert!(CubicSpline::<f64>::new(x.view(), y3.view(), Boundary::NotAKnot).is_err());
        assert!(CubicSpline::<f64>::new(x.view(), y3.view(), Boundary::Natural).is_ok());
        assert!(CubicSpline::<f64>::new(x.view(), y.view(), Boundary::Natural).is_err());
    }

    #[test]
    fn test_sample() {
        let x = array![0.0_f32, 1.0, 2.0, 3.0];
        let y = array![0.0_f32, 1.0, 4.0, 9.0];
        let s = CubicSpline::<f32>::new(x.view(), y.view(), Boundary::NotAKnot).unwrap();
        let (xs, ys) = s.sample(10);
        assert_eq!(xs.len(), 31);
        assert_eq!(ys.len(), 31);
        assert_eq!(xs[0], 0.0);
        assert_eq!(*xs.last().unwrap(), 3.0);
        // 二次函数也能被精确复现.
        assert!((s.eval(1.5) - 2.25).abs() < 1e-4);
    }
}
