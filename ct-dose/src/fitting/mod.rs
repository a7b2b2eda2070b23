//! 曲线拟合与参考表插值.
//!
//! 给定一系列点 `(x, y)`, 该模块拟合出一条经过全部点的三次样条曲线,
//! 并以 [`Curve`] 的形式提供求值与 (带提示的) 外推.

mod cubic_spline;

pub use cubic_spline::CubicSpline;

use crate::consts::MIN_SPLINE_POINTS;
use crate::error::{DoseError, Result};
use ndarray::ArrayView1;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

type VecPair<T> = (Vec<T>, Vec<T>);

/// 样条边界条件.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum Boundary {
    /// 两端二阶导数为 0. 至少 3 个点.
    Natural,

    /// 第一个与最后一个内部节点处三阶导数连续. 至少 4 个点.
    ///
    /// 与 `s = 0` 的插值型平滑样条等价.
    #[default]
    NotAKnot,
}

impl Boundary {
    /// 构造该样条所需的最少点数.
    #[inline]
    pub const fn min_points(self) -> usize {
        match self {
            Self::Natural => 3,
            Self::NotAKnot => MIN_SPLINE_POINTS,
        }
    }
}

/// 拟合三次样条曲线并按 "每段 `k` 点" 采样.
///
/// `x` 是严格递增 (或递减) 的数组, `y` 是对应函数值.
pub fn cubic_spline_f64(
    x: ArrayView1<f64>,
    y: ArrayView1<f64>,
    boundary: Boundary,
    k: u32,
) -> Result<VecPair<f64>> {
    Ok(CubicSpline::<f64>::new(x, y, boundary)?.sample(k))
}

/// 参考表: 一组 `(x, y)` 控制点, 例如 "直径 -> 转换因子".
///
/// 构造时即完成校验: 至少 4 个点, 全部为有限值, `x` 严格递增.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "Vec<(f64, f64)>", into = "Vec<(f64, f64)>"))]
pub struct CalibrationTable {
    x: Vec<f64>,
    y: Vec<f64>,
}

impl TryFrom<Vec<(f64, f64)>> for CalibrationTable {
    type Error = DoseError;

    fn try_from(points: Vec<(f64, f64)>) -> Result<Self> {
        let (x, y) = points.into_iter().unzip();
        Self::new(x, y)
    }
}

impl From<CalibrationTable> for Vec<(f64, f64)> {
    fn from(t: CalibrationTable) -> Self {
        t.x.into_iter().zip(t.y).collect()
    }
}

impl CalibrationTable {
    /// 由横纵坐标构造.
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<Self> {
        if x.len() != y.len() {
            return Err(DoseError::invalid(format!(
                "参考表横纵坐标数量不一致: {} != {}",
                x.len(),
                y.len()
            )));
        }
        if x.len() < MIN_SPLINE_POINTS {
            return Err(DoseError::invalid(format!(
                "参考表至少需要 {MIN_SPLINE_POINTS} 个点, 实际只有 {} 个",
                x.len()
            )));
        }
        if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return Err(DoseError::invalid("参考表中存在非有限值"));
        }
        if !x.windows(2).all(|w| w[0] < w[1]) {
            return Err(DoseError::invalid("参考表横坐标必须严格递增"));
        }
        Ok(Self { x, y })
    }

    /// 由点列构造.
    #[inline]
    pub fn from_points<I: IntoIterator<Item = (f64, f64)>>(it: I) -> Result<Self> {
        Self::try_from(it.into_iter().collect::<Vec<_>>())
    }

    /// 点数.
    #[inline]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// 参考表总是非空的.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// 横坐标.
    #[inline]
    pub fn xs(&self) -> &[f64] {
        &self.x
    }

    /// 纵坐标.
    #[inline]
    pub fn ys(&self) -> &[f64] {
        &self.y
    }
}

/// `x` 相对于参考表定义域的位置.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DomainCheck {
    /// 落在 `[min, max]` 内.
    Inside,

    /// 小于最小控制点, 结果为外推.
    Below,

    /// 大于最大控制点, 结果为外推.
    Above,
}

impl DomainCheck {
    /// 是否为外推?
    #[inline]
    pub fn is_extrapolated(self) -> bool {
        !matches!(self, Self::Inside)
    }
}

/// 由参考表构造的插值曲线. 构造一次, 反复求值.
#[derive(Clone, Debug)]
pub struct Curve {
    table: CalibrationTable,
    spline: CubicSpline<f64>,
}

impl Curve {
    /// 以 not-a-knot 三次样条拟合参考表.
    pub fn build(table: CalibrationTable) -> Result<Self> {
        let spline = CubicSpline::<f64>::new(
            ArrayView1::from(table.xs()),
            ArrayView1::from(table.ys()),
            Boundary::NotAKnot,
        )?;
        Ok(Self { table, spline })
    }

    /// 求值. 定义域外不报错, 直接外推.
    #[inline]
    pub fn evaluate(&self, x: f64) -> f64 {
        self.spline.eval(x)
    }

    /// 判断 `x` 是否需要外推.
    pub fn check(&self, x: f64) -> DomainCheck {
        let (lo, hi) = self.domain();
        if x < lo {
            DomainCheck::Below
        } else if x > hi {
            DomainCheck::Above
        } else {
            DomainCheck::Inside
        }
    }

    /// 定义域 `[min(x), max(x)]`.
    #[inline]
    pub fn domain(&self) -> (f64, f64) {
        self.spline.domain()
    }

    /// 原始参考表.
    #[inline]
    pub fn table(&self) -> &CalibrationTable {
        &self.table
    }

    /// 按 "每段 `k` 点" 采样整条曲线, 供绘图使用.
    #[inline]
    pub fn sample(&self, k: u32) -> VecPair<f64> {
        self.spline.sample(k)
    }
}
