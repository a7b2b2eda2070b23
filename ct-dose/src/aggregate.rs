//! 多切片直径聚合.
//!
//! 按采样策略选出若干切片, 逐张分割并度量, 取算术平均. 聚合过程可被协作式取消,
//! 取消时返回已完成部分的平均值; 取消前一张都没有成功时, 平均直径为 `None`.

use crate::data::Frame;
use crate::error::{DoseError, Result};
use crate::metrics::{measure_frame, DiameterMethod};
use crate::segment::SegmentParams;
use itertools::Itertools;
use ordered_float::OrderedFloat;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use std::sync::atomic::AtomicUsize;
        use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
    }
}

/// 切片采样策略.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SamplingStrategy {
    /// 每 `n` 张取一张, 从 0 开始.
    SliceStep(usize),

    /// 把全部切片尽量均匀地分成 `n` 段, 每段取中点.
    SliceNumber(usize),

    /// 闭区间 `[min(first, last), max(first, last)]` 内的全部切片.
    Regional {
        /// 区间一端.
        first: usize,
        /// 区间另一端.
        last: usize,
    },
}

impl SamplingStrategy {
    /// 在长度为 `len` 的切片序列上生成采样下标, 升序.
    ///
    /// # 注意
    ///
    /// 1. `SliceNumber(n)` 中前 `len % n` 段比其余段多一张; `n > len` 时按 `len` 处理;
    /// 2. `len == 0`, 步长/段数为 0, 或区间越界时返回 `InvalidInput`.
    pub fn indices(&self, len: usize) -> Result<Vec<usize>> {
        if len == 0 {
            return Err(DoseError::invalid("切片序列为空"));
        }
        match *self {
            Self::SliceStep(0) | Self::SliceNumber(0) => {
                Err(DoseError::invalid(format!("采样参数必须为正: {:?}", self)))
            }
            Self::SliceStep(n) => Ok((0..len).step_by(n).collect()),
            Self::SliceNumber(n) => {
                let n = n.min(len);
                let (base, extra) = (len / n, len % n);
                let mut start = 0;
                Ok((0..n)
                    .map(|k| {
                        let size = base + usize::from(k < extra);
                        let mid = start + size / 2;
                        start += size;
                        mid
                    })
                    .collect())
            }
            Self::Regional { first, last } => {
                let (lo, hi) = (first.min(last), first.max(last));
                if hi >= len {
                    return Err(DoseError::invalid(format!(
                        "区间 [{lo}, {hi}] 超出切片范围 0..{len}"
                    )));
                }
                Ok((lo..=hi).collect())
            }
        }
    }
}

/// 聚合参数.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AggregateParams {
    /// 度量方法.
    pub method: DiameterMethod,

    /// 采样策略.
    pub strategy: SamplingStrategy,

    /// 分割参数.
    #[cfg_attr(feature = "serde", serde(default))]
    pub segment: SegmentParams,
}

impl AggregateParams {
    /// 以默认分割参数构造.
    #[inline]
    pub fn new(method: DiameterMethod, strategy: SamplingStrategy) -> Self {
        Self {
            method,
            strategy,
            segment: SegmentParams::default(),
        }
    }
}

/// 协作式取消标志. 克隆后共享同一标志.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// 新的 (未取消的) 标志.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// 请求取消.
    #[inline]
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// 是否已请求取消?
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// 进度报告.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Progress {
    /// 已处理 (含跳过) 的切片数.
    pub done: usize,

    /// 需处理的切片总数.
    pub total: usize,

    /// 刚处理完的切片下标.
    pub index: usize,
}

/// 聚合结束状态.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AggregateStatus {
    /// 全部采样切片都已处理.
    Completed,

    /// 中途被取消, 结果只包含已处理部分.
    Cancelled,
}

/// 聚合结果.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Aggregate {
    /// 平均直径 (cm). 仅当被取消且尚无成功切片时为 `None`.
    pub diameter: Option<f64>,

    /// 每张成功度量的切片的直径, 与 `sampled_indices` 一一对应.
    pub per_slice_values: Vec<f64>,

    /// 成功度量的切片下标, 按采样顺序.
    pub sampled_indices: Vec<usize>,

    /// 因分割失败而跳过的切片下标.
    pub skipped: Vec<usize>,

    /// 结束状态.
    pub status: AggregateStatus,
}

impl Aggregate {
    /// 是否完整结束 (未被取消)?
    #[inline]
    pub fn is_completed(&self) -> bool {
        self.status == AggregateStatus::Completed
    }

    /// 单切片直径的最小值与最大值.
    pub fn extremes(&self) -> Option<(f64, f64)> {
        self.per_slice_values
            .iter()
            .map(|&v| OrderedFloat(v))
            .minmax()
            .into_option()
            .map(|(lo, hi)| (lo.0, hi.0))
    }

    fn finish(
        per_slice_values: Vec<f64>,
        sampled_indices: Vec<usize>,
        skipped: Vec<usize>,
        status: AggregateStatus,
    ) -> Result<Self> {
        if per_slice_values.is_empty() && status == AggregateStatus::Completed {
            // 全部处理完却一张都没有成功: 没有可平均的数据.
            return Err(DoseError::SegmentationFailed {
                index: (skipped.len() == 1).then(|| skipped[0]),
            });
        }
        let diameter = (!per_slice_values.is_empty())
            .then(|| per_slice_values.iter().sum::<f64>() / per_slice_values.len() as f64);
        log::info!(
            "aggregate {status:?}: {} slices, {} skipped, mean {diameter:?}cm",
            per_slice_values.len(),
            skipped.len()
        );
        Ok(Self {
            diameter,
            per_slice_values,
            sampled_indices,
            skipped,
            status,
        })
    }
}

/// 顺序聚合.
///
/// 每处理完一张切片 (无论成功或跳过) 调用一次 `progress`, 然后检查 `cancel`.
/// 分割失败的切片被跳过并记录; 其它错误立即返回.
/// 若全部处理完仍没有任何切片度量成功, 返回 `SegmentationFailed`;
/// 被取消时总是返回 `Ok`, 由 [`Aggregate::status`] 区分.
pub fn aggregate<F>(
    frames: &[Frame],
    params: &AggregateParams,
    cancel: &CancelToken,
    mut progress: F,
) -> Result<Aggregate>
where
    F: FnMut(Progress),
{
    let indices = params.strategy.indices(frames.len())?;
    let total = indices.len();
    let mut values = Vec::with_capacity(total);
    let mut sampled = Vec::with_capacity(total);
    let mut skipped = Vec::new();
    let mut status = AggregateStatus::Completed;

    for (k, &i) in indices.iter().enumerate() {
        match measure_frame(&frames[i], params.method, &params.segment) {
            Ok(r) => {
                values.push(r.diameter);
                sampled.push(i);
            }
            Err(e) if e.is_segmentation_failed() => {
                log::debug!("skip slice #{i}: {e}");
                skipped.push(i);
            }
            Err(e) => return Err(e.at_slice(i)),
        }
        progress(Progress {
            done: k + 1,
            total,
            index: i,
        });
        if k + 1 < total && cancel.is_cancelled() {
            status = AggregateStatus::Cancelled;
            break;
        }
    }
    Aggregate::finish(values, sampled, skipped, status)
}

/// 借助 `rayon` 并行聚合.
///
/// 结果顺序与采样顺序一致. 取消后不再开始新的切片, 已开始的切片会正常完成.
/// `progress` 可能在任意工作线程上被调用.
#[cfg(feature = "rayon")]
pub fn aggregate_par<F>(
    frames: &[Frame],
    params: &AggregateParams,
    cancel: &CancelToken,
    progress: F,
) -> Result<Aggregate>
where
    F: Fn(Progress) + Sync,
{
    let indices = params.strategy.indices(frames.len())?;
    let total = indices.len();
    let done = AtomicUsize::new(0);

    let results: Vec<Option<Result<f64>>> = indices
        .par_iter()
        .map(|&i| {
            if cancel.is_cancelled() {
                return None;
            }
            let r = measure_frame(&frames[i], params.method, &params.segment).map(|r| r.diameter);
            let d = done.fetch_add(1, Ordering::AcqRel) + 1;
            progress(Progress {
                done: d,
                total,
                index: i,
            });
            Some(r)
        })
        .collect();

    let mut values = Vec::with_capacity(total);
    let mut sampled = Vec::with_capacity(total);
    let mut skipped = Vec::new();
    let mut status = AggregateStatus::Completed;
    for (&i, r) in indices.iter().zip(results) {
        match r {
            None => status = AggregateStatus::Cancelled,
            Some(Ok(d)) => {
                values.push(d);
                sampled.push(i);
            }
            Some(Err(e)) if e.is_segmentation_failed() => skipped.push(i),
            Some(Err(e)) => return Err(e.at_slice(i)),
        }
    }
    Aggregate::finish(values, sampled, skipped, status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{effective_diameter, water_equivalent_diameter, EffectiveMethod};
    use crate::segment::segment;
    use ndarray::Array2;

    /// 第 i 张切片含有一个边长为 `i + 2` 的正方形. `air` 中的下标为全空气切片.
    fn frames(n: usize, air: &[usize]) -> Vec<Frame> {
        (0..n)
            .map(|i| {
                let side = i + 2;
                let data = Array2::from_shape_fn((24, 24), |(r, c)| {
                    if !air.contains(&i) && (1..=side).contains(&r) && (1..=side).contains(&c) {
                        (i as f32) * 10.0
                    } else {
                        -1000.0
                    }
                });
                Frame::with_reconstruction(data, 240.0).unwrap()
            })
            .collect()
    }

    fn area() -> DiameterMethod {
        DiameterMethod::Effective(EffectiveMethod::Area)
    }

    #[test]
    fn test_indices() {
        use SamplingStrategy::*;
        assert_eq!(SliceStep(3).indices(10).unwrap(), vec![0, 3, 6, 9]);
        assert_eq!(SliceStep(1).indices(3).unwrap(), vec![0, 1, 2]);
        assert_eq!(SliceNumber(3).indices(10).unwrap(), vec![2, 5, 8]);
        assert_eq!(SliceNumber(4).indices(10).unwrap(), vec![1, 4, 7, 9]);
        assert_eq!(SliceNumber(5).indices(3).unwrap(), vec![0, 1, 2]);
        assert_eq!(SliceNumber(1).indices(7).unwrap(), vec![3]);
        assert_eq!(Regional { first: 5, last: 2 }.indices(10).unwrap(), vec![2, 3, 4, 5]);
        assert!(Regional { first: 5, last: 10 }.indices(10).is_err());
        assert!(SliceStep(0).indices(10).is_err());
        assert!(SliceNumber(0).indices(10).is_err());
        assert!(SliceStep(1).indices(0).is_err());
    }

    #[test]
    fn test_step_one_is_plain_mean() {
        let fs = frames(6, &[]);
        let p = AggregateParams::new(area(), SamplingStrategy::SliceStep(1));
        let a = aggregate(&fs, &p, &CancelToken::new(), |_| {}).unwrap();
        assert_eq!(a.per_slice_values.len(), 6);
        assert_eq!(a.sampled_indices, vec![0, 1, 2, 3, 4, 5]);
        let mean = a.per_slice_values.iter().sum::<f64>() / 6.0;
        assert!((a.diameter.unwrap() - mean).abs() < 1e-12);
        assert!(a.is_completed());
        let (lo, hi) = a.extremes().unwrap();
        assert!(lo < hi);
    }

    #[test]
    fn test_single_region_equals_direct_call() {
        let fs = frames(6, &[]);
        let m = segment(&fs[3], -200.0).unwrap();
        let direct = effective_diameter(&m, fs[3].shape(), 240.0, EffectiveMethod::Center).unwrap();
        let p = AggregateParams::new(
            DiameterMethod::Effective(EffectiveMethod::Center),
            SamplingStrategy::Regional { first: 3, last: 3 },
        );
        let a = aggregate(&fs, &p, &CancelToken::new(), |_| {}).unwrap();
        assert_eq!(a.diameter, Some(direct.diameter));

        let direct = water_equivalent_diameter(&fs[3], &m, fs[3].shape(), 240.0, true).unwrap();
        let p = AggregateParams {
            method: DiameterMethod::WaterEquivalent { truncated: true },
            ..p
        };
        let a = aggregate(&fs, &p, &CancelToken::new(), |_| {}).unwrap();
        assert_eq!(a.diameter, Some(direct.diameter));
    }

    #[test]
    fn test_cancel_keeps_partial_result() {
        let fs = frames(8, &[]);
        let p = AggregateParams::new(area(), SamplingStrategy::SliceStep(1));
        let cancel = CancelToken::new();
        let c = cancel.clone();
        let mut seen = Vec::new();
        let a = aggregate(&fs, &p, &cancel, |pr| {
            seen.push(pr.done);
            if pr.done == 3 {
                c.cancel();
            }
        })
        .unwrap();
        assert_eq!(a.status, AggregateStatus::Cancelled);
        assert_eq!(a.per_slice_values.len(), 3);
        assert_eq!(a.sampled_indices, vec![0, 1, 2]);
        assert_eq!(seen, vec![1, 2, 3]);
        let mean = a.per_slice_values.iter().sum::<f64>() / 3.0;
        assert!((a.diameter.unwrap() - mean).abs() < 1e-12);
    }

    #[test]
    fn test_cancel_before_any_success() {
        // 首张全是空气, 处理完即取消: 应报告取消而不是分割失败.
        let fs = frames(4, &[0]);
        let p = AggregateParams::new(area(), SamplingStrategy::SliceStep(1));
        let cancel = CancelToken::new();
        let c = cancel.clone();
        let a = aggregate(&fs, &p, &cancel, |_| c.cancel()).unwrap();
        assert_eq!(a.status, AggregateStatus::Cancelled);
        assert_eq!(a.diameter, None);
        assert!(a.per_slice_values.is_empty());
        assert_eq!(a.skipped, vec![0]);
        assert_eq!(a.extremes(), None);
    }

    #[test]
    fn test_cancel_on_last_frame_is_complete() {
        let fs = frames(3, &[]);
        let p = AggregateParams::new(area(), SamplingStrategy::SliceStep(1));
        let cancel = CancelToken::new();
        let c = cancel.clone();
        let a = aggregate(&fs, &p, &cancel, |pr| {
            if pr.done == pr.total {
                c.cancel();
            }
        })
        .unwrap();
        assert!(a.is_completed());
    }

    #[test]
    fn test_skips_failed_slices() {
        let fs = frames(5, &[0, 4]);
        let p = AggregateParams::new(area(), SamplingStrategy::SliceStep(1));
        let mut total = 0;
        let a = aggregate(&fs, &p, &CancelToken::new(), |pr| total = pr.total).unwrap();
        assert_eq!(total, 5);
        assert_eq!(a.sampled_indices, vec![1, 2, 3]);
        assert_eq!(a.skipped, vec![0, 4]);
        assert!(a.is_completed());
    }

    #[test]
    fn test_all_failed() {
        let fs = frames(3, &[0, 1, 2]);
        let p = AggregateParams::new(area(), SamplingStrategy::SliceStep(1));
        let e = aggregate(&fs, &p, &CancelToken::new(), |_| {}).unwrap_err();
        assert!(e.is_segmentation_failed());

        let p = AggregateParams::new(area(), SamplingStrategy::Regional { first: 1, last: 1 });
        let e = aggregate(&fs, &p, &CancelToken::new(), |_| {}).unwrap_err();
        assert!(matches!(e, DoseError::SegmentationFailed { index: Some(1) }));
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn test_par_matches_sequential() {
        let fs = frames(12, &[5]);
        for strategy in [
            SamplingStrategy::SliceStep(2),
            SamplingStrategy::SliceNumber(4),
            SamplingStrategy::Regional { first: 9, last: 2 },
        ] {
            let p = AggregateParams::new(DiameterMethod::WaterEquivalent { truncated: false }, strategy);
            let a = aggregate(&fs, &p, &CancelToken::new(), |_| {}).unwrap();
            let b = aggregate_par(&fs, &p, &CancelToken::new(), |_| {}).unwrap();
            assert_eq!(a.sampled_indices, b.sampled_indices);
            assert_eq!(a.skipped, b.skipped);
            assert_eq!(a.per_slice_values, b.per_slice_values);
        }
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn test_par_precancelled() {
        let fs = frames(4, &[]);
        let p = AggregateParams::new(area(), SamplingStrategy::SliceStep(1));
        let cancel = CancelToken::new();
        cancel.cancel();
        let a = aggregate_par(&fs, &p, &cancel, |_| {}).unwrap();
        assert_eq!(a.status, AggregateStatus::Cancelled);
        assert_eq!(a.diameter, None);
        assert!(a.per_slice_values.is_empty());
        assert!(a.skipped.is_empty());
    }
}
