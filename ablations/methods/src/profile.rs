//! 单个度量方法的运行统计.

use std::time::{Duration, Instant};

/// 可累加计时器: 多次 `start` / `elapsed` 区间的总和.
#[derive(Clone, Debug)]
struct AccTimer {
    consumed: Duration,
    since: Instant,
}

impl AccTimer {
    /// 初始化计时器. 初始化时视为已经开始计时.
    #[inline]
    fn new() -> Self {
        Self {
            consumed: Duration::ZERO,
            since: Instant::now(),
        }
    }

    /// 开始 (或重新开始) 一轮计时.
    #[inline]
    fn start(&mut self) {
        self.since = Instant::now();
    }

    /// 结束本轮计时并累加, 返回本轮时长.
    #[inline]
    fn elapsed(&mut self) -> Duration {
        let d = self.since.elapsed();
        self.consumed += d;
        d
    }

    /// 累计时长 (微秒).
    #[inline]
    fn total_us(&self) -> u64 {
        self.consumed.as_micros() as u64
    }
}

/// 度量方法的统计.
#[derive(Clone, Debug)]
pub struct Profile {
    /// 分割失败而跳过的切片数.
    skipped: u64,

    /// 单切片度量 (含分割) 的总耗时.
    measure_time: AccTimer,

    /// 整个任务的总耗时.
    real_time: AccTimer,

    /// 最耗时的一次单切片度量.
    most: Option<Duration>,

    /// `(切片下标, 直径)`.
    diameters: Vec<(usize, f64)>,
}

impl Profile {
    /// 初始化并开始总计时.
    #[inline]
    pub fn new() -> Self {
        Self {
            skipped: 0,
            measure_time: AccTimer::new(),
            real_time: AccTimer::new(),
            most: None,
            diameters: Vec::new(),
        }
    }

    /// 开始一次单切片计时.
    #[inline]
    pub fn measure_start(&mut self) {
        self.measure_time.start();
    }

    /// 结束一次单切片计时. `diameter` 为 `None` 表示该切片被跳过.
    pub fn measure_end(&mut self, index: usize, diameter: Option<f64>) {
        let d = self.measure_time.elapsed();
        self.most = Some(self.most.map_or(d, |m| m.max(d)));
        match diameter {
            Some(v) => self.diameters.push((index, v)),
            None => self.skipped += 1,
        }
    }

    /// 结束全部计时.
    #[inline]
    pub fn finish(mut self) -> Self {
        self.real_time.elapsed();
        self
    }

    /// 跳过的切片数.
    #[inline]
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// 成功度量的切片数.
    #[inline]
    pub fn measured(&self) -> usize {
        self.diameters.len()
    }

    /// 全部 `(切片下标, 直径)`.
    #[inline]
    pub fn diameters(&self) -> &[(usize, f64)] {
        &self.diameters
    }

    /// 平均直径.
    pub fn mean(&self) -> Option<f64> {
        match self.diameters.len() {
            0 => None,
            n => Some(self.diameters.iter().map(|(_, d)| d).sum::<f64>() / n as f64),
        }
    }

    /// 直径最小值与最大值.
    pub fn range(&self) -> Option<(f64, f64)> {
        self.diameters.iter().fold(None, |acc, &(_, d)| match acc {
            None => Some((d, d)),
            Some((lo, hi)) => Some((lo.min(d), hi.max(d))),
        })
    }

    /// 单切片度量的总耗时 (微秒).
    #[inline]
    pub fn measure_time_us(&self) -> u64 {
        self.measure_time.total_us()
    }

    /// 单切片平均耗时 (微秒).
    pub fn avg_measure_time_us(&self) -> Option<f64> {
        let n = self.diameters.len() as u64 + self.skipped;
        (n > 0).then(|| self.measure_time_us() as f64 / n as f64)
    }

    /// 任务总耗时 (微秒).
    #[inline]
    pub fn real_time_us(&self) -> u64 {
        self.real_time.total_us()
    }

    /// 最耗时的一次单切片度量.
    #[inline]
    pub fn most_time_consuming(&self) -> Option<Duration> {
        self.most
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::new()
    }
}
