//! 二值掩码及其形态学/连通域操作.

use crate::{Area2d, Areas2d, Idx2d};
use ndarray::{s, Array2, ArrayView2, Axis};
use std::collections::VecDeque;
use std::ops::{Index, IndexMut};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 连通性.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Connectivity {
    /// 上下左右.
    Four,

    /// 上下左右及对角线.
    #[default]
    Eight,
}

impl Connectivity {
    /// 获取 `pos` 的邻居坐标. 在图像左/上边缘处会产生 `usize::MAX` 分量,
    /// 调用者需借助边界检查剔除.
    #[inline]
    pub(crate) fn neighbours(self, pos: Idx2d) -> impl Iterator<Item = Idx2d> {
        let n8 = neighbour8(pos);
        let take = match self {
            Self::Four => 4,
            Self::Eight => 8,
        };
        n8.into_iter().take(take)
    }
}

/// 前 4 项为 4-邻域, 全部 8 项为 8-邻域.
#[inline]
fn neighbour8((h, w): Idx2d) -> [Idx2d; 8] {
    [
        (h.wrapping_sub(1), w),
        (h.saturating_add(1), w),
        (h, w.wrapping_sub(1)),
        (h, w.saturating_add(1)),
        (h.wrapping_sub(1), w.wrapping_sub(1)),
        (h.wrapping_sub(1), w.saturating_add(1)),
        (h.saturating_add(1), w.wrapping_sub(1)),
        (h.saturating_add(1), w.saturating_add(1)),
    ]
}

/// 二值掩码. `true` 为前景.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Mask {
    data: Array2<bool>,
}

impl Index<Idx2d> for Mask {
    type Output = bool;

    #[inline]
    fn index(&self, index: Idx2d) -> &Self::Output {
        &self.data[index]
    }
}

impl IndexMut<Idx2d> for Mask {
    #[inline]
    fn index_mut(&mut self, index: Idx2d) -> &mut Self::Output {
        &mut self.data[index]
    }
}

impl Mask {
    /// 直接由布尔矩阵构造.
    #[inline]
    pub fn from_raw(data: Array2<bool>) -> Self {
        Self { data }
    }

    /// 全背景掩码.
    #[inline]
    pub fn zeros(shape: Idx2d) -> Self {
        Self::from_raw(Array2::from_elem(shape, false))
    }

    /// 逐像素生成掩码.
    #[inline]
    pub fn from_fn<F: FnMut(Idx2d) -> bool>(shape: Idx2d, f: F) -> Self {
        Self::from_raw(Array2::from_shape_fn(shape, f))
    }

    /// 由前景坐标集合构造. 越界坐标被忽略.
    pub fn from_positions<I: IntoIterator<Item = Idx2d>>(shape: Idx2d, it: I) -> Self {
        let mut ans = Self::zeros(shape);
        for pos in it {
            if let Some(p) = ans.data.get_mut(pos) {
                *p = true;
            }
        }
        ans
    }

    /// 取出内部布尔矩阵.
    #[inline]
    pub fn into_raw(self) -> Array2<bool> {
        self.data
    }

    /// 只读视图.
    #[inline]
    pub fn view(&self) -> ArrayView2<bool> {
        self.data.view()
    }

    /// 形状 `(高, 宽)`.
    #[inline]
    pub fn shape(&self) -> Idx2d {
        self.data.dim()
    }

    /// 高 (行数).
    #[inline]
    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    /// 宽 (列数).
    #[inline]
    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    /// 坐标是否在图像内?
    #[inline]
    pub fn check(&self, (h, w): Idx2d) -> bool {
        h < self.height() && w < self.width()
    }

    /// 获取像素. 越界时返回 `None`.
    #[inline]
    pub fn get(&self, pos: Idx2d) -> Option<bool> {
        self.data.get(pos).copied()
    }

    /// 坐标是否位于图像最外圈?
    #[inline]
    pub fn is_at_border(&self, (h, w): Idx2d) -> bool {
        h == 0 || w == 0 || h + 1 == self.height() || w + 1 == self.width()
    }

    /// 前景像素数.
    #[inline]
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&p| p).count()
    }

    /// 是否不含任何前景?
    #[inline]
    pub fn is_blank(&self) -> bool {
        !self.data.iter().any(|&p| p)
    }

    /// 按行优先顺序收集前景坐标.
    pub fn positions<B: FromIterator<Idx2d>>(&self) -> B {
        self.data
            .indexed_iter()
            .filter_map(|(pos, &p)| p.then_some(pos))
            .collect()
    }

    /// 每一行的前景像素数.
    pub fn row_counts(&self) -> Vec<usize> {
        self.data
            .axis_iter(Axis(0))
            .map(|row| row.iter().filter(|&&p| p).count())
            .collect()
    }

    /// 每一列的前景像素数.
    pub fn col_counts(&self) -> Vec<usize> {
        self.data
            .axis_iter(Axis(1))
            .map(|col| col.iter().filter(|&&p| p).count())
            .collect()
    }

    /// 前景质心 `(行, 列)`. 前景为空时返回 `None`.
    pub fn centroid(&self) -> Option<(f64, f64)> {
        let (sh, sw, cnt) = self
            .data
            .indexed_iter()
            .filter(|(_, &p)| p)
            .fold((0_usize, 0_usize, 0_usize), |(sh, sw, c), ((h, w), _)| {
                (sh + h, sw + w, c + 1)
            });
        (cnt > 0).then(|| (sh as f64 / cnt as f64, sw as f64 / cnt as f64))
    }

    /// 四周各补一圈背景像素.
    pub fn padded(&self) -> Self {
        let (h, w) = self.shape();
        let mut data = Array2::from_elem((h + 2, w + 2), false);
        data.slice_mut(s![1..=h, 1..=w]).assign(&self.data);
        Self::from_raw(data)
    }

    /// 去掉最外一圈像素, 是 [`Self::padded`] 的逆操作.
    ///
    /// # 注意
    ///
    /// 高或宽小于 2 时得到空掩码.
    pub fn cropped(&self) -> Self {
        let (h, w) = self.shape();
        if h < 2 || w < 2 {
            return Self::zeros((h.saturating_sub(2), w.saturating_sub(2)));
        }
        Self::from_raw(self.data.slice(s![1..h - 1, 1..w - 1]).to_owned())
    }

    /// 按 `it` 给定的种子顺序, 提取值为 `value` 的 `conn` 连通域.
    ///
    /// 区域按种子首次命中的顺序输出, 每个区域内部按 BFS 顺序排列.
    pub fn areas_from<I: IntoIterator<Item = Idx2d>>(
        &self,
        it: I,
        value: bool,
        conn: Connectivity,
    ) -> Areas2d {
        let mut ans = Areas2d::new();
        let mut visited = Array2::from_elem(self.shape(), false);
        let mut bfs_q = VecDeque::with_capacity(16);

        for seed in it {
            if self.get(seed) != Some(value) || visited[seed] {
                continue;
            }
            visited[seed] = true;
            bfs_q.push_back(seed);
            let mut this_area = Area2d::with_capacity(1);

            while let Some(cur) = bfs_q.pop_front() {
                this_area.push(cur);
                for nb in conn.neighbours(cur) {
                    if self.get(nb) == Some(value) && !visited[nb] {
                        visited[nb] = true;
                        bfs_q.push_back(nb);
                    }
                }
            }
            ans.push(this_area);
        }
        ans
    }

    /// 以行优先顺序提取全部值为 `value` 的 `conn` 连通域.
    #[inline]
    pub fn areas(&self, value: bool, conn: Connectivity) -> Areas2d {
        self.areas_from(self.data.indexed_iter().map(|(pos, _)| pos), value, conn)
    }

    /// 空洞填充: 不与图像边缘 4-连通的背景区域变为前景.
    /// 返回被填充的像素数.
    pub fn fill_holes(&mut self) -> usize {
        let (h, w) = self.shape();
        let border = (0..h)
            .flat_map(|r| [(r, 0), (r, w.saturating_sub(1))])
            .chain((0..w).flat_map(|c| [(0, c), (h.saturating_sub(1), c)]));
        let outside = self.areas_from(border, false, Connectivity::Four);

        let mut keep = Array2::from_elem(self.shape(), false);
        for pos in outside.into_iter().flatten() {
            keep[pos] = true;
        }
        let mut filled = 0;
        for (p, &k) in self.data.iter_mut().zip(keep.iter()) {
            if !*p && !k {
                *p = true;
                filled += 1;
            }
        }
        filled
    }

    /// 以十字形 (4-邻域) 结构元素腐蚀. 图像外部视为背景.
    pub fn eroded(&self) -> Self {
        Self::from_fn(self.shape(), |pos| {
            self[pos]
                && Connectivity::Four
                    .neighbours(pos)
                    .all(|nb| self.get(nb).unwrap_or(false))
        })
    }

    /// 形态学边界: 前景减去其腐蚀结果.
    ///
    /// 先补一圈背景再腐蚀, 因此贴着图像边缘的前景像素必然属于边界.
    pub fn boundary(&self) -> Self {
        let padded = self.padded();
        let eroded = padded.eroded();
        let data = &padded.data & &eroded.data.mapv(|e| !e);
        Self::from_raw(data).cropped()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn ring() -> Mask {
        Mask::from_raw(array![
            [false, false, false, false, false],
            [false, true, true, true, false],
            [false, true, false, true, false],
            [false, true, true, true, false],
            [false, false, false, false, false],
        ])
    }

    #[test]
    fn test_pad_crop() {
        let m = ring();
        let p = m.padded();
        assert_eq!(p.shape(), (7, 7));
        assert_eq!(p.count(), m.count());
        assert_eq!(p.cropped(), m);
    }

    #[test]
    fn test_fill_holes() {
        let mut m = ring();
        assert_eq!(m.fill_holes(), 1);
        assert!(m[(2, 2)]);
        assert_eq!(m.count(), 9);
        // 已填满的掩码保持不变.
        assert_eq!(m.fill_holes(), 0);
    }

    #[test]
    fn test_areas_connectivity() {
        let m = Mask::from_raw(array![[true, false], [false, true]]);
        assert_eq!(m.areas(true, Connectivity::Four).len(), 2);
        assert_eq!(m.areas(true, Connectivity::Eight).len(), 1);
        assert_eq!(m.areas(false, Connectivity::Four).len(), 2);
    }

    #[test]
    fn test_counts_and_centroid() {
        let m = ring();
        assert_eq!(m.row_counts(), vec![0, 3, 2, 3, 0]);
        assert_eq!(m.col_counts(), vec![0, 3, 2, 3, 0]);
        assert_eq!(m.centroid(), Some((2.0, 2.0)));
        assert_eq!(Mask::zeros((3, 3)).centroid(), None);
    }

    #[test]
    fn test_boundary() {
        let full = Mask::from_fn((4, 4), |_| true);
        // 全图前景: 只有最外圈是边界.
        let b = full.boundary();
        assert_eq!(b.count(), 12);
        assert!(!b[(1, 1)] && !b[(2, 2)]);

        let mut solid = ring();
        solid.fill_holes();
        let b = solid.boundary();
        assert_eq!(b.count(), 8);
        assert!(!b[(2, 2)]);
    }

    #[test]
    fn test_positions() {
        let m = Mask::from_positions((3, 3), [(0, 1), (2, 2), (5, 5)]);
        let v: Vec<Idx2d> = m.positions();
        assert_eq!(v, vec![(0, 1), (2, 2)]);
        assert!(m.is_at_border((2, 2)));
        assert!(!m.is_at_border((1, 1)));
    }
}
