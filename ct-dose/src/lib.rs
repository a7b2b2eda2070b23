#![warn(missing_docs)] // <= 合适时移除它.

//! 核心库. 从 CT 水平切片估计患者尺寸 (有效直径, 水当量直径),
//! 并据此推导体型特异性剂量估计 (SSDE), 有效剂量和器官剂量.
//!
//! 该 crate 只提供 `safe` 接口, 不做任何网络 IO. 文件 IO 仅限于读取 nii 体数据和
//! JSON 参考数据.
//!
//! # 注意
//!
//! 1. 切片像素值必须已经是 HU (nii 的 `scl_slope/scl_inter` 会在读取时自动应用);
//! 2. 所有长度输出都以厘米为单位, 而重建直径, 像素间距等输入以毫米为单位;
//! 3. 参考数据缺失时一律报错, 从不使用默认表.
//!
//! # 处理流程
//!
//! ### 人体分割 ✅
//!
//! 阈值化, 补边, 空洞填充, 最大连通域.
//!
//! 实现位于 `ct-dose/src/segment.rs`.
//!
//! ### 尺寸度量 ✅
//!
//! 有效直径 (area / center / max) 与水当量直径 (可选截断校正).
//!
//! 实现位于 `ct-dose/src/metrics`.
//!
//! ### 多切片聚合 ✅
//!
//! 三种采样策略, 可取消, 可并行 (`rayon` feature).
//!
//! 实现位于 `ct-dose/src/aggregate.rs`.
//!
//! ### 三次样条插值的纯 Rust 实现 ✅
//!
//! not-a-knot 边界条件, 与 `s = 0` 的插值型平滑样条一致. 不依赖 BLAS/LAPACK.
//!
//! 实现位于 `ct-dose/src/fitting`.
//!
//! ### 剂量推导 ✅
//!
//! SSDE, 校正 DLP, 有效剂量, 器官剂量, 以及由技术参数计算 CTDIvol/DLP.
//!
//! 实现位于 `ct-dose/src/dose`.
//!
//! ### 手动尺寸 ✅
//!
//! 直接输入, AP/LAT 径线, 年龄查表.
//!
//! 实现位于 `ct-dose/src/manual.rs`.

/// 二维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx2d = (usize, usize);

type Area2d = Vec<Idx2d>;
type Areas2d = Vec<Area2d>;

/// 体数据与切片基础数据结构.
pub mod data;

pub use data::{Connectivity, CtVolume, Frame, FrameGeometry, Mask};

pub mod aggregate;
pub mod config;
pub mod consts;
pub mod dose;
pub mod error;
pub mod fitting;
pub mod manual;
pub mod metrics;
pub mod prelude;
pub mod reference;
pub mod segment;

pub use error::{DoseError, Result};
