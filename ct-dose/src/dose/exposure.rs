//! 曝光参数: 由扫描技术参数, 手动输入, 或图像元数据得到 CTDIvol 与 DLP.

use crate::consts::{CTDI_REFERENCE_MAS, MM_TO_CM};
use crate::error::{DoseError, Result};
use crate::reference::{Phantom, Scanner};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 扫描技术参数.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Technique {
    /// 标准化 CTDI (mGy / 100 mAs).
    pub ctdi: f64,

    /// 准直校正系数.
    pub collimation: f64,

    /// 管电流 (mA).
    pub tube_current: f64,

    /// 旋转时间 (s).
    pub rotation_time: f64,

    /// 螺距.
    pub pitch: f64,

    /// 扫描长度 (cm).
    pub scan_length: f64,
}

/// 技术参数的计算结果.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TechniqueOutput {
    /// 管电流时间积.
    pub mas: f64,

    /// 有效 mAs, `mAs / pitch`, 即 `管电流 * 旋转时间 / pitch`, 而非 `管电流 / pitch`.
    pub effective_mas: f64,

    /// 加权 CTDI (mGy).
    pub ctdi_w: f64,

    /// 容积 CTDI (mGy).
    pub ctdi_vol: f64,

    /// 剂量长度积 (mGy·cm).
    pub dlp: f64,
}

impl Technique {
    /// 以扫描仪参考数据给出 CTDI 和准直系数, 其余参数取常用默认值
    /// (100 mA, 1 s, 螺距 1, 10 cm).
    pub fn from_scanner(
        scanner: &Scanner,
        voltage: f64,
        phantom: Phantom,
        collimation: &str,
    ) -> Result<Self> {
        Ok(Self {
            ctdi: scanner.ctdi(voltage, phantom)?,
            collimation: scanner.collimation(collimation)?,
            tube_current: 100.0,
            rotation_time: 1.0,
            pitch: 1.0,
            scan_length: 10.0,
        })
    }

    /// 计算 mAs, CTDIw, CTDIvol 与 DLP.
    pub fn evaluate(&self) -> Result<TechniqueOutput> {
        let fields = [
            ("CTDI", self.ctdi),
            ("准直系数", self.collimation),
            ("管电流", self.tube_current),
            ("旋转时间", self.rotation_time),
            ("扫描长度", self.scan_length),
        ];
        if let Some((name, v)) = fields.iter().find(|(_, v)| !v.is_finite() || *v < 0.0) {
            return Err(DoseError::invalid(format!("{name}必须为非负有限值: {v}")));
        }
        if !self.pitch.is_finite() || self.pitch <= 0.0 {
            return Err(DoseError::invalid(format!("螺距必须为正: {}", self.pitch)));
        }

        let mas = self.tube_current * self.rotation_time;
        let effective_mas = mas / self.pitch;
        let k = self.collimation * self.ctdi / CTDI_REFERENCE_MAS;
        let ctdi_vol = k * effective_mas;
        Ok(TechniqueOutput {
            mas,
            effective_mas,
            ctdi_w: k * mas,
            ctdi_vol,
            dlp: ctdi_vol * self.scan_length,
        })
    }
}

/// 管电流调制 (TCM): 各切片管电流的平均值.
pub fn mean_tube_current(currents: &[f64]) -> Result<f64> {
    if currents.is_empty() {
        return Err(DoseError::invalid("没有任何切片的管电流"));
    }
    if currents.iter().any(|v| !v.is_finite()) {
        return Err(DoseError::invalid("管电流中存在非有限值"));
    }
    Ok(currents.iter().sum::<f64>() / currents.len() as f64)
}

/// 由切片位置 (mm, 按扫描顺序) 与层厚 (mm) 估计扫描长度 (cm).
///
/// `(|last - first| + |second - first| + thickness) * 0.1`. 只有一张切片时
/// `second` 取 `last`.
pub fn scan_length_cm(positions: &[f64], thickness: f64) -> Result<f64> {
    let (first, last) = match positions {
        [] => return Err(DoseError::invalid("没有切片位置信息")),
        [f, .., l] => (*f, *l),
        [f] => (*f, *f),
    };
    let second = positions.get(1).copied().unwrap_or(last);
    if !thickness.is_finite() || thickness < 0.0 {
        return Err(DoseError::invalid(format!("层厚必须为非负: {thickness}")));
    }
    Ok(((last - first).abs() + (second - first).abs() + thickness) * MM_TO_CM)
}

/// CTDIvol 与 DLP 的来源.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Exposure {
    /// 由扫描技术参数计算.
    Technique(Technique),

    /// 手动输入.
    Manual {
        /// CTDIvol (mGy).
        ctdi_vol: f64,
        /// DLP (mGy·cm).
        dlp: f64,
    },

    /// 图像元数据: 标注的 CTDIvol 与由切片位置估计的扫描长度.
    Image {
        /// CTDIvol (mGy).
        ctdi_vol: f64,
        /// 扫描长度 (cm).
        scan_length: f64,
    },
}

/// 解析后的曝光值.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ExposureValues {
    /// CTDIvol (mGy).
    pub ctdi_vol: f64,

    /// DLP (mGy·cm).
    pub dlp: f64,
}

impl Exposure {
    /// 由图像元数据构造. `ctdi_vol` 缺失 (或非正) 时返回 `CalibrationMissing`.
    pub fn from_image(ctdi_vol: Option<f64>, positions: &[f64], thickness: f64) -> Result<Self> {
        let ctdi_vol = ctdi_vol
            .filter(|v| *v > 0.0)
            .ok_or_else(|| DoseError::missing("图像元数据中的 CTDIvol"))?;
        Ok(Self::Image {
            ctdi_vol,
            scan_length: scan_length_cm(positions, thickness)?,
        })
    }

    /// 得到 CTDIvol 与 DLP.
    pub fn resolve(&self) -> Result<ExposureValues> {
        let ans = match *self {
            Self::Technique(t) => {
                let o = t.evaluate()?;
                ExposureValues {
                    ctdi_vol: o.ctdi_vol,
                    dlp: o.dlp,
                }
            }
            Self::Manual { ctdi_vol, dlp } => ExposureValues { ctdi_vol, dlp },
            Self::Image {
                ctdi_vol,
                scan_length,
            } => ExposureValues {
                ctdi_vol,
                dlp: ctdi_vol * scan_length,
            },
        };
        if [ans.ctdi_vol, ans.dlp].iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(DoseError::invalid(format!(
                "CTDIvol/DLP 必须为非负有限值: {} / {}",
                ans.ctdi_vol, ans.dlp
            )));
        }
        Ok(ans)
    }
}
