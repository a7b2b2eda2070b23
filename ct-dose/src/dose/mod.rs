//! 剂量推导: SSDE, 校正 DLP, 有效剂量, 器官剂量.
//!
//! 推导只做一次插值 (转换因子), 其余均为闭式回归. 给定相同输入与参考数据,
//! 结果逐位一致.

mod exposure;

pub use exposure::{
    mean_tube_current, scan_length_cm, Exposure, ExposureValues, Technique, TechniqueOutput,
};

use crate::error::{DoseError, Result};
use crate::fitting::DomainCheck;
use crate::manual::ManualSource;
use crate::metrics::DiameterMethod;
use crate::reference::{Phantom, ProjectionKind, ReferenceData};
use itertools::Itertools;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 患者直径的来源.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DiameterSource {
    /// 由图像度量得到.
    Image(DiameterMethod),

    /// 手动给出.
    Manual(ManualSource),
}

impl From<DiameterMethod> for DiameterSource {
    fn from(method: DiameterMethod) -> Self {
        Self::Image(method)
    }
}

impl From<ManualSource> for DiameterSource {
    fn from(source: ManualSource) -> Self {
        Self::Manual(source)
    }
}

/// 剂量推导请求.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DoseRequest {
    /// CTDIvol (mGy).
    pub ctdi_vol: f64,

    /// DLP (mGy·cm).
    pub dlp: f64,

    /// 患者直径 (cm), 必须为正.
    pub diameter: f64,

    /// 直径从何而来.
    pub source: DiameterSource,

    /// 模体.
    pub phantom: Phantom,

    /// 转换因子表种类.
    pub projection: ProjectionKind,

    /// 扫描协议, 用于查找有效剂量与器官剂量回归系数.
    pub protocol: String,

    /// 是否计算器官剂量.
    #[cfg_attr(feature = "serde", serde(default))]
    pub organs: bool,
}

/// 单个器官的剂量.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OrganDose {
    /// 器官名称.
    pub organ: String,

    /// 剂量 (mGy).
    pub dose: f64,
}

/// 剂量推导结果.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DoseRecord {
    /// CTDIvol (mGy).
    pub ctdi_vol: f64,

    /// DLP (mGy·cm).
    pub dlp: f64,

    /// 患者直径 (cm).
    pub diameter: f64,

    /// 直径来源, 原样取自请求.
    pub source: DiameterSource,

    /// 模体.
    pub phantom: Phantom,

    /// 转换因子表种类.
    pub projection: ProjectionKind,

    /// 扫描协议.
    pub protocol: String,

    /// 转换因子 `k`.
    pub conversion_factor: f64,

    /// 转换因子是否由外推得到.
    pub extrapolated: bool,

    /// 体型特异性剂量估计 `k * CTDIvol` (mGy).
    pub ssde: f64,

    /// 校正 DLP `k * DLP` (mGy·cm).
    pub dlpc: f64,

    /// 有效剂量 `DLP * exp(alfa * d + beta)` (mSv).
    pub effective_dose: f64,

    /// 器官剂量, 顺序与参考表一致. 未请求时为 `None`.
    pub organ_dose: Option<Vec<OrganDose>>,
}

/// 剂量推导器. 借用只读参考数据, 可在多线程间共享.
#[derive(Copy, Clone, Debug)]
pub struct DoseDeriver<'a> {
    reference: &'a ReferenceData,
}

impl<'a> DoseDeriver<'a> {
    /// 以参考数据构造.
    #[inline]
    pub fn new(reference: &'a ReferenceData) -> Self {
        Self { reference }
    }

    /// 推导剂量.
    ///
    /// # 注意
    ///
    /// 1. `diameter` 非正, 或 `ctdi_vol`/`dlp` 为负时返回 `InvalidInput`;
    /// 2. 任何所需参考表缺失时返回 `CalibrationMissing`, 不做默认替换;
    /// 3. 直径超出转换因子表范围时仍给出外推结果, 并置 `extrapolated`.
    pub fn derive(&self, req: &DoseRequest) -> Result<DoseRecord> {
        if !req.diameter.is_finite() || req.diameter <= 0.0 {
            return Err(DoseError::invalid(format!("直径必须为正: {}", req.diameter)));
        }
        if [req.ctdi_vol, req.dlp].iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(DoseError::invalid(format!(
                "CTDIvol/DLP 必须为非负有限值: {} / {}",
                req.ctdi_vol, req.dlp
            )));
        }

        let curve = self.reference.conversion_curve(req.phantom, req.projection)?;
        let regression = self.reference.effective_dose(&req.protocol)?;
        let organ_dose = if req.organs {
            let organs = self.reference.organ_dose(&req.protocol)?;
            Some(
                organs
                    .iter()
                    .map(|o| OrganDose {
                        organ: o.organ.clone(),
                        dose: req.ctdi_vol * o.coefficients.eval(req.diameter),
                    })
                    .collect_vec(),
            )
        } else {
            None
        };

        let k = curve.evaluate(req.diameter);
        let domain = curve.check(req.diameter);
        if domain != DomainCheck::Inside {
            let (lo, hi) = curve.domain();
            log::warn!(
                "{}/{}: 直径 {:.2}cm 超出转换因子表范围 [{lo}, {hi}], 结果为外推值",
                req.phantom,
                req.projection,
                req.diameter
            );
        }

        Ok(DoseRecord {
            ctdi_vol: req.ctdi_vol,
            dlp: req.dlp,
            diameter: req.diameter,
            source: req.source,
            phantom: req.phantom,
            projection: req.projection,
            protocol: req.protocol.clone(),
            conversion_factor: k,
            extrapolated: domain.is_extrapolated(),
            ssde: k * req.ctdi_vol,
            dlpc: k * req.dlp,
            effective_dose: req.dlp * regression.eval(req.diameter),
            organ_dose,
        })
    }
}
