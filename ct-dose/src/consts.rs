//! 通用常量.

/// 默认分割阈值 (HU). 严格大于该值的像素被视为 "物体" (人体及床板等).
pub const DEFAULT_THRESHOLD: f32 = -200.0;

/// 毫米到厘米的换算系数.
pub const MM_TO_CM: f64 = 0.1;

/// 截断校正经验系数. 校正因子为 `exp(TRUNCATION_COEFFICIENT * p^3)`,
/// 其中 `p` 为截断百分比.
pub const TRUNCATION_COEFFICIENT: f64 = 1.14e-6;

/// 三次样条 (not-a-knot) 所需的最少控制点数.
pub const MIN_SPLINE_POINTS: usize = 4;

/// 标准化 CTDI 所对应的 mAs.
pub const CTDI_REFERENCE_MAS: f64 = 100.0;

/// 扫描协议名称.
pub mod protocol {
    use crate::reference::Phantom;

    /// 体部模体对应的协议.
    pub const BODY: [&str; 10] = [
        "Chest",
        "Liver",
        "Liver to Kidney",
        "Abdomen",
        "Adrenal",
        "Kidney",
        "Chest-Abdomen-Pelvis",
        "Abdomen-Pelvis",
        "Kidney to Bladder",
        "Pelvis",
    ];

    /// 头部模体对应的协议.
    pub const HEAD: [&str; 3] = ["Head", "Head & Neck", "Neck"];

    /// 获取某一模体下的全部协议.
    #[inline]
    pub fn of(phantom: Phantom) -> &'static [&'static str] {
        match phantom {
            Phantom::Body => &BODY,
            Phantom::Head => &HEAD,
        }
    }

    /// 根据协议名称推断其模体. 未知协议返回 `None`.
    pub fn phantom_of(name: &str) -> Option<Phantom> {
        if BODY.contains(&name) {
            Some(Phantom::Body)
        } else if HEAD.contains(&name) {
            Some(Phantom::Head)
        } else {
            None
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_phantom_of() {
            assert_eq!(phantom_of("Chest"), Some(Phantom::Body));
            assert_eq!(phantom_of("Head & Neck"), Some(Phantom::Head));
            assert_eq!(phantom_of("chest"), None);
            assert!(of(Phantom::Head).iter().all(|p| phantom_of(p) == Some(Phantom::Head)));
            assert!(of(Phantom::Body).iter().all(|p| phantom_of(p) == Some(Phantom::Body)));
        }
    }
}
