//! 错误类型.

use thiserror::Error;

/// 本 crate 的统一错误类型.
///
/// # 注意
///
/// 用户取消 (`cancel`) 不是错误, 它通过 [`crate::aggregate::AggregateStatus`] 表达.
#[derive(Error, Debug)]
pub enum DoseError {
    /// 切片中不存在任何高于阈值的像素.
    #[error("分割失败: {} 中没有可识别的物体", slice_name(.index))]
    SegmentationFailed {
        /// 失败切片在体数据中的索引 (若已知).
        index: Option<usize>,
    },

    /// 所需的参考表缺失.
    #[error("缺少参考数据: {table}")]
    CalibrationMissing {
        /// 缺失的表名 (包含模体/协议等上下文).
        table: String,
    },

    /// 输入不合法 (形状不一致, 非正直径, 控制点过少等).
    #[error("输入不合法: {0}")]
    InvalidInput(String),

    /// IO 错误.
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// nii 文件读取错误.
    #[error("nii 文件读取错误: {0}")]
    Nifti(#[from] nifti::NiftiError),

    /// 参考数据 JSON 解析错误.
    #[cfg(feature = "serde")]
    #[error("参考数据解析错误: {0}")]
    Json(#[from] serde_json::Error),
}

fn slice_name(index: &Option<usize>) -> String {
    match index {
        Some(i) => format!("切片 #{i}"),
        None => "切片".to_string(),
    }
}

impl DoseError {
    /// 构造 `InvalidInput`.
    #[inline]
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// 构造 `CalibrationMissing`.
    #[inline]
    pub fn missing(table: impl Into<String>) -> Self {
        Self::CalibrationMissing {
            table: table.into(),
        }
    }

    /// 为 `SegmentationFailed` 补充切片索引. 其它错误原样返回.
    pub fn at_slice(self, idx: usize) -> Self {
        match self {
            Self::SegmentationFailed { index: None } => Self::SegmentationFailed { index: Some(idx) },
            e => e,
        }
    }

    /// 是否为分割失败? 聚合流程会跳过此类切片.
    #[inline]
    pub fn is_segmentation_failed(&self) -> bool {
        matches!(self, Self::SegmentationFailed { .. })
    }
}

/// 本 crate 的 `Result` 别名.
pub type Result<T> = std::result::Result<T, DoseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let e = DoseError::SegmentationFailed { index: None };
        assert!(e.to_string().contains("切片"));
        let e = e.at_slice(7);
        assert!(e.to_string().contains("#7"));
        assert!(e.is_segmentation_failed());

        let e = DoseError::missing("body/effective");
        assert!(e.to_string().contains("body/effective"));
        assert!(!e.at_slice(1).is_segmentation_failed());
    }
}
