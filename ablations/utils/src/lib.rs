//! 消融实验依赖的通用组件.

pub mod loader;

const SEP: &str = "--------------------------------------------------------";

/// 向 `w` 写入一条简单分隔线.
#[inline]
pub fn sep_to<W: std::io::Write>(mut w: W) -> std::io::Result<()> {
    writeln!(&mut w, "{SEP}")
}

/// 以 `cm` 为单位格式化可能缺失的数值.
#[inline]
pub fn cm_to_display(v: Option<f64>) -> String {
    match v {
        Some(v) => format!("{v:.3} cm"),
        None => "/".to_string(),
    }
}
