//! 对 `ct_dose::config` 的更一层封装. 提供更直接的数据加载器.

use ct_dose::config;
use ct_dose::{CtVolume, Result};
use std::env;
use std::path::PathBuf;

/// 获取待分析的体数据路径.
///
/// 1. 若命令行第一个参数非空, 则返回其值;
/// 2. 若环境变量 `$CT_DOSE_VOLUME` 非空, 则返回其值;
/// 3. 否则, 返回 `$HOME/dataset/ct-dose/volume.nii.gz`.
pub fn volume_path_from_args_env_or_home() -> Result<PathBuf> {
    match env::args().nth(1) {
        Some(p) if !p.is_empty() => Ok(PathBuf::from(p)),
        _ => config::volume_path_from_env_or_home(),
    }
}

/// 加载待分析的体数据, 路径规则见 [`volume_path_from_args_env_or_home`].
pub fn volume_from_args_env_or_home() -> Result<(PathBuf, CtVolume)> {
    let path = volume_path_from_args_env_or_home()?;
    log::info!("loading volume {}", path.display());
    let volume = CtVolume::open(&path)?;
    Ok((path, volume))
}
