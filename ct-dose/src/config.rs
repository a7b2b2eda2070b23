//! 运行配置: 参考数据与体数据的默认位置.

use crate::error::{DoseError, Result};
use std::env;
use std::path::{Path, PathBuf};

/// 指定参考数据 (JSON) 路径的环境变量.
pub const REFERENCE_ENV: &str = "CT_DOSE_REFERENCE";

/// 指定待分析体数据 (nii) 路径的环境变量.
pub const VOLUME_ENV: &str = "CT_DOSE_VOLUME";

/// 获取 `{用户主目录}/dataset` 目录下给定继续项组成的全路径.
pub fn home_dataset_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    ans.extend(it);
    Some(ans)
}

/// 从环境变量 `key` 读取路径; 若未设置 (或为空), 则回退到
/// `{用户主目录}/dataset/{fallback...}`.
///
/// 两者都不可用时返回 `InvalidInput`.
pub fn path_from_env_or_home<P: AsRef<Path>, I: IntoIterator<Item = P>>(
    key: &str,
    fallback: I,
) -> Result<PathBuf> {
    match env::var(key) {
        Ok(d) if !d.is_empty() => Ok(PathBuf::from(d)),
        _ => home_dataset_dir_with(fallback)
            .ok_or_else(|| DoseError::invalid(format!("未设置 ${key}, 且无法定位用户主目录"))),
    }
}

/// 获取参考数据路径.
///
/// 1. 若环境变量 `$CT_DOSE_REFERENCE` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/ct-dose/reference.json`.
#[inline]
pub fn reference_path_from_env_or_home() -> Result<PathBuf> {
    path_from_env_or_home(REFERENCE_ENV, ["ct-dose", "reference.json"])
}

/// 获取体数据路径.
///
/// 1. 若环境变量 `$CT_DOSE_VOLUME` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/ct-dose/volume.nii.gz`.
#[inline]
pub fn volume_path_from_env_or_home() -> Result<PathBuf> {
    path_from_env_or_home(VOLUME_ENV, ["ct-dose", "volume.nii.gz"])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_override() {
        let key = "CT_DOSE_TEST_CONFIG_PATH";
        env::set_var(key, "/tmp/some/where.json");
        let p = path_from_env_or_home(key, ["x"]).unwrap();
        assert_eq!(p, PathBuf::from("/tmp/some/where.json"));
        env::remove_var(key);
    }

    #[test]
    fn test_home_fallback() {
        let key = "CT_DOSE_TEST_CONFIG_UNSET";
        env::remove_var(key);
        if let Some(home) = dirs::home_dir() {
            let p = path_from_env_or_home(key, ["ct-dose", "a.json"]).unwrap();
            assert_eq!(p, home.join("dataset").join("ct-dose").join("a.json"));
        }
    }
}
