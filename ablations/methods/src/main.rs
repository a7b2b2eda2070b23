//! 比较各直径度量方法在同一体数据上的结果与耗时.
//!
//! 用法: `methods [volume.nii.gz]`. 未给出路径时读取 `$CT_DOSE_VOLUME`,
//! 或 `$HOME/dataset/ct-dose/volume.nii.gz`.

mod profile;
mod result;
mod runner;

use log::LevelFilter;
use simple_logger::SimpleLogger;
use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = SimpleLogger::new().with_level(LevelFilter::Info).init() {
        eprintln!("logger init failed: {e}");
    }

    let (path, volume) = match utils::loader::volume_from_args_env_or_home() {
        Ok(v) => v,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    println!("Volume: {}", path.display());

    match runner::run(&volume).map(|r| r.analyze()) {
        Ok(Ok(())) => ExitCode::SUCCESS,
        Ok(Err(e)) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
