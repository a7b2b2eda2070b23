//! 程序运行函数.

use crate::profile::Profile;
use crate::result::AblationResult;
use ct_dose::metrics::{measure_frame, DiameterMethod};
use ct_dose::segment::SegmentParams;
use ct_dose::{CtVolume, DoseError};
use std::thread;

/// 以 `method` 逐张度量全部切片.
fn profile_method(volume: &CtVolume, method: DiameterMethod) -> Result<Profile, DoseError> {
    let params = SegmentParams::default();
    let mut profile = Profile::new();
    for (i, frame) in volume.frames().iter().enumerate() {
        profile.measure_start();
        match measure_frame(frame, method, &params) {
            Ok(r) => profile.measure_end(i, Some(r.diameter)),
            Err(e) if e.is_segmentation_failed() => profile.measure_end(i, None),
            Err(e) => return Err(e.at_slice(i)),
        }
    }
    Ok(profile.finish())
}

/// 实际运行: 每种度量方法一个线程.
pub fn run(volume: &CtVolume) -> Result<AblationResult, DoseError> {
    if volume.is_empty() {
        return Err(DoseError::invalid("体数据不含任何切片"));
    }

    println!("Running ablation studies on {} slices...", volume.len());
    thread::scope(|s| {
        let handles = DiameterMethod::ALL.map(|m| (m, s.spawn(move || profile_method(volume, m))));

        let mut ans = Vec::with_capacity(handles.len());
        for (m, th) in handles {
            match th.join() {
                Ok(r) => ans.push((m.name(), r?)),
                Err(_) => return Err(DoseError::invalid(format!("线程 `{}` 异常退出", m.name()))),
            }
        }
        Ok(AblationResult::from_iter(ans))
    })
}
