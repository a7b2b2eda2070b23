//! 实验结果.

use crate::profile::Profile;
use std::io::{self, Write};

/// 将 `p` 的结果写进 `w` 中.
fn describe_into<W: Write>(name: &str, p: &Profile, w: &mut W) -> io::Result<()> {
    const S4: &str = "    ";

    #[inline]
    fn us_to_display(f: Option<f64>) -> String {
        match f {
            Some(f) => format!("{f:.1} us"),
            None => "/".to_string(),
        }
    }

    writeln!(w, "Profile `{name}`:")?;
    writeln!(w, "{S4}Skipped slices: {}", p.skipped())?;
    writeln!(w, "{S4}Measured slices: {}", p.measured())?;
    writeln!(w, "{S4}Mean diameter: {}", utils::cm_to_display(p.mean()))?;
    if let Some((lo, hi)) = p.range() {
        writeln!(w, "{S4}Diameter range: [{lo:.3}, {hi:.3}] cm")?;
    }
    writeln!(w, "{S4}Measure total time: {} us", p.measure_time_us())?;
    writeln!(w, "{S4}Measure average time: {}", us_to_display(p.avg_measure_time_us()))?;
    writeln!(w, "{S4}Total machine time: {} us", p.real_time_us())?;
    let t = p.most_time_consuming().map(|d| d.as_micros() as f64);
    write!(w, "{S4}Most time-consuming slice costs {}", us_to_display(t))?;
    Ok(())
}

/// 消融实验最终结果.
pub struct AblationResult {
    data: Vec<(&'static str, Profile)>,
}

impl AblationResult {
    pub fn from_iter<I: IntoIterator<Item = (&'static str, Profile)>>(it: I) -> Self {
        Self {
            data: it.into_iter().collect(),
        }
    }

    /// 相对于基准方法 `base` 的逐切片平均相对偏差 (只统计双方都成功的切片).
    fn relative_to(&self, base: &Profile, other: &Profile) -> Option<f64> {
        let (sum, n) = other
            .diameters()
            .iter()
            .filter_map(|&(i, d)| {
                let b = base.diameters().iter().find(|&&(j, _)| j == i)?.1;
                (b > 0.0).then(|| (d - b) / b)
            })
            .fold((0.0, 0_usize), |(s, n), r| (s + r, n + 1));
        (n > 0).then(|| sum / n as f64)
    }

    /// 分析运行结果并打印. 第一个方法视为基准.
    pub fn analyze(&self) -> io::Result<()> {
        self.analyze_into(&mut io::stdout().lock())
    }

    /// 将分析结果写进 `w` 中.
    fn analyze_into<W: Write>(&self, w: &mut W) -> io::Result<()> {
        utils::sep_to(&mut *w)?;
        let base = self.data.first();

        for (key, profile) in self.data.iter() {
            describe_into(key, profile, w)?;
            if let Some((base_key, base)) = base.filter(|(k, _)| k != key) {
                if let Some(r) = self.relative_to(base, profile) {
                    write!(w, "\n    Relative to `{base_key}`: {:+.2}%", r * 100.0)?;
                }
            }
            writeln!(w)?;
            utils::sep_to(&mut *w)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(values: &[(usize, Option<f64>)]) -> Profile {
        let mut p = Profile::new();
        for &(i, d) in values {
            p.measure_start();
            p.measure_end(i, d);
        }
        p.finish()
    }

    #[test]
    fn test_analyze_into() {
        let res = AblationResult::from_iter([
            ("dw", profile(&[(0, Some(20.0)), (1, Some(25.0)), (2, None)])),
            ("deff-area", profile(&[(0, Some(22.0)), (1, Some(27.5))])),
        ]);
        let mut buf = Vec::new();
        res.analyze_into(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert_eq!(text.lines().filter(|l| l.starts_with("----")).count(), 3);
        assert!(text.contains("Profile `dw`:"));
        assert!(text.contains("Skipped slices: 1"));
        assert!(text.contains("Relative to `dw`: +10.00%"));
        assert_eq!(text.matches("Relative to").count(), 1);
    }
}
