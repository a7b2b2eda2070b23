//! 🩻欢迎光临🩻
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::Idx2d;

pub use crate::data::{Connectivity, CtVolume, Frame, FrameGeometry, Mask};
pub use crate::error::{DoseError, Result};

pub use crate::consts::{protocol, DEFAULT_THRESHOLD};

pub use crate::segment::{segment, segment_with, SegmentParams};

pub use crate::metrics::{
    effective_diameter, measure, measure_frame, truncation_percentage, water_equivalent_diameter,
    DiameterMethod, DiameterResult, EffectiveMethod,
};

pub use crate::aggregate::{
    aggregate, AggregateParams, AggregateStatus, CancelToken, Progress, SamplingStrategy,
};

#[cfg(feature = "rayon")]
pub use crate::aggregate::aggregate_par;

pub use crate::fitting::{CalibrationTable, Curve, DomainCheck};

pub use crate::reference::{Phantom, ProjectionKind, ReferenceData, Regression, SizeKind};

pub use crate::manual::{line_length_cm, ManualSource};

pub use crate::dose::{DiameterSource, DoseDeriver, DoseRecord, DoseRequest, Exposure, Technique};
