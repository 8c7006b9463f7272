//! Status - Scalar printer status carried by reports

use serde::Serialize;

/// Scalar fields found in a single report. `None` means "not present".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportFields {
    pub gcode_state: Option<String>,
    pub print_progress: Option<u8>,
    pub download_progress: Option<u8>,
    pub bed_temp: Option<f32>,
    pub bed_target: Option<f32>,
    pub nozzle_temp: Option<f32>,
    pub nozzle_target: Option<f32>,
    pub remaining_minutes: Option<u32>,
}

impl ReportFields {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Last known printer status, accumulated over reports
///
/// Printers send partial reports, so absent fields keep their previous value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PrinterStatus {
    /// `IDLE`, `PREPARE`, `RUNNING`, `PAUSE`, `FINISH`, `FAILED`, ...
    pub gcode_state: String,
    /// 0-100
    pub print_progress: Option<u8>,
    /// 0-100
    pub download_progress: Option<u8>,
    pub bed_temp: f32,
    pub bed_target: f32,
    /// Set once a bed temperature has been reported
    pub bed_valid: bool,
    pub nozzle_temp: Option<f32>,
    pub nozzle_target: Option<f32>,
    pub remaining_minutes: Option<u32>,
}

impl PrinterStatus {
    /// Apply the fields present in a report
    pub fn merge(&mut self, fields: &ReportFields) {
        if let Some(state) = &fields.gcode_state {
            self.gcode_state.clone_from(state);
        }
        if let Some(p) = fields.print_progress {
            self.print_progress = Some(p);
        }
        if let Some(p) = fields.download_progress {
            self.download_progress = Some(p);
        }
        if let Some(t) = fields.bed_temp {
            self.bed_temp = t;
            self.bed_valid = true;
        }
        if let Some(t) = fields.bed_target {
            self.bed_target = t;
        }
        if let Some(t) = fields.nozzle_temp {
            self.nozzle_temp = Some(t);
        }
        if let Some(t) = fields.nozzle_target {
            self.nozzle_target = Some(t);
        }
        if let Some(m) = fields.remaining_minutes {
            self.remaining_minutes = Some(m);
        }
    }
}
