//! Report Decoder
//!
//! Turns one printer report payload into scalar status fields and the list of
//! HMS codes it carries. Decoding is a pure transform: it never touches the
//! event table or the network.

use ahash::AHashSet;
use serde_json::{Map, Value};
use snafu::{ResultExt, Snafu};

use crate::domain::hms::HmsCode;
use crate::domain::status::ReportFields;

/// Why a report payload was rejected as a whole
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DecodeError {
    /// Payload is not well-formed JSON
    #[snafu(display("malformed report: {source}"))]
    Malformed { source: serde_json::Error },

    /// Payload is JSON but not an object
    #[snafu(display("malformed report: top level is not an object"))]
    NotAnObject,
}

/// Result of decoding one report
#[derive(Debug, Clone)]
pub struct DecodedReport {
    /// Scalar fields present in this report
    pub fields: ReportFields,
    /// HMS codes to track, in report order, ignored codes removed
    pub events: Vec<HmsCode>,
    /// Records dropped for missing or invalid `attr`/`code`
    pub skipped: usize,
    /// Records dropped by the ignore list
    pub ignored: usize,
    /// The parsed document
    pub document: Value,
}

/// Where the HMS list may live, in priority order
const HMS_LOCATIONS: [&[&str]; 3] = [&["hms"], &["print", "hms"], &["data", "hms"]];

/// Decoder for printer reports
#[derive(Debug, Clone, Default)]
pub struct ReportDecoder {
    ignore: AHashSet<String>,
}

impl ReportDecoder {
    /// Create a decoder that drops the given normalised display codes
    pub fn new(ignore: AHashSet<String>) -> Self {
        Self { ignore }
    }

    pub fn is_ignored(&self, code: HmsCode) -> bool {
        !self.ignore.is_empty() && self.ignore.contains(code.display_code().as_str())
    }

    /// Decode a raw payload
    pub fn decode(&self, payload: &[u8]) -> Result<DecodedReport, DecodeError> {
        let document: Value = serde_json::from_slice(payload).context(MalformedSnafu)?;
        let Some(root) = document.as_object() else {
            return NotAnObjectSnafu.fail();
        };

        let fields = extract_fields(root);

        let mut events = Vec::new();
        let mut skipped = 0;
        let mut ignored = 0;

        for record in find_hms_list(root).unwrap_or_default() {
            let Some(code) = parse_hms_record(record) else {
                tracing::trace!(?record, "Skipping malformed HMS record");
                skipped += 1;
                continue;
            };
            if self.is_ignored(code) {
                tracing::trace!(code = %code, "Ignoring HMS code");
                ignored += 1;
                continue;
            }
            events.push(code);
        }

        Ok(DecodedReport {
            fields,
            events,
            skipped,
            ignored,
            document,
        })
    }
}

fn find_hms_list(root: &Map<String, Value>) -> Option<&[Value]> {
    HMS_LOCATIONS.iter().find_map(|path| {
        let (first, rest) = path.split_first()?;
        let value = rest
            .iter()
            .try_fold(root.get(*first)?, |value, key| value.get(*key))?;
        value.as_array().map(Vec::as_slice)
    })
}

fn parse_hms_record(record: &Value) -> Option<HmsCode> {
    let record = record.as_object()?;
    let attribute = u32_field(record, "attr").or_else(|| u32_field(record, "attribute"))?;
    let code = u32_field(record, "code")?;
    let key = HmsCode::new(attribute, code);
    (!key.is_zero()).then_some(key)
}

fn u32_field(record: &Map<String, Value>, key: &str) -> Option<u32> {
    record
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
}

/// Look up `key` under `print` first, then at the top level; the first value
/// accepted by `parse` wins.
fn scalar<T>(root: &Map<String, Value>, key: &str, parse: impl Fn(&Value) -> Option<T>) -> Option<T> {
    let nested = root.get("print").and_then(|print| print.get(key));
    [nested, root.get(key)].into_iter().flatten().find_map(parse)
}

fn as_text(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

/// Numbers may arrive as JSON numbers or numeric strings
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_percent(value: &Value) -> Option<u8> {
    as_number(value)
        .filter(|n| n.is_finite())
        .map(|n| n.round().clamp(0.0, 100.0) as u8)
}

fn as_temperature(value: &Value) -> Option<f32> {
    as_number(value).filter(|n| n.is_finite()).map(|n| n as f32)
}

fn as_minutes(value: &Value) -> Option<u32> {
    as_number(value)
        .filter(|n| n.is_finite() && *n >= 0.0)
        .map(|n| n.round().min(f64::from(u32::MAX)) as u32)
}

fn extract_fields(root: &Map<String, Value>) -> ReportFields {
    ReportFields {
        gcode_state: scalar(root, "gcode_state", as_text),
        print_progress: scalar(root, "mc_percent", as_percent),
        download_progress: scalar(root, "gcode_file_prepare_percent", as_percent),
        bed_temp: scalar(root, "bed_temper", as_temperature),
        bed_target: scalar(root, "bed_target_temper", as_temperature),
        nozzle_temp: scalar(root, "nozzle_temper", as_temperature),
        nozzle_target: scalar(root, "nozzle_target_temper", as_temperature),
        remaining_minutes: scalar(root, "mc_remaining_time", as_minutes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::normalize_ignore_codes;
    use crate::domain::severity::Severity;
    use serde_json::json;

    fn decode(value: Value) -> DecodedReport {
        ReportDecoder::default()
            .decode(value.to_string().as_bytes())
            .expect("decode")
    }

    #[test]
    fn test_single_record_scenario() {
        let report = decode(json!({
            "print": { "hms": [{ "attr": 0x0000_0001u32, "code": 0x0002_0003u32 }] }
        }));
        assert_eq!(report.events, vec![HmsCode(0x0000_0001_0002_0003)]);
        let code = report.events[0];
        assert_eq!(code.display_code(), "HMS_0000_0001_0002_0003");
        assert_eq!(code.severity(), Severity::None);
    }

    #[test]
    fn test_hms_location_priority() {
        let report = decode(json!({
            "hms": [{ "attr": 1, "code": 1 }],
            "print": { "hms": [{ "attr": 2, "code": 2 }] },
            "data": { "hms": [{ "attr": 3, "code": 3 }] }
        }));
        assert_eq!(report.events, vec![HmsCode::new(1, 1)]);

        let report = decode(json!({
            "hms": { "not": "a list" },
            "data": { "hms": [{ "attr": 3, "code": 3 }] }
        }));
        assert_eq!(report.events, vec![HmsCode::new(3, 3)]);
    }

    #[test]
    fn test_no_hms_list_is_empty() {
        let report = decode(json!({ "print": { "gcode_state": "IDLE" } }));
        assert!(report.events.is_empty());
        assert_eq!(report.fields.gcode_state.as_deref(), Some("IDLE"));
    }

    #[test]
    fn test_malformed_records_skipped() {
        let report = decode(json!({
            "hms": [
                { "attr": 1 },
                { "code": 2 },
                { "attr": -1, "code": 2 },
                { "attr": 4_294_967_296u64, "code": 2 },
                { "attr": 0, "code": 0 },
                "garbage",
                { "attr": 5, "code": 0x0001_0000 }
            ]
        }));
        assert_eq!(report.events, vec![HmsCode::new(5, 0x0001_0000)]);
        assert_eq!(report.skipped, 6);
    }

    #[test]
    fn test_ignore_list_exact_match() {
        let ignore = normalize_ignore_codes(&["hms_0000_0005_0001_0000".to_string()]);
        let decoder = ReportDecoder::new(ignore);
        let payload = json!({
            "hms": [
                { "attr": 5, "code": 0x0001_0000 },
                { "attr": 5, "code": 0x0001_0001 }
            ]
        });
        let report = decoder
            .decode(payload.to_string().as_bytes())
            .expect("decode");
        assert_eq!(report.events, vec![HmsCode::new(5, 0x0001_0001)]);
        assert_eq!(report.ignored, 1);
    }

    #[test]
    fn test_gcode_state_print_wins_over_top_level() {
        let report = decode(json!({
            "gcode_state": "IDLE",
            "print": { "gcode_state": "RUNNING" }
        }));
        assert_eq!(report.fields.gcode_state.as_deref(), Some("RUNNING"));

        let report = decode(json!({
            "gcode_state": "FINISH",
            "print": { "gcode_state": 7 }
        }));
        assert_eq!(report.fields.gcode_state.as_deref(), Some("FINISH"));
    }

    #[test]
    fn test_scalar_fields() {
        let report = decode(json!({
            "print": {
                "mc_percent": 57,
                "gcode_file_prepare_percent": "100",
                "bed_temper": 59.8,
                "bed_target_temper": 60,
                "nozzle_temper": 219.9,
                "nozzle_target_temper": 220,
                "mc_remaining_time": 41
            }
        }));
        let f = report.fields;
        assert_eq!(f.print_progress, Some(57));
        assert_eq!(f.download_progress, Some(100));
        assert_eq!(f.bed_temp, Some(59.8));
        assert_eq!(f.bed_target, Some(60.0));
        assert_eq!(f.nozzle_target, Some(220.0));
        assert_eq!(f.remaining_minutes, Some(41));
    }

    #[test]
    fn test_percent_clamped() {
        let report = decode(json!({ "mc_percent": 140 }));
        assert_eq!(report.fields.print_progress, Some(100));
    }

    #[test]
    fn test_malformed_payload() {
        let decoder = ReportDecoder::default();
        assert!(matches!(
            decoder.decode(b"{\"print\": "),
            Err(DecodeError::Malformed { .. })
        ));
        assert!(matches!(
            decoder.decode(b"[1, 2, 3]"),
            Err(DecodeError::NotAnObject)
        ));
    }
}
