use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

/// Optional classification tag attached to a whole dataset, expressed as a
/// (category, value) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Labeling {
    /// Name of the labeling category
    pub labeling_name: String,
    /// Name of the label within that category
    pub label_name: String,
}

impl Labeling {
    /// Parse a dataset label of the form `labelingName_labelName`.
    ///
    /// The label is split on its first underscore; everything after it
    /// becomes the label name, so `sensorset_room_a` yields
    /// (`sensorset`, `room_a`).
    pub fn parse(label: &str) -> Result<Self> {
        match label.split_once('_') {
            Some((labeling_name, label_name))
                if !labeling_name.is_empty() && !label_name.is_empty() =>
            {
                Ok(Self {
                    labeling_name: labeling_name.to_string(),
                    label_name: label_name.to_string(),
                })
            }
            _ => Err(ClientError::Config(format!(
                "dataset label '{}' must contain an underscore-separated pair",
                label
            ))),
        }
    }
}

/// One series' buffered points as sent on the wire: an ordered sequence of
/// `[timestamp, value]` pairs plus running timestamp bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesBatch {
    /// Name of the series
    pub name: String,
    /// Buffered points in insertion order
    pub data: Vec<(f64, f64)>,
    /// Minimum timestamp among the buffered points
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<f64>,
    /// Maximum timestamp among the buffered points
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<f64>,
}

/// Round a measurement to two decimal places, half away from zero.
pub fn round_value(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_labeling_pair() {
        let labeling = Labeling::parse("sensorset_roomA").unwrap();
        assert_eq!(labeling.labeling_name, "sensorset");
        assert_eq!(labeling.label_name, "roomA");
    }

    #[test]
    fn parse_labeling_splits_on_first_underscore() {
        let labeling = Labeling::parse("sensorset_room_a").unwrap();
        assert_eq!(labeling.labeling_name, "sensorset");
        assert_eq!(labeling.label_name, "room_a");
    }

    #[test]
    fn parse_labeling_rejects_missing_underscore() {
        assert!(matches!(
            Labeling::parse("sensorset"),
            Err(ClientError::Config(_))
        ));
    }

    #[test]
    fn parse_labeling_rejects_empty_halves() {
        assert!(Labeling::parse("_roomA").is_err());
        assert!(Labeling::parse("sensorset_").is_err());
    }

    #[test]
    fn labeling_serializes_camel_case() {
        let labeling = Labeling::parse("sensorset_roomA").unwrap();
        let json = serde_json::to_value(&labeling).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"labelingName": "sensorset", "labelName": "roomA"})
        );
    }

    #[test]
    fn round_value_two_decimals() {
        assert_eq!(round_value(21.255), 21.26);
        assert_eq!(round_value(3.14159), 3.14);
        assert_eq!(round_value(21.2549), 21.25);
        assert_eq!(round_value(12.0), 12.0);
    }

    #[test]
    fn round_value_half_away_from_zero() {
        assert_eq!(round_value(0.005), 0.01);
        assert_eq!(round_value(-0.005), -0.01);
        assert_eq!(round_value(-1.115), -1.12);
    }

    #[test]
    fn series_batch_wire_shape() {
        let batch = SeriesBatch {
            name: "temp".to_string(),
            data: vec![(10.0, 21.26), (20.0, 21.5)],
            start: Some(10.0),
            end: Some(20.0),
        };
        let json = serde_json::to_value(&batch).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "temp",
                "data": [[10.0, 21.26], [20.0, 21.5]],
                "start": 10.0,
                "end": 20.0,
            })
        );
    }

    #[test]
    fn series_batch_omits_absent_bounds() {
        let batch = SeriesBatch {
            name: "temp".to_string(),
            data: vec![],
            start: None,
            end: None,
        };
        let json = serde_json::to_value(&batch).unwrap();
        assert_eq!(json, serde_json::json!({"name": "temp", "data": []}));
    }
}
