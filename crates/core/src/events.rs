// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! NDJSON-serialisable output records, one per line on standard output.
//! Diagnostic logging never uses these types; see the dispatcher's logging
//! module for the stderr-only diagnostic channel.

use serde::Serialize;
use serde_json::Value;

/// One speaker known to the emitter, identified by the stream-qualified id
/// `"{stream}:{speaker}"`.
#[derive(Debug, Clone, Serialize)]
pub struct SpeakerInfo {
    pub speaker_id: String,
    pub name: String,
}

/// A self-contained output record. Serialises with an internal `type` tag
/// matching the record kinds in the protocol table.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputEvent {
    Status {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        meta: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        stream: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        duration: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        finalize: Option<bool>,
        #[serde(skip_serializing_if = "Option::is_none")]
        turns: Option<usize>,
    },
    Meter {
        stream: String,
        t: f64,
        rms: f64,
    },
    Speakers {
        known: Vec<SpeakerInfo>,
    },
    Segment {
        speaker: String,
        speaker_id: String,
        stream: String,
        t0: f64,
        t1: f64,
        text: String,
    },
    Partial {
        speaker_id: String,
        stream: String,
        t0: f64,
        text: String,
    },
    Screenshot {
        #[serde(flatten)]
        payload: Value,
    },
    Error {
        message: String,
    },
}

impl OutputEvent {
    #[must_use]
    pub fn status(message: impl Into<String>) -> Self {
        Self::Status { message: message.into(), meta: None, stream: None, duration: None, finalize: None, turns: None }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error { message: message.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_event_serialises_with_type_tag() {
        let event = OutputEvent::status("listening");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "status");
        assert_eq!(json["message"], "listening");
        assert!(json.get("meta").is_none());
    }

    #[test]
    fn segment_event_carries_all_fields() {
        let event = OutputEvent::Segment {
            speaker: "spk0".into(),
            speaker_id: "system:spk0".into(),
            stream: "system".into(),
            t0: 1.0,
            t1: 2.5,
            text: "hello".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "segment");
        assert_eq!(json["speaker_id"], "system:spk0");
    }
}
