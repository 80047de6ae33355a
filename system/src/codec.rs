use crate::error::{Result, SystemError};
use crate::message::WireMessage;
use serde_json::Value;

/// Encodes a message as one JSON line terminated by `\n`.
pub fn encode(message: &WireMessage) -> Vec<u8> {
    // Every field is a plain integer, string or bool, so serialization
    // cannot fail.
    let mut bytes = serde_json::to_vec(message).unwrap_or_default();
    bytes.push(b'\n');
    bytes
}

pub fn decode(bytes: &[u8]) -> Result<WireMessage> {
    let bytes = trim_line_ending(bytes);

    let value: Value = serde_json::from_slice(bytes)
        .map_err(|err| SystemError::ProtocolViolation(format!("not a JSON message: {}", err)))?;
    let tag = value
        .as_object()
        .and_then(|object| object.get("type"))
        .and_then(Value::as_str)
        .ok_or_else(|| SystemError::ProtocolViolation("message without a type tag".into()))?;
    if !WireMessage::TAGS.contains(&tag) {
        return Err(SystemError::ProtocolViolation(format!(
            "unknown message type {:?}",
            tag
        )));
    }

    let message: WireMessage = serde_json::from_value(value)
        .map_err(|err| SystemError::MalformedEvent(err.to_string()))?;
    if let WireMessage::Draw(segment) = &message {
        segment
            .brush
            .validate()
            .map_err(SystemError::MalformedEvent)?;
    }
    Ok(message)
}

fn trim_line_ending(mut bytes: &[u8]) -> &[u8] {
    while let Some((last, rest)) = bytes.split_last() {
        if *last == b'\n' || *last == b'\r' {
            bytes = rest;
        } else {
            break;
        }
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::*;

    fn segment(brush: BrushSettings) -> StrokeSegment {
        StrokeSegment::new(
            Point::new(10, 10),
            Point::new(20, 20),
            Color(0x00336699),
            brush,
        )
    }

    #[test]
    fn it_should_round_trip_draw_messages() {
        let brushes = vec![
            BrushSettings::default(),
            BrushSettings::spray(),
            BrushSettings {
                mode: BrushMode::Line,
                width: 256,
                opacity: 0,
                dashed: true,
                cap_style: CapStyle::Square,
                spray_diameter: 512,
                spray_density: 10_000,
            },
        ];
        for brush in brushes {
            let message = WireMessage::Draw(segment(brush));
            assert_eq!(decode(&encode(&message)).expect(""), message);
        }

        let negative = WireMessage::Draw(StrokeSegment::new(
            Point::new(-5, i32::MAX),
            Point::new(i32::MIN, 0),
            Color(0xFFFF_FFFF),
            BrushSettings::default(),
        ));
        assert_eq!(decode(&encode(&negative)).expect(""), negative);
    }

    #[test]
    fn it_should_frame_messages_as_single_lines() {
        let bytes = encode(&WireMessage::Draw(segment(BrushSettings::default())));
        assert_eq!(bytes.last(), Some(&b'\n'));
        assert_eq!(bytes.iter().filter(|b| **b == b'\n').count(), 1);
    }

    #[test]
    fn it_should_encode_save_as_bare_tag() {
        assert_eq!(encode(&WireMessage::Save), b"{\"type\":\"save\"}\n".to_vec());
        assert_eq!(decode(b"{\"type\":\"save\"}\r\n").expect(""), WireMessage::Save);
    }

    #[test]
    fn it_should_use_documented_field_names() {
        let value: Value =
            serde_json::from_slice(&encode(&WireMessage::Draw(segment(BrushSettings::default()))))
                .expect("");
        assert_eq!(value["type"], "draw");
        assert_eq!(value["from"]["x"], 10);
        assert_eq!(value["to"]["y"], 20);
        assert_eq!(value["color"], 0x00336699);
        assert_eq!(value["brush"]["mode"], "line");
        assert_eq!(value["brush"]["capStyle"], "round");
        assert_eq!(value["brush"]["sprayDiameter"], 10);
        assert_eq!(value["brush"]["sprayDensity"], 100);
    }

    #[test]
    fn it_should_default_optional_brush_fields() {
        let json = br#"{"type":"draw","from":{"x":10,"y":10},"to":{"x":20,"y":20},"color":0,"brush":{"mode":"line","width":5,"opacity":100,"capStyle":"round"}}"#;
        match decode(json).expect("") {
            WireMessage::Draw(segment) => {
                assert_eq!(segment.brush, BrushSettings::default());
                assert_eq!(segment.color, Color::BLACK);
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn it_should_reject_out_of_range_opacity() {
        let json = br#"{"type":"draw","from":{"x":0,"y":0},"to":{"x":1,"y":1},"color":0,"brush":{"mode":"line","width":5,"opacity":101,"capStyle":"round"}}"#;
        assert!(matches!(decode(json), Err(SystemError::MalformedEvent(_))));
    }

    #[test]
    fn it_should_reject_missing_fields() {
        let json = br#"{"type":"draw","from":{"x":0,"y":0},"color":0,"brush":{"mode":"line","width":5,"opacity":10,"capStyle":"round"}}"#;
        assert!(matches!(decode(json), Err(SystemError::MalformedEvent(_))));

        let json = br#"{"type":"draw","from":{"x":0,"y":0},"to":{"x":1,"y":1},"color":0,"brush":{"mode":"line","opacity":10,"capStyle":"round"}}"#;
        assert!(matches!(decode(json), Err(SystemError::MalformedEvent(_))));
    }

    #[test]
    fn it_should_reject_zero_width() {
        let mut brush = BrushSettings::default();
        brush.width = 0;
        let bytes = encode(&WireMessage::Draw(segment(brush)));
        assert!(matches!(decode(&bytes), Err(SystemError::MalformedEvent(_))));
    }

    #[test]
    fn it_should_treat_unknown_types_as_protocol_violations() {
        assert!(matches!(
            decode(br#"{"type":"erase"}"#),
            Err(SystemError::ProtocolViolation(_))
        ));
        assert!(matches!(
            decode(br#"{"from":{"x":0,"y":0}}"#),
            Err(SystemError::ProtocolViolation(_))
        ));
        assert!(matches!(
            decode(b"not json"),
            Err(SystemError::ProtocolViolation(_))
        ));
    }
}
