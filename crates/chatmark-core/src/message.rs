//! Message records exchanged with the external message store.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ParseError;

/// Opaque identifier assigned by the external store on first persist.
///
/// Serialized as the store's `_id` field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Provenance/role tag of a message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    #[default]
    Left,
    Right,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            other => Err(ParseError::UnknownSide(other.to_string())),
        }
    }
}

/// Correctness annotation on a message.
///
/// The store distinguishes three shapes on the wire: `null` (never
/// annotatable, the default for right-side messages), `""` (annotatable but
/// unset) and an integer score. Scores are not clamped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Correctness {
    #[default]
    Absent,
    Unset,
    Score(i64),
}

impl Correctness {
    /// Default shape for a freshly composed message on `side`.
    pub fn initial_for(side: Side) -> Self {
        match side {
            Side::Left => Self::Unset,
            Side::Right => Self::Absent,
        }
    }
}

impl fmt::Display for Correctness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => f.write_str("-"),
            Self::Unset => f.write_str("unset"),
            Self::Score(n) => write!(f, "{n}%"),
        }
    }
}

impl Serialize for Correctness {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Absent => serializer.serialize_none(),
            Self::Unset => serializer.serialize_str(""),
            Self::Score(n) => serializer.serialize_i64(*n),
        }
    }
}

impl<'de> Deserialize<'de> for Correctness {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Score(i64),
            Text(String),
        }

        Ok(match Option::<Wire>::deserialize(deserializer)? {
            None => Self::Absent,
            Some(Wire::Score(n)) => Self::Score(n),
            Some(Wire::Text(s)) => parse_correctness(&s),
        })
    }
}

/// Parse user input into a correctness value.
///
/// Reads an optional sign followed by the leading run of ASCII digits, after
/// leading whitespace; anything after the digits is ignored (`"42abc"` is 42).
/// Input with no leading digits becomes [`Correctness::Unset`], never zero.
pub fn parse_correctness(raw: &str) -> Correctness {
    let s = raw.trim_start();
    let (sign, rest) = match s.as_bytes().first() {
        Some(b'-') => ("-", &s[1..]),
        Some(b'+') => ("", &s[1..]),
        _ => ("", s),
    };
    let digit_end = rest
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(rest.len());
    if digit_end == 0 {
        return Correctness::Unset;
    }

    format!("{sign}{}", &rest[..digit_end])
        .parse::<i64>()
        .map(Correctness::Score)
        .unwrap_or(Correctness::Unset)
}

/// A message record as held locally and returned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// `None` until the store has confirmed the record.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<MessageId>,
    pub text: String,
    pub side: Side,
    #[serde(default)]
    pub correctness: Correctness,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Message {
    /// Local-only record for an approved assistant answer.
    pub fn answer(text: impl Into<String>) -> Self {
        Self {
            id: None,
            text: text.into(),
            side: Side::Right,
            correctness: Correctness::Absent,
            title: None,
        }
    }

    pub fn is_pinned(&self) -> bool {
        self.correctness == Correctness::Score(crate::pins::PIN_THRESHOLD)
    }

    /// Only left-side messages carry a correctness score.
    pub fn is_scorable(&self) -> bool {
        self.side == Side::Left
    }

    /// A title may be given once, to a pinned message.
    pub fn is_titleable(&self) -> bool {
        self.is_pinned() && self.title.as_deref().is_none_or(str::is_empty)
    }

    /// Title when one is set, otherwise the message text.
    pub fn label(&self) -> &str {
        match self.title.as_deref() {
            Some(title) if !title.is_empty() => title,
            _ => &self.text,
        }
    }
}

/// Body of a create request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    pub text: String,
    pub side: Side,
    pub correctness: Correctness,
}

impl NewMessage {
    /// Draft record for text composed on `side`.
    pub fn draft(text: impl Into<String>, side: Side) -> Self {
        Self {
            text: text.into(),
            side,
            correctness: Correctness::initial_for(side),
        }
    }
}

/// Partial update body. Fields left as `None` are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correctness: Option<Correctness>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl MessagePatch {
    pub fn correctness(value: Correctness) -> Self {
        Self {
            correctness: Some(value),
            ..Self::default()
        }
    }

    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plain_integer() {
        assert_eq!(parse_correctness("100"), Correctness::Score(100));
        assert_eq!(parse_correctness("0"), Correctness::Score(0));
        assert_eq!(parse_correctness("  7"), Correctness::Score(7));
    }

    #[test]
    fn parse_keeps_leading_digits_only() {
        assert_eq!(parse_correctness("42abc"), Correctness::Score(42));
        assert_eq!(parse_correctness("99.9"), Correctness::Score(99));
        assert_eq!(parse_correctness("-5"), Correctness::Score(-5));
    }

    #[test]
    fn parse_rejects_to_unset_not_zero() {
        assert_eq!(parse_correctness(""), Correctness::Unset);
        assert_eq!(parse_correctness("abc"), Correctness::Unset);
        assert_eq!(parse_correctness("-"), Correctness::Unset);
        assert_eq!(parse_correctness("x100"), Correctness::Unset);
    }

    #[test]
    fn out_of_range_scores_are_not_clamped() {
        assert_eq!(parse_correctness("101"), Correctness::Score(101));
        assert_eq!(parse_correctness("250"), Correctness::Score(250));
    }

    #[test]
    fn message_from_store_json() {
        let json = r#"{
            "_id": "65a1f0",
            "text": "What is the boiling point?",
            "side": "left",
            "correctness": 100,
            "title": "Boiling",
            "__v": 0
        }"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.id, Some(MessageId::from("65a1f0")));
        assert_eq!(msg.side, Side::Left);
        assert_eq!(msg.correctness, Correctness::Score(100));
        assert!(msg.is_pinned());
        assert_eq!(msg.label(), "Boiling");
    }

    #[test]
    fn correctness_wire_shapes() {
        let unset: Message =
            serde_json::from_str(r#"{"_id":"a","text":"t","side":"left","correctness":""}"#)
                .unwrap();
        assert_eq!(unset.correctness, Correctness::Unset);

        let absent: Message =
            serde_json::from_str(r#"{"_id":"b","text":"t","side":"right","correctness":null}"#)
                .unwrap();
        assert_eq!(absent.correctness, Correctness::Absent);

        let missing: Message =
            serde_json::from_str(r#"{"_id":"c","text":"t","side":"right"}"#).unwrap();
        assert_eq!(missing.correctness, Correctness::Absent);
        assert!(missing.title.is_none());
    }

    #[test]
    fn draft_body_shapes_follow_side() {
        let left = serde_json::to_value(NewMessage::draft("hi", Side::Left)).unwrap();
        assert_eq!(
            left,
            serde_json::json!({"text": "hi", "side": "left", "correctness": ""})
        );

        let right = serde_json::to_value(NewMessage::draft("hi", Side::Right)).unwrap();
        assert_eq!(
            right,
            serde_json::json!({"text": "hi", "side": "right", "correctness": null})
        );
    }

    #[test]
    fn patch_omits_unset_fields() {
        let patch = serde_json::to_value(MessagePatch::correctness(Correctness::Score(80))).unwrap();
        assert_eq!(patch, serde_json::json!({"correctness": 80}));

        let patch = serde_json::to_value(MessagePatch::title("Pinned")).unwrap();
        assert_eq!(patch, serde_json::json!({"title": "Pinned"}));
    }

    #[test]
    fn label_falls_back_to_text_for_empty_title() {
        let mut msg = Message::answer("an answer");
        msg.title = Some(String::new());
        assert_eq!(msg.label(), "an answer");
    }

    #[test]
    fn only_left_messages_are_scorable() {
        let mut msg = Message::answer("reply");
        assert!(!msg.is_scorable());
        msg.side = Side::Left;
        assert!(msg.is_scorable());
    }

    #[test]
    fn title_offered_once_on_pinned_messages() {
        let mut msg = Message::answer("fact");
        msg.side = Side::Left;
        msg.correctness = Correctness::Score(50);
        assert!(!msg.is_titleable());

        msg.correctness = Correctness::Score(100);
        assert!(msg.is_titleable());
        msg.title = Some(String::new());
        assert!(msg.is_titleable());

        msg.title = Some("Boiling".into());
        assert!(!msg.is_titleable());
    }

    #[test]
    fn side_parsing() {
        assert_eq!("Right".parse::<Side>().unwrap(), Side::Right);
        assert_eq!(Side::Left.toggled(), Side::Right);
        assert!("up".parse::<Side>().is_err());
    }
}
