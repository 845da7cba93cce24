//! The JSON wire format for operations.
//!
//! An operation serializes to a flat array: a positive integer retains, a negative
//! integer deletes, a string inserts. Components carrying attributes become small
//! objects instead: `{"r": n, "attrs": {...}}` or `{"i": "text", "attrs": {...}}`.
//! The unset sentinel serializes as `false`. Deserializing feeds everything back
//! through the normalizing builders, so `from_json(to_json(op)) == op` holds even
//! for sloppily split input.

use std::fmt;

use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smartstring::alias::String as SmartString;

use crate::attributes::{opt_attrs, AttrValue, Attrs};
use crate::cursor::Cursor;
use crate::error::OtError;
use crate::operation::{OpComponent, TextOperation};

impl TextOperation {
    /// Decode an operation from its wire form. Anything malformed — bad JSON, a
    /// zero-length component, an unknown field — fails with
    /// [`OtError::InvalidOperation`]. This is the entry point coordinator
    /// adapters should use for incoming operations.
    pub fn from_json(json: &str) -> Result<TextOperation, OtError> {
        serde_json::from_str(json).map_err(|_| OtError::InvalidOperation)
    }
}

impl Cursor {
    /// Decode a cursor from its wire form, failing with
    /// [`OtError::InvalidOperation`] on malformed input.
    pub fn from_json(json: &str) -> Result<Cursor, OtError> {
        serde_json::from_str(json).map_err(|_| OtError::InvalidOperation)
    }
}

impl Serialize for AttrValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AttrValue::Str(s) => serializer.serialize_str(s),
            AttrValue::Unset => serializer.serialize_bool(false),
        }
    }
}

impl<'de> Deserialize<'de> for AttrValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AttrValueVisitor;

        impl Visitor<'_> for AttrValueVisitor {
            type Value = AttrValue;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a string, or false for the unset sentinel")
            }

            fn visit_str<E: de::Error>(self, s: &str) -> Result<AttrValue, E> {
                Ok(AttrValue::Str(s.into()))
            }

            fn visit_bool<E: de::Error>(self, b: bool) -> Result<AttrValue, E> {
                if b {
                    Err(de::Error::invalid_value(de::Unexpected::Bool(true), &self))
                } else {
                    Ok(AttrValue::Unset)
                }
            }
        }

        deserializer.deserialize_any(AttrValueVisitor)
    }
}

impl Serialize for OpComponent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            OpComponent::Retain(n, None) => serializer.serialize_u64(*n as u64),
            OpComponent::Delete(n) => serializer.serialize_i64(-(*n as i64)),
            OpComponent::Insert(s, None) => serializer.serialize_str(s),
            OpComponent::Retain(n, Some(attrs)) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("r", n)?;
                map.serialize_entry("attrs", attrs)?;
                map.end()
            }
            OpComponent::Insert(s, Some(attrs)) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("i", s.as_str())?;
                map.serialize_entry("attrs", attrs)?;
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for OpComponent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ComponentVisitor;

        impl<'de> Visitor<'de> for ComponentVisitor {
            type Value = OpComponent;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an integer, a string, or an attributed component object")
            }

            fn visit_u64<E: de::Error>(self, n: u64) -> Result<OpComponent, E> {
                if n == 0 {
                    return Err(de::Error::invalid_value(de::Unexpected::Unsigned(0), &self));
                }
                Ok(OpComponent::Retain(n as usize, None))
            }

            fn visit_i64<E: de::Error>(self, n: i64) -> Result<OpComponent, E> {
                if n > 0 {
                    Ok(OpComponent::Retain(n as usize, None))
                } else if n < 0 {
                    Ok(OpComponent::Delete(n.unsigned_abs() as usize))
                } else {
                    Err(de::Error::invalid_value(de::Unexpected::Signed(0), &self))
                }
            }

            fn visit_str<E: de::Error>(self, s: &str) -> Result<OpComponent, E> {
                if s.is_empty() {
                    return Err(de::Error::invalid_value(de::Unexpected::Str(s), &self));
                }
                Ok(OpComponent::Insert(s.into(), None))
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<OpComponent, A::Error> {
                let mut retain: Option<u64> = None;
                let mut insert: Option<SmartString> = None;
                let mut attrs: Option<Attrs> = None;
                while let Some(key) = map.next_key::<SmartString>()? {
                    match key.as_str() {
                        "r" => {
                            if retain.is_some() {
                                return Err(de::Error::duplicate_field("r"));
                            }
                            retain = Some(map.next_value()?);
                        }
                        "i" => {
                            if insert.is_some() {
                                return Err(de::Error::duplicate_field("i"));
                            }
                            insert = Some(map.next_value()?);
                        }
                        "attrs" => {
                            if attrs.is_some() {
                                return Err(de::Error::duplicate_field("attrs"));
                            }
                            attrs = Some(map.next_value()?);
                        }
                        other => {
                            return Err(de::Error::unknown_field(other, &["r", "i", "attrs"]));
                        }
                    }
                }
                let attrs = attrs.and_then(opt_attrs);
                match (retain, insert) {
                    (Some(n), None) if n > 0 => Ok(OpComponent::Retain(n as usize, attrs)),
                    (None, Some(s)) if !s.is_empty() => Ok(OpComponent::Insert(s, attrs)),
                    _ => Err(de::Error::custom(
                        "component object needs exactly one of a nonzero \"r\" or a nonempty \"i\"",
                    )),
                }
            }
        }

        deserializer.deserialize_any(ComponentVisitor)
    }
}

impl Serialize for TextOperation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.components().len()))?;
        for c in self.components() {
            seq.serialize_element(c)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for TextOperation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OperationVisitor;

        impl<'de> Visitor<'de> for OperationVisitor {
            type Value = TextOperation;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an array of operation components")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<TextOperation, A::Error> {
                let mut op = TextOperation::new();
                while let Some(component) = seq.next_element::<OpComponent>()? {
                    op.add(component);
                }
                Ok(op)
            }
        }

        deserializer.deserialize_seq(OperationVisitor)
    }
}

#[cfg(test)]
mod test {
    use rand::prelude::*;
    use serde_json::json;

    use crate::attributes::{AttrValue, Attrs};
    use crate::cursor::Cursor;
    use crate::error::OtError;
    use crate::fuzzer_tools::{random_operation, random_str};
    use crate::operation::TextOperation;

    #[test]
    fn parses_the_compact_array_form() {
        let op = TextOperation::from_json(r#"[1,-1,"abc"]"#).unwrap();
        let mut expected = TextOperation::new();
        expected.retain(1).delete(1).insert("abc");
        assert_eq!(op, expected);
    }

    #[test]
    fn serializes_plain_components_compactly() {
        let mut op = TextOperation::new();
        op.retain(2).insert("hi").delete(3);
        assert_eq!(serde_json::to_value(&op).unwrap(), json!([2, "hi", -3]));
    }

    #[test]
    fn attributed_components_round_trip() {
        let bold: Attrs = [("bold".into(), "true".into())].into_iter().collect();
        let mut op = TextOperation::new();
        op.retain_with(2, Some(bold.clone())).insert_with("x", Some(bold)).retain(1);

        let value = serde_json::to_value(&op).unwrap();
        assert_eq!(
            value,
            json!([
                {"r": 2, "attrs": {"bold": "true"}},
                {"i": "x", "attrs": {"bold": "true"}},
                1
            ])
        );
        let back: TextOperation = serde_json::from_value(value).unwrap();
        assert_eq!(back, op);
    }

    #[test]
    fn unset_serializes_as_false() {
        let unset: Attrs = [("bold".into(), AttrValue::Unset)].into_iter().collect();
        let mut op = TextOperation::new();
        op.retain_with(1, Some(unset));
        let value = serde_json::to_value(&op).unwrap();
        assert_eq!(value, json!([{"r": 1, "attrs": {"bold": false}}]));
        let back: TextOperation = serde_json::from_value(value).unwrap();
        assert_eq!(back, op);
    }

    #[test]
    fn normalizes_sloppily_split_input() {
        let op: TextOperation = serde_json::from_str(r#"[1,1,"ab","cd",-1,-2]"#).unwrap();
        let mut expected = TextOperation::new();
        expected.retain(2).insert("abcd").delete(3);
        assert_eq!(op, expected);
    }

    #[test]
    fn random_operations_round_trip() {
        let mut rng = SmallRng::seed_from_u64(42);
        for _ in 0..300 {
            let doc = random_str(25, &mut rng);
            let op = random_operation(&doc, &mut rng);
            let encoded = serde_json::to_string(&op).unwrap();
            let back: TextOperation = serde_json::from_str(&encoded).unwrap();
            assert_eq!(back, op, "mangled by round trip: {encoded}");
        }
    }

    #[test]
    fn cursor_wire_shape() {
        let cursor = Cursor::new(1, 5);
        assert_eq!(
            serde_json::to_value(cursor).unwrap(),
            json!({"position": 1, "selectionEnd": 5})
        );
        assert_eq!(Cursor::from_json(r#"{"position":1,"selectionEnd":5}"#), Ok(cursor));
        assert_eq!(Cursor::from_json("{}"), Err(OtError::InvalidOperation));
    }

    #[test]
    fn rejects_malformed_components() {
        for bad in [
            "[0]",
            r#"[""]"#,
            "[1.5]",
            r#"[{"x": 1}]"#,
            r#"[{"r": 1, "i": "a"}]"#,
            r#"[{"r": 0}]"#,
            r#"[{"r": 1, "attrs": {"b": true}}]"#,
            "not json at all",
        ] {
            assert_eq!(
                TextOperation::from_json(bad),
                Err(OtError::InvalidOperation),
                "accepted malformed input: {bad}"
            );
        }
    }
}
