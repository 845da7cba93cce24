//! Attribute maps carried opaquely on retain and insert components.
//!
//! The library doesn't interpret attributes; it only merges them correctly under
//! compose and transform so concurrent attribute edits converge the same way
//! concurrent text edits do.

use std::collections::BTreeMap;

use smartstring::alias::String as SmartString;

/// An attribute value: a concrete string, or the sentinel marking the key as unset.
///
/// Unset only matters inside operations (a retain that clears a key); a document
/// position never holds an unset value.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum AttrValue {
    Str(SmartString),
    Unset,
}

impl AttrValue {
    pub fn is_unset(&self) -> bool {
        matches!(self, AttrValue::Unset)
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Str(s.into())
    }
}

/// Map from attribute key to value. BTreeMap so equality is order-insensitive.
pub type Attrs = BTreeMap<SmartString, AttrValue>;

/// Empty maps are represented as None everywhere, so equality checks stay cheap.
pub(crate) fn opt_attrs(attrs: Attrs) -> Option<Attrs> {
    if attrs.is_empty() { None } else { Some(attrs) }
}

/// Merge the attributes of two sequential components targeting the same span.
/// The second component's values win. When the first component is an insert there
/// is nothing underneath to restore, so an unset in the second simply erases the key.
pub(crate) fn compose_attrs(
    first: Option<&Attrs>,
    second: Option<&Attrs>,
    first_is_insert: bool,
) -> Option<Attrs> {
    let mut merged = first.cloned().unwrap_or_default();
    if let Some(second) = second {
        for (key, value) in second {
            if first_is_insert && value.is_unset() {
                merged.remove(key);
            } else {
                merged.insert(key.clone(), value.clone());
            }
        }
    }
    opt_attrs(merged)
}

/// Resolve concurrent attribute edits over the same retained span.
///
/// `theirs` wins on conflicting keys: our transformed component drops any key they
/// also touched, theirs keeps everything. Both sides of a client pair must designate
/// the same operation as `theirs` or the documents will diverge.
pub(crate) fn transform_attrs(
    ours: Option<&Attrs>,
    theirs: Option<&Attrs>,
) -> (Option<Attrs>, Option<Attrs>) {
    let ours_prime = match (ours, theirs) {
        (Some(ours), Some(theirs)) => {
            let kept: Attrs = ours
                .iter()
                .filter(|(key, _)| !theirs.contains_key(key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            opt_attrs(kept)
        }
        (ours, _) => ours.cloned(),
    };
    (ours_prime, theirs.cloned())
}
