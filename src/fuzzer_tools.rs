//! Random documents and operations for the law tests.

use rand::prelude::*;

use crate::attributes::Attrs;
use crate::operation::TextOperation;

const UCHARS: [char; 12] = [
    'a', 'b', 'c', '1', '2', ' ', '\n', // ASCII
    '©', '¥', // Latin-1 supplement
    'Δ', '↯', '𐆘', // and some wider codepoints to shake out byte/char confusion
];

pub(crate) fn random_str(len: usize, rng: &mut SmallRng) -> String {
    let mut str = String::new();
    for _ in 0..len {
        str.push(UCHARS[rng.gen_range(0..UCHARS.len())]);
    }
    str
}

fn random_attrs(rng: &mut SmallRng) -> Option<Attrs> {
    if rng.gen_bool(0.85) {
        return None;
    }
    let mut attrs = Attrs::new();
    if rng.gen_bool(0.5) {
        attrs.insert("bold".into(), "true".into());
    }
    if rng.gen_bool(0.5) {
        attrs.insert("color".into(), if rng.gen_bool(0.5) { "red" } else { "blue" }.into());
    }
    if attrs.is_empty() { None } else { Some(attrs) }
}

/// Build a random operation applicable to `doc`, occasionally attributed.
pub(crate) fn random_operation(doc: &str, rng: &mut SmallRng) -> TextOperation {
    let mut op = TextOperation::new();
    let mut remaining = doc.chars().count();
    while remaining > 0 {
        let chunk = rng.gen_range(1..=remaining.min(5));
        match rng.gen_range(0..10) {
            0..=4 => {
                op.retain_with(chunk, random_attrs(rng));
            }
            5..=7 => {
                op.delete(chunk);
            }
            _ => {
                let text = random_str(rng.gen_range(1..4), rng);
                op.insert_with(&text, random_attrs(rng));
                continue; // inserts don't consume the document
            }
        }
        remaining -= chunk;
    }
    if rng.gen_bool(0.3) {
        let text = random_str(rng.gen_range(1..4), rng);
        op.insert_with(&text, random_attrs(rng));
    }
    op
}
