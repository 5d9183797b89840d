//! Property-based testing generators.
//!
//! Proptest strategies for dimensions, values and editing keystrokes.

use crate::dimension::Dimension;
use crate::value::Value;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use proptest::prelude::*;

/// Random dimension value.
pub fn value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::Bool),
        (-1000i64..1000).prop_map(Value::Int),
        "[a-zA-Z ]{0,12}".prop_map(Value::Str),
        "[A-Z][a-z]{1,8}".prop_map(Value::Ident),
    ]
}

/// Cardinalities for between 1 and `max_dims` dimensions.
pub fn cardinalities(max_dims: usize, max_values: usize) -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(1..=max_values.max(1), 1..=max_dims.max(1))
}

/// Dimensions `D0..Dn` with random values.
pub fn dimensions(max_dims: usize, max_values: usize) -> impl Strategy<Value = Vec<Dimension>> {
    prop::collection::vec(
        prop::collection::vec(value(), 1..=max_values.max(1)),
        1..=max_dims.max(1),
    )
    .prop_filter_map("dimension construction failed", |all| {
        all.into_iter()
            .enumerate()
            .map(|(i, values)| Dimension::new(format!("D{}", i), values).ok())
            .collect()
    })
}

/// Text made of characters a text box can hold on one line.
pub fn single_line_text(max_len: usize) -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(printable_chars()), 0..=max_len)
        .prop_map(|chars| chars.into_iter().collect())
}

/// A valid `(start, length)` selection within text of `text_len` characters.
pub fn selection(text_len: usize) -> impl Strategy<Value = (usize, usize)> {
    (0..=text_len).prop_flat_map(move |start| (Just(start), 0..=text_len - start))
}

/// Random editing keystroke: a typed character, Backspace or Delete (Ctrl
/// for whole words), or a navigation key with any of Shift and Ctrl.
///
/// Typed characters never carry modifiers, so no shortcut fires.
pub fn edit_key() -> impl Strategy<Value = KeyEvent> {
    let typed = prop::sample::select(printable_chars())
        .prop_map(|c| KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
    let deletion = (
        prop::sample::select(vec![KeyCode::Backspace, KeyCode::Delete]),
        any::<bool>(),
    )
        .prop_map(|(code, word)| {
            let modifiers = if word { KeyModifiers::CONTROL } else { KeyModifiers::NONE };
            KeyEvent::new(code, modifiers)
        });
    let navigation = (
        prop::sample::select(vec![
            KeyCode::Left,
            KeyCode::Right,
            KeyCode::Home,
            KeyCode::End,
            KeyCode::Up,
            KeyCode::Down,
        ]),
        prop::sample::select(vec![
            KeyModifiers::NONE,
            KeyModifiers::SHIFT,
            KeyModifiers::CONTROL,
            KeyModifiers::CONTROL | KeyModifiers::SHIFT,
        ]),
    )
        .prop_map(|(code, modifiers)| KeyEvent::new(code, modifiers));

    prop_oneof![3 => typed, 1 => deletion, 2 => navigation]
}

/// Random editing keystroke sequence.
pub fn edit_sequence(
    len: impl Into<prop::collection::SizeRange>,
) -> impl Strategy<Value = Vec<KeyEvent>> {
    prop::collection::vec(edit_key(), len)
}

fn printable_chars() -> Vec<char> {
    ('a'..='z')
        .chain('A'..='Z')
        .chain('0'..='9')
        .chain([' ', '.', ',', '!', '?', '-', '_'])
        .collect()
}
