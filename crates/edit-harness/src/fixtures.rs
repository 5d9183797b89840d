//! Deterministic sample content for editing tests.

use crate::dimension::Dimension;
use crate::value::Value;
use crate::TestResult;

/// A named sample string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleText {
    pub name: &'static str,
    pub value: &'static str,
}

impl SampleText {
    pub fn is_multiline(&self) -> bool {
        self.value.contains('\n')
    }

    /// Length in characters.
    pub fn char_len(&self) -> usize {
        self.value.chars().count()
    }
}

const SAMPLES: &[SampleText] = &[
    SampleText {
        name: "empty",
        value: "",
    },
    SampleText {
        name: "latin",
        value: "Hello world",
    },
    SampleText {
        name: "wrapping-line",
        value: "Sample phrase that is long enough to wrap inside a narrow text box",
    },
    SampleText {
        name: "multi-line",
        value: "first line\nsecond line\nthird",
    },
    SampleText {
        name: "surrogate-pair",
        value: "a\u{1D11E}b",
    },
    SampleText {
        name: "combining",
        value: "e\u{0301}te\u{0301}",
    },
    SampleText {
        name: "mixed-scripts",
        value: "abc \u{05D0}\u{05D1}\u{05D2} \u{0628}\u{062A} xyz",
    },
    SampleText {
        name: "tabs",
        value: "col1\tcol2\tcol3",
    },
];

/// Collection of deterministic test fixtures.
pub struct Fixtures;

impl Fixtures {
    /// All sample strings.
    pub fn sample_texts() -> &'static [SampleText] {
        SAMPLES
    }

    /// Sample string by name.
    pub fn text(name: &str) -> Option<&'static str> {
        SAMPLES.iter().find(|s| s.name == name).map(|s| s.value)
    }

    /// Single-line samples only.
    pub fn single_line_texts() -> Vec<&'static str> {
        SAMPLES
            .iter()
            .filter(|s| !s.is_multiline())
            .map(|s| s.value)
            .collect()
    }

    /// Dimension named `name` over the given samples.
    pub fn text_dimension(name: &str, samples: &[&str]) -> TestResult<Dimension> {
        let values: TestResult<Vec<Value>> = samples
            .iter()
            .map(|s| {
                Self::text(s).map(Value::from).ok_or_else(|| {
                    crate::TestError::InvalidArgument(format!("Unknown sample text {}", s))
                })
            })
            .collect();
        Dimension::new(name, values?)
    }

    /// Caret placements used by selection-sensitive cases.
    pub fn selection_states() -> Vec<Value> {
        ["start", "middle", "end", "selectall"]
            .into_iter()
            .map(Value::ident)
            .collect()
    }

    /// Text of exactly `len` characters cycling through the alphabet.
    pub fn text_of_len(len: usize) -> String {
        (b'a'..=b'z').cycle().take(len).map(char::from).collect()
    }

    /// Long multi-paragraph text.
    pub fn long_text() -> String {
        r#"Lorem ipsum dolor sit amet, consectetur adipiscing elit.
Sed do eiusmod tempor incididunt ut labore et dolore magna aliqua.
Ut enim ad minim veniam, quis nostrud exercitation ullamco laboris.

Curabitur pretium tincidunt lacus. Nulla gravida orci a odio.
Nullam varius, turpis et commodo pharetra, est eros bibendum elit."#
            .to_string()
    }
}
