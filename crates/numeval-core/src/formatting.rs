//! Answer formatting policy.
//!
//! Turns a computed value into the canonical answer string a test suite
//! expects. Two variants exist because suites were written against two
//! different rule sets:
//!
//! | Variant | Separators | Whole values | Non-whole     | Percentages | Averages |
//! |---------|------------|--------------|---------------|-------------|----------|
//! | A       | `1,000`    | `1,000`      | `1,000.125`   | always `.2` | as plain |
//! | B       | none       | `1000`       | `1000.13`     | as plain    | always `.2` |
//!
//! Variant A keeps non-percentage values at the precision they were given in
//! and only groups thousands. Wherever a variant rounds, it rounds half away
//! from zero at two decimal places.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which rule set to render answers with.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FormattingVariant {
    #[default]
    A,
    B,
}

impl std::fmt::Display for FormattingVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormattingVariant::A => write!(f, "a"),
            FormattingVariant::B => write!(f, "b"),
        }
    }
}

impl FromStr for FormattingVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a" => Ok(FormattingVariant::A),
            "b" => Ok(FormattingVariant::B),
            other => Err(format!("unknown formatting variant '{other}' (expected a or b)")),
        }
    }
}

/// What kind of quantity a function produces, as far as formatting cares.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResultKind {
    pub percentage: bool,
    pub average: bool,
}

impl ResultKind {
    pub fn plain() -> Self {
        Self::default()
    }

    pub fn percentage() -> Self {
        Self {
            percentage: true,
            average: false,
        }
    }

    pub fn average() -> Self {
        Self {
            percentage: false,
            average: true,
        }
    }

    /// Classify a function description by its wording.
    pub fn classify(function: &str) -> Self {
        let lower = function.to_lowercase();
        let mut kind = Self::plain();
        if lower.contains('%') {
            kind.percentage = true;
        }
        for word in lower.split(|c: char| !c.is_alphanumeric()) {
            match word {
                "percent" | "percentage" | "percentages" | "pct" => kind.percentage = true,
                "average" | "averages" | "averaged" | "avg" | "mean" => kind.average = true,
                _ => {}
            }
        }
        kind
    }
}

/// The formatting configuration handed to the computation agent.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FormattingPolicy {
    pub variant: FormattingVariant,
}

impl FormattingPolicy {
    pub fn new(variant: FormattingVariant) -> Self {
        Self { variant }
    }

    /// Render a value in canonical form.
    ///
    /// Unrounded Variant A values use the shortest representation of `value`.
    pub fn render(&self, value: f64, kind: ResultKind) -> String {
        self.render_with(value, kind, None)
    }

    fn render_with(&self, value: f64, kind: ResultKind, decimals: Option<usize>) -> String {
        if self.variant == FormattingVariant::A && !kind.percentage {
            let value = if value == 0.0 { 0.0 } else { value };
            let plain = match decimals {
                Some(places) => format!("{value:.places$}"),
                None => format!("{value}"),
            };
            return group_thousands(&plain);
        }

        let mut rounded = round2(value);
        if rounded == 0.0 {
            // Collapse -0.0.
            rounded = 0.0;
        }

        let two_decimals = match self.variant {
            FormattingVariant::A => kind.percentage || !is_whole(rounded),
            FormattingVariant::B => kind.average || !is_whole(rounded),
        };

        let plain = if two_decimals {
            format!("{rounded:.2}")
        } else {
            format!("{:.0}", rounded.round())
        };

        match self.variant {
            FormattingVariant::A => group_thousands(&plain),
            FormattingVariant::B => plain,
        }
    }

    /// Parse an answer string and re-render it canonically.
    ///
    /// Returns `None` when the answer is not numeric.
    pub fn normalize(&self, answer: &str, kind: ResultKind) -> Option<String> {
        parse_number(answer).map(|v| self.render_with(v, kind, written_decimals(answer)))
    }

    /// Whether `answer` is already in canonical form.
    pub fn conforms(&self, answer: &str, kind: ResultKind) -> bool {
        self.normalize(answer, kind).as_deref() == Some(answer)
    }

    /// Formatting rules in the words given to the computation agent.
    pub fn instructions(&self) -> &'static str {
        match self.variant {
            FormattingVariant::A => {
                "Return only the numeric value. Include commas for thousands \
                 (e.g., 1,000,000). Round to 2 decimal places for percentages \
                 and do not append a % sign."
            }
            FormattingVariant::B => {
                "Return only the numeric value. Do not use thousands separators. \
                 Whole numbers have no decimal places. Round all other numbers \
                 to 2 decimal places. Averages always keep 2 decimal places, \
                 even when the result is a whole number."
            }
        }
    }
}

/// Parse a human-formatted number.
///
/// Accepts thousands separators, a leading `$`, a trailing `%`, and
/// surrounding whitespace. Rejects anything non-finite.
pub fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    let trimmed = trimmed.strip_suffix('%').unwrap_or(trimmed).trim_end();
    let (negative, body) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let body = body.strip_prefix('$').unwrap_or(body);
    let cleaned: String = body.chars().filter(|c| *c != ',').collect();

    let well_formed = cleaned.starts_with(|c: char| c.is_ascii_digit() || c == '.')
        && cleaned
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'));
    if !well_formed {
        return None;
    }

    let value: f64 = cleaned.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(if negative { -value } else { value })
}

/// Digits after the decimal point as written; `None` for exponent notation.
fn written_decimals(answer: &str) -> Option<usize> {
    let trimmed = answer.trim();
    if trimmed.contains(['e', 'E']) {
        return None;
    }
    Some(match trimmed.split_once('.') {
        Some((_, frac)) => frac.chars().filter(char::is_ascii_digit).count(),
        None => 0,
    })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn is_whole(value: f64) -> bool {
    (value - value.round()).abs() < 1e-9
}

fn group_thousands(plain: &str) -> String {
    let (sign, unsigned) = match plain.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", plain),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}
