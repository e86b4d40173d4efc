use std::time::Instant;

use crate::content::normalize::normalize;
use crate::content::{Scheme, TargetUnit};
use crate::session::progress::{Phase, ProgressState};

/// What the head of the buffer did to the current unit. Byte counts are
/// how much of the buffer the unit consumed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum UnitOutcome {
    Matched(usize),
    Missed(usize),
    NeedMore,
}

pub fn is_ideograph(c: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&c)
}

/// Single state transition of a typing session.
///
/// `raw` is the whole content of the input field, not a delta. While the IME
/// is composing only the buffer is recorded. With `continuous` off at most
/// one unit advances per call.
pub fn process_input(
    progress: &ProgressState,
    raw: &str,
    composing: bool,
    units: &[TargetUnit],
    scheme: Scheme,
    continuous: bool,
) -> ProgressState {
    let mut next = progress.clone();
    if next.phase != Phase::Active {
        return next;
    }
    if composing {
        next.residual_input = raw.to_string();
        return next;
    }

    let mut rest = raw;
    let mut advanced = true;
    while advanced && next.current_index < units.len() {
        advanced = false;
        match match_unit(rest, &units[next.current_index], scheme) {
            UnitOutcome::Matched(consumed) => {
                rest = &rest[consumed..];
                next.current_index += 1;
                advanced = true;
            }
            UnitOutcome::Missed(consumed) => {
                rest = &rest[consumed..];
                next.error_positions.insert(next.current_index);
                next.current_index += 1;
                advanced = true;
            }
            UnitOutcome::NeedMore => {}
        }

        if advanced && !continuous {
            break;
        }
    }

    if next.current_index >= units.len() {
        next.phase = Phase::Finished;
        next.finished_at = Some(Instant::now());
        next.residual_input.clear();
    } else {
        next.residual_input = rest.to_string();
    }
    next
}

fn match_unit(buffer: &str, unit: &TargetUnit, scheme: Scheme) -> UnitOutcome {
    let Some(first) = buffer.chars().next() else {
        return UnitOutcome::NeedMore;
    };

    // A committed IME candidate. A wrong homophone still moves on, it is
    // already gone from the input field.
    if is_ideograph(first) {
        let consumed = first.len_utf8();
        return if first == unit.glyph {
            UnitOutcome::Matched(consumed)
        } else {
            UnitOutcome::Missed(consumed)
        };
    }

    let target = normalize(unit.code(scheme));
    let letters: String = buffer
        .chars()
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_lowercase())
        .collect();

    if !target.is_empty() && letters.starts_with(&target) {
        return UnitOutcome::Matched(letters_prefix_len(buffer, target.len()));
    }

    // Space confirms whatever was typed for this unit.
    match buffer.find(' ') {
        Some(pos) => UnitOutcome::Missed(pos + 1),
        None => UnitOutcome::NeedMore,
    }
}

/// Byte length of the shortest prefix of `buffer` holding `count` ASCII
/// letters.
fn letters_prefix_len(buffer: &str, count: usize) -> usize {
    let mut seen = 0;
    for (i, c) in buffer.char_indices() {
        if c.is_ascii_alphabetic() {
            seen += 1;
            if seen == count {
                return i + c.len_utf8();
            }
        }
    }
    buffer.len()
}
