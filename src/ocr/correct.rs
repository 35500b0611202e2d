/// OCR character repair for MRZ text.
///
/// OCR engines confuse visually similar glyphs. The MRZ layout is positional,
/// so each span of the line is known to be numeric or alphabetic and the
/// confusion can be resolved from position alone.

/// What character class a TD3 span is allowed to contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Digits only (dates, check digits).
    Numeric,
    /// Letters and fillers only (names, country codes).
    Alpha,
}

fn to_digit(c: char) -> char {
    match c {
        'O' => '0',
        'I' => '1',
        'Z' => '2',
        'S' => '5',
        'G' => '6',
        'B' => '8',
        other => other,
    }
}

fn to_letter(c: char) -> char {
    match c {
        '0' => 'O',
        '1' => 'I',
        '5' => 'S',
        '8' => 'B',
        other => other,
    }
}

/// Apply glyph-confusion substitutions appropriate for the field class.
pub fn correct_field(text: &str, kind: FieldKind) -> String {
    text.chars()
        .map(|c| match kind {
            FieldKind::Numeric => to_digit(c),
            FieldKind::Alpha => to_letter(c),
        })
        .collect()
}

/// Normalize a raw OCR line into the MRZ alphabet: uppercase, spaces become
/// fillers, anything outside `A-Z0-9<` is dropped. A doubled `K` before a
/// filler is a common misread of `K<<` and is repaired.
pub fn normalize_line(raw: &str) -> String {
    let upper = raw.to_uppercase().replace(' ', "<");
    let kept: String = upper
        .chars()
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || *c == '<')
        .collect();
    kept.replace("KK<", "K<<")
}

/// Repair the positionally numeric spans of a TD3 second line: both date
/// fields, their check digits, the final check and composite digits.
pub fn repair_line2(line: &str) -> String {
    let mut chars: Vec<char> = line.chars().collect();
    for (i, c) in chars.iter_mut().enumerate() {
        let numeric = (13..20).contains(&i) || (21..28).contains(&i) || i == 9 || i >= 42;
        if numeric {
            *c = to_digit(*c);
        } else if (10..13).contains(&i) {
            *c = to_letter(*c);
        }
    }
    chars.into_iter().collect()
}

/// Repair the first line: everything after the document type prefix is
/// alphabetic (issuing country and names).
pub fn repair_line1(line: &str) -> String {
    line.chars()
        .enumerate()
        .map(|(i, c)| if i >= 2 { to_letter(c) } else { c })
        .collect()
}
