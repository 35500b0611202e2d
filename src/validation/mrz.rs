use chrono::NaiveDate;
use log::debug;

use crate::models::{CheckDigitReport, MrzRecord};

const TD3_LINE_LEN: usize = 44;

/// ICAO character value: digits map to themselves, letters to 10-35, the
/// filler `<` to 0. Any other character also counts as 0 so a corrupt line
/// degrades to failed check digits instead of a parse error.
pub fn char_value(c: char) -> u32 {
    match c {
        '0'..='9' => c as u32 - '0' as u32,
        'A'..='Z' => c as u32 - 'A' as u32 + 10,
        _ => 0,
    }
}

/// 7-3-1 weighted check digit over a field.
pub fn check_digit(field: &str) -> u32 {
    const WEIGHTS: [u32; 3] = [7, 3, 1];
    field
        .chars()
        .enumerate()
        .map(|(i, c)| char_value(c) * WEIGHTS[i % 3])
        .sum::<u32>()
        % 10
}

fn digit_matches(field: &str, digit_char: char) -> bool {
    // An empty optional field may carry `<` as its check digit, valued 0.
    let expected = match digit_char {
        '0'..='9' => digit_char as u32 - '0' as u32,
        '<' => 0,
        _ => return false,
    };
    check_digit(field) == expected
}

/// Parse a YYMMDD date using the ICAO century window: two-digit years up to
/// 50 resolve to 20xx, the rest to 19xx. `None` when the text is not a real
/// calendar date.
pub fn parse_yymmdd(raw: &str) -> Option<NaiveDate> {
    if raw.len() != 6 || !raw.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let yy: i32 = raw[0..2].parse().ok()?;
    let month: u32 = raw[2..4].parse().ok()?;
    let day: u32 = raw[4..6].parse().ok()?;
    let year = if yy <= 50 { 2000 + yy } else { 1900 + yy };
    NaiveDate::from_ymd_opt(year, month, day)
}

// The parsed lines are byte-sliced by column, so every kept character must
// be single-byte. Non-ASCII characters become fillers and show up as failed
// check digits rather than a panic.
fn pad_line(line: &str) -> String {
    let mut padded: String = line
        .chars()
        .map(|c| if c.is_ascii() { c } else { '<' })
        .take(TD3_LINE_LEN)
        .collect();
    while padded.len() < TD3_LINE_LEN {
        padded.push('<');
    }
    padded
}

fn strip_fillers(field: &str) -> String {
    field.trim_matches('<').replace('<', " ")
}

/// Parse a TD3 (passport) MRZ line pair into a structured record.
///
/// Parsing never fails: malformed fields keep their raw text and surface as
/// failed check digits or invalid dates, so the caller always gets a record
/// to inspect.
pub fn parse_td3(line1: &str, line2: &str, source_engine: &str) -> MrzRecord {
    let line1 = pad_line(line1);
    let line2 = pad_line(line2);

    let document_type = strip_fillers(&line1[0..2]);
    let issuing_country = strip_fillers(&line1[2..5]);

    let name_field = &line1[5..44];
    let (surname, given_names) = match name_field.find("<<") {
        Some(split) => (
            strip_fillers(&name_field[..split]),
            strip_fillers(&name_field[split + 2..]),
        ),
        None => (strip_fillers(name_field), String::new()),
    };

    let document_number_raw = &line2[0..9];
    let document_number_check = line2.chars().nth(9).unwrap_or('<');
    let nationality = strip_fillers(&line2[10..13]);
    let birth_date = line2[13..19].to_string();
    let birth_check = line2.chars().nth(19).unwrap_or('<');
    let sex = line2[20..21].to_string();
    let expiry_date = line2[21..27].to_string();
    let expiry_check = line2.chars().nth(27).unwrap_or('<');
    let personal_raw = &line2[28..42];
    let personal_check = line2.chars().nth(42).unwrap_or('<');
    let composite_char = line2.chars().nth(43).unwrap_or('<');

    let composite_field: String = format!("{}{}{}", &line2[0..10], &line2[13..20], &line2[21..43]);

    let checks = CheckDigitReport {
        document_number: digit_matches(document_number_raw, document_number_check),
        birth_date: digit_matches(&birth_date, birth_check),
        expiry_date: digit_matches(&expiry_date, expiry_check),
        personal_number: digit_matches(personal_raw, personal_check),
        composite: digit_matches(&composite_field, composite_char),
    };

    let birth_date_valid = parse_yymmdd(&birth_date).is_some();
    let expiry_date_valid = parse_yymmdd(&expiry_date).is_some();
    let is_valid = checks.all_valid() && birth_date_valid && expiry_date_valid;

    let personal_trimmed = personal_raw.trim_end_matches('<');
    let personal_number = if personal_trimmed.is_empty() {
        None
    } else {
        Some(personal_trimmed.to_string())
    };

    debug!(
        "parsed MRZ record from {}: checks valid={}, dates valid={}/{}",
        source_engine,
        checks.all_valid(),
        birth_date_valid,
        expiry_date_valid
    );

    MrzRecord {
        document_type,
        issuing_country,
        surname,
        given_names,
        document_number: document_number_raw.trim_end_matches('<').to_string(),
        nationality,
        birth_date,
        sex,
        expiry_date,
        personal_number,
        checks,
        birth_date_valid,
        expiry_date_valid,
        source_engine: source_engine.to_string(),
        raw_lines: [line1, line2],
        is_valid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE1: &str = "P<UTOERIKSSON<<ANNA<MARIA<<<<<<<<<<<<<<<<<<<";
    const LINE2: &str = "L898902C36UTO7408122F1204159ZE184226B<<<<<10";

    #[test]
    fn character_values_follow_icao_mapping() {
        assert_eq!(char_value('0'), 0);
        assert_eq!(char_value('9'), 9);
        assert_eq!(char_value('A'), 10);
        assert_eq!(char_value('Z'), 35);
        assert_eq!(char_value('<'), 0);
    }

    #[test]
    fn specimen_document_number_digit() {
        assert_eq!(check_digit("L898902C3"), 6);
    }

    #[test]
    fn specimen_record_is_fully_valid() {
        let record = parse_td3(LINE1, LINE2, "primary");
        assert!(record.is_valid);
        assert!(record.checks.all_valid());
        assert_eq!(record.document_type, "P");
        assert_eq!(record.issuing_country, "UTO");
        assert_eq!(record.surname, "ERIKSSON");
        assert_eq!(record.given_names, "ANNA MARIA");
        assert_eq!(record.document_number, "L898902C3");
        assert_eq!(record.nationality, "UTO");
        assert_eq!(record.birth_date, "740812");
        assert_eq!(record.sex, "F");
        assert_eq!(record.expiry_date, "120415");
        assert_eq!(record.personal_number.as_deref(), Some("ZE184226B"));
        assert_eq!(record.source_engine, "primary");
    }

    #[test]
    fn corrupt_composite_digit_fails_only_composite() {
        let mut line2 = LINE2.to_string();
        line2.replace_range(43..44, "7");
        let record = parse_td3(LINE1, &line2, "primary");
        assert!(!record.is_valid);
        assert!(!record.checks.composite);
        assert!(record.checks.document_number);
        assert!(record.checks.birth_date);
        assert!(record.checks.expiry_date);
        assert!(record.checks.personal_number);
    }

    #[test]
    fn corrupt_birth_digit_fails_birth_and_composite() {
        let mut line2 = LINE2.to_string();
        line2.replace_range(13..14, "8");
        let record = parse_td3(LINE1, &line2, "primary");
        assert!(!record.checks.birth_date);
        assert!(!record.checks.composite);
        assert!(record.checks.document_number);
    }

    #[test]
    fn impossible_calendar_date_is_flagged() {
        assert!(parse_yymmdd("990230").is_none());
        assert!(parse_yymmdd("741301").is_none());
        assert!(parse_yymmdd("740812").is_some());
    }

    #[test]
    fn century_window_splits_at_fifty() {
        assert_eq!(
            parse_yymmdd("250101"),
            NaiveDate::from_ymd_opt(2025, 1, 1)
        );
        assert_eq!(
            parse_yymmdd("740812"),
            NaiveDate::from_ymd_opt(1974, 8, 12)
        );
    }

    #[test]
    fn non_ascii_input_degrades_to_failed_checks() {
        let line1 = "P<UTOERIKSSÖN<<ÅNNA<MARIA<<<<<<<<<<<<<<<<<<<";
        let line2 = "L898902C36UTO74Ø8122F1204159ZE184226B<<<<<10";
        let record = parse_td3(line1, line2, "primary");
        assert!(!record.is_valid);
        assert!(record.raw_lines.iter().all(|l| l.is_ascii()));
        assert_eq!(record.raw_lines[1].len(), 44);
    }

    #[test]
    fn short_lines_are_padded_not_rejected() {
        let record = parse_td3("P<UTO", "L898902C36UTO", "fallback");
        assert!(!record.is_valid);
        assert_eq!(record.raw_lines[0].len(), 44);
        assert_eq!(record.raw_lines[1].len(), 44);
    }
}
