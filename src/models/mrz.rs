use serde::Serialize;

/// Per-field check digit results. Each flag is true when the embedded check
/// digit matches the ICAO 7-3-1 weighted value recomputed from the field.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CheckDigitReport {
    pub document_number: bool,
    pub birth_date: bool,
    pub expiry_date: bool,
    pub personal_number: bool,
    pub composite: bool,
}

impl CheckDigitReport {
    pub fn all_valid(&self) -> bool {
        self.document_number
            && self.birth_date
            && self.expiry_date
            && self.personal_number
            && self.composite
    }
}

/// Structured identity data parsed from a TD3 MRZ line pair.
///
/// Fields keep their parsed values even when the matching check digit fails;
/// the caller can see both the value and whether it is trustworthy.
#[derive(Debug, Clone, Serialize)]
pub struct MrzRecord {
    pub document_type: String,
    pub issuing_country: String,
    pub surname: String,
    pub given_names: String,
    pub document_number: String,
    pub nationality: String,
    /// Raw YYMMDD text from the MRZ.
    pub birth_date: String,
    pub sex: String,
    /// Raw YYMMDD text from the MRZ.
    pub expiry_date: String,
    pub personal_number: Option<String>,
    pub checks: CheckDigitReport,
    pub birth_date_valid: bool,
    pub expiry_date_valid: bool,
    /// Which OCR engine produced the text this record was parsed from.
    pub source_engine: String,
    pub raw_lines: [String; 2],
    /// True iff every check digit matches and both dates are real calendar
    /// dates. Expiration policy is not part of this flag.
    pub is_valid: bool,
}

/// Terminal outcome of the MRZ extraction cascade. `NotFound` is an expected
/// result, distinct from an OCR failure error: it means no MRZ-shaped text
/// was present on any page.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MrzOutcome {
    Found(MrzRecord),
    NotFound,
}

impl MrzOutcome {
    pub fn record(&self) -> Option<&MrzRecord> {
        match self {
            MrzOutcome::Found(record) => Some(record),
            MrzOutcome::NotFound => None,
        }
    }
}
