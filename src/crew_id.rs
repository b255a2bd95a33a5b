/// Division codes seen on crew rosters, longest first so "MAS" is tried
/// before "MS". Keep that order when adding codes.
pub const DIVISION_CODES: &[&str] = &[
    "ALLP", "MAS", "TBM", "MDU", "TEN", "CBE", "TPJ", "KMU", "PGT", "SRR", "OTP", "TVC", "QLN",
    "AVD", "AJJ", "KPD", "MS", "DG", "SA", "ED", "TJ",
];

pub const UNKNOWN_DIVISION: &str = "UNKNOWN";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Prefix found in `DIVISION_CODES`.
    Known,
    /// Generic 2-4 letters followed by digits.
    Pattern,
    /// Nothing matched; the whole input is kept as the serial.
    Unrecognized,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCrewId {
    pub division_code: String,
    pub crew_serial: String,
    pub kind: MatchKind,
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn split_generic(s: &str) -> Option<(&str, &str)> {
    let letters = s.bytes().take_while(|b| b.is_ascii_uppercase()).count();
    if !(2..=4).contains(&letters) {
        return None;
    }
    let (code, rest) = s.split_at(letters);
    if all_digits(rest) {
        Some((code, rest))
    } else {
        None
    }
}

/// Splits a combined station+serial identifier such as `MAS1456`.
///
/// Never fails: input that matches neither a known code nor the generic
/// letters-then-digits shape comes back under `UNKNOWN_DIVISION` with the
/// trimmed, uppercased input as its serial.
pub fn parse(raw: &str) -> ParsedCrewId {
    let trimmed = raw.trim().to_uppercase();

    for &code in DIVISION_CODES {
        if let Some(rest) = trimmed.strip_prefix(code) {
            if all_digits(rest) {
                return ParsedCrewId {
                    division_code: code.to_string(),
                    crew_serial: rest.to_string(),
                    kind: MatchKind::Known,
                };
            }
        }
    }

    if let Some((code, serial)) = split_generic(&trimmed) {
        return ParsedCrewId {
            division_code: code.to_string(),
            crew_serial: serial.to_string(),
            kind: MatchKind::Pattern,
        };
    }

    ParsedCrewId {
        division_code: UNKNOWN_DIVISION.to_string(),
        crew_serial: trimmed,
        kind: MatchKind::Unrecognized,
    }
}

pub fn is_valid_division_code(code: &str) -> bool {
    let up = code.trim().to_uppercase();
    up == UNKNOWN_DIVISION || DIVISION_CODES.contains(&up.as_str())
}
