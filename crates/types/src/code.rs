/// Errors that can occur when parsing a certificate code.
#[derive(Debug, thiserror::Error)]
pub enum CodeError {
    /// The code did not match the `NNNN-YYYY` shape
    #[error("invalid certificate code: {0:?}")]
    Malformed(String),
}

/// A certificate-of-analysis code in the canonical `NNNN-YYYY` form.
///
/// The sequence part is a zero-padded four-digit number that increases
/// monotonically within a year; the year part identifies the issuing year.
/// `0000-...` is rejected: sequences start at `0001`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CertificateCode {
    sequence: u32,
    year: i32,
}

impl CertificateCode {
    /// Parses a code from its canonical text form.
    ///
    /// # Errors
    ///
    /// Returns `CodeError::Malformed` unless the input is exactly four digits,
    /// a dash, and four digits, with a non-zero sequence.
    pub fn parse(input: &str) -> Result<Self, CodeError> {
        let malformed = || CodeError::Malformed(input.to_owned());

        let (seq, year) = input.split_once('-').ok_or_else(malformed)?;
        if seq.len() != 4 || year.len() != 4 {
            return Err(malformed());
        }
        if !seq.bytes().all(|b| b.is_ascii_digit()) || !year.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }

        let sequence: u32 = seq.parse().map_err(|_| malformed())?;
        let year: i32 = year.parse().map_err(|_| malformed())?;
        if sequence == 0 {
            return Err(malformed());
        }

        Ok(Self { sequence, year })
    }

    /// Builds a code from its parts.
    pub fn new(sequence: u32, year: i32) -> Self {
        Self { sequence, year }
    }

    /// First code of the given year, `0001-<year>`.
    pub fn first_of_year(year: i32) -> Self {
        Self { sequence: 1, year }
    }

    /// The code that follows this one within the same year.
    pub fn successor(&self) -> Self {
        Self {
            sequence: self.sequence + 1,
            year: self.year,
        }
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    pub fn year(&self) -> i32 {
        self.year
    }
}

impl std::fmt::Display for CertificateCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{}", self.sequence, self.year)
    }
}

impl std::str::FromStr for CertificateCode {
    type Err = CodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl serde::Serialize for CertificateCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for CertificateCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        CertificateCode::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonical() {
        let code = CertificateCode::parse("0007-2025").unwrap();
        assert_eq!(code.sequence(), 7);
        assert_eq!(code.year(), 2025);
        assert_eq!(code.to_string(), "0007-2025");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["", "7-2025", "00072025", "abcd-2025", "0007-25", "0000-2025", "0007-2025-1"] {
            assert!(CertificateCode::parse(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_successor_stays_in_year() {
        let next = CertificateCode::parse("0099-2024").unwrap().successor();
        assert_eq!(next.to_string(), "0100-2024");
    }

    #[test]
    fn test_display_pads_sequence() {
        assert_eq!(CertificateCode::first_of_year(2026).to_string(), "0001-2026");
    }
}
