use std::fmt::{Display, Formatter};
use std::str::FromStr;

use itertools::Itertools;
use thiserror::Error;

/// Severity of a scan finding, ordered from most to least severe.
///
/// The set is closed: every finding reported by a scanning backend maps to
/// exactly one member, unknown backend values end up as [`Severity::Undefined`].
#[derive(PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord, Debug)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Informational,
    Undefined,
}

impl Severity {
    pub const fn all() -> [Severity; 6] {
        [
            Severity::Critical,
            Severity::High,
            Severity::Medium,
            Severity::Low,
            Severity::Informational,
            Severity::Undefined,
        ]
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
            Severity::Informational => "Informational",
            Severity::Undefined => "Undefined",
        }
    }

    pub fn all_as_string() -> String {
        Self::all().iter().join(", ")
    }

    /// Checks that every candidate names a severity level, case-exactly.
    ///
    /// Fails on the first candidate that does not match.
    pub fn validate<I, S>(candidates: I) -> Result<(), InvalidSeverityError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        candidates
            .into_iter()
            .try_for_each(|candidate| candidate.as_ref().parse::<Severity>().map(|_| ()))
    }
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = InvalidSeverityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Severity::all()
            .into_iter()
            .find(|severity| severity.as_str() == s)
            .ok_or_else(|| InvalidSeverityError {
                value: s.to_string(),
                valid_set: Severity::all().to_vec(),
            })
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "{value} is not a valid finding severity level. Valid levels are: {}",
    .valid_set.iter().join(", ")
)]
pub struct InvalidSeverityError {
    pub value: String,
    pub valid_set: Vec<Severity>,
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{InvalidSeverityError, Severity};

    #[test]
    fn it_lists_the_severities_from_most_to_least_severe() {
        assert_eq!(
            Severity::all_as_string(),
            "Critical, High, Medium, Low, Informational, Undefined"
        );
        assert!(Severity::all().is_sorted());
    }

    #[rstest]
    #[case("Critical", Severity::Critical)]
    #[case("High", Severity::High)]
    #[case("Medium", Severity::Medium)]
    #[case("Low", Severity::Low)]
    #[case("Informational", Severity::Informational)]
    #[case("Undefined", Severity::Undefined)]
    fn it_parses_every_level_by_its_name(#[case] name: &str, #[case] expected: Severity) {
        assert_eq!(name.parse::<Severity>().unwrap(), expected);
        assert_eq!(expected.to_string(), name);
    }

    #[rstest]
    #[case("critical")]
    #[case("CRITICAL")]
    #[case(" High")]
    #[case("")]
    fn it_rejects_names_that_do_not_match_exactly(#[case] name: &str) {
        assert!(name.parse::<Severity>().is_err());
    }

    #[test]
    fn it_accepts_an_empty_list_of_candidates() {
        assert!(Severity::validate(Vec::<String>::new()).is_ok());
    }

    #[test]
    fn it_fails_on_the_first_invalid_candidate_listing_the_valid_levels() {
        let error = Severity::validate("Critical Bogus Nope".split_whitespace()).unwrap_err();

        assert_eq!(
            error,
            InvalidSeverityError {
                value: "Bogus".to_string(),
                valid_set: Severity::all().to_vec(),
            }
        );
        assert_eq!(
            error.to_string(),
            "Bogus is not a valid finding severity level. Valid levels are: Critical, High, Medium, Low, Informational, Undefined"
        );
    }
}
