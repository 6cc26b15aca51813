use snafu::prelude::*;

use crate::errors::{CustomResult, ValidationSnafu};

pub struct Helpers {}

impl Helpers {
    /// # parse an optional circuit filter
    /// circuit filters arrive as loosely typed text from outside. a
    /// value that does not parse as an integer means the filter is
    /// ignored, not that the call fails.
    ///
    /// ## Arguments
    /// * `raw` - the raw filter value, if one was passed at all
    ///
    /// ## Returns
    /// * `Option<i32>` - the circuit id to filter on, or `None`
    pub fn parse_circuit_filter(raw: Option<&str>) -> Option<i32> {
        raw?.trim().parse::<i32>().ok()
    }

    /// # parse the comparison id list
    /// the id list of a driver comparison is required input: every
    /// element must parse and at most 4 drivers can be compared, so
    /// unlike the circuit filter this fails loudly.
    ///
    /// ## Arguments
    /// * `raw` - the comma separated id list
    ///
    /// ## Returns
    /// * `Vec<i32>` - the parsed driver ids
    pub fn parse_id_list(raw: &str) -> CustomResult<Vec<i32>> {
        ensure!(
            !raw.trim().is_empty(),
            ValidationSnafu { message: "Missing 'ids' parameter".to_string() }
        );

        let mut ids = Vec::new();
        for part in raw.split(',') {
            let id = part.trim().parse::<i32>().map_err(|_| {
                ValidationSnafu { message: format!("Invalid driver id: {}", part.trim()) }.build()
            })?;
            ids.push(id);
        }

        ensure!(
            ids.len() <= 4,
            ValidationSnafu { message: "Maximum 4 drivers allowed".to_string() }
        );

        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::Helpers;
    use crate::errors::Error;

    #[test]
    fn circuit_filter_parses_integers() {
        assert_eq!(Helpers::parse_circuit_filter(Some("3")), Some(3));
        assert_eq!(Helpers::parse_circuit_filter(Some(" 12 ")), Some(12));
    }

    #[test]
    fn invalid_circuit_filter_is_silently_ignored() {
        assert_eq!(Helpers::parse_circuit_filter(Some("indoor")), None);
        assert_eq!(Helpers::parse_circuit_filter(Some("")), None);
        assert_eq!(Helpers::parse_circuit_filter(None), None);
    }

    #[test]
    fn id_list_parses_up_to_four() {
        assert_eq!(Helpers::parse_id_list("1,2, 3 ,4").unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(Helpers::parse_id_list("7").unwrap(), vec![7]);
    }

    #[test]
    fn id_list_rejects_more_than_four() {
        let err = Helpers::parse_id_list("1,2,3,4,5").unwrap_err();
        assert!(matches!(err, Error::ValidationError { .. }));
    }

    #[test]
    fn id_list_rejects_unparseable_entries() {
        let err = Helpers::parse_id_list("1,two,3").unwrap_err();
        assert!(matches!(err, Error::ValidationError { .. }));
    }

    #[test]
    fn id_list_rejects_missing_input() {
        let err = Helpers::parse_id_list("  ").unwrap_err();
        assert!(matches!(err, Error::ValidationError { .. }));
    }
}
