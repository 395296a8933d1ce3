use crate::date::date_filter;
use crate::error::QueryError;
use crate::parameters::ObservationSearchParam;
use clinobs_storage::DocumentFilter;

/// A translated Observation search.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationQuery {
    pub filter: DocumentFilter,
    /// Whether any search parameter was given; selects the Bundle type.
    pub searched: bool,
}

impl ObservationQuery {
    pub fn unfiltered() -> Self {
        Self {
            filter: DocumentFilter::All,
            searched: false,
        }
    }
}

/// Translate raw query pairs into a store filter.
///
/// Every key must be recognized before anything is translated, so a single
/// unknown key rejects the whole request. Parameters combine with AND.
pub fn translate(params: &[(String, String)]) -> Result<ObservationQuery, QueryError> {
    let mut recognized = Vec::with_capacity(params.len());
    for (name, value) in params {
        let param = ObservationSearchParam::parse(name)
            .ok_or_else(|| QueryError::UnknownParameter(name.clone()))?;
        recognized.push((param, value.as_str()));
    }

    if recognized.is_empty() {
        return Ok(ObservationQuery::unfiltered());
    }

    let dates = recognized
        .iter()
        .filter(|(p, _)| *p == ObservationSearchParam::Date)
        .count();
    if dates > 1 {
        return Err(QueryError::DuplicateParameter(
            ObservationSearchParam::Date.to_string(),
        ));
    }

    let filters = recognized
        .into_iter()
        .map(|(param, value)| translate_one(param, value))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ObservationQuery {
        filter: DocumentFilter::and(filters),
        searched: true,
    })
}

fn translate_one(param: ObservationSearchParam, value: &str) -> Result<DocumentFilter, QueryError> {
    match param {
        ObservationSearchParam::Patient => {
            let id = non_empty(param, value)?;
            Ok(DocumentFilter::eq("subject.reference", format!("Patient/{id}")))
        }
        ObservationSearchParam::Code => {
            let codes: Vec<String> = value
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(String::from)
                .collect();
            if codes.is_empty() {
                return Err(QueryError::invalid_value(param.as_str(), "expected at least one code"));
            }
            Ok(DocumentFilter::any_of("code.coding.code", codes))
        }
        ObservationSearchParam::Category => {
            let code = non_empty(param, value)?;
            Ok(DocumentFilter::eq("category.coding.code", code))
        }
        ObservationSearchParam::Date => date_filter(value),
    }
}

fn non_empty(param: ObservationSearchParam, value: &str) -> Result<&str, QueryError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(QueryError::invalid_value(param.as_str(), "value must not be empty"));
    }
    Ok(trimmed)
}
