use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    domain::models::{Coordinates, NewReport},
    services::errors::ServiceError,
};

#[derive(Debug, Validate)]
struct ReportFields {
    #[validate(
        custom = "not_blank",
        length(max = 2000, message = "description must be at most 2000 characters")
    )]
    description: String,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("blank");
        error.message = Some("description must not be empty".into());
        return Err(error);
    }
    Ok(())
}

/// Checks a new report before it reaches the store.
pub fn validate_new_report(report: &NewReport) -> Result<(), ServiceError> {
    ReportFields {
        description: report.description.clone(),
    }
    .validate()
    .map_err(|errors| ServiceError::Validation(flatten(&errors)))?;

    if let Some(point) = report.location.coordinates {
        validate_coordinates(&point)?;
    }
    Ok(())
}

pub fn validate_coordinates(point: &Coordinates) -> Result<(), ServiceError> {
    if !(-180.0..=180.0).contains(&point.longitude) {
        return Err(ServiceError::Validation(format!(
            "longitude {} is outside [-180, 180]",
            point.longitude
        )));
    }
    if !(-90.0..=90.0).contains(&point.latitude) {
        return Err(ServiceError::Validation(format!(
            "latitude {} is outside [-90, 90]",
            point.latitude
        )));
    }
    Ok(())
}

fn flatten(errors: &ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |err| match &err.message {
                Some(message) => message.to_string(),
                None => format!("{field} is invalid ({})", err.code),
            })
        })
        .collect();
    messages.sort();
    messages.join("; ")
}
