use std::sync::LazyLock;

use regex::Regex;

use super::ServiceError;
use crate::models::{
    referrals::{NewReferral, ReferralSubmission},
    referrers::NewReferrer,
};

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\S+@\S+\.\S+").expect("email pattern is valid"));

pub const INVALID_EMAIL: &str = "Invalid email format";
pub const STATUS_REQUIRED: &str = "Status is required";

/// A submission that passed presence and format checks.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidSubmission {
    pub referrer: NewReferrer,
    pub referral: NewReferral,
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

fn optional(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn required(
    value: Option<String>,
    label: &'static str,
    missing: &mut Vec<&'static str>,
) -> String {
    match optional(value) {
        Some(value) => value,
        None => {
            missing.push(label);
            String::new()
        }
    }
}

pub fn validate_submission(
    submission: ReferralSubmission,
) -> Result<ValidSubmission, ServiceError> {
    let mut missing = Vec::new();
    let referrer_name = required(submission.referrer_name, "Referrer Name", &mut missing);
    let referrer_email = required(submission.referrer_email, "Referrer Email", &mut missing);
    let referee_name = required(submission.referee_name, "Referee Name", &mut missing);
    let referee_email = required(submission.referee_email, "Referee Email", &mut missing);
    let field_of_work = required(submission.field_of_work, "Field of Work", &mut missing);
    let program = required(submission.program, "Program", &mut missing);

    if !missing.is_empty() {
        return Err(ServiceError::Validation(format!(
            "The following fields are required: {}",
            missing.join(", ")
        )));
    }

    if !is_valid_email(&referrer_email) || !is_valid_email(&referee_email) {
        return Err(ServiceError::Validation(INVALID_EMAIL.to_string()));
    }

    Ok(ValidSubmission {
        referrer: NewReferrer {
            name: referrer_name,
            email: referrer_email,
            phone: optional(submission.referrer_phone),
        },
        referral: NewReferral {
            name: referee_name,
            email: referee_email,
            phone: optional(submission.referee_phone),
            field_of_work,
            program,
        },
    })
}

pub fn validate_status(status: Option<String>) -> Result<String, ServiceError> {
    status
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ServiceError::Validation(STATUS_REQUIRED.to_string()))
}
