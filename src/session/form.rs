//! Create/edit form values, required-field validation and input formatting

use super::{Location, SessionFields};
use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;

/// Raw values of the create/edit session form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionForm {
    pub subject: String,
    pub subject_name: String,
    pub location: Option<Location>,
    pub date: String,
    pub time: String,
    pub description: String,
    pub attendee_limit: Option<NonZeroU32>,
}

/// Form values that passed [`SessionForm::validate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidForm(SessionFields);

impl ValidForm {
    pub fn fields(&self) -> &SessionFields {
        &self.0
    }

    pub fn into_fields(self) -> SessionFields {
        self.0
    }
}

impl SessionForm {
    /// Prefill the form from an existing session, for editing
    pub fn from_session(session: &super::Session) -> Self {
        Self {
            subject: session.subject.clone(),
            subject_name: session.subject_name.clone(),
            location: Some(session.location),
            date: session.date.clone(),
            time: session.time.clone(),
            description: session.description.clone(),
            attendee_limit: session.attendee_limit,
        }
    }

    /// Reject the form when any required field is missing
    ///
    /// Date and time must be non-blank; their format is not checked.
    pub fn validate(self) -> Result<ValidForm, AppError> {
        let location = match self.location {
            Some(location) => location,
            None => return Err(AppError::MissingFields),
        };

        if self.subject.is_empty()
            || self.subject_name.is_empty()
            || self.date.trim().is_empty()
            || self.time.trim().is_empty()
        {
            return Err(AppError::MissingFields);
        }

        Ok(ValidForm(SessionFields {
            subject: self.subject,
            subject_name: self.subject_name,
            location,
            date: self.date,
            time: self.time,
            description: self.description,
            attendee_limit: self.attendee_limit,
        }))
    }
}

/// Group typed digits into `DD/MM/YYYY` as the student types
///
/// Non-digits are dropped and anything past eight digits is cut off.
pub fn format_date_input(raw: &str) -> String {
    let digits: Vec<char> = raw.chars().filter(char::is_ascii_digit).take(8).collect();
    let mut out = String::with_capacity(10);
    for (i, digit) in digits.iter().enumerate() {
        if i == 2 || i == 4 {
            out.push('/');
        }
        out.push(*digit);
    }
    out
}

/// Group typed digits into `HH:MM`, keeping an AM/PM marker if one was typed
pub fn format_time_input(raw: &str) -> String {
    let digits: Vec<char> = raw.chars().filter(char::is_ascii_digit).take(4).collect();
    let mut out = String::with_capacity(8);
    for (i, digit) in digits.iter().enumerate() {
        if i == 2 {
            out.push(':');
        }
        out.push(*digit);
    }

    let lower = raw.to_ascii_lowercase();
    let meridiem = if lower.contains('p') {
        Some("PM")
    } else if lower.contains('a') {
        Some("AM")
    } else {
        None
    };

    if let Some(meridiem) = meridiem {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(meridiem);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> SessionForm {
        SessionForm {
            subject: "CSE3MAD".to_string(),
            subject_name: "Mobile Application Development".to_string(),
            location: Some(Location::Agora),
            date: "12/12/2025".to_string(),
            time: "5pm".to_string(),
            description: String::new(),
            attendee_limit: None,
        }
    }

    #[test]
    fn test_complete_form_passes() {
        let valid = complete().validate().unwrap();
        assert_eq!(valid.fields().location, Location::Agora);
        assert_eq!(valid.fields().time, "5pm");
    }

    #[test]
    fn test_each_required_field() {
        let cases: Vec<Box<dyn Fn(&mut SessionForm)>> = vec![
            Box::new(|f| f.subject.clear()),
            Box::new(|f| f.subject_name.clear()),
            Box::new(|f| f.location = None),
            Box::new(|f| f.date = "   ".to_string()),
            Box::new(|f| f.time = String::new()),
        ];

        for blank in cases {
            let mut form = complete();
            blank(&mut form);
            assert_eq!(form.validate(), Err(AppError::MissingFields));
        }
    }

    #[test]
    fn test_description_is_optional() {
        let mut form = complete();
        form.description.clear();
        assert!(form.validate().is_ok());
    }

    #[test]
    fn test_format_date_input() {
        assert_eq!(format_date_input(""), "");
        assert_eq!(format_date_input("1"), "1");
        assert_eq!(format_date_input("121"), "12/1");
        assert_eq!(format_date_input("12122"), "12/12/2");
        assert_eq!(format_date_input("12122025"), "12/12/2025");
        assert_eq!(format_date_input("12/12/2025"), "12/12/2025");
        assert_eq!(format_date_input("1212202599"), "12/12/2025");
    }

    #[test]
    fn test_format_time_input() {
        assert_eq!(format_time_input("0530"), "05:30");
        assert_eq!(format_time_input("053"), "05:3");
        assert_eq!(format_time_input("0530pm"), "05:30 PM");
        assert_eq!(format_time_input("11:15 am"), "11:15 AM");
        assert_eq!(format_time_input("123456"), "12:34");
        assert_eq!(format_time_input("pm"), "PM");
    }
}
