use garde::Validate;

use crate::error::{AppError, Result};

/// Runs garde validation and flattens the report into a single
/// [`AppError::Validation`] message.
pub fn validate_form<T>(form: &T) -> Result<()>
where
    T: Validate,
    T::Context: Default,
{
    form.validate()
        .map_err(|report| AppError::Validation(report.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::{LoginForm, RegisterForm};

    fn register_form() -> RegisterForm {
        RegisterForm {
            first_name: "Geofrey".to_string(),
            last_name: "Ernest".to_string(),
            email: "me@me.com".to_string(),
            password: "password1".to_string(),
            confirm_password: "password1".to_string(),
        }
    }

    #[test]
    fn valid_registration_passes() {
        assert!(validate_form(&register_form()).is_ok());
    }

    #[test]
    fn bad_email_is_rejected() {
        let mut form = register_form();
        form.email = "not-an-email".to_string();
        assert!(validate_form(&form).is_err());
    }

    #[test]
    fn mismatched_confirmation_is_rejected() {
        let mut form = register_form();
        form.confirm_password = "different1".to_string();
        assert!(validate_form(&form).is_err());
    }

    #[test]
    fn short_password_is_rejected() {
        let form = LoginForm {
            email: "me@me.com".to_string(),
            password: String::new(),
        };
        assert!(validate_form(&form).is_err());
    }
}
