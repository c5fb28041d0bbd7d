// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use thiserror::Error;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("{field} is required -- fill it in and retry")]
    Required { field: &'static str },
    #[error("{0:?} is not a valid email address -- use the form name@domain.com")]
    InvalidEmail(String),
    #[error("password must be at least {min} characters")]
    PasswordTooShort { min: usize },
    #[error("new password and confirmation do not match -- retype both")]
    PasswordMismatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    Login,
    Registration,
    ChangeName,
    ChangeEmail,
    ChangePassword,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationForm {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeNameForm {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEmailForm {
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangePasswordForm {
    pub current: String,
    pub new: String,
    pub confirmation: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPayload {
    Login(LoginForm),
    Registration(RegistrationForm),
    ChangeName(ChangeNameForm),
    ChangeEmail(ChangeEmailForm),
    ChangePassword(ChangePasswordForm),
}

impl FormPayload {
    pub fn kind(&self) -> FormKind {
        match self {
            Self::Login(_) => FormKind::Login,
            Self::Registration(_) => FormKind::Registration,
            Self::ChangeName(_) => FormKind::ChangeName,
            Self::ChangeEmail(_) => FormKind::ChangeEmail,
            Self::ChangePassword(_) => FormKind::ChangePassword,
        }
    }

    pub fn validate(&self) -> Result<(), FormError> {
        match self {
            Self::Login(form) => form.validate(),
            Self::Registration(form) => form.validate(),
            Self::ChangeName(form) => form.validate(),
            Self::ChangeEmail(form) => form.validate(),
            Self::ChangePassword(form) => form.validate(),
        }
    }
}

fn required(field: &'static str, value: &str) -> Result<(), FormError> {
    if value.trim().is_empty() {
        return Err(FormError::Required { field });
    }
    Ok(())
}

/// Accepts `local@domain.tld` with no whitespace and a dot inside the domain.
pub fn looks_like_email(value: &str) -> bool {
    let value = value.trim();
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

fn email(value: &str) -> Result<(), FormError> {
    required("email", value)?;
    if !looks_like_email(value) {
        return Err(FormError::InvalidEmail(value.trim().to_owned()));
    }
    Ok(())
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), FormError> {
        required("email", &self.email)?;
        required("password", &self.password)
    }
}

impl RegistrationForm {
    pub fn validate(&self) -> Result<(), FormError> {
        required("name", &self.name)?;
        email(&self.email)?;
        required("password", &self.password)
    }
}

impl ChangeNameForm {
    pub fn validate(&self) -> Result<(), FormError> {
        required("name", &self.name)
    }
}

impl ChangeEmailForm {
    pub fn validate(&self) -> Result<(), FormError> {
        email(&self.email)
    }
}

impl ChangePasswordForm {
    pub fn validate(&self) -> Result<(), FormError> {
        required("current password", &self.current)?;
        required("new password", &self.new)?;
        required("password confirmation", &self.confirmation)?;
        if self.new != self.confirmation {
            return Err(FormError::PasswordMismatch);
        }
        if self.new.chars().count() < MIN_PASSWORD_LEN {
            return Err(FormError::PasswordTooShort {
                min: MIN_PASSWORD_LEN,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ChangeEmailForm, ChangeNameForm, ChangePasswordForm, FormError, FormKind, FormPayload,
        LoginForm, RegistrationForm, looks_like_email,
    };

    #[test]
    fn login_requires_both_fields() {
        let payload = FormPayload::Login(LoginForm {
            email: "ana@example.com".to_owned(),
            password: "  ".to_owned(),
        });
        assert_eq!(payload.kind(), FormKind::Login);
        assert_eq!(
            payload.validate(),
            Err(FormError::Required { field: "password" })
        );
    }

    #[test]
    fn registration_checks_email_shape() {
        let form = RegistrationForm {
            name: "Ana".to_owned(),
            email: "ana.example.com".to_owned(),
            password: "secret1".to_owned(),
        };
        let error = form.validate().expect_err("email without @ should fail");
        assert_eq!(error, FormError::InvalidEmail("ana.example.com".to_owned()));

        let valid = RegistrationForm {
            email: "ana@example.com".to_owned(),
            ..form
        };
        assert!(valid.validate().is_ok());
    }

    #[test]
    fn email_shape_rules() {
        for good in ["a@b.co", " joao.silva@mail.com.br "] {
            assert!(looks_like_email(good), "{good}");
        }
        for bad in ["", "a@b", "@b.com", "a@.com", "a b@c.com", "a@b@c.com", "a@b."] {
            assert!(!looks_like_email(bad), "{bad}");
        }
    }

    #[test]
    fn change_name_and_email_reject_blank() {
        assert!(ChangeNameForm { name: String::new() }.validate().is_err());
        assert!(ChangeNameForm { name: "Bia".to_owned() }.validate().is_ok());
        assert_eq!(
            ChangeEmailForm { email: " ".to_owned() }.validate(),
            Err(FormError::Required { field: "email" })
        );
    }

    #[test]
    fn change_password_rules() {
        let mismatch = ChangePasswordForm {
            current: "old-pass".to_owned(),
            new: "abcdef".to_owned(),
            confirmation: "abcdeg".to_owned(),
        };
        assert_eq!(mismatch.validate(), Err(FormError::PasswordMismatch));

        let short = ChangePasswordForm {
            current: "old-pass".to_owned(),
            new: "abc".to_owned(),
            confirmation: "abc".to_owned(),
        };
        let error = short.validate().expect_err("short password should fail");
        assert_eq!(error.to_string(), "password must be at least 6 characters");

        let missing = ChangePasswordForm {
            current: String::new(),
            new: "abcdef".to_owned(),
            confirmation: "abcdef".to_owned(),
        };
        assert_eq!(
            missing.validate(),
            Err(FormError::Required {
                field: "current password"
            })
        );
    }
}
