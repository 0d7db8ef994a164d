use std::fmt;
use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::domain::{
    AccountType, ContactSubject, EmploymentType, Gender, LoanType, NewCibilRequest,
    NewContactMessage, NewLoanApplication, WireLabel,
};

pub const MIN_APPLICANT_AGE: i32 = 18;
pub const MAX_APPLICANT_AGE: i32 = 70;
pub const MIN_MONTHLY_INCOME: i64 = 15_000;
pub const MAX_MONTHLY_INCOME: i64 = 50_000_000;
pub const MIN_LOAN_AMOUNT: i64 = 10_000;
pub const MAX_LOAN_AMOUNT: i64 = 10_000_000;
pub const MIN_TENURE_YEARS: i64 = 1;
pub const MAX_TENURE_YEARS: i64 = 30;
pub const MAX_EXISTING_EMIS: i64 = 1_000_000;

/// Loan application form as posted by the client. Every field is optional so
/// that missing values surface as field errors instead of a parse failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoanApplicationSubmission {
    pub full_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub mobile: Option<String>,
    pub email: Option<String>,
    pub pan_card: Option<String>,
    pub gender: Option<String>,
    pub current_address: Option<String>,
    pub employment_type: Option<String>,
    pub monthly_income: Option<i64>,
    pub company_name: Option<String>,
    pub work_experience: Option<String>,
    pub existing_emis: Option<i64>,
    pub account_type: Option<String>,
    pub loan_type: Option<String>,
    pub loan_amount: Option<i64>,
    pub tenure: Option<i64>,
    pub purpose: Option<String>,
    pub terms_accepted: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContactSubmission {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CibilCheckSubmission {
    pub full_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub mobile: Option<String>,
    pub pan_card: Option<String>,
    pub pincode: Option<String>,
    pub consent_agreement: Option<bool>,
}

/// A single rejected field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Every field error found in one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        Self(vec![FieldError {
            field,
            message: message.into(),
        }])
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.iter().any(|error| error.field == field)
    }

    pub fn fields(&self) -> Vec<&'static str> {
        self.0.iter().map(|error| error.field).collect()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed: {}", self.fields().join(", "))
    }
}

impl std::error::Error for ValidationErrors {}

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-zA-Z\s.]+$").expect("name pattern compiles"))
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
    })
}

fn pan_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Z]{5}[0-9]{4}[A-Z]$").expect("pan pattern compiles"))
}

fn pincode_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9]{6}$").expect("pincode pattern compiles"))
}

/// Reduce a mobile number to its canonical bare 10-digit form.
///
/// Accepts spaces, dashes, dots and parentheses as separators and an optional
/// `+91`, `91` or `0` prefix. Returns `None` unless the result is ten digits
/// starting with 6-9.
pub fn normalize_mobile(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let (international, rest) = match trimmed.strip_prefix('+') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };

    let mut digits = String::with_capacity(rest.len());
    for ch in rest.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
        } else if !matches!(ch, ' ' | '-' | '.' | '(' | ')') {
            return None;
        }
    }

    let national = if international {
        digits.strip_prefix("91")?
    } else if digits.len() == 12 {
        digits.strip_prefix("91")?
    } else if digits.len() == 11 {
        digits.strip_prefix('0')?
    } else {
        digits.as_str()
    };

    let valid = national.len() == 10 && matches!(national.as_bytes()[0], b'6'..=b'9');
    valid.then(|| national.to_string())
}

/// Trim, collapse inner whitespace, and drop angle brackets.
pub fn sanitize_text(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .filter(|ch| !matches!(ch, '<' | '>'))
        .collect()
}

pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Whole years between `dob` and `today`; negative for future dates.
fn age_on(dob: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - dob.year();
    if (today.month(), today.day()) < (dob.month(), dob.day()) {
        age -= 1;
    }
    age
}

/// Accumulates field errors. Each check returns `None` exactly when it
/// recorded an error.
#[derive(Default)]
struct Collector {
    errors: Vec<FieldError>,
}

impl Collector {
    fn reject<T>(&mut self, field: &'static str, message: impl Into<String>) -> Option<T> {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
        None
    }

    fn finish(self) -> ValidationErrors {
        ValidationErrors(self.errors)
    }

    fn text(
        &mut self,
        field: &'static str,
        raw: Option<&str>,
        min: usize,
        max: usize,
    ) -> Option<String> {
        let value = raw.map(sanitize_text).unwrap_or_default();
        let length = value.chars().count();
        if length == 0 {
            self.reject(field, "is required")
        } else if length < min {
            self.reject(field, format!("must be at least {min} characters"))
        } else if length > max {
            self.reject(field, format!("must not exceed {max} characters"))
        } else {
            Some(value)
        }
    }

    fn person_name(
        &mut self,
        field: &'static str,
        raw: Option<&str>,
        min: usize,
        max: usize,
    ) -> Option<String> {
        let value = self.text(field, raw, min, max)?;
        if name_pattern().is_match(&value) {
            Some(value)
        } else {
            self.reject(field, "may only contain letters, spaces, and dots")
        }
    }

    fn email(&mut self, field: &'static str, raw: Option<&str>) -> Option<String> {
        let value = raw.map(normalize_email).unwrap_or_default();
        if value.is_empty() {
            self.reject(field, "is required")
        } else if value.chars().count() > 255 {
            self.reject(field, "must not exceed 255 characters")
        } else if !email_pattern().is_match(&value) {
            self.reject(field, "must be a valid email address")
        } else {
            Some(value)
        }
    }

    fn mobile(&mut self, field: &'static str, raw: Option<&str>) -> Option<String> {
        match raw.map(str::trim).filter(|value| !value.is_empty()) {
            None => self.reject(field, "is required"),
            Some(value) => match normalize_mobile(value) {
                Some(mobile) => Some(mobile),
                None => self.reject(field, "must be a 10-digit number starting with 6-9"),
            },
        }
    }

    /// `Some(None)` when the optional phone is blank.
    fn optional_mobile(&mut self, field: &'static str, raw: Option<&str>) -> Option<Option<String>> {
        match raw.map(str::trim).filter(|value| !value.is_empty()) {
            None => Some(None),
            Some(value) => self.mobile(field, Some(value)).map(Some),
        }
    }

    fn pan(&mut self, field: &'static str, raw: Option<&str>) -> Option<String> {
        let value = raw.map(|pan| pan.trim().to_ascii_uppercase()).unwrap_or_default();
        if value.is_empty() {
            self.reject(field, "is required")
        } else if pan_pattern().is_match(&value) {
            Some(value)
        } else {
            self.reject(field, "must match the PAN format ABCDE1234F")
        }
    }

    fn pincode(&mut self, field: &'static str, raw: Option<&str>) -> Option<String> {
        let value = raw.map(str::trim).unwrap_or_default();
        if value.is_empty() {
            self.reject(field, "is required")
        } else if pincode_pattern().is_match(value) {
            Some(value.to_string())
        } else {
            self.reject(field, "must be 6 digits")
        }
    }

    fn choice<T: WireLabel>(&mut self, field: &'static str, raw: Option<&str>) -> Option<T> {
        let value = raw.map(str::trim).unwrap_or_default();
        if value.is_empty() {
            return self.reject(field, "is required");
        }
        match T::from_label(value) {
            Some(choice) => Some(choice),
            None => self.reject(field, format!("must be one of: {}", T::labels().join(", "))),
        }
    }

    fn integer(
        &mut self,
        field: &'static str,
        raw: Option<i64>,
        min: i64,
        max: i64,
    ) -> Option<i64> {
        match raw {
            None => self.reject(field, "is required"),
            Some(value) if value < min || value > max => {
                self.reject(field, format!("must be between {min} and {max}"))
            }
            Some(value) => Some(value),
        }
    }

    fn date(&mut self, field: &'static str, raw: Option<&str>) -> Option<NaiveDate> {
        let value = raw.map(str::trim).unwrap_or_default();
        if value.is_empty() {
            return self.reject(field, "is required");
        }
        match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(_) => self.reject(field, "must be a date in YYYY-MM-DD format"),
        }
    }

    fn date_of_birth(
        &mut self,
        field: &'static str,
        raw: Option<&str>,
        today: NaiveDate,
    ) -> Option<NaiveDate> {
        let dob = self.date(field, raw)?;
        let age = age_on(dob, today);
        if (MIN_APPLICANT_AGE..=MAX_APPLICANT_AGE).contains(&age) {
            Some(dob)
        } else {
            self.reject(
                field,
                format!("age must be between {MIN_APPLICANT_AGE} and {MAX_APPLICANT_AGE} years"),
            )
        }
    }

    fn accepted(&mut self, field: &'static str, raw: Option<bool>, message: &str) -> Option<()> {
        match raw {
            Some(true) => Some(()),
            _ => self.reject(field, message),
        }
    }
}

/// Boundary validator run before any store write.
#[derive(Debug, Clone, Default)]
pub struct IntakeGuard;

impl IntakeGuard {
    pub fn loan_application(
        &self,
        submission: &LoanApplicationSubmission,
        today: NaiveDate,
    ) -> Result<NewLoanApplication, ValidationErrors> {
        let mut checks = Collector::default();
        let s = submission;

        let full_name = checks.person_name("fullName", s.full_name.as_deref(), 2, 100);
        let date_of_birth = checks.date_of_birth("dateOfBirth", s.date_of_birth.as_deref(), today);
        let mobile = checks.mobile("mobile", s.mobile.as_deref());
        let email = checks.email("email", s.email.as_deref());
        let pan_card = checks.pan("panCard", s.pan_card.as_deref());
        let gender = checks.choice::<Gender>("gender", s.gender.as_deref());
        let current_address = checks.text("currentAddress", s.current_address.as_deref(), 10, 500);
        let employment_type =
            checks.choice::<EmploymentType>("employmentType", s.employment_type.as_deref());
        let monthly_income = checks.integer(
            "monthlyIncome",
            s.monthly_income,
            MIN_MONTHLY_INCOME,
            MAX_MONTHLY_INCOME,
        );
        let company_name = checks.text("companyName", s.company_name.as_deref(), 2, 200);
        let work_experience = checks.text("workExperience", s.work_experience.as_deref(), 1, 50);
        let existing_emis = match s.existing_emis {
            None => Some(None),
            Some(value) => checks
                .integer("existingEmis", Some(value), 0, MAX_EXISTING_EMIS)
                .map(Some),
        };
        let account_type = checks.choice::<AccountType>("accountType", s.account_type.as_deref());
        let loan_type = checks.choice::<LoanType>("loanType", s.loan_type.as_deref());
        let loan_amount =
            checks.integer("loanAmount", s.loan_amount, MIN_LOAN_AMOUNT, MAX_LOAN_AMOUNT);
        let tenure = checks.integer("tenure", s.tenure, MIN_TENURE_YEARS, MAX_TENURE_YEARS);
        let purpose = checks.text("purpose", s.purpose.as_deref(), 5, 200);
        let terms = checks.accepted(
            "termsAccepted",
            s.terms_accepted,
            "terms and conditions must be accepted",
        );

        let (
            Some(full_name),
            Some(date_of_birth),
            Some(mobile),
            Some(email),
            Some(pan_card),
            Some(gender),
            Some(current_address),
            Some(employment_type),
            Some(monthly_income),
            Some(company_name),
            Some(work_experience),
            Some(existing_emis),
            Some(account_type),
            Some(loan_type),
            Some(loan_amount),
            Some(tenure),
            Some(purpose),
            Some(()),
        ) = (
            full_name,
            date_of_birth,
            mobile,
            email,
            pan_card,
            gender,
            current_address,
            employment_type,
            monthly_income,
            company_name,
            work_experience,
            existing_emis,
            account_type,
            loan_type,
            loan_amount,
            tenure,
            purpose,
            terms,
        )
        else {
            return Err(checks.finish());
        };

        // Range checks above guarantee these conversions are lossless.
        Ok(NewLoanApplication {
            full_name,
            date_of_birth,
            mobile,
            email,
            pan_card,
            gender,
            current_address,
            employment_type,
            monthly_income: monthly_income.unsigned_abs(),
            company_name,
            work_experience,
            existing_emis: existing_emis.map(i64::unsigned_abs),
            account_type,
            loan_type,
            loan_amount: loan_amount.unsigned_abs(),
            tenure: u8::try_from(tenure).unwrap_or(MAX_TENURE_YEARS as u8),
            purpose,
        })
    }

    pub fn contact_message(
        &self,
        submission: &ContactSubmission,
    ) -> Result<NewContactMessage, ValidationErrors> {
        let mut checks = Collector::default();
        let s = submission;

        let first_name = checks.text("firstName", s.first_name.as_deref(), 2, 50);
        let last_name = checks.text("lastName", s.last_name.as_deref(), 2, 50);
        let email = checks.email("email", s.email.as_deref());
        let phone = checks.optional_mobile("phone", s.phone.as_deref());
        let subject = checks.choice::<ContactSubject>("subject", s.subject.as_deref());
        let message = checks.text("message", s.message.as_deref(), 10, 2000);

        let (Some(first_name), Some(last_name), Some(email), Some(phone), Some(subject), Some(message)) =
            (first_name, last_name, email, phone, subject, message)
        else {
            return Err(checks.finish());
        };

        Ok(NewContactMessage {
            first_name,
            last_name,
            email,
            phone,
            subject,
            message,
        })
    }

    pub fn cibil_request(
        &self,
        submission: &CibilCheckSubmission,
        today: NaiveDate,
    ) -> Result<NewCibilRequest, ValidationErrors> {
        let mut checks = Collector::default();
        let s = submission;

        let full_name = checks.person_name("fullName", s.full_name.as_deref(), 2, 100);
        let date_of_birth = checks.date("dateOfBirth", s.date_of_birth.as_deref());
        let date_of_birth = match date_of_birth {
            Some(dob) if dob > today => checks.reject("dateOfBirth", "must not be in the future"),
            other => other,
        };
        let mobile = checks.mobile("mobile", s.mobile.as_deref());
        let pan_card = checks.pan("panCard", s.pan_card.as_deref());
        let pincode = checks.pincode("pincode", s.pincode.as_deref());
        let consent = checks.accepted(
            "consentAgreement",
            s.consent_agreement,
            "consent is required to fetch a credit score",
        );

        let (Some(full_name), Some(date_of_birth), Some(mobile), Some(pan_card), Some(pincode), Some(())) =
            (full_name, date_of_birth, mobile, pan_card, pincode, consent)
        else {
            return Err(checks.finish());
        };

        Ok(NewCibilRequest {
            full_name,
            date_of_birth,
            mobile,
            pan_card,
            pincode,
        })
    }

    /// Canonicalise the mobile supplied to the application tracker.
    pub fn tracking_mobile(&self, raw: Option<&str>) -> Result<String, ValidationErrors> {
        let mut checks = Collector::default();
        checks
            .mobile("mobile", raw)
            .ok_or_else(|| checks.finish())
    }
}
