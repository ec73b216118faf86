//! Named column groups for the study tables.
//!
//! Column membership is declared here once and passed explicitly to the
//! analysis functions, rather than recovered by prefix/suffix matching on
//! column names.

/// Visit-level identifier: one per observation/assessment event
pub const VISIT_ID: &str = "visit_id";

/// Person-level identifier: one per unique individual across visits
pub const PERSON_ID: &str = "person_id";

/// Date of the assessment event
pub const ASSESSMENT_DATE: &str = "assessment_date";

/// The three UCLA loneliness items, each scored 1-3
pub const UCLA_ITEMS: &[&str] = &["ucla_companionship", "ucla_left_out", "ucla_isolated"];

/// Derived UCLA total score (3-9); null if any item is missing
pub const UCLA_TOTAL: &str = "ucla_total";

/// Sociodemographic measures
pub const SOCIODEMOGRAPHIC: &[&str] = &[
    "age",
    "sex",
    "education_years",
    "lives_alone",
    "employment",
];

/// Self-report questionnaire totals
pub const SELF_REPORT: &[&str] = &["phq9_total", "gad7_total", "self_rated_health"];

/// Administrative-investigation measures
pub const INVESTIGATION: &[&str] = &["bmi", "systolic_bp", "grip_strength"];

/// Panel-assessment measures
pub const PANEL: &[&str] = &["cognition_score", "social_network_size"];

/// Columns excluded before imputation.
///
/// `employment` is collinear with `age` and `education_years` in this
/// cohort; `grip_strength` exceeds the missingness threshold. Dropping them
/// up front is the mitigation for chained-equation nonconvergence.
pub const IMPUTATION_DROP: &[&str] = &["employment", "grip_strength"];

/// All predictor columns in report order: UCLA total first, then the
/// auxiliary measure groups
#[must_use]
pub fn predictor_columns() -> Vec<&'static str> {
    let mut cols = vec![UCLA_TOTAL];
    cols.extend_from_slice(SOCIODEMOGRAPHIC);
    cols.extend_from_slice(SELF_REPORT);
    cols.extend_from_slice(INVESTIGATION);
    cols.extend_from_slice(PANEL);
    cols
}

/// Predictor columns with the documented drop list removed
#[must_use]
pub fn imputation_columns() -> Vec<&'static str> {
    predictor_columns()
        .into_iter()
        .filter(|c| !IMPUTATION_DROP.contains(c))
        .collect()
}
