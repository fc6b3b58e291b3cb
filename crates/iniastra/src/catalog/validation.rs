use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::domain::{DegreeLevel, IntakeSeason, University};
use crate::query::{lenient_f64, parse_timestamp};
use crate::validate::{check_max_chars, looks_like_email, looks_like_url, trimmed};

/// Create/update body for a university. Every field is optional so the same shape
/// serves partial updates; required fields are enforced after merging.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniversityPayload {
    pub name: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub description: Option<String>,
    pub degree_level: Option<String>,
    pub programs: Option<Vec<String>>,
    #[serde(rename = "minGPA", default, deserialize_with = "lenient_f64")]
    pub min_gpa: Option<f64>,
    #[serde(rename = "minIELTS", default, deserialize_with = "lenient_f64")]
    pub min_ielts: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub tuition_fee: Option<f64>,
    pub scholarships_available: Option<bool>,
    pub application_deadline: Option<String>,
    pub intake_seasons: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub ranking: Option<f64>,
    pub website: Option<String>,
    pub contact_email: Option<String>,
    pub logo_url: Option<String>,
    pub campus_photos: Option<Vec<String>>,
}

impl UniversityPayload {
    /// Fields present in `self` win over `base`.
    fn overlay(self, base: UniversityPayload) -> UniversityPayload {
        UniversityPayload {
            name: self.name.or(base.name),
            country: self.country.or(base.country),
            city: self.city.or(base.city),
            description: self.description.or(base.description),
            degree_level: self.degree_level.or(base.degree_level),
            programs: self.programs.or(base.programs),
            min_gpa: self.min_gpa.or(base.min_gpa),
            min_ielts: self.min_ielts.or(base.min_ielts),
            tuition_fee: self.tuition_fee.or(base.tuition_fee),
            scholarships_available: self.scholarships_available.or(base.scholarships_available),
            application_deadline: self.application_deadline.or(base.application_deadline),
            intake_seasons: self.intake_seasons.or(base.intake_seasons),
            ranking: self.ranking.or(base.ranking),
            website: self.website.or(base.website),
            contact_email: self.contact_email.or(base.contact_email),
            logo_url: self.logo_url.or(base.logo_url),
            campus_photos: self.campus_photos.or(base.campus_photos),
        }
    }
}

impl From<&University> for UniversityPayload {
    fn from(university: &University) -> Self {
        Self {
            name: Some(university.name.clone()),
            country: Some(university.country.clone()),
            city: university.city.clone(),
            description: university.description.clone(),
            degree_level: Some(university.degree_level.label().to_string()),
            programs: Some(university.programs.clone()),
            min_gpa: Some(university.min_gpa),
            min_ielts: Some(university.min_ielts),
            tuition_fee: Some(university.tuition_fee),
            scholarships_available: Some(university.scholarships_available),
            application_deadline: university
                .application_deadline
                .map(|deadline| deadline.to_chrono().to_rfc3339()),
            intake_seasons: Some(
                university
                    .intake_seasons
                    .iter()
                    .map(|season| format!("{season:?}"))
                    .collect(),
            ),
            ranking: university.ranking.map(f64::from),
            website: university.website.clone(),
            contact_email: university.contact_email.clone(),
            logo_url: university.logo_url.clone(),
            campus_photos: Some(university.campus_photos.clone()),
        }
    }
}

/// Validates a create request and stamps a fresh id.
pub fn build_university(
    payload: UniversityPayload,
    now: DateTime<Utc>,
) -> Result<University, Vec<String>> {
    validate_university(payload, ObjectId::new(), now, now, true)
}

/// Merges a partial update over the stored record and re-validates the result.
pub fn apply_update(
    existing: &University,
    payload: UniversityPayload,
    now: DateTime<Utc>,
) -> Result<University, Vec<String>> {
    let merged = payload.overlay(UniversityPayload::from(existing));
    validate_university(
        merged,
        existing.id,
        existing.created_at.to_chrono(),
        now,
        existing.is_active,
    )
}

fn validate_university(
    payload: UniversityPayload,
    id: ObjectId,
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
    is_active: bool,
) -> Result<University, Vec<String>> {
    let mut errors = Vec::new();

    let name = trimmed(payload.name);
    if name.is_none() {
        errors.push("University name is required".to_string());
    }
    check_max_chars(
        &mut errors,
        name.as_deref(),
        100,
        "University name cannot exceed 100 characters",
    );

    let country = trimmed(payload.country);
    if country.is_none() {
        errors.push("Country is required".to_string());
    }

    let description = payload.description.filter(|text| !text.trim().is_empty());
    check_max_chars(
        &mut errors,
        description.as_deref(),
        1000,
        "Description cannot exceed 1000 characters",
    );

    let degree_level = match trimmed(payload.degree_level) {
        None => {
            errors.push("Degree level is required".to_string());
            None
        }
        Some(raw) => {
            let parsed = DegreeLevel::parse(&raw);
            if parsed.is_none() {
                errors.push("Degree level must be one of: Bachelors, Masters, PhD, Diploma".to_string());
            }
            parsed
        }
    };

    let min_gpa = required_in_range(
        &mut errors,
        payload.min_gpa,
        4.0,
        ["Minimum GPA is required", "GPA cannot be negative", "GPA cannot exceed 4.0"],
    );
    let min_ielts = required_in_range(
        &mut errors,
        payload.min_ielts,
        9.0,
        [
            "Minimum IELTS score is required",
            "IELTS score cannot be negative",
            "IELTS score cannot exceed 9",
        ],
    );

    let tuition_fee = match payload.tuition_fee {
        None => {
            errors.push("Tuition fee is required".to_string());
            None
        }
        Some(fee) if fee < 0.0 => {
            errors.push("Tuition fee cannot be negative".to_string());
            None
        }
        Some(fee) => Some(fee),
    };

    let application_deadline = match trimmed(payload.application_deadline) {
        None => None,
        Some(raw) => match parse_timestamp(&raw) {
            Some(deadline) => Some(bson::DateTime::from_chrono(deadline)),
            None => {
                errors.push("Application deadline must be a valid date".to_string());
                None
            }
        },
    };

    let mut intake_seasons = Vec::new();
    for raw in payload.intake_seasons.unwrap_or_default() {
        match IntakeSeason::parse(&raw) {
            Some(season) if !intake_seasons.contains(&season) => intake_seasons.push(season),
            Some(_) => {}
            None => {
                errors.push(format!("'{raw}' is not a valid intake season"));
            }
        }
    }

    let ranking = match payload.ranking {
        None => None,
        Some(rank) if rank >= 1.0 && rank.fract() == 0.0 && rank <= f64::from(i32::MAX) => {
            Some(rank as i32)
        }
        Some(_) => {
            errors.push("Ranking must be a whole number of at least 1".to_string());
            None
        }
    };

    let website = trimmed(payload.website);
    if website.as_deref().is_some_and(|url| !looks_like_url(url)) {
        errors.push("Please enter a valid URL".to_string());
    }

    let contact_email = trimmed(payload.contact_email).map(|email| email.to_lowercase());
    if contact_email
        .as_deref()
        .is_some_and(|email| !looks_like_email(email))
    {
        errors.push("Please enter a valid email".to_string());
    }

    let (Some(name), Some(country), Some(degree_level), Some(min_gpa), Some(min_ielts), Some(tuition_fee)) =
        (name, country, degree_level, min_gpa, min_ielts, tuition_fee)
    else {
        return Err(errors);
    };
    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(University {
        id,
        name,
        country,
        city: trimmed(payload.city),
        description,
        degree_level,
        programs: trimmed_list(payload.programs),
        min_gpa,
        min_ielts,
        tuition_fee,
        scholarships_available: payload.scholarships_available.unwrap_or(false),
        application_deadline,
        intake_seasons,
        ranking,
        website,
        contact_email,
        logo_url: trimmed(payload.logo_url),
        campus_photos: trimmed_list(payload.campus_photos),
        is_active,
        created_at: bson::DateTime::from_chrono(created_at),
        updated_at: bson::DateTime::from_chrono(now),
    })
}

fn required_in_range(
    errors: &mut Vec<String>,
    value: Option<f64>,
    max: f64,
    [missing, negative, too_high]: [&str; 3],
) -> Option<f64> {
    match value {
        None => {
            errors.push(missing.to_string());
            None
        }
        Some(value) if value < 0.0 => {
            errors.push(negative.to_string());
            None
        }
        Some(value) if value > max => {
            errors.push(too_high.to_string());
            None
        }
        Some(value) => Some(value),
    }
}

fn trimmed_list(values: Option<Vec<String>>) -> Vec<String> {
    values
        .unwrap_or_default()
        .into_iter()
        .filter_map(|value| trimmed(Some(value)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap()
    }

    fn payload() -> UniversityPayload {
        UniversityPayload {
            name: Some("  University of Toronto ".into()),
            country: Some("Canada".into()),
            city: Some("Toronto".into()),
            degree_level: Some("Masters".into()),
            programs: Some(vec!["Computer Science".into(), "  ".into()]),
            min_gpa: Some(3.3),
            min_ielts: Some(6.5),
            tuition_fee: Some(45_000.0),
            intake_seasons: Some(vec!["Fall".into(), "fall".into(), "Winter".into()]),
            ranking: Some(21.0),
            website: Some("https://www.utoronto.ca".into()),
            contact_email: Some("Admissions@UToronto.ca".into()),
            ..UniversityPayload::default()
        }
    }

    #[test]
    fn builds_normalised_record() {
        let university = build_university(payload(), now()).expect("valid payload");
        assert_eq!(university.name, "University of Toronto");
        assert_eq!(university.programs, vec!["Computer Science".to_string()]);
        assert_eq!(
            university.intake_seasons,
            vec![IntakeSeason::Fall, IntakeSeason::Winter]
        );
        assert_eq!(university.contact_email.as_deref(), Some("admissions@utoronto.ca"));
        assert_eq!(university.ranking, Some(21));
        assert!(university.is_active);
        assert!(!university.scholarships_available);
    }

    #[test]
    fn collects_every_field_error() {
        let errors = build_university(
            UniversityPayload {
                degree_level: Some("Doctorate".into()),
                min_gpa: Some(4.5),
                min_ielts: Some(-1.0),
                website: Some("utoronto.ca".into()),
                ..UniversityPayload::default()
            },
            now(),
        )
        .expect_err("invalid payload");

        assert_eq!(
            errors,
            vec![
                "University name is required".to_string(),
                "Country is required".to_string(),
                "Degree level must be one of: Bachelors, Masters, PhD, Diploma".to_string(),
                "GPA cannot exceed 4.0".to_string(),
                "IELTS score cannot be negative".to_string(),
                "Tuition fee is required".to_string(),
                "Please enter a valid URL".to_string(),
            ]
        );
    }

    #[test]
    fn update_keeps_unmentioned_fields() {
        let existing = build_university(payload(), now()).expect("valid payload");
        let later = now() + chrono::Duration::days(2);
        let updated = apply_update(
            &existing,
            UniversityPayload {
                tuition_fee: Some(47_500.0),
                ..UniversityPayload::default()
            },
            later,
        )
        .expect("valid update");

        assert_eq!(updated.id, existing.id);
        assert_eq!(updated.tuition_fee, 47_500.0);
        assert_eq!(updated.name, existing.name);
        assert_eq!(updated.intake_seasons, existing.intake_seasons);
        assert_eq!(updated.created_at, existing.created_at);
        assert_eq!(updated.updated_at.to_chrono(), later);
    }

    #[test]
    fn update_is_revalidated() {
        let existing = build_university(payload(), now()).expect("valid payload");
        let errors = apply_update(
            &existing,
            UniversityPayload {
                min_ielts: Some(9.5),
                ..UniversityPayload::default()
            },
            now(),
        )
        .expect_err("out of range");
        assert_eq!(errors, vec!["IELTS score cannot exceed 9".to_string()]);
    }
}
