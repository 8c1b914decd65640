use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SurveyResponse {
    pub id: i64,
    pub student_name: String,
    pub gender: String,
    pub education_stage: String,
    pub satisfaction: String,
    pub understanding_help: String,
    pub device: String,
    pub internet_quality: String,
    pub platform_ease: String,
    pub teacher_interaction: String,
    pub study_preference: String,
    pub continue_elearning: String,
    pub created_at: DateTime<Utc>,
}

impl SurveyResponse {
    pub fn value(&self, field: Field) -> &str {
        match field {
            Field::Gender => &self.gender,
            Field::EducationStage => &self.education_stage,
            Field::Satisfaction => &self.satisfaction,
            Field::UnderstandingHelp => &self.understanding_help,
            Field::Device => &self.device,
            Field::InternetQuality => &self.internet_quality,
            Field::PlatformEase => &self.platform_ease,
            Field::TeacherInteraction => &self.teacher_interaction,
            Field::StudyPreference => &self.study_preference,
            Field::ContinueElearning => &self.continue_elearning,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewSurveyResponse {
    pub student_name: String,
    pub gender: String,
    pub education_stage: String,
    pub satisfaction: String,
    pub understanding_help: String,
    pub device: String,
    pub internet_quality: String,
    pub platform_ease: String,
    pub teacher_interaction: String,
    pub study_preference: String,
    pub continue_elearning: String,
}

impl NewSurveyResponse {
    /// Trims every answer and rejects blanks, naming the first offending field.
    pub fn validate(self) -> Result<Self, String> {
        let trimmed = Self {
            student_name: self.student_name.trim().to_string(),
            gender: self.gender.trim().to_string(),
            education_stage: self.education_stage.trim().to_string(),
            satisfaction: self.satisfaction.trim().to_string(),
            understanding_help: self.understanding_help.trim().to_string(),
            device: self.device.trim().to_string(),
            internet_quality: self.internet_quality.trim().to_string(),
            platform_ease: self.platform_ease.trim().to_string(),
            teacher_interaction: self.teacher_interaction.trim().to_string(),
            study_preference: self.study_preference.trim().to_string(),
            continue_elearning: self.continue_elearning.trim().to_string(),
        };

        if trimmed.student_name.is_empty() {
            return Err("student_name is required".to_string());
        }
        for field in Field::ALL {
            if trimmed.value(field).is_empty() {
                return Err(format!("{} is required", field.column()));
            }
        }

        Ok(trimmed)
    }

    pub fn value(&self, field: Field) -> &str {
        match field {
            Field::Gender => &self.gender,
            Field::EducationStage => &self.education_stage,
            Field::Satisfaction => &self.satisfaction,
            Field::UnderstandingHelp => &self.understanding_help,
            Field::Device => &self.device,
            Field::InternetQuality => &self.internet_quality,
            Field::PlatformEase => &self.platform_ease,
            Field::TeacherInteraction => &self.teacher_interaction,
            Field::StudyPreference => &self.study_preference,
            Field::ContinueElearning => &self.continue_elearning,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Gender,
    EducationStage,
    Satisfaction,
    UnderstandingHelp,
    Device,
    InternetQuality,
    PlatformEase,
    TeacherInteraction,
    StudyPreference,
    ContinueElearning,
}

impl Field {
    pub const ALL: [Field; 10] = [
        Field::Gender,
        Field::EducationStage,
        Field::Satisfaction,
        Field::UnderstandingHelp,
        Field::Device,
        Field::InternetQuality,
        Field::PlatformEase,
        Field::TeacherInteraction,
        Field::StudyPreference,
        Field::ContinueElearning,
    ];

    pub fn column(self) -> &'static str {
        match self {
            Field::Gender => "gender",
            Field::EducationStage => "education_stage",
            Field::Satisfaction => "satisfaction",
            Field::UnderstandingHelp => "understanding_help",
            Field::Device => "device",
            Field::InternetQuality => "internet_quality",
            Field::PlatformEase => "platform_ease",
            Field::TeacherInteraction => "teacher_interaction",
            Field::StudyPreference => "study_preference",
            Field::ContinueElearning => "continue_elearning",
        }
    }

    pub fn sheet_header(self) -> &'static str {
        match self {
            Field::Gender => "الجنس",
            Field::EducationStage => "المرحلة الدراسية",
            Field::Satisfaction => "الرضا عن التعلم الإلكتروني",
            Field::UnderstandingHelp => "هل يساعدك على فهم المادة؟",
            Field::Device => "الجهاز المستخدم",
            Field::InternetQuality => "جودة الانترنت",
            Field::PlatformEase => "سهولة المنصة",
            Field::TeacherInteraction => "التفاعل مع المدرس",
            Field::StudyPreference => "تفضيل الدراسة",
            Field::ContinueElearning => "الاستمرار بالتعلم الإلكتروني",
        }
    }

    pub fn section_title(self) -> &'static str {
        match self {
            Field::Gender => "الجنس",
            Field::EducationStage => "المرحلة الدراسية",
            Field::Satisfaction => "الرضا عن التعلم الإلكتروني",
            Field::UnderstandingHelp => "هل يساعد على فهم المادة؟",
            Field::Device => "الجهاز المستخدم",
            Field::InternetQuality => "جودة الإنترنت",
            Field::PlatformEase => "سهولة المنصة",
            Field::TeacherInteraction => "التفاعل مع المدرس",
            Field::StudyPreference => "تفضيل طريقة الدراسة",
            Field::ContinueElearning => "الاستمرار بالتعلم الإلكتروني",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .into_iter()
            .find(|field| field.column() == s.trim())
            .ok_or_else(|| format!("unknown survey field: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrendPoint {
    pub day: NaiveDate,
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> NewSurveyResponse {
        NewSurveyResponse {
            student_name: "  Zainab  ".to_string(),
            gender: "أنثى".to_string(),
            education_stage: "جامعة".to_string(),
            satisfaction: "راضٍ".to_string(),
            understanding_help: "نعم".to_string(),
            device: " هاتف ".to_string(),
            internet_quality: "جيدة".to_string(),
            platform_ease: "سهلة".to_string(),
            teacher_interaction: "جيد".to_string(),
            study_preference: "مدمج".to_string(),
            continue_elearning: "نعم".to_string(),
        }
    }

    #[test]
    fn validation_trims_answers() {
        let response = filled().validate().unwrap();
        assert_eq!(response.student_name, "Zainab");
        assert_eq!(response.device, "هاتف");
    }

    #[test]
    fn validation_names_the_blank_field() {
        let mut response = filled();
        response.student_name = "   ".to_string();
        assert_eq!(response.validate().unwrap_err(), "student_name is required");

        let mut response = filled();
        response.internet_quality = String::new();
        assert_eq!(response.validate().unwrap_err(), "internet_quality is required");
    }

    #[test]
    fn fields_parse_from_column_names() {
        for field in Field::ALL {
            assert_eq!(field.column().parse::<Field>().unwrap(), field);
        }
        assert!("favourite_colour".parse::<Field>().is_err());
    }
}
