use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use time::{macros::format_description, PrimitiveDateTime};
use validator::Validate;

use crate::core::time::{format_primitive, parse_rfc3339};
use crate::db::models::{Exam, Question};
use crate::db::types::{ExamStatus, QuestionType};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ExamCreate {
    #[validate(length(min = 3, message = "title must be at least 3 characters"))]
    pub(crate) title: String,
    #[validate(length(min = 1, message = "subject must not be empty"))]
    pub(crate) subject: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(alias = "scheduledAt", deserialize_with = "deserialize_datetime_flexible")]
    pub(crate) scheduled_at: PrimitiveDateTime,
    #[serde(alias = "durationMinutes")]
    #[validate(range(min = 5, max = 480, message = "duration_minutes must be between 5 and 480"))]
    pub(crate) duration_minutes: i32,
    #[serde(alias = "totalMarks")]
    #[validate(range(min = 1, message = "total_marks must be positive"))]
    pub(crate) total_marks: i32,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub(crate) struct ExamUpdate {
    #[serde(default)]
    #[validate(length(min = 3, message = "title must be at least 3 characters"))]
    pub(crate) title: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, message = "subject must not be empty"))]
    pub(crate) subject: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(
        default,
        alias = "scheduledAt",
        deserialize_with = "deserialize_option_datetime_flexible"
    )]
    pub(crate) scheduled_at: Option<PrimitiveDateTime>,
    #[serde(default, alias = "durationMinutes")]
    #[validate(range(min = 5, max = 480, message = "duration_minutes must be between 5 and 480"))]
    pub(crate) duration_minutes: Option<i32>,
    #[serde(default, alias = "totalMarks")]
    #[validate(range(min = 1, message = "total_marks must be positive"))]
    pub(crate) total_marks: Option<i32>,
    #[serde(default)]
    pub(crate) status: Option<ExamStatus>,
}

impl ExamUpdate {
    /// Applies the present fields onto `exam`.
    pub(crate) fn apply(self, exam: &mut Exam) {
        if let Some(title) = self.title {
            exam.title = title;
        }
        if let Some(subject) = self.subject {
            exam.subject = subject;
        }
        if let Some(description) = self.description {
            exam.description = Some(description);
        }
        if let Some(scheduled_at) = self.scheduled_at {
            exam.scheduled_at = scheduled_at;
        }
        if let Some(duration_minutes) = self.duration_minutes {
            exam.duration_minutes = duration_minutes;
        }
        if let Some(total_marks) = self.total_marks {
            exam.total_marks = total_marks;
        }
        if let Some(status) = self.status {
            exam.status = status;
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) subject: String,
    pub(crate) description: Option<String>,
    pub(crate) teacher_id: String,
    pub(crate) scheduled_at: String,
    pub(crate) duration_minutes: i32,
    pub(crate) total_marks: i32,
    pub(crate) status: ExamStatus,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl ExamResponse {
    pub(crate) fn from_db(exam: Exam) -> Self {
        Self {
            id: exam.id,
            title: exam.title,
            subject: exam.subject,
            description: exam.description,
            teacher_id: exam.teacher_id,
            scheduled_at: format_primitive(exam.scheduled_at),
            duration_minutes: exam.duration_minutes,
            total_marks: exam.total_marks,
            status: exam.status,
            created_at: format_primitive(exam.created_at),
            updated_at: format_primitive(exam.updated_at),
        }
    }
}

/// Exam as listed to a student.
#[derive(Debug, Serialize)]
pub(crate) struct AvailableExamResponse {
    #[serde(flatten)]
    pub(crate) exam: ExamResponse,
    pub(crate) already_submitted: bool,
    pub(crate) teacher_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamWithQuestionsResponse {
    #[serde(flatten)]
    pub(crate) exam: ExamResponse,
    pub(crate) questions: Vec<QuestionResponse>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuestionCreate {
    #[serde(alias = "questionText")]
    #[validate(length(min = 1, message = "question_text must not be empty"))]
    pub(crate) question_text: String,
    #[serde(default = "default_question_type", alias = "questionType")]
    pub(crate) question_type: QuestionType,
    #[serde(default)]
    pub(crate) options: Option<Vec<String>>,
    #[serde(default, alias = "correctAnswer")]
    pub(crate) correct_answer: Option<String>,
    #[validate(range(min = 1, message = "marks must be positive"))]
    pub(crate) marks: i32,
    #[serde(alias = "orderNum")]
    #[validate(range(min = 1, message = "order_num must be positive"))]
    pub(crate) order_num: i32,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionResponse {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) question_text: String,
    pub(crate) question_type: QuestionType,
    pub(crate) options: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) correct_answer: Option<String>,
    pub(crate) marks: i32,
    pub(crate) order_num: i32,
}

impl QuestionResponse {
    pub(crate) fn from_db(question: Question) -> Self {
        Self {
            id: question.id,
            exam_id: question.exam_id,
            question_text: question.question_text,
            question_type: question.question_type,
            options: question.options.map(|options| options.0),
            correct_answer: question.correct_answer,
            marks: question.marks,
            order_num: question.order_num,
        }
    }

    /// Student view: the answer key never leaves the server.
    pub(crate) fn for_student(question: Question) -> Self {
        Self { correct_answer: None, ..Self::from_db(question) }
    }
}

fn default_question_type() -> QuestionType {
    QuestionType::Text
}

fn parse_datetime_flexible(raw: &str) -> Option<PrimitiveDateTime> {
    if let Some(value) = parse_rfc3339(raw) {
        return Some(value);
    }

    // `datetime-local` inputs arrive without an offset; they are taken as UTC.
    PrimitiveDateTime::parse(raw, &format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"))
        .or_else(|_| {
            PrimitiveDateTime::parse(raw, &format_description!("[year]-[month]-[day]T[hour]:[minute]"))
        })
        .ok()
}

fn deserialize_datetime_flexible<'de, D>(deserializer: D) -> Result<PrimitiveDateTime, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_datetime_flexible(&raw).ok_or_else(|| D::Error::custom(format!("invalid datetime: {raw}")))
}

fn deserialize_option_datetime_flexible<'de, D>(
    deserializer: D,
) -> Result<Option<PrimitiveDateTime>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw {
        Some(value) => parse_datetime_flexible(&value)
            .ok_or_else(|| D::Error::custom(format!("invalid datetime: {value}")))
            .map(Some),
        None => Ok(None),
    }
}
