use serde::Serialize;

use crate::schemas::exam::ExamResponse;
use crate::schemas::result::ResultResponse;

#[derive(Debug, Serialize)]
pub(crate) struct StudentDashboard {
    pub(crate) upcoming_exams: Vec<ExamResponse>,
    pub(crate) completed_exams: usize,
    pub(crate) total_submissions: usize,
    pub(crate) average_percentage: Option<f64>,
    pub(crate) recent_results: Vec<ResultResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TeacherDashboard {
    pub(crate) total_exams: i64,
    pub(crate) active_exams: i64,
    pub(crate) total_submissions: i64,
    pub(crate) pending_evaluations: i64,
    pub(crate) recent_exams: Vec<ExamResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AdminDashboard {
    pub(crate) total_users: i64,
    pub(crate) total_teachers: i64,
    pub(crate) total_students: i64,
    pub(crate) total_exams: i64,
    pub(crate) total_submissions: i64,
    pub(crate) recent_exams: Vec<ExamResponse>,
}
