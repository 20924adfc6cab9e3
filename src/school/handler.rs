use axum::{
    body::Bytes,
    extract::{Path, State},
    response::Response,
};
use serde::{Deserialize, Serialize};

use super::store::STUDENT_NOT_FOUND;
use super::{Course, CourseInput, School, Student, StudentInput, Teacher};
use crate::api::Message;
use crate::error::{ApiError, ApiResult};
use crate::handler::AppState;
use crate::model::parse_json_body;
use crate::{created_response, good_response, parse_id};

#[derive(Debug, Serialize, Deserialize)]
pub struct TeacherList {
    pub teachers: Vec<Teacher>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CourseList {
    pub courses: Vec<Course>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StudentList {
    pub students: Vec<Student>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SavedCourse {
    pub message: String,
    pub course: Course,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SavedStudent {
    pub message: String,
    pub student: Student,
}

pub async fn list_teachers(State(state): State<AppState>) -> ApiResult<Response> {
    let teachers = School::new(&state.db).list_teachers().await?;
    tracing::info!(count = teachers.len(), "got teachers");
    Ok(good_response(TeacherList { teachers }))
}

pub async fn list_courses(State(state): State<AppState>) -> ApiResult<Response> {
    let courses = School::new(&state.db).list_courses().await?;
    tracing::info!(count = courses.len(), "got courses");
    Ok(good_response(CourseList { courses }))
}

pub async fn create_course(State(state): State<AppState>, body: Bytes) -> ApiResult<Response> {
    let input = parse_json_body::<CourseInput>(&body)?.validate()?;
    let course = School::new(&state.db).insert_course(input).await?;

    tracing::info!(id = course.id, teacher_id = course.teacher_id, "created course");
    Ok(created_response(SavedCourse {
        message: "Course added successfully".to_owned(),
        course,
    }))
}

pub async fn list_students(State(state): State<AppState>) -> ApiResult<Response> {
    let students = School::new(&state.db).list_students().await?;
    tracing::info!(count = students.len(), "got students");
    Ok(good_response(StudentList { students }))
}

pub async fn create_student(State(state): State<AppState>, body: Bytes) -> ApiResult<Response> {
    let input = parse_json_body::<StudentInput>(&body)?.validate()?;
    let student = School::new(&state.db).insert_student(input).await?;

    tracing::info!(id = student.id, course_id = student.course_id, "created student");
    Ok(created_response(SavedStudent {
        message: "Student added successfully".to_owned(),
        student,
    }))
}

pub async fn update_student(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Response> {
    let id = parse_id(&id, STUDENT_NOT_FOUND)?;
    let school = School::new(&state.db);

    if school.find_student(id).await?.is_none() {
        return Err(ApiError::not_found(STUDENT_NOT_FOUND));
    }

    let input = parse_json_body::<StudentInput>(&body)?.validate()?;
    let student = school.update_student(id, input).await?;

    tracing::info!(id = student.id, "updated student");
    Ok(good_response(SavedStudent {
        message: "Student updated successfully".to_owned(),
        student,
    }))
}

pub async fn delete_student(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Response> {
    let id = parse_id(&id, STUDENT_NOT_FOUND)?;
    School::new(&state.db).delete_student(id).await?;

    tracing::info!(id, "deleted student");
    Ok(good_response(Message {
        message: "Student deleted successfully".to_owned(),
    }))
}

pub async fn student_name_queries(State(state): State<AppState>) -> ApiResult<Response> {
    let queries = School::new(&state.db).name_queries().await?;
    Ok(good_response(queries))
}
