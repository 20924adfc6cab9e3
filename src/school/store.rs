use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use crate::db::Database;
use crate::error::{ApiError, ApiResult};

const TEACHER_SELECT: &str = "SELECT t.id, t.name, t.email, \
     (SELECT COUNT(*) FROM courses c WHERE c.teacher_id = t.id) FROM teachers t";
const COURSE_SELECT: &str = "SELECT c.id, c.name, c.description, c.teacher_id, t.name, \
     (SELECT COUNT(*) FROM students s WHERE s.course_id = c.id) \
     FROM courses c JOIN teachers t ON t.id = c.teacher_id";
const STUDENT_SELECT: &str =
    "SELECT s.id, s.name, s.email, s.course_id, c.name FROM students s JOIN courses c ON c.id = s.course_id";

pub(crate) const STUDENT_NOT_FOUND: &str = "Student not found";
const DUPLICATE_EMAIL: &str = "Email already exists";
const UNKNOWN_COURSE: &str = "Course does not exist";
const UNKNOWN_TEACHER: &str = "Teacher does not exist";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Teacher {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub course_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub teacher_id: i64,
    pub teacher_name: String,
    pub student_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub course_id: i64,
    pub course_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTeacher {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCourse {
    pub name: String,
    pub description: String,
    pub teacher_id: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewStudent {
    pub name: String,
    pub email: String,
    pub course_id: i64,
}

/// Request body for creating a student and for replacing one on update.
#[derive(Debug, Deserialize)]
pub struct StudentInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub course_id: Option<i64>,
}

impl StudentInput {
    pub fn validate(self) -> ApiResult<NewStudent> {
        match (non_blank(self.name), non_blank(self.email), self.course_id) {
            (Some(name), Some(email), Some(course_id)) => Ok(NewStudent { name, email, course_id }),
            _ => Err(ApiError::validation("Name, email and course_id are required")),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CourseInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub teacher_id: Option<i64>,
}

impl CourseInput {
    pub fn validate(self) -> ApiResult<NewCourse> {
        match (non_blank(self.name), self.teacher_id) {
            (Some(name), Some(teacher_id)) => Ok(NewCourse {
                name,
                description: self.description.unwrap_or_default(),
                teacher_id,
            }),
            _ => Err(ApiError::validation("Name and teacher_id are required")),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Three views over student names: containing an "a", sorted by name, and
/// the first two enrolled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameQueries {
    pub filter: Vec<String>,
    pub order_by: Vec<String>,
    pub limit: Vec<String>,
}

/// Teachers own courses, courses enrol students. Both links are foreign keys.
pub struct School<'a> {
    db: &'a Database,
}

impl<'a> School<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub async fn list_teachers(&self) -> ApiResult<Vec<Teacher>> {
        let _guard = self.db.lock().await;
        let query = format!("{TEACHER_SELECT} ORDER BY t.id");
        let mut rows = self.db.connection().query(&query, ()).await?;

        let mut teachers = Vec::new();
        while let Some(row) = rows.next().await? {
            teachers.push(row_to_teacher(&row)?);
        }
        Ok(teachers)
    }

    pub async fn teacher_id_by_email(&self, email: &str) -> ApiResult<Option<i64>> {
        let _guard = self.db.lock().await;
        let mut rows = self
            .db
            .connection()
            .query("SELECT id FROM teachers WHERE email = ?", libsql::params![email])
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    pub async fn count_teachers(&self) -> ApiResult<i64> {
        let _guard = self.db.lock().await;
        self.count("teachers").await
    }

    pub async fn count_courses(&self) -> ApiResult<i64> {
        let _guard = self.db.lock().await;
        self.count("courses").await
    }

    pub async fn insert_teacher(&self, teacher: NewTeacher) -> ApiResult<Teacher> {
        let _guard = self.db.lock().await;
        self.db.begin().await?;
        let result = self.insert_teacher_internal(teacher).await;
        self.db.finish(result).await
    }

    async fn insert_teacher_internal(&self, teacher: NewTeacher) -> ApiResult<Teacher> {
        let id = self
            .insert_returning_id(
                "INSERT INTO teachers (name, email) VALUES (?, ?) RETURNING id",
                vec![teacher.name.into(), teacher.email.into()],
            )
            .await?;
        let query = format!("{TEACHER_SELECT} WHERE t.id = ?");
        self.select_one(&query, id, row_to_teacher).await
    }

    pub async fn list_courses(&self) -> ApiResult<Vec<Course>> {
        let _guard = self.db.lock().await;
        let query = format!("{COURSE_SELECT} ORDER BY c.id");
        let mut rows = self.db.connection().query(&query, ()).await?;

        let mut courses = Vec::new();
        while let Some(row) = rows.next().await? {
            courses.push(row_to_course(&row)?);
        }
        Ok(courses)
    }

    pub async fn insert_course(&self, course: NewCourse) -> ApiResult<Course> {
        let _guard = self.db.lock().await;
        self.db.begin().await?;
        let result = self.insert_course_internal(course).await;
        self.db.finish(result).await
    }

    async fn insert_course_internal(&self, course: NewCourse) -> ApiResult<Course> {
        if !self.exists("teachers", course.teacher_id).await? {
            return Err(ApiError::validation(UNKNOWN_TEACHER));
        }

        let id = self
            .insert_returning_id(
                "INSERT INTO courses (name, description, teacher_id) VALUES (?, ?, ?) RETURNING id",
                vec![course.name.into(), course.description.into(), course.teacher_id.into()],
            )
            .await?;
        let query = format!("{COURSE_SELECT} WHERE c.id = ?");
        self.select_one(&query, id, row_to_course).await
    }

    pub async fn list_students(&self) -> ApiResult<Vec<Student>> {
        let _guard = self.db.lock().await;
        let query = format!("{STUDENT_SELECT} ORDER BY s.id");
        let mut rows = self.db.connection().query(&query, ()).await?;

        let mut students = Vec::new();
        while let Some(row) = rows.next().await? {
            students.push(row_to_student(&row)?);
        }
        Ok(students)
    }

    pub async fn find_student(&self, id: i64) -> ApiResult<Option<Student>> {
        let _guard = self.db.lock().await;
        self.select_student(id).await
    }

    pub async fn insert_student(&self, student: NewStudent) -> ApiResult<Student> {
        let _guard = self.db.lock().await;
        self.db.begin().await?;
        let result = self.insert_student_internal(student).await;
        self.db.finish(result).await
    }

    async fn insert_student_internal(&self, student: NewStudent) -> ApiResult<Student> {
        self.check_enrolment(&student, None).await?;

        let id = self
            .insert_returning_id(
                "INSERT INTO students (name, email, course_id) VALUES (?, ?, ?) RETURNING id",
                vec![student.name.into(), student.email.into(), student.course_id.into()],
            )
            .await?;
        self.select_student(id)
            .await?
            .ok_or_else(|| anyhow!("inserted student {id} vanished").into())
    }

    /// Replaces name, email and course of an existing student.
    pub async fn update_student(&self, id: i64, student: NewStudent) -> ApiResult<Student> {
        let _guard = self.db.lock().await;
        self.db.begin().await?;
        let result = self.update_student_internal(id, student).await;
        self.db.finish(result).await
    }

    async fn update_student_internal(&self, id: i64, student: NewStudent) -> ApiResult<Student> {
        self.check_enrolment(&student, Some(id)).await?;

        let affected = self
            .db
            .connection()
            .execute(
                "UPDATE students SET name = ?, email = ?, course_id = ? WHERE id = ?",
                libsql::params![student.name, student.email, student.course_id, id],
            )
            .await
            .map_err(|e| ApiError::from_write(e, DUPLICATE_EMAIL))?;
        if affected == 0 {
            return Err(ApiError::not_found(STUDENT_NOT_FOUND));
        }

        self.select_student(id)
            .await?
            .ok_or_else(|| ApiError::not_found(STUDENT_NOT_FOUND))
    }

    pub async fn delete_student(&self, id: i64) -> ApiResult<()> {
        let _guard = self.db.lock().await;
        self.db.begin().await?;
        let result = async {
            let affected = self
                .db
                .connection()
                .execute("DELETE FROM students WHERE id = ?", libsql::params![id])
                .await?;
            if affected == 0 {
                return Err(ApiError::not_found(STUDENT_NOT_FOUND));
            }
            Ok::<(), ApiError>(())
        }
        .await;
        self.db.finish(result).await
    }

    pub async fn name_queries(&self) -> ApiResult<NameQueries> {
        let _guard = self.db.lock().await;
        Ok(NameQueries {
            filter: self
                .names("SELECT name FROM students WHERE name LIKE '%a%' ORDER BY id")
                .await?,
            order_by: self.names("SELECT name FROM students ORDER BY name, id").await?,
            limit: self.names("SELECT name FROM students ORDER BY id LIMIT 2").await?,
        })
    }

    /// The referenced course must exist and the email must not belong to
    /// another student.
    async fn check_enrolment(&self, student: &NewStudent, exclude_id: Option<i64>) -> ApiResult<()> {
        if !self.exists("courses", student.course_id).await? {
            return Err(ApiError::validation(UNKNOWN_COURSE));
        }

        let mut rows = self
            .db
            .connection()
            .query(
                "SELECT 1 FROM students WHERE email = ? AND (? IS NULL OR id != ?) LIMIT 1",
                libsql::params![student.email.as_str(), exclude_id, exclude_id],
            )
            .await?;
        if rows.next().await?.is_some() {
            return Err(ApiError::conflict(DUPLICATE_EMAIL));
        }
        Ok(())
    }

    async fn exists(&self, table: &str, id: i64) -> ApiResult<bool> {
        let query = format!("SELECT 1 FROM {table} WHERE id = ?");
        let mut rows = self.db.connection().query(&query, libsql::params![id]).await?;
        Ok(rows.next().await?.is_some())
    }

    async fn count(&self, table: &str) -> ApiResult<i64> {
        let query = format!("SELECT COUNT(*) FROM {table}");
        let mut rows = self.db.connection().query(&query, ()).await?;
        match rows.next().await? {
            Some(row) => Ok(row.get(0)?),
            None => Ok(0),
        }
    }

    async fn names(&self, query: &str) -> ApiResult<Vec<String>> {
        let mut rows = self.db.connection().query(query, ()).await?;
        let mut names = Vec::new();
        while let Some(row) = rows.next().await? {
            names.push(row.get(0)?);
        }
        Ok(names)
    }

    async fn insert_returning_id(&self, query: &str, params: Vec<libsql::Value>) -> ApiResult<i64> {
        let mut rows = self
            .db
            .connection()
            .query(query, params)
            .await
            .map_err(|e| ApiError::from_write(e, DUPLICATE_EMAIL))?;

        match rows.next().await.map_err(|e| ApiError::from_write(e, DUPLICATE_EMAIL))? {
            Some(row) => Ok(row.get(0)?),
            None => Err(anyhow!("insert returned no row").into()),
        }
    }

    async fn select_one<T>(&self, query: &str, id: i64, map: fn(&libsql::Row) -> ApiResult<T>) -> ApiResult<T> {
        let mut rows = self.db.connection().query(query, libsql::params![id]).await?;
        match rows.next().await? {
            Some(row) => map(&row),
            None => Err(anyhow!("row {id} missing after insert").into()),
        }
    }

    async fn select_student(&self, id: i64) -> ApiResult<Option<Student>> {
        let query = format!("{STUDENT_SELECT} WHERE s.id = ?");
        let mut rows = self.db.connection().query(&query, libsql::params![id]).await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row_to_student(&row)?)),
            None => Ok(None),
        }
    }
}

fn row_to_teacher(row: &libsql::Row) -> ApiResult<Teacher> {
    Ok(Teacher {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        course_count: row.get(3)?,
    })
}

fn row_to_course(row: &libsql::Row) -> ApiResult<Course> {
    Ok(Course {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        teacher_id: row.get(3)?,
        teacher_name: row.get(4)?,
        student_count: row.get(5)?,
    })
}

fn row_to_student(row: &libsql::Row) -> ApiResult<Student> {
    Ok(Student {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        course_id: row.get(3)?,
        course_name: row.get(4)?,
    })
}
