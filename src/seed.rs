use crate::catalog::Catalog;
use crate::db::Database;
use crate::error::ApiResult;
use crate::model::NewBook;
use crate::school::{NewCourse, NewTeacher, School};

pub const SAMPLE_BOOKS: [(&str, &str, i64, &str); 3] = [
    ("Python Crash Course", "Eric Matthes", 2019, "978-1593279288"),
    ("Flask Web Development", "Miguel Grinberg", 2018, "978-1491991732"),
    ("Clean Code", "Robert C. Martin", 2008, "978-0132350884"),
];

pub const SAMPLE_TEACHERS: [(&str, &str); 2] = [("Mr. Sharma", "sharma@school.com"), ("Ms. Patil", "patil@school.com")];

/// Course name, description, and the email of the teacher running it.
pub const SAMPLE_COURSES: [(&str, &str, &str); 3] = [
    ("Python Basics", "Learn Python fundamentals", "sharma@school.com"),
    ("Web Development", "HTML, CSS, Flask", "patil@school.com"),
    ("Data Science", "Data analysis with Python", "sharma@school.com"),
];

/// Inserts the sample books when the catalog is empty. Returns how many were
/// added.
pub async fn seed_sample_books(db: &Database) -> ApiResult<usize> {
    let catalog = Catalog::new(db);
    if catalog.count().await? > 0 {
        tracing::debug!("catalog already has books, skipping seed");
        return Ok(0);
    }

    for (title, author, year, isbn) in SAMPLE_BOOKS {
        catalog
            .insert(NewBook {
                title: title.to_owned(),
                author: author.to_owned(),
                year: Some(year),
                isbn: Some(isbn.to_owned()),
            })
            .await?;
    }

    tracing::info!("sample books added");
    Ok(SAMPLE_BOOKS.len())
}

/// Adds the sample teachers when there are none, then the sample courses when
/// there are none. Returns how many rows were added.
pub async fn seed_school(db: &Database) -> ApiResult<usize> {
    let school = School::new(db);
    let mut added = 0;

    if school.count_teachers().await? == 0 {
        for (name, email) in SAMPLE_TEACHERS {
            school
                .insert_teacher(NewTeacher {
                    name: name.to_owned(),
                    email: email.to_owned(),
                })
                .await?;
            added += 1;
        }
    }

    if school.count_courses().await? == 0 {
        for (name, description, teacher_email) in SAMPLE_COURSES {
            let Some(teacher_id) = school.teacher_id_by_email(teacher_email).await? else {
                tracing::warn!(course = name, teacher_email, "teacher missing, skipping sample course");
                continue;
            };
            school
                .insert_course(NewCourse {
                    name: name.to_owned(),
                    description: description.to_owned(),
                    teacher_id,
                })
                .await?;
            added += 1;
        }
    }

    tracing::info!(added, "school sample data checked");
    Ok(added)
}
