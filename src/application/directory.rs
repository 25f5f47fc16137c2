use crate::domain::{Hall, Level, Student, Washerman, Wing};
use crate::storage::Repository;

use super::AppError;

/// A wing resolved under a washerman, with all of its students loaded.
#[derive(Debug, Clone)]
pub struct ResolvedWing {
    pub washerman: Washerman,
    pub hall: Hall,
    pub wing: Wing,
    pub students: Vec<Student>,
}

/// A single student resolved under a washerman.
#[derive(Debug, Clone)]
pub struct ResolvedStudent {
    pub washerman: Washerman,
    pub hall: Hall,
    pub wing: Wing,
    pub student: Student,
}

/// Walks Washerman -> Hall -> Wing -> Student with one indexed lookup per
/// level, stopping at the first level that is missing. Read-only.
pub struct DirectoryResolver<'a> {
    repo: &'a Repository,
}

impl<'a> DirectoryResolver<'a> {
    pub fn new(repo: &'a Repository) -> Self {
        Self { repo }
    }

    pub async fn washerman(&self, contact: &str) -> Result<Washerman, AppError> {
        self.repo
            .find_washerman(contact)
            .await?
            .ok_or_else(|| AppError::not_found(Level::Washerman, contact))
    }

    async fn hall_and_wing(
        &self,
        contact: &str,
        hall_name: &str,
        wing_name: &str,
    ) -> Result<(Washerman, Hall, Wing), AppError> {
        let washerman = self.washerman(contact).await?;

        let hall = self
            .repo
            .find_hall(washerman.id, hall_name)
            .await?
            .ok_or_else(|| AppError::not_found(Level::Hall, hall_name))?;

        let wing = self
            .repo
            .find_wing(hall.id, wing_name)
            .await?
            .ok_or_else(|| AppError::not_found(Level::Wing, wing_name))?;

        Ok((washerman, hall, wing))
    }

    /// Resolve down to a wing and load every student in it.
    pub async fn wing(
        &self,
        contact: &str,
        hall_name: &str,
        wing_name: &str,
    ) -> Result<ResolvedWing, AppError> {
        let (washerman, hall, wing) = self.hall_and_wing(contact, hall_name, wing_name).await?;
        let students = self.repo.list_students(wing.id).await?;

        Ok(ResolvedWing {
            washerman,
            hall,
            wing,
            students,
        })
    }

    /// Resolve down to one student by roll.
    pub async fn student(
        &self,
        contact: &str,
        hall_name: &str,
        wing_name: &str,
        roll: &str,
    ) -> Result<ResolvedStudent, AppError> {
        let (washerman, hall, wing) = self.hall_and_wing(contact, hall_name, wing_name).await?;

        let student = self
            .repo
            .find_student(wing.id, roll)
            .await?
            .ok_or_else(|| AppError::not_found(Level::Student, roll))?;

        Ok(ResolvedStudent {
            washerman,
            hall,
            wing,
            student,
        })
    }
}
