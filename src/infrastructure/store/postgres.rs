use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgRow, Row};
use uuid::Uuid;

use super::{ReportStore, UserDirectory};
use crate::{
    domain::models::{
        Coordinates, Location, NewReport, Report, ReportPatch, ReportStatus, ReportType, Role,
        User,
    },
    infrastructure::db::PgPool,
    services::errors::ServiceError,
    validation::rules::validate_new_report,
};

const REPORT_COLUMNS: &str = "id, owner_id, report_type, description, address, city, postal_code, country, \
     longitude, latitude, status, assignee_id, version, created_at, updated_at";

pub struct PgReportStore {
    pool: PgPool,
}

impl PgReportStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn list_where(
        &self,
        predicate: &str,
        param: Option<Uuid>,
    ) -> Result<Vec<Report>, ServiceError> {
        let sql = format!(
            "SELECT {REPORT_COLUMNS} FROM reports {predicate} ORDER BY created_at DESC, id DESC"
        );
        let mut query = sqlx::query(&sql);
        if let Some(param) = param {
            query = query.bind(param);
        }
        let rows = query.fetch_all(&self.pool).await.map_err(map_sqlx_error)?;
        rows.into_iter().map(map_report).collect()
    }
}

#[async_trait]
impl ReportStore for PgReportStore {
    async fn create(&self, report: NewReport) -> Result<Uuid, ServiceError> {
        validate_new_report(&report)?;
        let id = Uuid::new_v4();
        let now = Utc::now();
        let coordinates = report.location.coordinates;
        sqlx::query(
            "INSERT INTO reports (id, owner_id, report_type, description, address, city, postal_code, country,
                                  longitude, latitude, status, assignee_id, version, created_at, updated_at)
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15)",
        )
        .bind(id)
        .bind(report.owner_id)
        .bind(report.report_type)
        .bind(report.description)
        .bind(report.location.address)
        .bind(report.location.city)
        .bind(report.location.postal_code)
        .bind(report.location.country)
        .bind(coordinates.map(|point| point.longitude))
        .bind(coordinates.map(|point| point.latitude))
        .bind(ReportStatus::Submitted)
        .bind::<Option<Uuid>>(None)
        .bind(0_i32)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(id)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Report, ServiceError> {
        let sql = format!("SELECT {REPORT_COLUMNS} FROM reports WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        match row {
            Some(row) => map_report(row),
            None => Err(ServiceError::NotFound),
        }
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<Report>, ServiceError> {
        self.list_where("WHERE owner_id = $1", Some(owner_id)).await
    }

    async fn list_by_assignee(&self, assignee_id: Uuid) -> Result<Vec<Report>, ServiceError> {
        self.list_where("WHERE assignee_id = $1", Some(assignee_id))
            .await
    }

    async fn list_all(&self) -> Result<Vec<Report>, ServiceError> {
        self.list_where("", None).await
    }

    async fn update(
        &self,
        id: Uuid,
        expected_version: i32,
        patch: ReportPatch,
    ) -> Result<Report, ServiceError> {
        // Single conditional statement: either the whole patch lands with the
        // version bump or nothing changes.
        let sql = format!(
            "UPDATE reports
             SET status = COALESCE($1, status),
                 assignee_id = CASE WHEN $2 THEN $3 ELSE assignee_id END,
                 version = version + 1,
                 updated_at = $4
             WHERE id = $5 AND version = $6
             RETURNING {REPORT_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(patch.status)
            .bind(patch.assignee_id.is_some())
            .bind(patch.assignee_id.flatten())
            .bind(Utc::now())
            .bind(id)
            .bind(expected_version)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        if let Some(row) = row {
            return map_report(row);
        }

        let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(1) FROM reports WHERE id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        if exists == 0 {
            Err(ServiceError::NotFound)
        } else {
            Err(ServiceError::Conflict)
        }
    }

    async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = sqlx::query("DELETE FROM reports WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound);
        }
        Ok(())
    }
}

pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, ServiceError> {
        sqlx::query_as::<_, User>(
            "SELECT id, name, email, role, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, ServiceError> {
        sqlx::query_as::<_, User>(
            "SELECT id, name, email, role, created_at FROM users WHERE lower(email) = lower($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn list_by_role(&self, role: Role) -> Result<Vec<User>, ServiceError> {
        sqlx::query_as::<_, User>(
            "SELECT id, name, email, role, created_at FROM users WHERE role = $1 ORDER BY name ASC, id ASC",
        )
        .bind(role)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn insert(&self, user: User) -> Result<(), ServiceError> {
        sqlx::query(
            "INSERT INTO users (id, name, email, role, created_at) VALUES ($1,$2,$3,$4,$5)",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.role)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|err| match err {
            sqlx::Error::Database(db) if db.is_unique_violation() => ServiceError::Validation(
                format!("a user with email {} already exists", user.email),
            ),
            other => map_sqlx_error(other),
        })?;
        Ok(())
    }
}

fn map_report(row: PgRow) -> Result<Report, ServiceError> {
    let longitude = row
        .try_get::<Option<f64>, _>("longitude")
        .map_err(map_sqlx_error)?;
    let latitude = row
        .try_get::<Option<f64>, _>("latitude")
        .map_err(map_sqlx_error)?;
    let coordinates = match (longitude, latitude) {
        (Some(longitude), Some(latitude)) => Some(Coordinates {
            longitude,
            latitude,
        }),
        _ => None,
    };

    Ok(Report {
        id: row.try_get("id").map_err(map_sqlx_error)?,
        owner_id: row.try_get("owner_id").map_err(map_sqlx_error)?,
        report_type: row
            .try_get::<ReportType, _>("report_type")
            .map_err(map_sqlx_error)?,
        description: row.try_get("description").map_err(map_sqlx_error)?,
        location: Location {
            address: row.try_get("address").map_err(map_sqlx_error)?,
            city: row.try_get("city").map_err(map_sqlx_error)?,
            postal_code: row.try_get("postal_code").map_err(map_sqlx_error)?,
            country: row.try_get("country").map_err(map_sqlx_error)?,
            coordinates,
        },
        status: row
            .try_get::<ReportStatus, _>("status")
            .map_err(map_sqlx_error)?,
        assignee_id: row
            .try_get::<Option<Uuid>, _>("assignee_id")
            .map_err(map_sqlx_error)?,
        version: row.try_get::<i32, _>("version").map_err(map_sqlx_error)?,
        created_at: row.try_get("created_at").map_err(map_sqlx_error)?,
        updated_at: row.try_get("updated_at").map_err(map_sqlx_error)?,
    })
}

fn map_sqlx_error(err: sqlx::Error) -> ServiceError {
    ServiceError::Internal(err.to_string())
}
