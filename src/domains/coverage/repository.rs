use crate::domains::coverage::types::{CountyRef, ParticipationRecord, ParticipationRow};
use crate::errors::{DbError, DomainResult};
use async_trait::async_trait;
use sqlx::{query_as, SqlitePool};

/// Data-access collaborator producing flat, pre-joined participation records
#[async_trait]
pub trait ParticipationRepository: Send + Sync {
    /// Every active enrollment joined with its training and facility chain.
    /// Rows whose chain is broken come back with `None` links.
    async fn fetch_participation(&self) -> DomainResult<Vec<ParticipationRecord>>;

    /// Every active county with its county-wide facility count
    async fn fetch_counties(&self) -> DomainResult<Vec<CountyRef>>;
}

/// SQLite implementation for ParticipationRepository
#[derive(Debug, Clone)]
pub struct SqliteParticipationRepository {
    pool: SqlitePool,
}

impl SqliteParticipationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ParticipationRepository for SqliteParticipationRepository {
    async fn fetch_participation(&self) -> DomainResult<Vec<ParticipationRecord>> {
        let rows = query_as::<_, ParticipationRow>(
            "SELECT
                t.id AS training_id,
                t.type AS training_type,
                t.program_id AS program_id,
                t.start_date AS start_date,
                t.end_date AS end_date,
                f.id AS facility_id,
                s.id AS subcounty_id,
                c.id AS county_id,
                tp.user_id AS participant_user_id,
                u.department_id AS department_id,
                u.cadre_id AS cadre_id
             FROM training_participants tp
             JOIN trainings t ON tp.training_id = t.id AND t.deleted_at IS NULL
             JOIN users u ON tp.user_id = u.id
             LEFT JOIN facilities f ON u.facility_id = f.id AND f.deleted_at IS NULL
             LEFT JOIN subcounties s ON f.subcounty_id = s.id AND s.deleted_at IS NULL
             LEFT JOIN counties c ON s.county_id = c.id AND c.deleted_at IS NULL
             WHERE tp.deleted_at IS NULL
             ORDER BY t.id, tp.id"
        )
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        let total = rows.len();
        let records: Vec<ParticipationRecord> = rows
            .into_iter()
            .filter_map(ParticipationRow::into_record)
            .collect();

        log::debug!("Loaded {} participation records ({} rows read)", records.len(), total);
        Ok(records)
    }

    async fn fetch_counties(&self) -> DomainResult<Vec<CountyRef>> {
        let counties = query_as::<_, CountyRef>(
            "SELECT c.id AS id, c.name AS name, COUNT(f.id) AS total_facilities
             FROM counties c
             LEFT JOIN subcounties s ON s.county_id = c.id AND s.deleted_at IS NULL
             LEFT JOIN facilities f ON f.subcounty_id = s.id AND f.deleted_at IS NULL
             WHERE c.deleted_at IS NULL
             GROUP BY c.id, c.name
             ORDER BY c.name ASC"
        )
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(counties)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::coverage::types::TrainingType;
    use chrono::NaiveDate;
    use sqlx::sqlite::SqlitePoolOptions;

    const SCHEMA: &str = "
        CREATE TABLE counties (id INTEGER PRIMARY KEY, name TEXT NOT NULL, deleted_at TEXT);
        CREATE TABLE subcounties (id INTEGER PRIMARY KEY, county_id INTEGER, name TEXT, deleted_at TEXT);
        CREATE TABLE facilities (id INTEGER PRIMARY KEY, subcounty_id INTEGER, name TEXT, deleted_at TEXT);
        CREATE TABLE users (id INTEGER PRIMARY KEY, facility_id INTEGER, department_id INTEGER, cadre_id INTEGER);
        CREATE TABLE trainings (
            id INTEGER PRIMARY KEY, type TEXT NOT NULL, program_id INTEGER,
            start_date TEXT, end_date TEXT, deleted_at TEXT
        );
        CREATE TABLE training_participants (
            id INTEGER PRIMARY KEY, training_id INTEGER NOT NULL, user_id INTEGER NOT NULL, deleted_at TEXT
        );
    ";

    const SEED: &str = "
        INSERT INTO counties (id, name) VALUES (1, 'Nairobi'), (2, 'Trans Nzoia'), (3, 'Kisumu');
        INSERT INTO counties (id, name, deleted_at) VALUES (4, 'Retired', '2024-01-01');
        INSERT INTO subcounties (id, county_id, name) VALUES (10, 1, 'Westlands'), (20, 2, 'Kiminini');
        INSERT INTO facilities (id, subcounty_id, name) VALUES
            (100, 10, 'Westlands HC'), (101, 10, 'Parklands Dispensary'), (200, 20, 'Kiminini HC');
        INSERT INTO facilities (id, subcounty_id, name, deleted_at) VALUES (102, 10, 'Closed', '2023-06-01');
        INSERT INTO users (id, facility_id, department_id, cadre_id) VALUES
            (1, 100, 5, 7), (2, 200, NULL, NULL), (3, NULL, NULL, NULL), (4, 999, NULL, NULL);
        INSERT INTO trainings (id, type, program_id, start_date, end_date) VALUES
            (1, 'program_training', 11, '2024-05-02', '2024-05-04'),
            (2, 'facility_mentorship', NULL, '2024-06-10 09:00:00', NULL),
            (3, 'webinar', NULL, NULL, NULL);
        INSERT INTO trainings (id, type, start_date, deleted_at) VALUES (4, 'program_training', '2024-05-01', '2024-05-02');
        INSERT INTO training_participants (id, training_id, user_id) VALUES
            (1, 1, 1), (2, 2, 2), (3, 1, 3), (4, 1, 4), (5, 3, 1), (6, 4, 1);
        INSERT INTO training_participants (id, training_id, user_id, deleted_at) VALUES (7, 2, 1, '2024-07-01');
    ";

    async fn seeded_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory pool");
        sqlx::raw_sql(SCHEMA).execute(&pool).await.expect("schema");
        sqlx::raw_sql(SEED).execute(&pool).await.expect("seed");
        pool
    }

    #[tokio::test]
    async fn test_fetch_participation_flattens_chain() {
        let repo = SqliteParticipationRepository::new(seeded_pool().await);
        let records = repo.fetch_participation().await.unwrap();

        // Unknown training type and soft-deleted rows never arrive
        assert_eq!(records.len(), 4);

        let complete = &records[0];
        assert_eq!(complete.training_id, 1);
        assert_eq!(complete.training_type, TrainingType::ProgramTraining);
        assert_eq!(complete.program_id, Some(11));
        assert_eq!(complete.start_date, NaiveDate::from_ymd_opt(2024, 5, 2));
        assert_eq!(complete.county_id, Some(1));
        assert_eq!(complete.department_id, Some(5));
        assert!(complete.geography().is_some());

        // User without a facility and user with a dangling facility keep NULL links
        let broken: Vec<_> = records.iter().filter(|r| r.geography().is_none()).collect();
        assert_eq!(broken.len(), 2);

        let mentorship = records.iter().find(|r| r.training_id == 2).unwrap();
        assert_eq!(mentorship.training_type, TrainingType::FacilityMentorship);
        assert_eq!(mentorship.start_date, NaiveDate::from_ymd_opt(2024, 6, 10));
        assert_eq!(mentorship.county_id, Some(2));
    }

    #[tokio::test]
    async fn test_fetch_counties_counts_active_facilities() {
        let repo = SqliteParticipationRepository::new(seeded_pool().await);
        let counties = repo.fetch_counties().await.unwrap();

        assert_eq!(
            counties,
            vec![
                CountyRef::new(3, "Kisumu", 0),
                CountyRef::new(1, "Nairobi", 2),
                CountyRef::new(2, "Trans Nzoia", 1),
            ]
        );
    }
}
