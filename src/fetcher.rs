//! Named patient queries over a [`ConnectionManager`].

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use crate::backend::Backend;
use crate::config::ReadConsistency;
use crate::connection::ConnectionManager;
use crate::error::Result;
use crate::schema::{
    ADDRESS_COLUMNS, ADDRESS_TYPE, BASIC_INFO_COLUMNS, DISEASE_COLUMNS, DISEASE_START_DATE,
    INSURANCE_COLUMNS, INSURANCE_NO, KANA_FULL_NAME, NAME_SEARCH_COLUMNS, PATIENT_ADDRESS,
    PATIENT_BASIC, PATIENT_DISEASE, PATIENT_ID, PATIENT_INSURANCE, REGISTERED_AT,
    REGISTRATION_COLUMNS,
};
use crate::sql::{escape_like, BindValue, Select, SortOrder, Statement};
use crate::types::Record;
use crate::validation::{search_name, DateRange, NameMatch, PatientId};

/// Row limit for name searches when none is given.
pub const DEFAULT_SEARCH_LIMIT: u32 = 100;

const PATIENT_ID_BIND: &str = "patient_id";
const NAME_BIND: &str = "kana_name";
const MAX_ROWS_BIND: &str = "max_rows";
const START_DATE_BIND: &str = "start_date";
const END_DATE_BIND: &str = "end_date";

/// Everything known about one patient.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientAllData {
    /// `None` when no basic-info row exists.
    pub basic: Option<Record>,
    pub address: Vec<Record>,
    pub insurance: Vec<Record>,
    pub diseases: Vec<Record>,
}

/// Statement builders, one per query.
pub mod statements {
    use super::*;

    pub fn basic_info(id: &PatientId) -> Statement {
        Select::new(&PATIENT_BASIC, BASIC_INFO_COLUMNS)
            .filter_eq(PATIENT_ID, PATIENT_ID_BIND, BindValue::Text(id.to_string()))
            .build()
    }

    pub fn address(id: &PatientId) -> Statement {
        Select::new(&PATIENT_ADDRESS, ADDRESS_COLUMNS)
            .filter_eq(PATIENT_ID, PATIENT_ID_BIND, BindValue::Text(id.to_string()))
            .order_by(ADDRESS_TYPE, SortOrder::Asc)
            .build()
    }

    pub fn insurance(id: &PatientId) -> Statement {
        Select::new(&PATIENT_INSURANCE, INSURANCE_COLUMNS)
            .filter_eq(PATIENT_ID, PATIENT_ID_BIND, BindValue::Text(id.to_string()))
            .order_by(INSURANCE_NO, SortOrder::Asc)
            .build()
    }

    pub fn diseases(id: &PatientId) -> Statement {
        Select::new(&PATIENT_DISEASE, DISEASE_COLUMNS)
            .filter_eq(PATIENT_ID, PATIENT_ID_BIND, BindValue::Text(id.to_string()))
            .order_by(DISEASE_START_DATE, SortOrder::Desc)
            .build()
    }

    /// `name` must already be validated and trimmed.
    pub fn by_name(name: &str, mode: NameMatch, limit: u32) -> Statement {
        let select = Select::new(&PATIENT_BASIC, NAME_SEARCH_COLUMNS);
        let select = match mode {
            NameMatch::Exact => {
                select.filter_eq(KANA_FULL_NAME, NAME_BIND, BindValue::Text(name.to_string()))
            }
            NameMatch::Partial => {
                select.filter_like(KANA_FULL_NAME, NAME_BIND, format!("%{}%", escape_like(name)))
            }
        };
        select
            .order_by(PATIENT_ID, SortOrder::Asc)
            .fetch_first(MAX_ROWS_BIND, limit)
            .build()
    }

    /// Registration date on or after the start day and before the day after
    /// the end day.
    pub fn by_registration(start: NaiveDate, end_exclusive: NaiveDate) -> Statement {
        Select::new(&PATIENT_BASIC, REGISTRATION_COLUMNS)
            .filter_on_or_after(REGISTERED_AT, START_DATE_BIND, start)
            .filter_before(REGISTERED_AT, END_DATE_BIND, end_exclusive)
            .order_by(REGISTERED_AT, SortOrder::Desc)
            .build()
    }
}

/// Fetches patient records through a borrowed connection manager.
///
/// Every method validates its input before building a statement, so a
/// rejected input never reaches the database.
pub struct PatientDataFetcher<'a, B: Backend> {
    db: &'a mut ConnectionManager<B>,
    consistency: ReadConsistency,
}

impl<'a, B: Backend> PatientDataFetcher<'a, B> {
    /// Bind a fetcher to `db`, using the read consistency from its config.
    pub fn new(db: &'a mut ConnectionManager<B>) -> Self {
        let consistency = db.config().read_consistency();
        Self { db, consistency }
    }

    /// Override the read consistency of [`get_patient_all_data`](Self::get_patient_all_data).
    pub fn with_consistency(mut self, consistency: ReadConsistency) -> Self {
        self.consistency = consistency;
        self
    }

    pub fn consistency(&self) -> ReadConsistency {
        self.consistency
    }

    /// Basic information (`TTPT01`), `None` if the patient does not exist.
    pub async fn get_patient_basic_info(&mut self, patient_id: &str) -> Result<Option<Record>> {
        let id = PatientId::parse(patient_id)?;
        self.basic_info(&id).await
    }

    /// Addresses (`TTPT02`), ordered by address type.
    pub async fn get_patient_address(&mut self, patient_id: &str) -> Result<Vec<Record>> {
        let id = PatientId::parse(patient_id)?;
        self.address(&id).await
    }

    /// Insurance records (`TTPT11`), ordered by insurance number.
    pub async fn get_patient_insurance(&mut self, patient_id: &str) -> Result<Vec<Record>> {
        let id = PatientId::parse(patient_id)?;
        self.insurance(&id).await
    }

    /// Disease names (`TTBY01`), most recent start date first.
    pub async fn get_patient_diseases(&mut self, patient_id: &str) -> Result<Vec<Record>> {
        let id = PatientId::parse(patient_id)?;
        self.diseases(&id).await
    }

    /// All four sections for one patient.
    ///
    /// The first failing query aborts the whole call; nothing fetched before
    /// it is returned. With [`ReadConsistency::Snapshot`] the four queries
    /// share one read-only transaction, which is ended on every path.
    pub async fn get_patient_all_data(&mut self, patient_id: &str) -> Result<PatientAllData> {
        let id = PatientId::parse(patient_id)?;
        info!(patient_id = %id, consistency = ?self.consistency, "fetching all patient data");

        match self.consistency {
            ReadConsistency::Independent => self.all_data(&id).await,
            ReadConsistency::Snapshot => {
                self.db.begin_read_only().await?;
                let outcome = self.all_data(&id).await;
                let ended = self.db.end_read_only().await;
                match (outcome, ended) {
                    (Ok(data), Ok(())) => Ok(data),
                    (Ok(_), Err(e)) => Err(e),
                    (Err(e), Ok(())) => Err(e),
                    (Err(e), Err(end_err)) => {
                        warn!(error = %end_err, "ending read-only transaction failed after an earlier error");
                        Err(e)
                    }
                }
            }
        }
    }

    /// Patients by kana full name, ordered by patient id, at most
    /// [`DEFAULT_SEARCH_LIMIT`] rows.
    pub async fn search_patients_by_name(
        &mut self,
        name: &str,
        mode: NameMatch,
    ) -> Result<Vec<Record>> {
        self.search_patients_by_name_limited(name, mode, DEFAULT_SEARCH_LIMIT)
            .await
    }

    /// Patients by kana full name, at most `limit` rows (1 to 1000).
    pub async fn search_patients_by_name_limited(
        &mut self,
        name: &str,
        mode: NameMatch,
        limit: u32,
    ) -> Result<Vec<Record>> {
        let name = search_name(name, limit)?;
        let stmt = statements::by_name(name, mode, limit);
        Ok(self.db.execute(&stmt).await?.rows)
    }

    /// Patients registered between `start` and `end`, both days included,
    /// most recent first.
    pub async fn get_patients_by_date_range(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Record>> {
        let range = DateRange::new(start, end)?;
        self.registered_in(&range).await
    }

    /// Like [`get_patients_by_date_range`](Self::get_patients_by_date_range)
    /// with a pre-validated range.
    pub async fn registered_in(&mut self, range: &DateRange) -> Result<Vec<Record>> {
        let stmt = statements::by_registration(range.start(), range.end_exclusive()?);
        Ok(self.db.execute(&stmt).await?.rows)
    }

    async fn all_data(&mut self, id: &PatientId) -> Result<PatientAllData> {
        let basic = self.basic_info(id).await?;
        let address = self.address(id).await?;
        let insurance = self.insurance(id).await?;
        let diseases = self.diseases(id).await?;
        Ok(PatientAllData {
            basic,
            address,
            insurance,
            diseases,
        })
    }

    async fn basic_info(&mut self, id: &PatientId) -> Result<Option<Record>> {
        Ok(self.db.execute(&statements::basic_info(id)).await?.into_first())
    }

    async fn address(&mut self, id: &PatientId) -> Result<Vec<Record>> {
        Ok(self.db.execute(&statements::address(id)).await?.rows)
    }

    async fn insurance(&mut self, id: &PatientId) -> Result<Vec<Record>> {
        Ok(self.db.execute(&statements::insurance(id)).await?.rows)
    }

    async fn diseases(&mut self, id: &PatientId) -> Result<Vec<Record>> {
        Ok(self.db.execute(&statements::diseases(id)).await?.rows)
    }
}
