//! Application-level certificate operations shared by the REST API and CLI.

use crate::audit::ActivityLog;
use crate::error::{CoaError, CoaResult};
use crate::record::{column_order, CertificateRecord};
use crate::store::RecordStore;
use chrono::{DateTime, Utc};
use coa_types::CertificateCode;
use std::sync::Arc;

/// Fields the server owns: callers may not set these on create or overwrite
/// them on update.
const SERVER_FIELDS: [&str; 3] = ["CODIGO", "FECHA_DE_REGISTRO", "CREADO_POR"];

/// Certificate registry operations on top of a [`RecordStore`].
#[derive(Clone)]
pub struct CertificateService {
    store: Arc<dyn RecordStore>,
    log: Arc<dyn ActivityLog>,
}

impl CertificateService {
    pub fn new(store: Arc<dyn RecordStore>, log: Arc<dyn ActivityLog>) -> Self {
        Self { store, log }
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    pub fn log(&self) -> &dyn ActivityLog {
        self.log.as_ref()
    }

    /// All records, optionally filtered by a case-insensitive substring match
    /// over every field value.
    pub fn search(&self, term: Option<&str>) -> CoaResult<Vec<CertificateRecord>> {
        let records = self.store.fetch_all()?;
        match term.map(str::trim).filter(|t| !t.is_empty()) {
            Some(term) => Ok(records
                .into_iter()
                .filter(|record| record.matches_search(term))
                .collect()),
            None => Ok(records),
        }
    }

    pub fn fetch(&self, code: &str) -> CoaResult<CertificateRecord> {
        self.store
            .fetch_by_code(code)?
            .ok_or_else(|| CoaError::RecordNotFound(code.to_owned()))
    }

    /// Preview of the code the next registration will receive.
    pub fn next_code(&self, now: DateTime<Utc>) -> CoaResult<CertificateCode> {
        use chrono::Datelike;
        self.store.next_code(now.year())
    }

    /// Registers a new certificate record.
    ///
    /// The store assigns the code; the service stamps the registration
    /// timestamp and creator. Caller-provided values for server-owned fields
    /// are discarded, and the stored row carries the full fixed column set so
    /// the sheet shape stays uniform.
    pub fn register(
        &self,
        fields: CertificateRecord,
        created_by: &str,
        now: DateTime<Utc>,
    ) -> CoaResult<CertificateRecord> {
        use chrono::Datelike;
        let code = self.store.next_code(now.year())?;

        let mut record = CertificateRecord::new();
        for column in column_order() {
            if !SERVER_FIELDS.contains(&column.as_str()) {
                record.set(column.clone(), fields.get(&column));
            }
        }
        record.set("CODIGO", code.to_string());
        record.set(
            "FECHA_DE_REGISTRO",
            now.format("%d-%m-%Y %H:%M:%S").to_string(),
        );
        record.set("CREADO_POR", created_by);

        self.store.append(record.clone())?;
        self.log.append(
            created_by,
            "Creó Certificado",
            &format!("Código: {code}"),
        );
        Ok(record)
    }

    /// Updates the record with `code` in place.
    ///
    /// Server-owned fields are preserved from the stored row regardless of
    /// what the caller sent.
    pub fn update(
        &self,
        code: &str,
        fields: CertificateRecord,
        updated_by: &str,
    ) -> CoaResult<CertificateRecord> {
        let records = self.store.fetch_all()?;
        let (position, existing) = records
            .iter()
            .enumerate()
            .find(|(_, record)| record.code() == code)
            .ok_or_else(|| CoaError::RecordNotFound(code.to_owned()))?;

        let mut record = CertificateRecord::new();
        for column in column_order() {
            if SERVER_FIELDS.contains(&column.as_str()) {
                record.set(column.clone(), existing.get(&column));
            } else {
                record.set(column.clone(), fields.get(&column));
            }
        }

        self.store.update_at(position, record.clone())?;
        self.log
            .append(updated_by, "Editó Certificado", &format!("Código: {code}"));
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryLog;
    use crate::store::MemoryStore;
    use chrono::TimeZone;

    fn service() -> CertificateService {
        CertificateService::new(Arc::new(MemoryStore::new()), Arc::new(MemoryLog::new()))
    }

    fn noon(year: i32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_register_assigns_sequential_codes() {
        let service = service();
        let first = service
            .register(CertificateRecord::new(), "qa1", noon(2025))
            .unwrap();
        let second = service
            .register(CertificateRecord::new(), "qa1", noon(2025))
            .unwrap();
        assert_eq!(first.code(), "0001-2025");
        assert_eq!(second.code(), "0002-2025");
    }

    #[test]
    fn test_register_ignores_caller_code() {
        let service = service();
        let mut fields = CertificateRecord::new();
        fields.set("CODIGO", "9999-1999");
        fields.set("PRODUCTO", "Amoxicilina");
        let stored = service.register(fields, "qa1", noon(2025)).unwrap();
        assert_eq!(stored.code(), "0001-2025");
        assert_eq!(stored.get("PRODUCTO"), "Amoxicilina");
        assert_eq!(stored.get("CREADO_POR"), "qa1");
    }

    #[test]
    fn test_update_preserves_server_fields() {
        let service = service();
        let mut fields = CertificateRecord::new();
        fields.set("PRODUCTO", "Amoxicilina");
        let stored = service.register(fields, "qa1", noon(2025)).unwrap();
        let registered_at = stored.get("FECHA_DE_REGISTRO").to_owned();

        let mut edit = CertificateRecord::new();
        edit.set("PRODUCTO", "Amoxicilina 500");
        edit.set("CREADO_POR", "intruso");
        let updated = service.update("0001-2025", edit, "qa2").unwrap();

        assert_eq!(updated.get("PRODUCTO"), "Amoxicilina 500");
        assert_eq!(updated.get("CREADO_POR"), "qa1");
        assert_eq!(updated.get("FECHA_DE_REGISTRO"), registered_at);
    }

    #[test]
    fn test_update_unknown_code_errors() {
        let service = service();
        let err = service.update("0404-2025", CertificateRecord::new(), "qa1");
        assert!(matches!(err, Err(CoaError::RecordNotFound(_))));
    }

    #[test]
    fn test_search_filters_across_fields() {
        let service = service();
        let mut fields = CertificateRecord::new();
        fields.set("PRODUCTO", "Amoxicilina");
        fields.set("LOTE", "L-774");
        service.register(fields, "qa1", noon(2025)).unwrap();

        let mut other = CertificateRecord::new();
        other.set("PRODUCTO", "Ivermectina");
        service.register(other, "qa1", noon(2025)).unwrap();

        assert_eq!(service.search(Some("l-774")).unwrap().len(), 1);
        assert_eq!(service.search(Some("  ")).unwrap().len(), 2);
        assert_eq!(service.search(None).unwrap().len(), 2);
        assert!(service.search(Some("paracetamol")).unwrap().is_empty());
    }
}
