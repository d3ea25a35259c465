//! Encrypted descriptor rows

use biogate_core::{BiometricDescriptor, ElementType, Modality, NewAuditEvent, PrincipalId};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

use crate::audit::insert_audit;
use crate::codec::{parse_enum, parse_json, parse_opt_ts, parse_ts, ts};
use crate::error::StoreError;
use crate::Store;

const DESCRIPTOR_COLUMNS: &str = "id, principal_id, modality, ciphertext, shape, element_type, \
     quality_score, enrolled_at, last_used_at, is_active";

fn descriptor_from_row(row: &Row<'_>) -> rusqlite::Result<BiometricDescriptor> {
    Ok(BiometricDescriptor {
        id: row.get(0)?,
        principal: PrincipalId(row.get(1)?),
        modality: parse_enum(2, &row.get::<_, String>(2)?)?,
        ciphertext: row.get(3)?,
        shape: parse_json(4, &row.get::<_, String>(4)?)?,
        element_type: parse_enum(5, &row.get::<_, String>(5)?)?,
        quality_score: row.get(6)?,
        enrolled_at: parse_ts(7, &row.get::<_, String>(7)?)?,
        last_used_at: parse_opt_ts(8, row.get(8)?)?,
        is_active: row.get(9)?,
    })
}

/// Enrollment payload; the ciphertext is produced by the vault
#[derive(Clone)]
pub struct DescriptorRecord {
    pub principal: PrincipalId,
    pub modality: Modality,
    pub ciphertext: Vec<u8>,
    pub shape: Vec<usize>,
    pub element_type: ElementType,
    pub quality_score: f64,
    pub enrolled_at: DateTime<Utc>,
}

impl Store {
    /// The single active descriptor for (principal, modality), if any
    pub fn active_descriptor(
        &self,
        principal: PrincipalId,
        modality: Modality,
    ) -> Result<Option<BiometricDescriptor>, StoreError> {
        let conn = self.conn()?;
        let descriptor = conn
            .query_row(
                &format!(
                    "SELECT {} FROM biometric_descriptors
                     WHERE principal_id = ?1 AND modality = ?2 AND is_active = 1",
                    DESCRIPTOR_COLUMNS
                ),
                params![principal.0, modality.to_string()],
                descriptor_from_row,
            )
            .optional()?;
        Ok(descriptor)
    }

    /// Every descriptor row owned by a principal (active or not)
    pub fn descriptors_for(&self, principal: PrincipalId) -> Result<Vec<BiometricDescriptor>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM biometric_descriptors WHERE principal_id = ?1 ORDER BY id",
            DESCRIPTOR_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![principal.0], descriptor_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Insert or overwrite-in-place the active descriptor, together with its
    /// enrollment audit event
    pub fn upsert_descriptor(
        &self,
        record: &DescriptorRecord,
        event: &NewAuditEvent,
    ) -> Result<BiometricDescriptor, StoreError> {
        let shape = serde_json::to_string(&record.shape)?;
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM biometric_descriptors
                 WHERE principal_id = ?1 AND modality = ?2 AND is_active = 1",
                params![record.principal.0, record.modality.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        let id = match existing {
            Some(id) => {
                tx.execute(
                    "UPDATE biometric_descriptors
                     SET ciphertext = ?1, shape = ?2, element_type = ?3,
                         quality_score = ?4, enrolled_at = ?5
                     WHERE id = ?6",
                    params![
                        record.ciphertext,
                        shape,
                        record.element_type.to_string(),
                        record.quality_score,
                        ts(&record.enrolled_at),
                        id,
                    ],
                )?;
                debug!(descriptor = id, modality = %record.modality, "descriptor re-enrolled in place");
                id
            }
            None => {
                tx.execute(
                    "INSERT INTO biometric_descriptors
                     (principal_id, modality, ciphertext, shape, element_type,
                      quality_score, enrolled_at, last_used_at, is_active)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL, 1)",
                    params![
                        record.principal.0,
                        record.modality.to_string(),
                        record.ciphertext,
                        shape,
                        record.element_type.to_string(),
                        record.quality_score,
                        ts(&record.enrolled_at),
                    ],
                )?;
                tx.last_insert_rowid()
            }
        };

        insert_audit(&tx, event)?;

        let descriptor = tx.query_row(
            &format!("SELECT {} FROM biometric_descriptors WHERE id = ?1", DESCRIPTOR_COLUMNS),
            params![id],
            descriptor_from_row,
        )?;
        tx.commit()?;
        Ok(descriptor)
    }

    /// Stamp last use of a descriptor, together with the authentication audit event
    pub fn touch_descriptor(
        &self,
        descriptor_id: i64,
        at: DateTime<Utc>,
        event: &NewAuditEvent,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let rows = tx.execute(
            "UPDATE biometric_descriptors SET last_used_at = ?1 WHERE id = ?2",
            params![ts(&at), descriptor_id],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound(format!("descriptor {}", descriptor_id)));
        }
        insert_audit(&tx, event)?;
        tx.commit()?;
        Ok(())
    }
}
