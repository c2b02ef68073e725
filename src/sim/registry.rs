//! Patient registry
//!
//! Fixed-size ward of patients. Ids are stable indices `0..count` and
//! iteration is always by id.

use serde::{Deserialize, Serialize};

use super::events::GameSink;
use crate::error::GameError;

/// Patient condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PatientStatus {
    #[default]
    Normal,
    Critical,
    Saved,
}

impl PatientStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatientStatus::Normal => "Normal",
            PatientStatus::Critical => "Critical",
            PatientStatus::Saved => "Saved",
        }
    }
}

/// A monitored infant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: u32,
    pub status: PatientStatus,
    /// Virtual time the patient turned critical
    pub critical_since_ms: Option<u64>,
    /// Grace time left while the grace timer is frozen
    pub remaining_grace_ms: Option<u64>,
}

impl Patient {
    fn new(id: u32) -> Self {
        Self {
            id,
            status: PatientStatus::Normal,
            critical_since_ms: None,
            remaining_grace_ms: None,
        }
    }
}

/// Owner of every patient in a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRegistry {
    patients: Vec<Patient>,
}

impl EntityRegistry {
    /// Create `count` patients, all Normal
    pub fn create(count: u32) -> Result<Self, GameError> {
        if count == 0 {
            return Err(GameError::config("patient_count", "must be at least 1"));
        }
        Ok(Self {
            patients: (0..count).map(Patient::new).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.patients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patients.is_empty()
    }

    pub fn get(&self, id: u32) -> Option<&Patient> {
        self.patients.get(id as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Patient> {
        self.patients.iter()
    }

    fn get_mut(&mut self, id: u32) -> Result<&mut Patient, GameError> {
        let count = self.patients.len() as u32;
        self.patients
            .get_mut(id as usize)
            .ok_or(GameError::UnknownEntity { id, count })
    }

    /// Change a patient's status and notify the sink
    pub fn set_status(
        &mut self,
        id: u32,
        status: PatientStatus,
        now_ms: u64,
        sink: &mut dyn GameSink,
    ) -> Result<(), GameError> {
        let patient = self.get_mut(id)?;
        patient.status = status;
        if status == PatientStatus::Critical {
            patient.critical_since_ms = Some(now_ms);
        } else {
            patient.critical_since_ms = None;
            patient.remaining_grace_ms = None;
        }
        sink.on_patient_status_changed(id, status);
        Ok(())
    }

    /// Patients with the given status, ordered by id
    pub fn list_by_status(&self, status: PatientStatus) -> Vec<&Patient> {
        self.patients.iter().filter(|p| p.status == status).collect()
    }

    /// Record the grace time left on a frozen timer
    pub fn freeze_grace(&mut self, id: u32, remaining_ms: u64) -> Result<(), GameError> {
        self.get_mut(id)?.remaining_grace_ms = Some(remaining_ms);
        Ok(())
    }

    pub fn thaw_grace(&mut self, id: u32) -> Result<(), GameError> {
        self.get_mut(id)?.remaining_grace_ms = None;
        Ok(())
    }

    /// Put every patient back to Normal without notifying anyone
    pub fn reset(&mut self) {
        for patient in &mut self.patients {
            *patient = Patient::new(patient.id);
        }
    }
}
