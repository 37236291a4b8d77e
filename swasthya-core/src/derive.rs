//! Raw payload -> view model derivation.
//!
//! Pure functions: no I/O, no clock. A missing or mistyped field yields
//! `SyncError::MalformedPayload` naming the domain and the field path.

use crate::error::{Domain, Result, SyncError};
use crate::models::{
    AgentActivity, AgentView, CrisisView, GaugePair, HospitalStatus, HospitalView, HospitalsView,
    PredictionView, RiskLevel,
};
use serde_json::{Map, Value};

struct Fields<'a> {
    domain: Domain,
    prefix: String,
    obj: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
    fn of(domain: Domain, raw: &'a Value) -> Result<Self> {
        Self::nested(domain, String::new(), raw)
    }

    fn nested(domain: Domain, prefix: String, raw: &'a Value) -> Result<Self> {
        let obj = raw.as_object().ok_or_else(|| {
            let at = if prefix.is_empty() { "$".to_string() } else { prefix.clone() };
            SyncError::malformed(domain, at)
        })?;
        Ok(Self { domain, prefix, obj })
    }

    fn path(&self, field: &str) -> String {
        if self.prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", self.prefix, field)
        }
    }

    fn bad(&self, field: &str) -> SyncError {
        SyncError::malformed(self.domain, self.path(field))
    }

    fn string(&self, field: &str) -> Result<String> {
        self.obj
            .get(field)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| self.bad(field))
    }

    fn opt_string(&self, field: &str) -> Result<Option<String>> {
        match self.obj.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(self.bad(field)),
        }
    }

    fn number(&self, field: &str) -> Result<f64> {
        self.obj
            .get(field)
            .and_then(Value::as_f64)
            .ok_or_else(|| self.bad(field))
    }

    /// Integers; integral floats such as `88.0` are accepted too.
    fn integer(&self, field: &str) -> Result<i64> {
        let value = self.obj.get(field).ok_or_else(|| self.bad(field))?;
        as_integer(value).ok_or_else(|| self.bad(field))
    }

    fn opt_integer(&self, field: &str) -> Result<Option<i64>> {
        match self.obj.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => as_integer(value).map(Some).ok_or_else(|| self.bad(field)),
        }
    }

    fn count(&self, field: &str) -> Result<u64> {
        let n = self.integer(field)?;
        u64::try_from(n).map_err(|_| self.bad(field))
    }

    fn strings(&self, field: &str) -> Result<Vec<String>> {
        let items = self
            .obj
            .get(field)
            .and_then(Value::as_array)
            .ok_or_else(|| self.bad(field))?;
        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| self.bad(&format!("{field}[{i}]")))
            })
            .collect()
    }
}

fn as_integer(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    let f = value.as_f64()?;
    (f.fract() == 0.0 && f.is_finite() && f.abs() < i64::MAX as f64).then_some(f as i64)
}

pub fn derive_agent(raw: &Value) -> Result<AgentView> {
    let f = Fields::of(Domain::Agent, raw)?;
    // anything but the exact string "ACTIVE" (absent, null, other types) is inactive
    let status = match f.obj.get("status").and_then(Value::as_str) {
        Some("ACTIVE") => AgentActivity::Active,
        _ => AgentActivity::Inactive,
    };

    Ok(AgentView {
        status,
        predictive_agent: f.string("predictiveAgent")?,
        operations_agent: f.string("operationsAgent")?,
        coordination_agent: f.string("coordinationAgent")?,
    })
}

pub fn derive_prediction(raw: &Value) -> Result<PredictionView> {
    let f = Fields::of(Domain::Prediction, raw)?;
    let risk_score = f.integer("riskScore")?;

    Ok(PredictionView {
        risk_level: RiskLevel::parse(&f.string("riskLevel")?),
        risk_score,
        predicted_surge: f.number("predictedSurge")?,
        recommended_action: f.string("recommendedAction")?,
        confidence: f.opt_integer("confidence")?,
        gauge: GaugePair::from_score(risk_score),
    })
}

pub fn derive_crisis(raw: &Value) -> Result<CrisisView> {
    let f = Fields::of(Domain::Crisis, raw)?;

    Ok(CrisisView {
        crisis: f.string("crisis")?,
        affected_hospitals: f.count("affectedHospitals")?,
        estimated_patients: f.count("estimatedPatients")?,
        auto_actions: f.strings("autoActions")?,
        response_time: f.opt_string("responseTime")?,
    })
}

pub fn derive_hospitals(raw: &Value) -> Result<HospitalsView> {
    let records = raw
        .as_array()
        .ok_or_else(|| SyncError::malformed(Domain::Hospitals, "$"))?;

    records
        .iter()
        .enumerate()
        .map(|(i, record)| derive_hospital(format!("[{i}]"), record))
        .collect()
}

fn derive_hospital(prefix: String, raw: &Value) -> Result<HospitalView> {
    let f = Fields::nested(Domain::Hospitals, prefix, raw)?;

    let total = f.integer("totalBeds")?;
    let total_beds = u32::try_from(total).map_err(|_| f.bad("totalBeds"))?;
    let available = f.integer("availableBeds")?;
    let available_beds = u32::try_from(available)
        .ok()
        .filter(|beds| *beds <= total_beds)
        .ok_or_else(|| f.bad("availableBeds"))?;

    let status = HospitalStatus::parse(&f.string("status")?);
    let severity_rank = status.severity_rank();

    Ok(HospitalView {
        name: f.string("name")?,
        status,
        total_beds,
        available_beds,
        occupancy_percent: occupancy_percent(total_beds, available_beds),
        severity_rank,
    })
}

/// `round((total - available) / total * 100)`, undefined for an empty ward.
pub fn occupancy_percent(total_beds: u32, available_beds: u32) -> Option<u8> {
    if total_beds == 0 || available_beds > total_beds {
        return None;
    }
    let occupied = f64::from(total_beds - available_beds);
    Some((occupied / f64::from(total_beds) * 100.0).round() as u8)
}
