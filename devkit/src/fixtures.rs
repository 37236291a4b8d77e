/*!
Raw payload builders shaped like the remote service's responses

Field names and canned values follow the service's own JSON so tests
exercise the same derivation paths as production.
*/

use serde_json::{json, Value};

pub struct PayloadBuilder;

impl PayloadBuilder {
    /// `/api/agent-coordination`
    pub fn agent_status(status: &str) -> Value {
        Self::agent_status_with(
            status,
            "Forecasting 200% surge in 48 hours",
            "Pre-ordering supplies and adjusting staff",
            "Negotiating resource sharing between 3 hospitals",
        )
    }

    pub fn agent_status_with(status: &str, predictive: &str, operations: &str, coordination: &str) -> Value {
        json!({
            "status": status,
            "predictiveAgent": predictive,
            "operationsAgent": operations,
            "coordinationAgent": coordination
        })
    }

    /// One `/api/hospitals` record.
    pub fn hospital(name: &str, status: &str, total_beds: i64, available_beds: i64) -> Value {
        json!({
            "name": name,
            "status": status,
            "totalBeds": total_beds,
            "availableBeds": available_beds
        })
    }

    /// The service's default hospital list.
    pub fn hospitals() -> Value {
        json!([
            Self::hospital("AIIMS Delhi", "MODERATE", 100, 35),
            Self::hospital("Apollo Hospital", "NORMAL", 120, 55),
            Self::hospital("Max Healthcare", "CRITICAL", 80, 8)
        ])
    }

    /// `/api/predict-surge`
    pub fn prediction(risk_level: &str, risk_score: i64, predicted_surge: f64, recommended_action: &str) -> Value {
        json!({
            "riskLevel": risk_level,
            "riskScore": risk_score,
            "predictedSurge": predicted_surge,
            "recommendedAction": recommended_action,
            "confidence": 85
        })
    }

    /// `/api/simulate-crisis`
    pub fn crisis(crisis_type: &str) -> Value {
        json!({
            "crisis": crisis_type,
            "affectedHospitals": 12,
            "estimatedPatients": 1500,
            "responseTime": "2-4 hours",
            "autoActions": [
                "Alerted staff networks",
                "Triggered supply chain protocols",
                "Notified partner hospitals"
            ]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swasthya_core::derive::{derive_agent, derive_crisis, derive_hospitals, derive_prediction};

    #[test]
    fn test_builders_derive_cleanly() {
        assert!(derive_agent(&PayloadBuilder::agent_status("ACTIVE")).unwrap().is_active());

        let hospitals = derive_hospitals(&PayloadBuilder::hospitals()).unwrap();
        let occupancy: Vec<_> = hospitals.iter().map(|h| h.occupancy_percent).collect();
        assert_eq!(occupancy, vec![Some(65), Some(54), Some(90)]);

        let prediction = derive_prediction(&PayloadBuilder::prediction("LOW", 10, 10.0, "Normal operations")).unwrap();
        assert_eq!(prediction.gauge.remainder, 90);

        assert_eq!(derive_crisis(&PayloadBuilder::crisis("Heatwave")).unwrap().affected_hospitals, 12);
    }
}
