//! Optional enrichment of new requests by a content classifier.
//!
//! Classification is best effort: any failure, or a result that does not make
//! sense, is treated as "no classification" and the user's own urgency wins.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::models::{Urgency, DEFAULT_CATEGORY};

const CLASSIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Classifier verdict for a free-text description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub category: String,
    /// 1 (no threat to life) to 10 (immediate threat).
    pub urgency_score: f64,
    #[serde(default)]
    pub estimated_people: Option<u32>,
    #[serde(default)]
    pub suggested_resources: Vec<String>,
}

impl Classification {
    pub fn is_well_formed(&self) -> bool {
        !self.category.trim().is_empty() && (1.0..=10.0).contains(&self.urgency_score)
    }
}

#[async_trait]
pub trait Classifier: Send + Sync {
    /// `None` when the classifier is unavailable or returned nothing usable.
    async fn classify(&self, text: &str) -> Option<Classification>;
}

/// Calls a classification endpoint with `{"text": ...}`.
#[derive(Debug, Clone)]
pub struct HttpClassifier {
    url: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    text: &'a str,
}

impl HttpClassifier {
    pub fn new(url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(CLASSIFY_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            url: url.into(),
            client,
        }
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn classify(&self, text: &str) -> Option<Classification> {
        let response = match self
            .client
            .post(&self.url)
            .json(&ClassifyRequest { text })
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("Classifier unreachable: {}", e);
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::debug!("Classifier returned {}", response.status());
            return None;
        }

        match response.json::<Classification>().await {
            Ok(result) if result.is_well_formed() => Some(result),
            Ok(result) => {
                tracing::debug!("Ignoring malformed classification: {:?}", result);
                None
            }
            Err(e) => {
                tracing::debug!("Unreadable classification: {}", e);
                None
            }
        }
    }
}

/// Category and urgency for a new request given an optional classification.
///
/// A score above 8 raises urgency to critical and above 5 to at least high;
/// otherwise the user's urgency stands. The classifier never lowers urgency.
pub fn enrich(user_urgency: Urgency, classification: Option<&Classification>) -> (String, Urgency) {
    match classification.filter(|c| c.is_well_formed()) {
        Some(c) => {
            let urgency = if c.urgency_score > 8.0 {
                Urgency::Critical
            } else if c.urgency_score > 5.0 {
                user_urgency.max(Urgency::High)
            } else {
                user_urgency
            };
            (c.category.trim().to_string(), urgency)
        }
        None => (DEFAULT_CATEGORY.to_string(), user_urgency),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(category: &str, score: f64) -> Classification {
        Classification {
            category: category.to_string(),
            urgency_score: score,
            estimated_people: None,
            suggested_resources: Vec::new(),
        }
    }

    #[test]
    fn test_enrich_thresholds() {
        assert_eq!(
            enrich(Urgency::Low, Some(&verdict("Medical", 9.0))),
            ("Medical".to_string(), Urgency::Critical)
        );
        assert_eq!(
            enrich(Urgency::Low, Some(&verdict("Flood", 6.0))),
            ("Flood".to_string(), Urgency::High)
        );
        // exactly 8 is high, exactly 5 keeps the user's choice
        assert_eq!(enrich(Urgency::Low, Some(&verdict("Fire", 8.0))).1, Urgency::High);
        assert_eq!(enrich(Urgency::Medium, Some(&verdict("Fire", 5.0))).1, Urgency::Medium);
    }

    #[test]
    fn test_enrich_keeps_higher_user_urgency() {
        assert_eq!(
            enrich(Urgency::Critical, Some(&verdict("Fire", 6.0))),
            ("Fire".to_string(), Urgency::Critical)
        );
        assert_eq!(enrich(Urgency::Critical, Some(&verdict("Fire", 2.0))).1, Urgency::Critical);
    }

    #[test]
    fn test_enrich_without_classification() {
        assert_eq!(
            enrich(Urgency::High, None),
            (DEFAULT_CATEGORY.to_string(), Urgency::High)
        );
    }

    #[test]
    fn test_enrich_ignores_malformed() {
        assert_eq!(
            enrich(Urgency::Low, Some(&verdict("Medical", 42.0))),
            (DEFAULT_CATEGORY.to_string(), Urgency::Low)
        );
        assert_eq!(
            enrich(Urgency::Low, Some(&verdict("  ", 9.0))),
            (DEFAULT_CATEGORY.to_string(), Urgency::Low)
        );
    }

    #[test]
    fn test_parse_camel_case_response() {
        let json = r#"{
            "category": "Medical",
            "urgencyScore": 7,
            "estimatedPeople": 3,
            "suggestedResources": ["ambulance", "first aid"]
        }"#;
        let parsed: Classification = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.urgency_score, 7.0);
        assert_eq!(parsed.estimated_people, Some(3));
        assert_eq!(parsed.suggested_resources.len(), 2);
    }

    #[tokio::test]
    async fn test_unreachable_classifier_is_none() {
        let classifier = HttpClassifier::new("http://127.0.0.1:9/classify");
        assert!(classifier.classify("water rising fast").await.is_none());
    }
}
