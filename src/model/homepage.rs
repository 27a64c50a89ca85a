use serde::{Deserialize, Serialize};

/// Title and description shown on the landing page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HomepageConfig {
    pub title: String,
    pub description: String,
}

impl Default for HomepageConfig {
    fn default() -> Self {
        Self {
            title: "환자 만족도 설문".to_string(),
            description: "설문을 선택해 주세요.".to_string(),
        }
    }
}
