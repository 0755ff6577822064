use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Recipe as produced by the AI providers or the fallback table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooking_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeResult {
    #[serde(default)]
    pub recipes: Vec<Recipe>,
    #[serde(default)]
    pub suggested_ingredients: Vec<String>,
}

/// Cached provider answer keyed by the canonical ingredient list
#[derive(Debug, Clone, FromRow)]
pub struct RecipeCache {
    pub id: i32,
    pub ingredients: String,
    pub result: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SavedRecipe {
    pub id: i32,
    pub user_id: i32,
    pub title: String,
    pub description: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSavedRecipe {
    pub user_id: i32,
    pub title: String,
    pub description: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_tolerates_missing_fields() {
        let parsed: RecipeResult =
            serde_json::from_str(r#"{"recipes":[{"title":"شكشوكة"}]}"#).unwrap();
        assert_eq!(parsed.recipes.len(), 1);
        assert!(parsed.recipes[0].ingredients.is_empty());
        assert!(parsed.suggested_ingredients.is_empty());
    }
}
