use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

use crate::db::RecipeRepository;
use crate::error::{AppError, Result};
use crate::middleware::AuthenticatedUser;
use crate::models::NewSavedRecipe;
use crate::services::substitutions::{find_substitutes, SubstitutionLanguage};
use crate::AppState;

const INVALID_INGREDIENTS: &str = "Invalid ingredients. Please provide an array of ingredients.";

#[derive(Debug, Deserialize)]
pub struct GenerateRecipesRequest {
    #[serde(default)]
    pub ingredients: Value,
}

#[derive(Debug, Deserialize)]
pub struct SubstitutionQuery {
    pub lang: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SaveRecipeRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub description: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub instructions: Vec<String>,
}

/// Accept only a non-empty JSON array of strings.
fn parse_ingredients(value: Value) -> Result<Vec<String>> {
    let invalid = || AppError::BadRequest(INVALID_INGREDIENTS.to_string());
    let Value::Array(items) = value else {
        return Err(invalid());
    };
    if items.is_empty() {
        return Err(invalid());
    }
    items
        .into_iter()
        .map(|item| match item {
            Value::String(s) => Ok(s),
            _ => Err(invalid()),
        })
        .collect()
}

/// POST /api/recipes
pub async fn generate_recipes(
    state: web::Data<AppState>,
    payload: web::Json<GenerateRecipesRequest>,
) -> Result<HttpResponse> {
    let ingredients = parse_ingredients(payload.into_inner().ingredients)?;
    let result = state.recipes.generate(&ingredients).await?;
    Ok(HttpResponse::Ok().json(result))
}

/// GET /api/substitutions/{ingredient}?lang=ar-EG|en-US
pub async fn get_substitutions(
    path: web::Path<String>,
    query: web::Query<SubstitutionQuery>,
) -> Result<HttpResponse> {
    let language = SubstitutionLanguage::from_tag(query.lang.as_deref());
    Ok(HttpResponse::Ok().json(find_substitutes(&path.into_inner(), language)))
}

/// GET /api/saved-recipes
pub async fn list_saved_recipes(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse> {
    let recipes = state.store.list_saved_recipes(user.id).await?;
    Ok(HttpResponse::Ok().json(recipes))
}

/// POST /api/saved-recipes
pub async fn save_recipe(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    payload: web::Json<SaveRecipeRequest>,
) -> Result<HttpResponse> {
    payload.validate()?;
    let payload = payload.into_inner();

    let recipe = state
        .store
        .create_saved_recipe(NewSavedRecipe {
            user_id: user.id,
            title: payload.title,
            description: payload.description,
            ingredients: payload.ingredients,
            instructions: payload.instructions,
        })
        .await?;
    Ok(HttpResponse::Created().json(recipe))
}

/// DELETE /api/saved-recipes/{id}
pub async fn delete_saved_recipe(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<i32>,
) -> Result<HttpResponse> {
    if !state
        .store
        .delete_saved_recipe(path.into_inner(), user.id)
        .await?
    {
        return Err(AppError::NotFound("الوصفة غير موجودة".to_string()));
    }
    Ok(HttpResponse::Ok().json(json!({ "message": "تم حذف الوصفة بنجاح" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ingredients() {
        assert_eq!(
            parse_ingredients(json!(["tomato", "egg"])).unwrap(),
            vec!["tomato".to_string(), "egg".to_string()]
        );
        assert!(parse_ingredients(json!([])).is_err());
        assert!(parse_ingredients(json!("tomato")).is_err());
        assert!(parse_ingredients(json!([1, 2])).is_err());
        assert!(parse_ingredients(Value::Null).is_err());
    }
}
