use async_trait::async_trait;

use super::{DbResult, PgStore, RecipeRepository};
use crate::models::{NewSavedRecipe, RecipeCache, SavedRecipe};

#[async_trait]
impl RecipeRepository for PgStore {
    async fn find_cached_recipe(&self, key: &str) -> DbResult<Option<RecipeCache>> {
        sqlx::query_as::<_, RecipeCache>(
            "SELECT id, ingredients, result, created_at FROM recipe_caches WHERE ingredients = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
    }

    async fn store_cached_recipe(&self, key: &str, result: &str) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO recipe_caches (ingredients, result)
            VALUES ($1, $2)
            ON CONFLICT (ingredients)
            DO UPDATE SET result = EXCLUDED.result, created_at = NOW()
            "#,
        )
        .bind(key)
        .bind(result)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_saved_recipes(&self, user_id: i32) -> DbResult<Vec<SavedRecipe>> {
        sqlx::query_as::<_, SavedRecipe>(
            r#"
            SELECT id, user_id, title, description, ingredients, instructions, created_at
            FROM saved_recipes
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn create_saved_recipe(&self, recipe: NewSavedRecipe) -> DbResult<SavedRecipe> {
        sqlx::query_as::<_, SavedRecipe>(
            r#"
            INSERT INTO saved_recipes (user_id, title, description, ingredients, instructions)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, title, description, ingredients, instructions, created_at
            "#,
        )
        .bind(recipe.user_id)
        .bind(&recipe.title)
        .bind(&recipe.description)
        .bind(&recipe.ingredients)
        .bind(&recipe.instructions)
        .fetch_one(&self.pool)
        .await
    }

    async fn delete_saved_recipe(&self, id: i32, user_id: i32) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM saved_recipes WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
