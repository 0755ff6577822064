//! Recipe generation with a database-backed answer cache
//!
//! Answers are cached under a canonical ingredient key (trimmed, lowercased,
//! sorted, comma-joined) so the same ingredients in any order share one row.
//! Provider failures fall back to a small static table, which is never cached.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::db::{RecipeRepository, Store};
use crate::error::{AppError, Result};
use crate::metrics::recipes::{RECIPE_CACHE_EVENTS, RECIPE_RESPONSES_TOTAL};
use crate::models::{Recipe, RecipeResult};
use crate::services::llm::{CompletionRequest, LlmProvider};

static JSON_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[\s\S]*\}").expect("valid JSON block regex"));

const DEFAULT_SUGGESTIONS_AR: &[&str] = &[
    "دجاج", "لحم", "سمك", "بطاطس", "أرز", "معكرونة", "بصل", "طماطم", "بيض", "جبنة",
];

const DEFAULT_SUGGESTIONS_EN: &[&str] = &[
    "chicken", "beef", "fish", "potatoes", "rice", "pasta", "onion", "tomato", "eggs", "cheese",
];

/// Canonical cache key for an ingredient list
pub fn cache_key(ingredients: &[String]) -> String {
    let mut normalized: Vec<String> = normalize(ingredients);
    normalized.sort();
    normalized.join(",")
}

fn normalize(ingredients: &[String]) -> Vec<String> {
    ingredients
        .iter()
        .map(|i| i.trim().to_lowercase())
        .filter(|i| !i.is_empty())
        .collect()
}

/// Language of the prompt and of the default suggestions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Arabic,
    English,
}

impl Language {
    pub fn detect(ingredients: &[String]) -> Self {
        if ingredients.iter().all(|i| i.is_ascii()) {
            Language::English
        } else {
            Language::Arabic
        }
    }

    fn default_suggestions(self) -> Vec<String> {
        let source = match self {
            Language::Arabic => DEFAULT_SUGGESTIONS_AR,
            Language::English => DEFAULT_SUGGESTIONS_EN,
        };
        source.iter().map(|s| s.to_string()).collect()
    }
}

pub struct RecipeService {
    store: Arc<dyn Store>,
    provider: Arc<dyn LlmProvider>,
}

impl RecipeService {
    pub fn new(store: Arc<dyn Store>, provider: Arc<dyn LlmProvider>) -> Self {
        Self { store, provider }
    }

    pub async fn generate(&self, ingredients: &[String]) -> Result<RecipeResult> {
        let normalized = normalize(ingredients);
        if normalized.is_empty() {
            return Err(AppError::BadRequest(
                "Invalid ingredients. Please provide an array of ingredients.".to_string(),
            ));
        }
        let key = cache_key(ingredients);
        let language = Language::detect(&normalized);

        if let Some(cached) = self.lookup_cache(&key).await {
            RECIPE_RESPONSES_TOTAL.with_label_values(&["cache"]).inc();
            return Ok(cached);
        }

        let prompt = build_prompt(&normalized, language);
        let request = CompletionRequest::new(prompt)
            .with_temperature(0.7)
            .with_max_tokens(2048)
            .json();

        let parsed = match self.provider.complete(request).await {
            Ok(reply) => {
                let parsed = parse_recipe_reply(&reply);
                if parsed.is_none() {
                    warn!(provider = self.provider.name(), "Recipe reply could not be parsed");
                }
                parsed
            }
            Err(e) => {
                warn!(provider = self.provider.name(), error = %e, "Recipe generation failed");
                None
            }
        };

        let Some(mut result) = parsed else {
            RECIPE_RESPONSES_TOTAL.with_label_values(&["fallback"]).inc();
            return Ok(fallback_recipes(&normalized, language));
        };

        if result.suggested_ingredients.is_empty() {
            result.suggested_ingredients = language.default_suggestions();
        }

        match serde_json::to_string(&result) {
            Ok(serialized) => {
                if let Err(e) = self.store.store_cached_recipe(&key, &serialized).await {
                    warn!(key = %key, error = %e, "Failed to cache recipe result");
                    RECIPE_CACHE_EVENTS.with_label_values(&["write_error"]).inc();
                }
            }
            Err(e) => warn!(error = %e, "Failed to serialize recipe result"),
        }

        RECIPE_RESPONSES_TOTAL
            .with_label_values(&[self.provider.name()])
            .inc();
        info!(
            provider = self.provider.name(),
            recipes = result.recipes.len(),
            "Generated recipes"
        );
        Ok(result)
    }

    async fn lookup_cache(&self, key: &str) -> Option<RecipeResult> {
        match self.store.find_cached_recipe(key).await {
            Ok(Some(entry)) => match serde_json::from_str::<RecipeResult>(&entry.result) {
                Ok(result) => {
                    debug!(key = %key, "Recipe cache hit");
                    RECIPE_CACHE_EVENTS.with_label_values(&["hit"]).inc();
                    Some(result)
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Discarding unreadable recipe cache entry");
                    RECIPE_CACHE_EVENTS.with_label_values(&["error"]).inc();
                    None
                }
            },
            Ok(None) => {
                RECIPE_CACHE_EVENTS.with_label_values(&["miss"]).inc();
                None
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Recipe cache lookup failed");
                RECIPE_CACHE_EVENTS.with_label_values(&["error"]).inc();
                None
            }
        }
    }
}

fn build_prompt(ingredients: &[String], language: Language) -> String {
    let list = ingredients.join(", ");
    match language {
        Language::Arabic => format!(
            "أريد منك أن تقترح لي وصفات طبخ باستخدام المكونات التالية: {list}.

مطلوب النتائج باللغة العربية، وأريد منك توليد وصفتين مختلفتين.
اقترح أيضاً قائمة بـ 5 مكونات إضافية قد ترغب بإضافتها لتوسيع الخيارات.

لكل وصفة: عنوان، وصف موجز (1-2 جملة)، قائمة المكونات مع الكميات، وخطوات التحضير.

أعد الرد بصيغة JSON فقط بدون أي نص إضافي:
{{
  \"recipes\": [
    {{
      \"title\": \"عنوان الوصفة\",
      \"description\": \"وصف موجز\",
      \"ingredients\": [\"المكون 1 مع الكمية\"],
      \"instructions\": [\"الخطوة 1\"]
    }}
  ],
  \"suggestedIngredients\": [\"مكون إضافي 1\"]
}}"
        ),
        Language::English => format!(
            "Suggest cooking recipes that use these ingredients: {list}.

Answer in English with two different recipes, and suggest 5 extra ingredients
that would widen the options.

For each recipe give a title, a short description (1-2 sentences), the
ingredient list with quantities, and clear preparation steps.

Reply with JSON only, no extra text:
{{
  \"recipes\": [
    {{
      \"title\": \"Recipe title\",
      \"description\": \"Short description\",
      \"ingredients\": [\"Ingredient 1 with quantity\"],
      \"instructions\": [\"Step 1\"]
    }}
  ],
  \"suggestedIngredients\": [\"Extra ingredient 1\"]
}}"
        ),
    }
}

/// Parse a provider reply, tolerating prose or code fences around the JSON.
/// Replies without any recipe are treated as unusable.
pub fn parse_recipe_reply(reply: &str) -> Option<RecipeResult> {
    let parsed = serde_json::from_str::<RecipeResult>(reply.trim()).ok().or_else(|| {
        JSON_BLOCK
            .find(reply)
            .and_then(|block| serde_json::from_str::<RecipeResult>(block.as_str()).ok())
    })?;

    (!parsed.recipes.is_empty()).then_some(parsed)
}

fn recipe(title: &str, description: &str, ingredients: &[&str], instructions: &[&str]) -> Recipe {
    Recipe {
        title: title.to_string(),
        description: description.to_string(),
        ingredients: ingredients.iter().map(|s| s.to_string()).collect(),
        instructions: instructions.iter().map(|s| s.to_string()).collect(),
        cooking_time: None,
        difficulty: None,
    }
}

fn result(recipes: Vec<Recipe>, suggestions: &[&str]) -> RecipeResult {
    RecipeResult {
        recipes,
        suggested_ingredients: suggestions.iter().map(|s| s.to_string()).collect(),
    }
}

static FALLBACK_RECIPES: Lazy<HashMap<&'static str, RecipeResult>> = Lazy::new(|| {
    let mut table = HashMap::new();

    table.insert(
        "بصل,ثوم,طماطم",
        result(
            vec![recipe(
                "صلصة طماطم مع البصل والثوم",
                "صلصة طماطم بسيطة وسريعة يمكن استخدامها مع المعكرونة أو الأرز",
                &["3 حبات طماطم", "1 بصلة متوسطة", "2 فص ثوم", "ملح وفلفل حسب الرغبة", "زيت زيتون"],
                &[
                    "قطع البصل والثوم إلى قطع صغيرة",
                    "سخن زيت الزيتون في مقلاة على نار متوسطة",
                    "أضف البصل والثوم وقلبهم حتى يصبح لونهم ذهبياً",
                    "قطع الطماطم وأضفها إلى المقلاة",
                    "أضف الملح والفلفل واتركها على نار هادئة لمدة 15 دقيقة",
                ],
            )],
            &["فلفل أخضر", "زيتون", "معكرونة", "جبنة", "أعشاب (ريحان أو بقدونس)"],
        ),
    );
    table.insert(
        "بيض",
        result(
            vec![recipe(
                "بيض مقلي",
                "وجبة سريعة من البيض المقلي",
                &["2 بيضة", "ملح وفلفل حسب الرغبة", "زيت للقلي"],
                &[
                    "سخن الزيت في مقلاة على نار متوسطة",
                    "اكسر البيض في المقلاة",
                    "رش الملح والفلفل",
                    "اطهي البيض حتى ينضج حسب الرغبة",
                ],
            )],
            &["جبنة", "خبز", "طماطم", "بصل", "فلفل أخضر"],
        ),
    );
    table.insert(
        "دجاج",
        result(
            vec![recipe(
                "دجاج مشوي بالأعشاب",
                "طبق دجاج مشوي لذيذ بتتبيلة الأعشاب",
                &[
                    "4 قطع دجاج",
                    "2 ملعقة زيت زيتون",
                    "2 فص ثوم مفروم",
                    "1 ملعقة أوريغانو",
                    "ملح وفلفل حسب الرغبة",
                    "عصير ليمون",
                ],
                &[
                    "اخلط الزيت والثوم والأعشاب والملح والفلفل وعصير الليمون في وعاء",
                    "ضع قطع الدجاج في التتبيلة وغطها جيدًا",
                    "اترك الدجاج في التتبيلة لمدة 30 دقيقة على الأقل",
                    "سخن الفرن إلى 200 درجة مئوية",
                    "ضع الدجاج في صينية الخبز واشويه لمدة 30-35 دقيقة حتى ينضج تمامًا",
                ],
            )],
            &["بطاطس", "أرز", "ليمون", "بصل", "زيت زيتون"],
        ),
    );
    table.insert(
        "garlic,onion,tomato",
        result(
            vec![recipe(
                "Tomato sauce with onion and garlic",
                "A quick, simple tomato sauce for pasta or rice",
                &["3 tomatoes", "1 medium onion", "2 garlic cloves", "Salt and pepper", "Olive oil"],
                &[
                    "Finely chop the onion and garlic",
                    "Heat the olive oil in a pan over medium heat",
                    "Fry the onion and garlic until golden",
                    "Chop the tomatoes and add them to the pan",
                    "Season and simmer gently for 15 minutes",
                ],
            )],
            &["green pepper", "olives", "pasta", "cheese", "basil or parsley"],
        ),
    );
    table.insert(
        "eggs",
        result(
            vec![recipe(
                "Fried eggs",
                "A fast meal of fried eggs",
                &["2 eggs", "Salt and pepper", "Oil for frying"],
                &[
                    "Heat the oil in a pan over medium heat",
                    "Crack the eggs into the pan",
                    "Season with salt and pepper",
                    "Cook until done to your liking",
                ],
            )],
            &["cheese", "bread", "tomato", "onion", "green pepper"],
        ),
    );
    table.insert(
        "chicken",
        result(
            vec![recipe(
                "Herb roasted chicken",
                "Tasty roasted chicken in a herb marinade",
                &[
                    "4 chicken pieces",
                    "2 tbsp olive oil",
                    "2 garlic cloves, minced",
                    "1 tsp oregano",
                    "Salt and pepper",
                    "Lemon juice",
                ],
                &[
                    "Mix the oil, garlic, herbs, salt, pepper and lemon juice",
                    "Coat the chicken pieces well in the marinade",
                    "Marinate for at least 30 minutes",
                    "Preheat the oven to 200°C",
                    "Roast for 30-35 minutes until cooked through",
                ],
            )],
            &["potatoes", "rice", "lemon", "onion", "olive oil"],
        ),
    );

    table
});

/// Static answer used when no provider reply is available.
///
/// Tries the whole sorted ingredient key first, then each ingredient on its
/// own, and otherwise returns no recipes with default suggestions.
pub fn fallback_recipes(ingredients: &[String], language: Language) -> RecipeResult {
    let mut sorted = ingredients.to_vec();
    sorted.sort();
    let key = sorted.join(",");

    if let Some(found) = FALLBACK_RECIPES.get(key.as_str()) {
        return found.clone();
    }

    for ingredient in ingredients {
        if let Some(found) = FALLBACK_RECIPES.get(ingredient.as_str()) {
            return found.clone();
        }
    }

    RecipeResult {
        recipes: Vec::new(),
        suggested_ingredients: language.default_suggestions(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::services::llm::{LlmError, MockLlmProvider};

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    const REPLY: &str = r#"{"recipes":[{"title":"Shakshuka","description":"Eggs in tomato","ingredients":["eggs","tomato"],"instructions":["Cook"]}],"suggestedIngredients":["cumin"]}"#;

    #[test]
    fn test_cache_key_is_order_independent() {
        let a = cache_key(&strings(&["Tomato", " onion ", "garlic"]));
        let b = cache_key(&strings(&["garlic", "TOMATO", "onion", ""]));
        assert_eq!(a, "garlic,onion,tomato");
        assert_eq!(a, b);
    }

    #[test]
    fn test_parse_reply_with_code_fence() {
        let reply = format!("```json\n{}\n```", REPLY);
        let parsed = parse_recipe_reply(&reply).unwrap();
        assert_eq!(parsed.recipes[0].title, "Shakshuka");
        assert_eq!(parsed.suggested_ingredients, vec!["cumin"]);
    }

    #[test]
    fn test_parse_reply_without_recipes_is_rejected() {
        assert!(parse_recipe_reply(r#"{"recipes": []}"#).is_none());
        assert!(parse_recipe_reply("no json here").is_none());
    }

    #[test]
    fn test_fallback_exact_and_partial_match() {
        let exact = fallback_recipes(&strings(&["طماطم", "ثوم", "بصل"]), Language::Arabic);
        assert_eq!(exact.recipes[0].title, "صلصة طماطم مع البصل والثوم");

        let partial = fallback_recipes(&strings(&["خبز", "بيض"]), Language::Arabic);
        assert_eq!(partial.recipes[0].title, "بيض مقلي");

        let none = fallback_recipes(&strings(&["quinoa"]), Language::English);
        assert!(none.recipes.is_empty());
        assert_eq!(none.suggested_ingredients.len(), 10);
        assert_eq!(none.suggested_ingredients[0], "chicken");
    }

    #[tokio::test]
    async fn test_generate_caches_provider_result() {
        let store = Arc::new(MemoryStore::new());
        let mut provider = MockLlmProvider::new();
        provider
            .expect_complete()
            .times(1)
            .returning(|_| Ok(REPLY.to_string()));
        provider.expect_name().return_const("mock");

        let service = RecipeService::new(store.clone(), Arc::new(provider));

        let first = service.generate(&strings(&["Eggs", "tomato"])).await.unwrap();
        let second = service.generate(&strings(&["tomato", "eggs"])).await.unwrap();

        assert_eq!(first, second);
        assert!(store
            .find_cached_recipe("eggs,tomato")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_provider_failure_uses_uncached_fallback() {
        let store = Arc::new(MemoryStore::new());
        let mut provider = MockLlmProvider::new();
        provider
            .expect_complete()
            .returning(|_| Err(LlmError::MissingApiKey { provider: "gemini" }));
        provider.expect_name().return_const("gemini");

        let service = RecipeService::new(store.clone(), Arc::new(provider));
        let result = service.generate(&strings(&["دجاج"])).await.unwrap();

        assert_eq!(result.recipes[0].title, "دجاج مشوي بالأعشاب");
        assert!(store.find_cached_recipe("دجاج").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_blank_ingredients_rejected() {
        let service = RecipeService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MockLlmProvider::new()),
        );
        let err = service.generate(&strings(&["  ", ""])).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
