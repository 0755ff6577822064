//! Ingredient substitutions from a static bilingual table

use serde::Serialize;

/// Lookup language, from the `lang` query parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubstitutionLanguage {
    Arabic,
    English,
}

impl SubstitutionLanguage {
    /// `en-US` (or any `en` tag) selects English; everything else is Arabic.
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag.map(|t| t.trim().to_ascii_lowercase()) {
            Some(t) if t == "en" || t.starts_with("en-") => SubstitutionLanguage::English,
            _ => SubstitutionLanguage::Arabic,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubstitutionResponse {
    pub original_ingredient: String,
    pub substitutes: Vec<Substitute>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Substitute {
    pub name: String,
    pub ratio: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

struct Entry {
    key: &'static str,
    original: &'static str,
    substitutes: &'static [(&'static str, &'static str, Option<&'static str>)],
}

impl Entry {
    fn to_response(&self) -> SubstitutionResponse {
        SubstitutionResponse {
            original_ingredient: self.original.to_string(),
            substitutes: self
                .substitutes
                .iter()
                .map(|(name, ratio, notes)| Substitute {
                    name: name.to_string(),
                    ratio: ratio.to_string(),
                    notes: notes.map(str::to_string),
                })
                .collect(),
        }
    }
}

/// Find substitutes for `ingredient`.
///
/// A table key matches when either string contains the other
/// (case-insensitive). Unknown or blank ingredients get a generic answer.
pub fn find_substitutes(ingredient: &str, language: SubstitutionLanguage) -> SubstitutionResponse {
    let needle = ingredient.trim().to_lowercase();
    let table = match language {
        SubstitutionLanguage::Arabic => ARABIC,
        SubstitutionLanguage::English => ENGLISH,
    };

    if !needle.is_empty() {
        let found = table.iter().find(|entry| {
            let key = entry.key.to_lowercase();
            key.contains(&needle) || needle.contains(&key)
        });
        if let Some(entry) = found {
            return entry.to_response();
        }
    }

    let (name, ratio) = match language {
        SubstitutionLanguage::English => (
            "We couldn't find specific substitutes for this ingredient",
            "Not available",
        ),
        SubstitutionLanguage::Arabic => ("لم نتمكن من إيجاد بدائل محددة لهذا المكون", "غير متوفر"),
    };
    SubstitutionResponse {
        original_ingredient: ingredient.trim().to_string(),
        substitutes: vec![Substitute {
            name: name.to_string(),
            ratio: ratio.to_string(),
            notes: None,
        }],
    }
}

const ARABIC: &[Entry] = &[
    Entry {
        key: "دقيق",
        original: "دقيق أبيض",
        substitutes: &[
            ("دقيق القمح الكامل", "1:1", Some("سيجعل الطعام أكثر كثافة وسيعطي نكهة أقوى")),
            ("دقيق اللوز", "1:1", Some("خيار منخفض الكربوهيدرات، مناسب للأطعمة الخالية من الغلوتين")),
            ("دقيق الذرة", "3/4 كوب دقيق ذرة لكل كوب دقيق", Some("مناسب للخبز والتكثيف")),
        ],
    },
    Entry {
        key: "سكر",
        original: "سكر أبيض",
        substitutes: &[
            ("عسل", "3/4 كوب عسل لكل كوب سكر", Some("قلل السوائل الأخرى بمقدار 1/4 كوب لكل كوب عسل")),
            ("سكر جوز الهند", "1:1", None),
            ("شراب القيقب", "3/4 كوب شراب لكل كوب سكر", Some("قلل السوائل الأخرى قليلاً")),
        ],
    },
    Entry {
        key: "زبدة",
        original: "زبدة",
        substitutes: &[
            ("زيت جوز الهند", "1:1", Some("جيد للخبز، يعمل بشكل أفضل عند درجة حرارة الغرفة")),
            ("زيت الزيتون", "3/4 كوب زيت لكل كوب زبدة", Some("أفضل للوصفات المالحة")),
            ("صلصة التفاح", "1/2 كوب صلصة تفاح لكل كوب زبدة", Some("لتقليل الدهون في المخبوزات")),
        ],
    },
    Entry {
        key: "بيض",
        original: "بيض",
        substitutes: &[
            ("بذور الكتان المطحونة + ماء", "1 ملعقة كبيرة بذور كتان + 3 ملاعق ماء = بيضة واحدة", Some("اتركها لمدة 5 دقائق حتى تتكاثف")),
            ("موز مهروس", "1/4 كوب موز مهروس = بيضة واحدة", Some("مناسب للمخبوزات الحلوة")),
            ("الزبادي", "1/4 كوب زبادي = بيضة واحدة", None),
        ],
    },
    Entry {
        key: "حليب",
        original: "حليب",
        substitutes: &[
            ("حليب اللوز", "1:1", None),
            ("حليب جوز الهند", "1:1", Some("يضيف نكهة جوز الهند")),
            ("حليب الصويا", "1:1", Some("بديل نباتي شائع")),
        ],
    },
    Entry {
        key: "زيت زيتون",
        original: "زيت زيتون",
        substitutes: &[
            ("زيت الكانولا", "1:1", Some("نكهة أخف")),
            ("زيت الأفوكادو", "1:1", Some("خيار صحي مع نقطة دخان عالية")),
            ("زيت جوز الهند", "1:1", Some("يضيف نكهة جوز الهند")),
        ],
    },
    Entry {
        key: "خل",
        original: "خل أبيض",
        substitutes: &[
            ("عصير ليمون", "1:1", Some("يعطي حموضة مشابهة مع نكهة حمضية")),
            ("خل التفاح", "1:1", Some("نكهة أقوى قليلاً")),
            ("خل النبيذ الأبيض", "1:1", Some("نكهة أكثر دقة")),
        ],
    },
    Entry {
        key: "ملح",
        original: "ملح طعام",
        substitutes: &[
            ("ملح البحر", "1:1", None),
            ("صلصة الصويا منخفضة الصوديوم", "استخدم بحذر حسب الذوق", Some("يضيف نكهة أومامي")),
            ("أعشاب طازجة", "استخدم حسب الذوق", Some("لإضافة نكهة بدون ملح")),
        ],
    },
    Entry {
        key: "بصل",
        original: "بصل",
        substitutes: &[
            ("كراث", "1:1", Some("نكهة أخف")),
            ("بصل أخضر", "1:1", Some("نكهة أكثر تميزاً")),
            ("مسحوق البصل", "1 ملعقة صغيرة لكل 1/2 كوب بصل طازج", None),
        ],
    },
    Entry {
        key: "ثوم",
        original: "ثوم",
        substitutes: &[
            ("مسحوق الثوم", "1/8 ملعقة صغيرة لكل فص ثوم", None),
            ("الثوم المعمر", "1 ملعقة كبيرة لكل فص ثوم", Some("نكهة أخف")),
            ("الكراث", "1/2 كوب كراث لكل فص ثوم", Some("نكهة مختلفة لكن مقبولة")),
        ],
    },
    Entry {
        key: "طماطم",
        original: "طماطم طازجة",
        substitutes: &[
            ("معجون طماطم + ماء", "2-3 ملاعق كبيرة معجون + 1/4 كوب ماء = كوب طماطم", None),
            ("طماطم معلبة", "1:1", None),
            ("صلصة طماطم", "1/2 كوب صلصة لكل كوب طماطم", Some("قد تحتاج لتعديل التوابل")),
        ],
    },
    Entry {
        key: "ليمون",
        original: "عصير ليمون",
        substitutes: &[
            ("خل أبيض", "1/2 الكمية من الخل لكل كمية من الليمون", None),
            ("عصير ليمون معبأ", "1:1", Some("لكن النكهة قد تكون أقل حدة")),
            ("خل التفاح", "1/2 الكمية من الخل لكل كمية من الليمون", None),
        ],
    },
];

const ENGLISH: &[Entry] = &[
    Entry {
        key: "flour",
        original: "White Flour",
        substitutes: &[
            ("Whole Wheat Flour", "1:1", Some("Will make food denser and give a stronger flavor")),
            ("Almond Flour", "1:1", Some("Low-carb option, suitable for gluten-free foods")),
            ("Cornstarch", "3/4 cup cornstarch for every cup of flour", Some("Good for baking and thickening")),
        ],
    },
    Entry {
        key: "sugar",
        original: "White Sugar",
        substitutes: &[
            ("Honey", "3/4 cup honey for every cup of sugar", Some("Reduce other liquids by 1/4 cup for each cup of honey")),
            ("Coconut Sugar", "1:1", None),
            ("Maple Syrup", "3/4 cup syrup for every cup of sugar", Some("Reduce other liquids slightly")),
        ],
    },
    Entry {
        key: "butter",
        original: "Butter",
        substitutes: &[
            ("Coconut Oil", "1:1", Some("Good for baking, works best at room temperature")),
            ("Olive Oil", "3/4 cup oil for every cup of butter", Some("Better for savory recipes")),
            ("Applesauce", "1/2 cup applesauce for every cup of butter", Some("To reduce fat in baked goods")),
        ],
    },
    Entry {
        key: "eggs",
        original: "Eggs",
        substitutes: &[
            ("Ground Flaxseed + Water", "1 tbsp ground flaxseed + 3 tbsp water = 1 egg", Some("Let sit for 5 minutes until thickened")),
            ("Mashed Banana", "1/4 cup mashed banana = 1 egg", Some("Suitable for sweet baked goods")),
            ("Yogurt", "1/4 cup yogurt = 1 egg", None),
        ],
    },
    Entry {
        key: "milk",
        original: "Milk",
        substitutes: &[
            ("Almond Milk", "1:1", None),
            ("Coconut Milk", "1:1", Some("Adds coconut flavor")),
            ("Soy Milk", "1:1", Some("Common plant-based alternative")),
        ],
    },
    Entry {
        key: "olive oil",
        original: "Olive Oil",
        substitutes: &[
            ("Canola Oil", "1:1", Some("Lighter flavor")),
            ("Avocado Oil", "1:1", Some("Healthy option with high smoke point")),
            ("Coconut Oil", "1:1", Some("Adds coconut flavor")),
        ],
    },
    Entry {
        key: "vinegar",
        original: "White Vinegar",
        substitutes: &[
            ("Lemon Juice", "1:1", Some("Gives similar acidity with citrus flavor")),
            ("Apple Cider Vinegar", "1:1", Some("Slightly stronger flavor")),
            ("White Wine Vinegar", "1:1", Some("More refined flavor")),
        ],
    },
    Entry {
        key: "salt",
        original: "Table Salt",
        substitutes: &[
            ("Sea Salt", "1:1", None),
            ("Low-sodium Soy Sauce", "Use sparingly to taste", Some("Adds umami flavor")),
            ("Fresh Herbs", "Use to taste", Some("To add flavor without salt")),
        ],
    },
    Entry {
        key: "onion",
        original: "Onion",
        substitutes: &[
            ("Leeks", "1:1", Some("Milder flavor")),
            ("Green Onions", "1:1", Some("More distinctive flavor")),
            ("Onion Powder", "1 tsp for every 1/2 cup fresh onion", None),
        ],
    },
    Entry {
        key: "garlic",
        original: "Garlic",
        substitutes: &[
            ("Garlic Powder", "1/8 tsp for each clove of garlic", None),
            ("Chives", "1 tbsp for each clove of garlic", Some("Milder flavor")),
            ("Leeks", "1/2 cup leeks for each clove of garlic", Some("Different but acceptable flavor")),
        ],
    },
    Entry {
        key: "tomato",
        original: "Fresh Tomatoes",
        substitutes: &[
            ("Tomato Paste + Water", "2-3 tbsp paste + 1/4 cup water = 1 cup tomatoes", None),
            ("Canned Tomatoes", "1:1", None),
            ("Tomato Sauce", "1/2 cup sauce for every cup of tomatoes", Some("May need to adjust seasonings")),
        ],
    },
    Entry {
        key: "lemon",
        original: "Lemon Juice",
        substitutes: &[
            ("White Vinegar", "1/2 the amount of vinegar for the amount of lemon", None),
            ("Bottled Lemon Juice", "1:1", Some("But the flavor may be less bright")),
            ("Apple Cider Vinegar", "1/2 the amount of vinegar for the amount of lemon", None),
        ],
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_tag() {
        assert_eq!(
            SubstitutionLanguage::from_tag(Some("en-US")),
            SubstitutionLanguage::English
        );
        assert_eq!(
            SubstitutionLanguage::from_tag(Some("ar-EG")),
            SubstitutionLanguage::Arabic
        );
        assert_eq!(SubstitutionLanguage::from_tag(None), SubstitutionLanguage::Arabic);
    }

    #[test]
    fn test_bidirectional_match() {
        let butter = find_substitutes("Unsalted BUTTER", SubstitutionLanguage::English);
        assert_eq!(butter.original_ingredient, "Butter");
        assert_eq!(butter.substitutes.len(), 3);

        let oil = find_substitutes("olive", SubstitutionLanguage::English);
        assert_eq!(oil.original_ingredient, "Olive Oil");

        let eggs = find_substitutes("بيض", SubstitutionLanguage::Arabic);
        assert_eq!(eggs.original_ingredient, "بيض");
    }

    #[test]
    fn test_unknown_ingredient_gets_generic_answer() {
        let result = find_substitutes("saffron", SubstitutionLanguage::English);
        assert_eq!(result.original_ingredient, "saffron");
        assert_eq!(result.substitutes[0].ratio, "Not available");

        let blank = find_substitutes("  ", SubstitutionLanguage::Arabic);
        assert_eq!(blank.substitutes[0].ratio, "غير متوفر");
    }
}
