//! JSON schemas for structured completions. Strict mode needs every property
//! listed under `required` and `additionalProperties: false`.

use serde_json::{json, Value};

pub const MEAL_PLAN: &str = "meal_plan";
pub const PANTRY_ITEMS: &str = "pantry_items";
pub const LIVE_ASSIST: &str = "live_assist";

fn string_array() -> Value {
    json!({ "type": "array", "items": { "type": "string" } })
}

pub fn meal_plan_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["meals", "shopping_list"],
        "properties": {
            "meals": {
                "type": "array",
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": [
                        "meal_name", "meal_type", "cooking_time_mins", "difficulty",
                        "ingredients_used", "missing_items", "instructions", "nutrition_estimate"
                    ],
                    "properties": {
                        "meal_name": { "type": "string" },
                        "meal_type": { "type": "string", "enum": ["breakfast", "lunch", "dinner", "snack"] },
                        "cooking_time_mins": { "type": "integer" },
                        "difficulty": { "type": "string", "enum": ["easy", "medium", "hard"] },
                        "ingredients_used": string_array(),
                        "missing_items": string_array(),
                        "instructions": string_array(),
                        "nutrition_estimate": {
                            "type": "object",
                            "additionalProperties": false,
                            "required": ["calories", "protein_g", "carbs_g", "fat_g"],
                            "properties": {
                                "calories": { "type": "number" },
                                "protein_g": { "type": "number" },
                                "carbs_g": { "type": "number" },
                                "fat_g": { "type": "number" }
                            }
                        }
                    }
                }
            },
            "shopping_list": string_array()
        }
    })
}

pub fn pantry_items_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["items"],
        "properties": {
            "items": {
                "type": "array",
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": ["name", "quantity", "category", "status", "perishability_days"],
                    "properties": {
                        "name": { "type": "string" },
                        "quantity": { "type": ["number", "null"] },
                        "category": { "type": "string" },
                        "status": { "type": "string", "enum": ["fresh", "low", "out", "expired", "nearing"] },
                        "perishability_days": { "type": ["integer", "null"] }
                    }
                }
            }
        }
    })
}

pub fn live_assist_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["reply", "suggestions"],
        "properties": {
            "reply": { "type": "string" },
            "suggestions": string_array()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every object in a strict schema must require all of its properties.
    fn assert_strict(schema: &Value) {
        if let Some(props) = schema.get("properties").and_then(Value::as_object) {
            assert_eq!(schema["additionalProperties"], false);
            let required: Vec<&str> = schema["required"]
                .as_array()
                .expect("required list")
                .iter()
                .filter_map(Value::as_str)
                .collect();
            for (name, sub) in props {
                assert!(required.contains(&name.as_str()), "{} not required", name);
                assert_strict(sub);
            }
        }
        if let Some(items) = schema.get("items") {
            assert_strict(items);
        }
    }

    #[test]
    fn schemas_are_strict() {
        assert_strict(&meal_plan_schema());
        assert_strict(&pantry_items_schema());
        assert_strict(&live_assist_schema());
    }
}
