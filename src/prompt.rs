use std::collections::BTreeMap;

use anyhow::Result;

use crate::timeline::PersonSummary;

/// Builds the fixed generation instruction with the compact dataset serialized
/// inline. People are keyed by id, in numeric order, so the prompt is stable
/// across runs on identical input.
pub fn build_prompt(people: &BTreeMap<i64, PersonSummary>) -> Result<String> {
    let data = serde_json::to_string_pretty(people)?;
    Ok(format!(
        "\
You are an expert video analyst.

Generate a SHORT and CLEAN summary.
This summary must fit within **1 page**.

IMPORTANT RULES:
- KEEP IT VERY SHORT.
- NO per-frame details.
- NO timeline for every person.
- ONLY describe the 5-7 most important people.
- NO tables.
- NO markdown tables.
- Bullet points only.
- No stories. No long explanations.

Write 4 short sections:

1. SHORT Scene Summary (3-4 lines)
2. Key Person Movements (only major people, 1 line each)
3. Short Timeline Overview (general movement pattern, not per-person)
4. Crowd-Level Behavior (3-4 lines)

Data:
{data}
"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_person() -> BTreeMap<i64, PersonSummary> {
        let mut people = BTreeMap::new();
        people.insert(
            3,
            PersonSummary {
                person_id: 3,
                first_frame: 1,
                last_frame: 42,
                dominant_direction: "left".to_string(),
                avg_speed: 2.0,
                movement_samples: vec!["left".to_string()],
                speed_samples: vec![2.0],
            },
        );
        people
    }

    #[test]
    fn prompt_embeds_the_compact_dataset() {
        let prompt = build_prompt(&one_person()).unwrap();
        assert!(prompt.contains("\"person_id\": 3"));
        assert!(prompt.contains("\"dominant_direction\": \"left\""));
    }

    #[test]
    fn prompt_requests_all_four_sections() {
        let prompt = build_prompt(&one_person()).unwrap();
        assert!(prompt.contains("SHORT Scene Summary"));
        assert!(prompt.contains("Key Person Movements"));
        assert!(prompt.contains("Short Timeline Overview"));
        assert!(prompt.contains("Crowd-Level Behavior"));
    }

    #[test]
    fn prompt_is_stable_for_identical_input() {
        let people = one_person();
        assert_eq!(build_prompt(&people).unwrap(), build_prompt(&people).unwrap());
    }
}
