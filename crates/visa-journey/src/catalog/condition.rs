use super::answers::{AnswerValue, PersonalizationData};
use super::domain::ConditionalLogic;

/// Decide whether a conditional catalog item applies to the given answers.
///
/// A missing condition always applies. `true`/`false` compare against the
/// truthiness of the answer; any other value requires strict equality, so an
/// absent answer only ever satisfies `false`.
pub fn evaluate(condition: Option<&ConditionalLogic>, answers: &PersonalizationData) -> bool {
    let Some(condition) = condition else {
        return true;
    };

    let answer = answers.get(&condition.field);
    match &condition.value {
        AnswerValue::Bool(true) => answer.is_some_and(|value| value.is_truthy()),
        AnswerValue::Bool(false) => !answer.is_some_and(|value| value.is_truthy()),
        expected => answer.as_ref() == Some(expected),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answers(pairs: &[(&str, AnswerValue)]) -> PersonalizationData {
        let mut data = PersonalizationData::default();
        for (field, value) in pairs {
            data.set(field, value.clone()).expect("valid answer");
        }
        data
    }

    #[test]
    fn absent_condition_is_universal() {
        assert!(evaluate(None, &PersonalizationData::default()));
    }

    #[test]
    fn true_condition_requires_truthy_answer() {
        let condition = ConditionalLogic::new("hasCAS", true);
        assert!(evaluate(
            Some(&condition),
            &answers(&[("hasCAS", true.into())])
        ));
        assert!(!evaluate(Some(&condition), &PersonalizationData::default()));
        assert!(!evaluate(
            Some(&condition),
            &answers(&[("hasCAS", false.into())])
        ));
    }

    #[test]
    fn false_condition_matches_falsy_or_missing_answer() {
        let condition = ConditionalLogic::new("priorityService", false);
        assert!(evaluate(Some(&condition), &PersonalizationData::default()));
        assert!(evaluate(
            Some(&condition),
            &answers(&[("priorityService", "".into())])
        ));
        assert!(!evaluate(
            Some(&condition),
            &answers(&[("priorityService", true.into())])
        ));
    }

    #[test]
    fn scalar_condition_uses_strict_equality() {
        let condition = ConditionalLogic::new("studyLocation", "london");
        assert!(evaluate(
            Some(&condition),
            &answers(&[("studyLocation", "london".into())])
        ));
        assert!(!evaluate(
            Some(&condition),
            &answers(&[("studyLocation", "London".into())])
        ));
        assert!(!evaluate(Some(&condition), &PersonalizationData::default()));

        let numeric = ConditionalLogic::new("courseLengthMonths", 12.0);
        assert!(evaluate(
            Some(&numeric),
            &answers(&[("courseLengthMonths", 12.0.into())])
        ));
        assert!(!evaluate(
            Some(&numeric),
            &answers(&[("courseLengthMonths", "12".into())])
        ));
    }

    #[test]
    fn date_answers_compare_in_display_format() {
        let condition = ConditionalLogic::new("casDate", "01/09/2025");
        assert!(evaluate(
            Some(&condition),
            &answers(&[("casDate", "01/09/2025".into())])
        ));
    }
}
