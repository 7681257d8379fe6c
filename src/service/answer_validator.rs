use crate::{
    models::{responsemodel::Answer, surveymodel::Question},
    service::error::ValidationError,
};

/// Check one answer against its question's constraints. Pure.
///
/// Skipped answers to optional questions pass without further checks. The
/// value must be of the kind the question type takes. Text
/// length is counted in characters of the extracted text; rating and scale
/// values are checked against whichever bounds are configured.
pub fn validate(answer: &Answer, question: &Question) -> Result<(), ValidationError> {
    if question.required && (answer.is_skipped || !answer.has_content()) {
        return Err(ValidationError::RequiredMissing(question.id));
    }

    if answer.is_skipped {
        return Ok(());
    }

    if let Some(value) = answer.value() {
        if !question.question_type.accepts(value) {
            return Err(ValidationError::WrongType {
                question_id: question.id,
                expected: question.question_type,
            });
        }
    }

    if question.question_type.is_text() {
        let length = answer.answer_text.chars().count();

        if let Some(min) = question.min_length {
            if length < min.max(0) as usize {
                return Err(ValidationError::TooShort {
                    question_id: question.id,
                    length,
                    min,
                });
            }
        }

        if let Some(max) = question.max_length {
            if length > max.max(0) as usize {
                return Err(ValidationError::TooLong {
                    question_id: question.id,
                    length,
                    max,
                });
            }
        }
    }

    if question.question_type.is_numeric() {
        if let Some(value) = answer.value().and_then(|v| v.numeric()) {
            let below = question.min_value.map_or(false, |min| value < min);
            let above = question.max_value.map_or(false, |max| value > max);

            if below || above {
                return Err(ValidationError::OutOfRange {
                    question_id: question.id,
                    value,
                    min: question.min_value,
                    max: question.max_value,
                });
            }
        }
    }

    Ok(())
}
