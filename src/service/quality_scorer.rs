use crate::models::{responsemodel::Response, surveymodel::Survey};

pub const MAX_QUALITY_SCORE: f64 = 5.0;

const MIN_SECONDS_PER_ANSWER: f64 = 5.0;
const FAST_PACE_FACTOR: f64 = 0.7;
const SKIPPED_REQUIRED_PENALTY: f64 = 0.1;

/// Heuristic quality score in `[0, 5]` for a finished response.
///
/// It scales the reward and nothing else; a low score is not proof of abuse.
/// Uses the response's recorded `duration` and its current answer set.
pub fn score(response: &Response, survey: &Survey) -> f64 {
    let total_questions = survey.total_questions();
    let answered = response.answered_count();

    let mut score = MAX_QUALITY_SCORE;

    let completion_ratio = if total_questions == 0 {
        0.0
    } else {
        answered as f64 / total_questions as f64
    };
    score *= completion_ratio;

    if answered > 0 {
        let seconds_per_answer = response.duration.max(0) as f64 / answered as f64;
        if seconds_per_answer < MIN_SECONDS_PER_ANSWER {
            score *= FAST_PACE_FACTOR;
        }
    }

    let skipped_required = survey
        .questions
        .iter()
        .filter(|q| q.required)
        .filter(|q| response.answers.get(&q.id).map_or(false, |a| a.is_skipped))
        .count();

    if skipped_required > 0 {
        score *= 1.0 - SKIPPED_REQUIRED_PENALTY * skipped_required as f64;
    }

    score.clamp(0.0, MAX_QUALITY_SCORE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        responsemodel::{Answer, AnswerValue, ClientMeta},
        surveymodel::{Question, QuestionType, SurveyStatus},
    };
    use chrono::Utc;
    use sqlx::types::Json;
    use uuid::Uuid;

    fn survey(questions: usize, required: bool) -> Survey {
        let now = Utc::now();
        let id = Uuid::new_v4();
        Survey {
            id,
            creator_id: Uuid::new_v4(),
            title: "Commute".to_string(),
            status: SurveyStatus::Published,
            reward_per_response: 50.0,
            max_responses: 100,
            response_count: 0,
            estimated_duration: 3,
            start_date: None,
            end_date: None,
            require_login: true,
            allow_multiple: false,
            created_at: now,
            updated_at: now,
            questions: (0..questions)
                .map(|i| Question {
                    id: Uuid::new_v4(),
                    survey_id: id,
                    question_type: QuestionType::Text,
                    text: format!("Question {}", i + 1),
                    required,
                    position: i as i32,
                    min_length: None,
                    max_length: None,
                    min_value: None,
                    max_value: None,
                    options: Json(Vec::new()),
                })
                .collect(),
        }
    }

    fn response_for(survey: &Survey, answered: usize, skipped: usize, duration: i32) -> Response {
        let now = Utc::now();
        let mut response = Response::start(survey.id, Some(Uuid::new_v4()), ClientMeta::default(), now);
        for (i, q) in survey.questions.iter().take(answered).enumerate() {
            let is_skipped = i < skipped;
            let value = (!is_skipped).then(|| AnswerValue::Text("fine".into()));
            response.upsert_answer(Answer::new(response.id, q.id, value, 20, is_skipped, now));
        }
        response.duration = duration;
        response
    }

    #[test]
    fn complete_unhurried_response_scores_full() {
        let s = survey(3, true);
        let r = response_for(&s, 3, 0, 180);
        assert_eq!(score(&r, &s), 5.0);
    }

    #[test]
    fn partial_completion_scales_linearly() {
        let s = survey(4, false);
        let r = response_for(&s, 2, 0, 100);
        assert!((score(&r, &s) - 2.5).abs() < 1e-9);
    }

    #[test]
    fn fast_pace_is_penalised() {
        let s = survey(3, false);
        let r = response_for(&s, 3, 0, 12);
        assert!((score(&r, &s) - 3.5).abs() < 1e-9);
    }

    #[test]
    fn skipped_required_penalty_applies_once() {
        let s = survey(3, true);
        let r = response_for(&s, 3, 2, 180);
        // 5 * (1 - 0.2), not 5 * 0.8 * 0.8
        assert!((score(&r, &s) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn empty_inputs_score_zero() {
        let s = survey(0, false);
        let r = response_for(&s, 0, 0, 0);
        assert_eq!(score(&r, &s), 0.0);

        let s = survey(3, false);
        let r = response_for(&s, 0, 0, 0);
        assert_eq!(score(&r, &s), 0.0);
    }

    #[test]
    fn score_stays_within_bounds() {
        for total in 0..=12 {
            let s = survey(total, true);
            for answered in 0..=total {
                for skipped in 0..=answered {
                    for duration in [0, 1, 4, 30, 600, 100_000] {
                        let r = response_for(&s, answered, skipped, duration);
                        let q = score(&r, &s);
                        assert!((0.0..=5.0).contains(&q), "score {} out of range", q);
                    }
                }
            }
        }
    }
}
