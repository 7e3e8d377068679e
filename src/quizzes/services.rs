use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

use super::dto::{QuestionInput, ReviewItem};
use super::repo_types::{Answers, Question, ResponseRow};
use crate::error::{AppError, AppResult};

pub const CSV_HEADER: &str = "user_name,user_email,score,completed_at,answers";

pub fn validate_title(title: &str) -> AppResult<String> {
    let t = title.trim();
    if t.is_empty() {
        return Err(AppError::validation("Quiz title is required"));
    }
    Ok(t.to_string())
}

/// Trims every question and checks that its correct answer is one of its
/// options.
pub fn validate_questions(inputs: Vec<QuestionInput>) -> AppResult<Vec<QuestionInput>> {
    inputs
        .into_iter()
        .enumerate()
        .map(|(i, q)| {
            let n = i + 1;
            let prompt = q.prompt.trim().to_string();
            if prompt.is_empty() {
                return Err(AppError::validation(format!("Question {} has no prompt", n)));
            }
            let mut options: Vec<String> = Vec::with_capacity(q.options.len());
            for o in q.options {
                let o = o.trim().to_string();
                if o.is_empty() {
                    return Err(AppError::validation(format!("Question {} has an empty option", n)));
                }
                if options.contains(&o) {
                    return Err(AppError::validation(format!("Question {} repeats option \"{}\"", n, o)));
                }
                options.push(o);
            }
            if options.len() < 2 {
                return Err(AppError::validation(format!("Question {} needs at least two options", n)));
            }
            let correct_answer = q.correct_answer.trim().to_string();
            if !options.contains(&correct_answer) {
                return Err(AppError::validation(format!(
                    "Question {}: correct answer must be one of the options",
                    n
                )));
            }
            Ok(QuestionInput {
                prompt,
                options,
                correct_answer,
            })
        })
        .collect()
}

/// Rejects answers for questions that are not part of the quiz.
pub fn check_answer_keys(questions: &[Question], answers: &Answers) -> AppResult<()> {
    match answers.keys().find(|id| !questions.iter().any(|q| q.id == **id)) {
        Some(id) => Err(AppError::validation(format!("Unknown question {}", id))),
        None => Ok(()),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scored {
    pub score: f64,
    pub correct: Vec<(Uuid, bool)>,
}

impl Scored {
    pub fn correct_count(&self) -> usize {
        self.correct.iter().filter(|(_, c)| *c).count()
    }
}

/// Fraction of questions whose submitted answer equals the correct option
/// exactly. Unanswered questions are wrong; a quiz without questions
/// scores 0.
pub fn score_response(questions: &[Question], answers: &Answers) -> Scored {
    let correct: Vec<(Uuid, bool)> = questions
        .iter()
        .map(|q| (q.id, answers.get(&q.id).is_some_and(|a| *a == q.correct_answer)))
        .collect();
    let score = if correct.is_empty() {
        0.0
    } else {
        correct.iter().filter(|(_, c)| *c).count() as f64 / correct.len() as f64
    };
    Scored { score, correct }
}

pub fn percent(score: f64) -> i64 {
    (score * 100.0).round() as i64
}

pub fn review(questions: Vec<Question>, answers: &Answers) -> Vec<ReviewItem> {
    questions
        .into_iter()
        .map(|q| {
            let submitted = answers.get(&q.id).cloned();
            let correct = submitted.as_deref() == Some(q.correct_answer.as_str());
            ReviewItem {
                question_id: q.id,
                position: q.position,
                prompt: q.prompt,
                options: q.options.0,
                submitted,
                correct_answer: q.correct_answer,
                correct,
                verdict: if correct { "Correct!" } else { "Incorrect" },
            }
        })
        .collect()
}

pub fn csv_quote(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

pub fn responses_csv(rows: &[ResponseRow]) -> AppResult<String> {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for r in rows {
        let completed_at = r
            .completed_at
            .format(&Rfc3339)
            .map_err(|e| anyhow::anyhow!("format completed_at: {e}"))?;
        let answers = serde_json::to_string(&r.answers.0).map_err(anyhow::Error::from)?;
        let fields = [
            csv_quote(&r.user_name),
            csv_quote(&r.user_email),
            percent(r.score).to_string(),
            completed_at,
            csv_quote(&answers),
        ];
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::types::Json;
    use time::macros::datetime;

    fn question(position: i32, correct: &str) -> Question {
        Question {
            id: Uuid::new_v4(),
            quiz_id: Uuid::nil(),
            position,
            prompt: format!("Q{}", position),
            options: Json(vec!["a".into(), "b".into(), "c".into()]),
            correct_answer: correct.into(),
        }
    }

    fn input(options: &[&str], correct: &str) -> QuestionInput {
        QuestionInput {
            prompt: " What? ".into(),
            options: options.iter().map(|o| o.to_string()).collect(),
            correct_answer: correct.into(),
        }
    }

    #[test]
    fn three_of_four_scores_seventy_five_percent() {
        let qs: Vec<Question> = (1..=4).map(|i| question(i, "a")).collect();
        let mut answers = Answers::new();
        for q in &qs[..3] {
            answers.insert(q.id, "a".into());
        }
        answers.insert(qs[3].id, "b".into());

        let scored = score_response(&qs, &answers);
        assert_eq!(scored.score, 0.75);
        assert_eq!(scored.correct_count(), 3);
        assert_eq!(format!("{}%", percent(scored.score)), "75%");

        let items = review(qs, &answers);
        let verdicts: Vec<&str> = items.iter().map(|i| i.verdict).collect();
        assert_eq!(verdicts, vec!["Correct!", "Correct!", "Correct!", "Incorrect"]);
    }

    #[test]
    fn unanswered_questions_are_incorrect() {
        let qs = vec![question(1, "a"), question(2, "b")];
        let mut answers = Answers::new();
        answers.insert(qs[0].id, "a".into());
        let scored = score_response(&qs, &answers);
        assert_eq!(scored.score, 0.5);
        assert_eq!(scored.correct[1], (qs[1].id, false));
    }

    #[test]
    fn matching_is_exact() {
        let qs = vec![question(1, "a")];
        let mut answers = Answers::new();
        answers.insert(qs[0].id, "A".into());
        assert_eq!(score_response(&qs, &answers).score, 0.0);
    }

    #[test]
    fn empty_quiz_scores_zero() {
        let scored = score_response(&[], &Answers::new());
        assert_eq!(scored.score, 0.0);
        assert!(scored.correct.is_empty());
    }

    #[test]
    fn answers_to_foreign_questions_are_rejected() {
        let qs = vec![question(1, "a")];
        let mut answers = Answers::new();
        answers.insert(Uuid::new_v4(), "a".into());
        assert!(check_answer_keys(&qs, &answers).is_err());
        assert!(check_answer_keys(&qs, &Answers::new()).is_ok());
    }

    #[test]
    fn correct_answer_must_be_an_option() {
        assert!(validate_questions(vec![input(&["a", "b"], "c")]).is_err());
        assert!(validate_questions(vec![input(&["a"], "a")]).is_err());
        assert!(validate_questions(vec![input(&["a", "a"], "a")]).is_err());
        let ok = validate_questions(vec![input(&[" a ", "b"], "a ")]).unwrap();
        assert_eq!(ok[0].prompt, "What?");
        assert_eq!(ok[0].options, vec!["a", "b"]);
        assert_eq!(ok[0].correct_answer, "a");
    }

    #[test]
    fn csv_quote_doubles_embedded_quotes() {
        assert_eq!(csv_quote("plain"), "plain");
        assert_eq!(csv_quote("Doe, Jane"), "\"Doe, Jane\"");
        assert_eq!(csv_quote("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_quote("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn csv_has_header_and_one_line_per_response() {
        let qid = Uuid::nil();
        let mut answers = Answers::new();
        answers.insert(qid, "Paris".into());
        let rows = vec![ResponseRow {
            id: Uuid::new_v4(),
            quiz_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            user_name: "Doe, Jane".into(),
            user_email: "jane@school.edu".into(),
            answers: Json(answers),
            score: 0.5,
            completed_at: datetime!(2024-05-01 10:30 UTC),
        }];

        let csv = responses_csv(&rows).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(
            lines[1],
            "\"Doe, Jane\",jane@school.edu,50,2024-05-01T10:30:00Z,\
             \"{\"\"00000000-0000-0000-0000-000000000000\"\":\"\"Paris\"\"}\""
        );
    }
}
