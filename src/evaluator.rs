use crate::quiz::{Answer, Question};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub is_correct: bool,
    pub score_delta: u32,
}

/// Scores `chosen` against `question`. The caller only passes answers taken
/// from `question.answers()`.
pub fn evaluate(question: &Question, chosen: &Answer) -> Evaluation {
    if chosen.is_correct() {
        Evaluation {
            is_correct: true,
            score_delta: question.mark(),
        }
    } else {
        Evaluation {
            is_correct: false,
            score_delta: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(mark: u32) -> Question {
        Question::new(
            "Which region is Sancerre from?".into(),
            mark,
            vec![
                Answer::new("Loire".into(), true),
                Answer::new("Rhône".into(), false),
                Answer::new("Alsace".into(), false),
            ],
        )
    }

    #[test]
    fn correct_answer_earns_the_mark() {
        let question = question(4);
        let evaluation = evaluate(&question, &question.answers()[0]);

        assert_eq!(
            evaluation,
            Evaluation {
                is_correct: true,
                score_delta: 4
            }
        );
    }

    #[test]
    fn every_other_answer_earns_nothing() {
        let question = question(4);

        for answer in &question.answers()[1..] {
            let evaluation = evaluate(&question, answer);
            assert!(!evaluation.is_correct);
            assert_eq!(evaluation.score_delta, 0);
        }
    }
}
