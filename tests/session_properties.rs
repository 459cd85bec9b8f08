// Random sequences of intents against the engine; the bookkeeping
// invariants must hold after every single transition.

use proptest::prelude::*;

use quizzle::{
    clock::ManualClock,
    question::{Difficulty, Question},
    session::{AnswerOutcome, EngineSettings},
    source::{QuestionSource, SourceError},
    validate::RawConfig,
    QuizMachine, Status,
};

/// Never runs dry; every question has "right" as its answer.
struct Endless {
    served: u32,
}

impl QuestionSource for Endless {
    fn list_categories(&mut self) -> Result<Vec<String>, SourceError> {
        Ok(vec!["Science".into()])
    }

    fn next_question(&mut self, _category: &str, difficulty: Difficulty) -> Result<Question, SourceError> {
        self.served += 1;
        Question::new(
            format!("question {}", self.served),
            "right",
            vec!["wrong".into(), "also wrong".into()],
            difficulty,
        )
    }
}

#[derive(Debug, Clone)]
enum Intent {
    Tick,
    Answer(usize),
    Advance,
    Fetch,
    Stop,
}

fn intent() -> impl Strategy<Value = Intent> {
    prop_oneof![
        4 => Just(Intent::Tick),
        3 => (0usize..3).prop_map(Intent::Answer),
        2 => Just(Intent::Advance),
        2 => Just(Intent::Fetch),
        1 => Just(Intent::Stop),
    ]
}

fn difficulty() -> impl Strategy<Value = Difficulty> {
    prop_oneof![
        Just(Difficulty::Easy),
        Just(Difficulty::Medium),
        Just(Difficulty::Hard)
    ]
}

fn started(count: u32, difficulty: Difficulty) -> (QuizMachine<ManualClock>, Endless) {
    let mut m = QuizMachine::new(ManualClock::new(), EngineSettings::default()).with_seed(1);
    m.set_categories(vec!["Science".into()]);
    m.submit(&RawConfig::new("Ann", "Science", difficulty, count))
        .unwrap();
    (m, Endless { served: 0 })
}

fn apply(m: &mut QuizMachine<ManualClock>, source: &mut Endless, intent: &Intent) {
    // contract violations are expected here; the state must stay consistent anyway
    match intent {
        Intent::Tick => {
            m.tick();
        }
        Intent::Answer(idx) => {
            let option = m
                .state()
                .and_then(|s| s.current())
                .and_then(|q| q.presented().option(*idx))
                .map(str::to_string);
            if let Some(option) = option {
                let _ = m.answer(&option);
            }
        }
        Intent::Advance => {
            let _ = m.advance();
        }
        Intent::Fetch => {
            let _ = m.fetch_with(source);
        }
        Intent::Stop => {
            let _ = m.stop();
        }
    }
}

proptest! {
    #[test]
    fn bookkeeping_holds_after_every_transition(
        count in 1u32..6,
        difficulty in difficulty(),
        intents in prop::collection::vec(intent(), 0..80),
    ) {
        let (mut m, mut source) = started(count, difficulty);
        let mut answered = 0;
        let mut stopped = false;

        for intent in &intents {
            let before = m.status();
            apply(&mut m, &mut source, intent);
            if matches!(intent, Intent::Stop) && before == Status::InProgress {
                stopped = true;
            }

            let state = m.state().unwrap();
            let logged: u64 = state.log().iter().map(|r| u64::from(r.points_awarded)).sum();
            prop_assert_eq!(logged, state.total_score());

            let now = state.questions_answered();
            prop_assert!(now == answered || now == answered + 1);
            prop_assert!(now <= count);
            prop_assert_eq!(now as usize, state.log().len());
            answered = now;

            for record in state.log() {
                if !record.is_correct {
                    prop_assert_eq!(record.points_awarded, 0);
                }
            }

            // ended exactly when every question was advanced past, or on stop
            let ended = m.status() == Status::Ended;
            prop_assert!(!ended || stopped || now == count);
            if ended {
                prop_assert!(!m.clock().is_running());
            }
        }
    }

    #[test]
    fn second_answer_has_no_effect(
        difficulty in difficulty(),
        first in 0usize..3,
        second in 0usize..3,
        ticks in 0u32..9,
    ) {
        let (mut m, mut source) = started(2, difficulty);
        m.fetch_with(&mut source).unwrap();
        for _ in 0..ticks {
            m.tick();
        }

        let options = m.state().unwrap().current().unwrap().presented().options().to_vec();
        let recorded = m.answer(&options[first]).unwrap();
        prop_assert!(matches!(recorded, AnswerOutcome::Recorded(_)));
        let snapshot = m.state().unwrap().clone();

        prop_assert_eq!(m.answer(&options[second]).unwrap(), AnswerOutcome::AlreadyResolved);
        let after = m.state().unwrap();
        prop_assert_eq!(after.total_score(), snapshot.total_score());
        prop_assert_eq!(after.questions_answered(), snapshot.questions_answered());
        prop_assert_eq!(after.log().as_slice(), snapshot.log().as_slice());
    }

    #[test]
    fn finishing_every_question_ends_the_session(
        count in 1u32..8,
        difficulty in difficulty(),
        picks in prop::collection::vec(0usize..3, 8),
    ) {
        let (mut m, mut source) = started(count, difficulty);
        for pick in picks.iter().take(count as usize) {
            prop_assert_eq!(m.status(), Status::InProgress);
            m.fetch_with(&mut source).unwrap();
            let option = m.state().unwrap().current().unwrap().presented().option(*pick).unwrap().to_string();
            m.answer(&option).unwrap();
            let _ = m.advance().unwrap();
        }
        prop_assert_eq!(m.status(), Status::Ended);
        let summary = m.summary().unwrap();
        prop_assert!(!summary.ended_early);
        prop_assert!(summary.total_score <= summary.max_possible_score);
    }
}
