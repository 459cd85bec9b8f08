use std::sync::mpsc;
use std::time::{Duration, Instant};

use quizzle::{
    question::Difficulty,
    runtime::{ChannelEventSource, FetchWorker, FixedTicker, QuizEvent, Runner, ThreadClock},
    session::{Advance, EngineSettings, TickOutcome},
    source::BankSource,
    validate::RawConfig,
    QuizMachine, Status,
};

// Headless run of the real runtime pieces: thread clock, fetch worker over
// the bundled bank, and the runner loop, without a terminal.
#[test]
fn headless_session_times_out_every_question() {
    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(
        ChannelEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(5)),
    );
    let settings = EngineSettings {
        seconds_per_question: 2,
        tick_interval: Duration::from_millis(10),
        ..EngineSettings::default()
    };
    let mut machine = QuizMachine::new(ThreadClock::new(tx.clone()), settings);
    let worker = FetchWorker::spawn(BankSource::bundled().unwrap().with_seed(3), tx);

    worker.load_categories();
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline && machine.status() != Status::Ended {
        match runner.step() {
            QuizEvent::Categories(result) => {
                machine.set_categories(result.unwrap());
                let request = machine
                    .submit(&RawConfig::new("Ann", "History", Difficulty::Medium, 3))
                    .unwrap();
                worker.fetch(request);
            }
            QuizEvent::Question { id, result } => {
                machine.deliver(id, result).unwrap();
            }
            QuizEvent::Tick(handle) => {
                if let TickOutcome::Expired(_) = machine.clock_tick(handle) {
                    if let Advance::Next(request) = machine.advance().unwrap() {
                        worker.fetch(request);
                    }
                }
            }
            QuizEvent::Key(_) | QuizEvent::Resize | QuizEvent::Idle => {}
        }
    }

    assert_eq!(machine.status(), Status::Ended, "session should finish on timeouts alone");
    let summary = machine.summary().unwrap();
    assert_eq!(summary.questions_played, 3);
    assert_eq!(summary.total_score, 0);
    assert!(summary.log.iter().all(|r| r.seconds_taken == 2));
    assert!(!summary.ended_early);
}

#[test]
fn stale_ticks_after_answer_are_ignored() {
    let (tx, rx) = mpsc::channel();
    let settings = EngineSettings {
        tick_interval: Duration::from_millis(5),
        ..EngineSettings::default()
    };
    let mut machine = QuizMachine::new(ThreadClock::new(tx.clone()), settings);
    let mut bank = BankSource::bundled().unwrap();
    machine.set_categories(vec!["Science".into()]);
    machine
        .submit(&RawConfig::new("Ann", "Science", Difficulty::Easy, 2))
        .unwrap();
    machine.fetch_with(&mut bank).unwrap();

    let handle = machine.running_clock().unwrap();
    let answer = machine
        .state()
        .and_then(|s| s.current())
        .map(|q| q.presented().question().correct_answer().to_string())
        .unwrap();
    machine.answer(&answer).unwrap();
    let score = machine.state().unwrap().total_score();

    // anything the old clock still delivers changes nothing
    std::thread::sleep(Duration::from_millis(30));
    while let Ok(event) = rx.try_recv() {
        if let QuizEvent::Tick(h) = event {
            assert_eq!(h, handle);
            assert_eq!(machine.clock_tick(h), TickOutcome::Ignored);
        }
    }
    assert_eq!(machine.state().unwrap().total_score(), score);
    assert_eq!(machine.state().unwrap().remaining_secs(), Some(10));
}
