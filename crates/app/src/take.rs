use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{self, MissedTickBehavior};

use exam_core::SessionStatus;
use exam_core::model::{TestPaper, option_label};
use exam_core::time::format_countdown;
use services::assessment::{Banner, SessionView, Urgency};
use services::{
    AssessmentError, AssessmentRunner, AssessmentService, ResultsView, RunnerPhase, SubmitReport,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    Answer { number: usize, label: char },
    Submit,
    Retry,
    Status,
    Help,
}

fn parse_input(line: &str) -> Option<Input> {
    let line = line.trim();
    match line.to_ascii_lowercase().as_str() {
        "submit" | "s" => return Some(Input::Submit),
        "retry" | "r" => return Some(Input::Retry),
        "status" | "?" => return Some(Input::Status),
        "help" | "h" => return Some(Input::Help),
        _ => {}
    }

    let mut parts = line.split_whitespace();
    let number = parts.next()?.parse::<usize>().ok()?;
    let mut letters = parts.next()?.chars();
    let label = letters.next()?.to_ascii_uppercase();
    if letters.next().is_some() || parts.next().is_some() {
        return None;
    }
    Some(Input::Answer { number, label })
}

fn print_help() {
    println!("  <n> <letter>   answer question n, e.g. `2 b`");
    println!("  status         show time left and progress");
    println!("  submit         submit your answers");
    println!("  retry          send again after a failed submission");
}

fn print_paper(paper: &TestPaper, duration_secs: u64) {
    println!();
    println!(
        "{} ({} questions, {})",
        paper.title(),
        paper.question_count(),
        format_countdown(duration_secs)
    );
    for (index, question) in paper.questions().iter().enumerate() {
        println!();
        println!("{}. {}", index + 1, question.prompt());
        for (i, option) in question.options().iter().enumerate() {
            println!("   {}) {option}", option_label(i));
        }
    }
    println!();
    print_help();
    println!();
}

fn print_status(view: &SessionView) {
    println!(
        "{} left ({}%), answered {}/{}",
        view.countdown, view.time_left_percent, view.answered, view.total
    );
    if !view.unanswered.is_empty() && view.status == SessionStatus::InProgress {
        let ids: Vec<&str> = view.unanswered.iter().map(|id| id.as_str()).collect();
        println!("unanswered: {}", ids.join(", "));
    }
}

fn print_results(results: &ResultsView) {
    println!();
    println!("{}", results.headline);
    println!("{}", results.score_line());
    println!("incorrect: {}", results.incorrect);
    if let Some(taken) = results.time_taken() {
        println!("time taken: {taken}");
    }
    if let Some(note) = results.note() {
        println!("{note}");
    }
}

async fn answer(runner: &AssessmentRunner, paper: &TestPaper, number: usize, label: char) {
    let Some(question) = number
        .checked_sub(1)
        .and_then(|index| paper.questions().get(index))
    else {
        eprintln!("there is no question {number}");
        return;
    };
    let Some(option) = question.option_for_label(label) else {
        eprintln!("question {number} has no option {label}");
        return;
    };

    match runner.record_answer(question.id().clone(), option).await {
        Ok(()) => {
            let view = runner.snapshot().await;
            println!("answered {}/{}", view.answered, view.total);
        }
        Err(err) => eprintln!("{err}"),
    }
}

async fn submit(runner: &AssessmentRunner) {
    match runner.submit().await {
        Ok(SubmitReport::Suppressed) => println!("already submitted"),
        // Outcomes are reported from the phase watcher.
        Ok(SubmitReport::Delivered { .. }) | Err(AssessmentError::SubmitFailure { .. }) => {}
        Err(err) => eprintln!("{err}"),
    }
}

async fn handle_line(runner: &AssessmentRunner, paper: &TestPaper, line: &str) {
    if line.trim().is_empty() {
        return;
    }
    match parse_input(line) {
        Some(Input::Answer { number, label }) => answer(runner, paper, number, label).await,
        Some(Input::Submit | Input::Retry) => submit(runner).await,
        Some(Input::Status) => print_status(&runner.snapshot().await),
        Some(Input::Help) => print_help(),
        None => eprintln!("unrecognised input, type `help`"),
    }
}

/// Run one session interactively until it is delivered or input ends.
///
/// # Errors
///
/// Returns an error if the session cannot start, stdin fails, or the
/// answers were never delivered.
pub async fn run(
    service: &AssessmentService,
    runner: Arc<AssessmentRunner>,
) -> Result<(), Box<dyn Error>> {
    let (paper, duration_secs) = runner
        .with_session(|s| (s.paper().clone(), s.duration_secs()))
        .await;
    print_paper(&paper, duration_secs);

    runner.start().await?;
    let mut ticker = service.spawn_ticker(&runner);
    let mut phases = runner.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    let mut clock_face = time::interval(Duration::from_secs(1));
    clock_face.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut urgency = Urgency::for_remaining(duration_secs);

    loop {
        tokio::select! {
            changed = phases.changed() => {
                if changed.is_err() {
                    break;
                }
                let phase = *phases.borrow_and_update();
                match phase {
                    RunnerPhase::Delivered => break,
                    RunnerPhase::Submitting => match runner.snapshot().await.banner {
                        Banner::Submitting { auto_submitted: true } => {
                            println!("time is up, submitting your answers...");
                        }
                        _ => println!("submitting..."),
                    },
                    RunnerPhase::DeliveryFailed => {
                        if let Banner::SubmitFailed { message, .. } = runner.snapshot().await.banner {
                            eprintln!("{message}");
                        }
                        if !stdin_open {
                            break;
                        }
                    }
                    RunnerPhase::NotStarted | RunnerPhase::InProgress => {}
                }
            }
            line = lines.next_line(), if stdin_open => {
                if let Some(line) = line? {
                    handle_line(&runner, &paper, &line).await;
                } else {
                    stdin_open = false;
                    match runner.phase() {
                        RunnerPhase::InProgress => submit(&runner).await,
                        RunnerPhase::DeliveryFailed => break,
                        _ => {}
                    }
                }
            }
            _ = clock_face.tick() => {
                let view = runner.snapshot().await;
                if view.status == SessionStatus::InProgress && view.urgency != urgency {
                    urgency = view.urgency;
                    println!("{} left", view.countdown);
                }
            }
        }
    }

    ticker.stop();
    ticker.join().await;

    let submission = runner.with_session(|s| s.submission().cloned()).await;
    match runner.snapshot().await.banner {
        Banner::Submitted {
            result,
            auto_submitted,
        } => {
            let view = match &submission {
                Some(submission) => ResultsView::for_submission(&result, submission),
                None => ResultsView::new(&result, auto_submitted),
            };
            print_results(&view);
            Ok(())
        }
        Banner::SubmitFailed { message, .. } => Err(message.into()),
        _ => Err("the test ended without being submitted".into()),
    }
}
