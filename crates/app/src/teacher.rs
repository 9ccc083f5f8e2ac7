use std::error::Error;

use exam_core::model::{AttemptId, TeacherId, option_label};
use exam_core::time::format_countdown;
use services::TeacherCatalog;
use services::api::{AnswerReview, DraftQuestion, SubmissionDetail, SubmissionSummary, TestBlueprint};

fn submission_row(submission: &SubmissionSummary) -> String {
    let result = &submission.result;
    let taken = submission
        .time_taken_secs
        .map_or_else(|| "-".to_owned(), format_countdown);
    format!(
        "{}  {} <{}>  {}  {}% ({}/{})  {}  {}",
        submission.attempt_id,
        submission.student_name,
        submission.student_email,
        submission.test_title,
        result.percentage,
        result.correct_answers,
        result.total_questions,
        taken,
        submission.completed_at.as_deref().unwrap_or("-"),
    )
}

fn answer_line(number: usize, answer: &AnswerReview) -> String {
    let selected = answer.selected_answer.as_deref().unwrap_or("(no answer)");
    if answer.is_correct {
        return format!("{number}. correct: {selected}");
    }
    match answer.correct_answer.as_deref() {
        Some(correct) => format!("{number}. wrong: {selected} (answer: {correct})"),
        None => format!("{number}. wrong: {selected}"),
    }
}

fn print_draft(number: usize, draft: &DraftQuestion) {
    println!();
    println!("{number}. {}", draft.question);
    for (i, option) in draft.options.iter().enumerate() {
        let marker = if *option == draft.correct_answer { "*" } else { " " };
        println!("  {marker}{}) {option}", option_label(i));
    }
    if let Some(explanation) = &draft.explanation {
        println!("   {explanation}");
    }
}

/// Generate questions for `blueprint`, show them, and publish them when `save` is set.
///
/// # Errors
///
/// Returns the backend error if generation or saving fails.
pub async fn create_test(
    catalog: &dyn TeacherCatalog,
    teacher: &TeacherId,
    blueprint: &TestBlueprint,
    save: bool,
) -> Result<(), Box<dyn Error>> {
    let drafts = catalog.generate_questions(teacher, blueprint).await?;
    println!(
        "{} ({}, {}): {} questions",
        blueprint.title,
        blueprint.topic,
        blueprint.difficulty,
        drafts.len()
    );
    for (index, draft) in drafts.iter().enumerate() {
        print_draft(index + 1, draft);
    }
    println!();

    if !save {
        println!("not saved; run again with --save to publish");
        return Ok(());
    }
    match catalog.save_test(teacher, blueprint, &drafts).await? {
        Some(test_id) => println!("saved as test {test_id}"),
        None => println!("saved"),
    }
    Ok(())
}

/// # Errors
///
/// Returns the backend error if the page cannot be fetched.
pub async fn list_submissions(
    catalog: &dyn TeacherCatalog,
    teacher: &TeacherId,
    page: u32,
) -> Result<(), Box<dyn Error>> {
    let listing = catalog.list_submissions(teacher, page).await?;
    if listing.submissions.is_empty() {
        println!("no submissions yet");
    }
    for submission in &listing.submissions {
        println!("{}", submission_row(submission));
    }
    println!("page {} of {}", listing.page, listing.total_pages);
    Ok(())
}

fn print_detail(detail: &SubmissionDetail) {
    let summary = &detail.summary;
    println!("{}", submission_row(summary));
    if let Some(class_name) = &detail.class_name {
        println!("class: {class_name}");
    }
    let about: Vec<&str> = [summary.subject.as_deref(), summary.difficulty.as_deref()]
        .into_iter()
        .flatten()
        .collect();
    if !about.is_empty() {
        println!("{}", about.join(", "));
    }
    println!();
    for (index, answer) in detail.answers.iter().enumerate() {
        println!("{}", answer_line(index + 1, answer));
    }
}

/// # Errors
///
/// Returns the backend error if the submission cannot be fetched.
pub async fn show_submission(
    catalog: &dyn TeacherCatalog,
    attempt_id: &AttemptId,
) -> Result<(), Box<dyn Error>> {
    let detail = catalog.submission_detail(attempt_id).await?;
    print_detail(&detail);
    Ok(())
}
