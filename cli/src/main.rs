use clap::{Parser, Subcommand};
use quizsync::{
    AppState, build_state,
    auth::Credential,
    error::{AppResult, run_with_error_handler},
    model::{LessonId, ProgressId, QuizId},
    sync::{Advance, LoadSource, SubmitOutcome, SyncError},
};

#[derive(Parser, Debug)]
#[command(about = "Drive lesson quizzes and progress against the LMS backend", long_about = None)]
pub struct Cli {
    /// Read ./config.toml instead of the per-user config
    #[arg(long, global = true, default_value_t = false)]
    pub local: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Store a bearer token for later commands
    Login {
        #[arg(long, env = "QUIZSYNC_TOKEN")]
        token: String,
    },

    /// Forget the stored token
    Logout,

    /// Lesson quizzes
    Quiz {
        #[command(subcommand)]
        action: QuizCommands,
    },

    /// Lesson progress
    Progress {
        #[command(subcommand)]
        action: ProgressCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum QuizCommands {
    /// List questions and the answers recorded so far
    Show {
        #[arg(long)]
        lesson: String,
    },
    /// Answer one question
    Answer {
        #[arg(long)]
        lesson: String,
        #[arg(long)]
        quiz: String,
        #[arg(long)]
        answer: String,
    },
    /// Walk through the unanswered questions, answering in order
    Run {
        #[arg(long)]
        lesson: String,
        /// One answer per remaining question
        #[arg(long = "answer", num_args = 1..)]
        answers: Vec<String>,
    },
    /// Forget every answer of a lesson
    Reset {
        #[arg(long)]
        lesson: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProgressCommands {
    /// Fetch or create the progress record of a lesson
    Init {
        #[arg(long)]
        lesson: String,
    },
    /// Set completion percentage and notes
    Update {
        #[arg(long)]
        id: String,
        #[arg(long, allow_negative_numbers = true)]
        percent: i64,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Completion across several lessons
    Course {
        #[arg(long = "lesson", num_args = 1..)]
        lessons: Vec<String>,
    },
}

/// Shows the user-facing message before handing the error to the handler.
fn report(e: SyncError) -> quizsync::error::AppError {
    eprintln!("{}", e.client_display());
    e.into()
}

async fn show(state: &AppState, lesson: String) -> AppResult<()> {
    let outcome = state
        .reconciler()
        .load(&LessonId::from(lesson))
        .await
        .map_err(report)?;

    if let LoadSource::Cached { saved_at, .. } = &outcome.source {
        println!("(offline: showing answers saved at {saved_at})");
    }
    for warning in &outcome.warnings {
        println!("warning: {warning}");
    }
    for quiz in &outcome.quizzes {
        println!("[{}] {}", quiz.id(), quiz.question());
        for option in quiz.options() {
            println!("    - {option}");
        }
        match outcome.answers.get(quiz.id()) {
            Some(a) => {
                println!(
                    "    answered: {} ({})",
                    a.answer,
                    if a.is_correct { "correct" } else { "incorrect" }
                );
                if let Some(explanation) = quiz.explanation() {
                    println!("    {explanation}");
                }
            }
            None => println!("    not answered"),
        }
    }
    Ok(())
}

fn print_outcome(outcome: &SubmitOutcome) {
    match outcome {
        SubmitOutcome::Recorded {
            is_correct,
            feedback,
        } => println!(
            "{} {}",
            if *is_correct { "Correct!" } else { "Incorrect." },
            feedback
        ),
        SubmitOutcome::AlreadyRecorded { .. } => println!("That answer is already recorded."),
        SubmitOutcome::Throttled => println!("Slow down, answer ignored."),
    }
}

async fn run() -> AppResult<()> {
    let args = Cli::parse();
    let state = build_state(args.local).await?;

    match args.command {
        Commands::Login { token } => {
            let credential = Credential::from_token(token)?;
            state.session().sign_in(credential.clone())?;
            println!("Signed in as user {}", credential.user_id());
        }

        Commands::Logout => {
            state.session().clear();
            println!("Signed out");
        }

        Commands::Quiz { action } => match action {
            QuizCommands::Show { lesson } => show(&state, lesson).await?,

            QuizCommands::Answer {
                lesson,
                quiz,
                answer,
            } => {
                let mut reconciler = state.reconciler();
                reconciler
                    .load(&LessonId::from(lesson))
                    .await
                    .map_err(report)?;
                let outcome = reconciler
                    .submit(&QuizId::from(quiz), &answer)
                    .await
                    .map_err(report)?;
                print_outcome(&outcome);
            }

            QuizCommands::Run { lesson, answers } => {
                let (mut session, _) = state
                    .open_quiz(LessonId::from(lesson))
                    .await
                    .map_err(report)?;

                for answer in answers {
                    if session.is_completed() {
                        break;
                    }
                    if let Some(quiz) = session.current_quiz() {
                        println!("{}", quiz.question());
                    }
                    let outcome = session.submit(&answer).await.map_err(report)?;
                    print_outcome(&outcome);
                    if let Advance::End { .. } = session.advance().map_err(report)? {
                        break;
                    }
                }

                let summary = session.summary();
                println!(
                    "{}/{} answered, score {}%{}",
                    summary.answered,
                    summary.total,
                    summary.score_percent(),
                    if session.is_completed() { " - completed" } else { "" }
                );
            }

            QuizCommands::Reset { lesson } => {
                state
                    .reconciler()
                    .reset(&LessonId::from(lesson))
                    .await
                    .map_err(report)?;
                println!("Answers cleared");
            }
        },

        Commands::Progress { action } => match action {
            ProgressCommands::Init { lesson } => {
                let progress = state
                    .tracker()
                    .initialize(&LessonId::from(lesson))
                    .await
                    .map_err(report)?;
                println!(
                    "Progress {}: {} ({}%)",
                    progress.id(),
                    progress.status(),
                    progress.completion_percentage()
                );
            }

            ProgressCommands::Update { id, percent, notes } => {
                let update = state
                    .tracker()
                    .update(&ProgressId::from(id), percent, &notes)
                    .await
                    .map_err(report)?;
                println!(
                    "Progress set to {}% ({})",
                    update.completion_percentage, update.status
                );
            }

            ProgressCommands::Course { lessons } => {
                let lessons: Vec<LessonId> = lessons.into_iter().map(LessonId::from).collect();
                let overview = state
                    .tracker()
                    .course_overview(&lessons)
                    .await
                    .map_err(report)?;
                for lesson in &overview.lessons {
                    println!(
                        "{}: {} ({}%)",
                        lesson.lesson_id, lesson.status, lesson.completion_percentage
                    );
                }
                println!(
                    "Course: {} ({}%)",
                    overview.status(),
                    overview.average_completion
                );
            }
        },
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    quizsync::setup_trace();
    run_with_error_handler(run).await;
    tracing::trace!("done");
}
