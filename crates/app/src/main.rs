use std::fmt;
use std::str::FromStr;

use tracing::debug;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use exam_core::model::{AttemptId, Role, StudentId, TestId};
use services::api::{DEFAULT_API_BASE_URL, Difficulty, TestBlueprint};
use services::demo::demo_paper;
use services::{ApiConfig, AppServices, AssessmentConfig, Clock, ResultsView};

mod take;
mod teacher;

const DEFAULT_DB_URL: &str = "sqlite:exam.sqlite3";
const GUEST_STUDENT_ID: &str = "guest";
const DEFAULT_QUESTION_COUNT: u32 = 5;

#[derive(Debug, PartialEq, Eq)]
enum ArgsError {
    MissingCommand,
    UnknownCommand(String),
    MissingValue { flag: &'static str },
    MissingArg { name: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidRole { raw: String },
    InvalidTestId { raw: String },
    InvalidAttemptId { raw: String },
    InvalidDifficulty { raw: String },
    InvalidNumber { flag: &'static str, raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingCommand => write!(f, "a command is required"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown command: {cmd}"),
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingArg { name } => write!(f, "missing {name}"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidRole { raw } => write!(f, "invalid --role value: {raw}"),
            ArgsError::InvalidTestId { raw } => write!(f, "invalid test id: {raw}"),
            ArgsError::InvalidAttemptId { raw } => write!(f, "invalid attempt id: {raw}"),
            ArgsError::InvalidDifficulty { raw } => {
                write!(f, "invalid --difficulty value: {raw}")
            }
            ArgsError::InvalidNumber { flag, raw } => {
                write!(f, "{flag} expects a positive number, got {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn require_positive(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<u32, ArgsError> {
    let raw = require_value(args, flag)?;
    match raw.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ArgsError::InvalidNumber { flag, raw }),
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  app login --email <email> --password <password> [--role teacher|student]");
    eprintln!("  app student-login --name <name> --email <email>");
    eprintln!("  app logout");
    eprintln!("  app whoami");
    eprintln!("  app tests");
    eprintln!("  app take <test-id>");
    eprintln!("  app demo");
    eprintln!("  app results");
    eprintln!("  app register --name <name> --email <email> --password <password>");
    eprintln!("  app create-test --title <title> --subject <subject> [--difficulty easy|medium|hard]");
    eprintln!("                  [--questions <n>] [--class <class>] [--save]");
    eprintln!("  app submissions [--page <n>]");
    eprintln!("  app submission <attempt-id>");
    eprintln!();
    eprintln!("Options (all commands):");
    eprintln!("  --db <sqlite_url>   default {DEFAULT_DB_URL}");
    eprintln!("  --api <base_url>    default {DEFAULT_API_BASE_URL}");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  EXAM_DB_URL, EXAM_API_BASE_URL, EXAM_DURATION_POLICY, EXAM_DURATION_SECS, RUST_LOG");
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Login {
        email: String,
        password: String,
        role: Role,
    },
    StudentLogin {
        name: String,
        email: String,
    },
    Logout,
    Whoami,
    Tests,
    Take {
        test_id: TestId,
    },
    Demo,
    Results,
    Register {
        name: String,
        email: String,
        password: String,
    },
    CreateTest {
        blueprint: TestBlueprint,
        save: bool,
    },
    Submissions {
        page: u32,
    },
    Submission {
        attempt_id: AttemptId,
    },
}

#[derive(Debug)]
struct Args {
    db_url: String,
    api_base_url: String,
    command: Command,
}

impl Args {
    /// Parse `argv` (without the program name). `Ok(None)` means help was asked for.
    fn parse(
        argv: impl IntoIterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Option<Self>, ArgsError> {
        let mut args = argv.into_iter();
        let command = match args.next() {
            None => return Err(ArgsError::MissingCommand),
            Some(first) if first == "--help" || first == "-h" => return Ok(None),
            Some(first) => first,
        };

        let mut db_url = env("EXAM_DB_URL").unwrap_or_else(|| DEFAULT_DB_URL.to_owned());
        let mut api_base_url =
            env("EXAM_API_BASE_URL").unwrap_or_else(|| DEFAULT_API_BASE_URL.to_owned());
        let mut email = None;
        let mut password = None;
        let mut name = None;
        let mut role = Role::Student;
        let mut title = None;
        let mut subject = None;
        let mut difficulty = Difficulty::default();
        let mut question_count = DEFAULT_QUESTION_COUNT;
        let mut class_name = String::new();
        let mut save = false;
        let mut page = 1;
        let mut positional = Vec::new();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--api" => api_base_url = require_value(&mut args, "--api")?,
                "--email" => email = Some(require_value(&mut args, "--email")?),
                "--password" => password = Some(require_value(&mut args, "--password")?),
                "--name" => name = Some(require_value(&mut args, "--name")?),
                "--role" => {
                    let value = require_value(&mut args, "--role")?;
                    role = Role::from_str(&value)
                        .map_err(|_| ArgsError::InvalidRole { raw: value })?;
                }
                "--title" => title = Some(require_value(&mut args, "--title")?),
                "--subject" => subject = Some(require_value(&mut args, "--subject")?),
                "--difficulty" => {
                    let value = require_value(&mut args, "--difficulty")?;
                    difficulty = Difficulty::from_str(&value)
                        .map_err(|_| ArgsError::InvalidDifficulty { raw: value })?;
                }
                "--questions" => question_count = require_positive(&mut args, "--questions")?,
                "--class" => class_name = require_value(&mut args, "--class")?,
                "--save" => save = true,
                "--page" => page = require_positive(&mut args, "--page")?,
                "--help" | "-h" => return Ok(None),
                _ if arg.starts_with('-') => return Err(ArgsError::UnknownArg(arg)),
                _ => positional.push(arg),
            }
        }

        let mut positional = positional.into_iter();
        let command = match command.as_str() {
            "login" => Command::Login {
                email: email.ok_or(ArgsError::MissingValue { flag: "--email" })?,
                password: password.ok_or(ArgsError::MissingValue { flag: "--password" })?,
                role,
            },
            "student-login" => Command::StudentLogin {
                name: name.ok_or(ArgsError::MissingValue { flag: "--name" })?,
                email: email.ok_or(ArgsError::MissingValue { flag: "--email" })?,
            },
            "logout" => Command::Logout,
            "whoami" => Command::Whoami,
            "tests" => Command::Tests,
            "take" => {
                let raw = positional
                    .next()
                    .ok_or(ArgsError::MissingArg { name: "<test-id>" })?;
                let test_id =
                    TestId::from_str(&raw).map_err(|_| ArgsError::InvalidTestId { raw })?;
                Command::Take { test_id }
            }
            "demo" => Command::Demo,
            "results" => Command::Results,
            "register" => Command::Register {
                name: name.ok_or(ArgsError::MissingValue { flag: "--name" })?,
                email: email.ok_or(ArgsError::MissingValue { flag: "--email" })?,
                password: password.ok_or(ArgsError::MissingValue { flag: "--password" })?,
            },
            "create-test" => Command::CreateTest {
                blueprint: TestBlueprint {
                    title: title.ok_or(ArgsError::MissingValue { flag: "--title" })?,
                    topic: subject.ok_or(ArgsError::MissingValue { flag: "--subject" })?,
                    difficulty,
                    question_count,
                    class_name,
                },
                save,
            },
            "submissions" => Command::Submissions { page },
            "submission" => {
                let raw = positional
                    .next()
                    .ok_or(ArgsError::MissingArg { name: "<attempt-id>" })?;
                let attempt_id =
                    AttemptId::from_str(&raw).map_err(|_| ArgsError::InvalidAttemptId { raw })?;
                Command::Submission { attempt_id }
            }
            _ => return Err(ArgsError::UnknownCommand(command)),
        };

        if let Some(extra) = positional.next() {
            return Err(ArgsError::UnknownArg(extra));
        }

        Ok(Some(Self {
            db_url: normalize_sqlite_url(db_url),
            api_base_url,
            command,
        }))
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let parsed = match Args::parse(std::env::args().skip(1), |key| std::env::var(key).ok()) {
        Ok(Some(parsed)) => parsed,
        Ok(None) => {
            print_usage();
            return Ok(());
        }
        Err(err) => {
            eprintln!("{err}");
            print_usage();
            return Err(err.into());
        }
    };

    debug!(db = %parsed.db_url, api = %parsed.api_base_url, "starting");
    prepare_sqlite_file(&parsed.db_url)?;
    let api = ApiConfig::new(&parsed.api_base_url)?;
    let services = AppServices::new_sqlite(
        &parsed.db_url,
        api,
        Clock::default(),
        AssessmentConfig::from_env(),
    )
    .await?;
    let identity = services.identity();

    match parsed.command {
        Command::Login {
            email,
            password,
            role,
        } => {
            let who = identity.login(&email, &password, role).await?;
            println!("signed in as {} ({})", who.name, who.role);
        }
        Command::StudentLogin { name, email } => {
            let who = identity.student_login(&name, &email).await?;
            println!("signed in as {} ({})", who.name, who.role);
        }
        Command::Logout => {
            identity.clear().await?;
            println!("signed out");
        }
        Command::Whoami => match identity.current().await {
            Some(who) => println!("{} <{}> ({}, id {})", who.name, who.email, who.role, who.user_id),
            None => println!("not signed in"),
        },
        Command::Tests => {
            let student = identity.require_student().await?;
            let tests = services.catalog().list_tests(&student).await?;
            if tests.is_empty() {
                println!("no tests available");
            }
            for test in tests {
                let questions = test
                    .question_count
                    .map_or_else(String::new, |n| format!(", {n} questions"));
                let minutes = test
                    .duration_minutes
                    .map_or_else(String::new, |m| format!(", {m} min"));
                println!("{}  {}{questions}{minutes}", test.id, test.title);
            }
        }
        Command::Take { test_id } => {
            let student = identity.require_student().await?;
            let assessments = services.assessments();
            let runner = assessments.load(&test_id, student).await?;
            take::run(&assessments, runner).await?;
        }
        Command::Demo => {
            let student = identity
                .current()
                .await
                .and_then(|who| who.student_id())
                .unwrap_or_else(|| StudentId::new(GUEST_STUDENT_ID));
            let demo = services.demo();
            let runner = demo.begin(demo_paper(), student)?;
            take::run(&demo, runner).await?;
        }
        Command::Results => {
            let student = identity.require_student().await?;
            let results = services.catalog().list_results(&student).await?;
            if results.is_empty() {
                println!("no results yet");
            }
            for listing in results {
                let view =
                    ResultsView::new(&listing.result, false).with_time_taken(listing.time_taken_secs);
                match view.time_taken() {
                    Some(taken) => println!(
                        "{}  {}  in {taken}  {}",
                        listing.test_title,
                        view.score_line(),
                        view.headline
                    ),
                    None => {
                        println!("{}  {}  {}", listing.test_title, view.score_line(), view.headline);
                    }
                }
            }
        }
        Command::Register {
            name,
            email,
            password,
        } => {
            let who = identity.register_teacher(&name, &email, &password).await?;
            println!("registered and signed in as {} ({})", who.name, who.role);
        }
        Command::CreateTest { blueprint, save } => {
            let teacher_id = identity.require_teacher().await?;
            teacher::create_test(services.teacher().as_ref(), &teacher_id, &blueprint, save)
                .await?;
        }
        Command::Submissions { page } => {
            let teacher_id = identity.require_teacher().await?;
            teacher::list_submissions(services.teacher().as_ref(), &teacher_id, page).await?;
        }
        Command::Submission { attempt_id } => {
            identity.require_teacher().await?;
            teacher::show_submission(services.teacher().as_ref(), &attempt_id).await?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Result<Option<Args>, ArgsError> {
        Args::parse(argv.iter().map(|s| (*s).to_owned()), |_| None)
    }

    #[test]
    fn take_requires_a_test_id() {
        let err = parse(&["take"]).unwrap_err();
        assert_eq!(err, ArgsError::MissingArg { name: "<test-id>" });

        let args = parse(&["take", "42", "--api", "http://exam.local"])
            .unwrap()
            .unwrap();
        assert_eq!(
            args.command,
            Command::Take {
                test_id: TestId::new("42")
            }
        );
        assert_eq!(args.api_base_url, "http://exam.local");
    }

    #[test]
    fn login_reads_role_and_credentials() {
        let args = parse(&[
            "login",
            "--email",
            "t@example.com",
            "--password",
            "pw",
            "--role",
            "Teacher",
        ])
        .unwrap()
        .unwrap();
        assert_eq!(
            args.command,
            Command::Login {
                email: "t@example.com".into(),
                password: "pw".into(),
                role: Role::Teacher,
            }
        );

        let err = parse(&["login", "--email", "t@example.com"]).unwrap_err();
        assert_eq!(err, ArgsError::MissingValue { flag: "--password" });
    }

    #[test]
    fn register_needs_all_three_fields() {
        let args = parse(&[
            "register",
            "--name",
            "Grace",
            "--email",
            "g@example.com",
            "--password",
            "hopper1",
        ])
        .unwrap()
        .unwrap();
        assert_eq!(
            args.command,
            Command::Register {
                name: "Grace".into(),
                email: "g@example.com".into(),
                password: "hopper1".into(),
            }
        );

        let err = parse(&["register", "--name", "Grace", "--email", "g@example.com"]).unwrap_err();
        assert_eq!(err, ArgsError::MissingValue { flag: "--password" });
    }

    #[test]
    fn create_test_fills_blueprint_defaults() {
        let args = parse(&["create-test", "--title", "Fractions", "--subject", "Maths"])
            .unwrap()
            .unwrap();
        assert_eq!(
            args.command,
            Command::CreateTest {
                blueprint: TestBlueprint {
                    title: "Fractions".into(),
                    topic: "Maths".into(),
                    difficulty: Difficulty::Easy,
                    question_count: 5,
                    class_name: String::new(),
                },
                save: false,
            }
        );

        let args = parse(&[
            "create-test",
            "--title",
            "Fractions",
            "--subject",
            "Maths",
            "--difficulty",
            "HARD",
            "--questions",
            "12",
            "--class",
            "7B",
            "--save",
        ])
        .unwrap()
        .unwrap();
        let Command::CreateTest { blueprint, save } = args.command else {
            panic!("expected create-test");
        };
        assert!(save);
        assert_eq!(blueprint.difficulty, Difficulty::Hard);
        assert_eq!(blueprint.question_count, 12);
        assert_eq!(blueprint.class_name, "7B");
    }

    #[test]
    fn create_test_rejects_bad_values() {
        assert_eq!(
            parse(&["create-test", "--subject", "Maths"]).unwrap_err(),
            ArgsError::MissingValue { flag: "--title" }
        );
        assert_eq!(
            parse(&["create-test", "--difficulty", "brutal"]).unwrap_err(),
            ArgsError::InvalidDifficulty {
                raw: "brutal".into()
            }
        );
        assert_eq!(
            parse(&["create-test", "--questions", "0"]).unwrap_err(),
            ArgsError::InvalidNumber {
                flag: "--questions",
                raw: "0".into()
            }
        );
    }

    #[test]
    fn submissions_take_a_page_and_detail_takes_an_id() {
        let args = parse(&["submissions"]).unwrap().unwrap();
        assert_eq!(args.command, Command::Submissions { page: 1 });

        let args = parse(&["submissions", "--page", "3"]).unwrap().unwrap();
        assert_eq!(args.command, Command::Submissions { page: 3 });

        let args = parse(&["submission", "a-17"]).unwrap().unwrap();
        assert_eq!(
            args.command,
            Command::Submission {
                attempt_id: AttemptId::new("a-17")
            }
        );
        assert_eq!(
            parse(&["submission"]).unwrap_err(),
            ArgsError::MissingArg {
                name: "<attempt-id>"
            }
        );
    }

    #[test]
    fn env_supplies_defaults() {
        let args = Args::parse(["whoami".to_owned()], |key| match key {
            "EXAM_DB_URL" => Some("sqlite::memory:".into()),
            "EXAM_API_BASE_URL" => Some("http://backend:8080".into()),
            _ => None,
        })
        .unwrap()
        .unwrap();
        assert_eq!(args.db_url, "sqlite::memory:");
        assert_eq!(args.api_base_url, "http://backend:8080");
    }

    #[test]
    fn rejects_unknown_input() {
        assert_eq!(
            parse(&["grade"]).unwrap_err(),
            ArgsError::UnknownCommand("grade".into())
        );
        assert_eq!(
            parse(&["tests", "--verbose"]).unwrap_err(),
            ArgsError::UnknownArg("--verbose".into())
        );
        assert_eq!(
            parse(&["logout", "now"]).unwrap_err(),
            ArgsError::UnknownArg("now".into())
        );
        assert!(parse(&["--help"]).unwrap().is_none());
        assert_eq!(parse(&[]).unwrap_err(), ArgsError::MissingCommand);
    }
}
