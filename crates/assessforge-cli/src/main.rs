//! assessforge CLI — import, inspect and publish assessments.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

mod commands;

#[derive(Parser)]
#[command(name = "assessforge", version, about = "Assessment authoring engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import questions from a CSV file or workbook
    Import {
        /// Path to a .csv file or .xlsx/.xls/.ods workbook (first sheet only)
        #[arg(long)]
        sheet: PathBuf,

        /// Write the built document here
        #[arg(long)]
        output: Option<PathBuf>,

        /// Time limit in minutes
        #[arg(long)]
        time_limit: Option<u32>,

        /// When students see correct answers
        #[arg(long, value_enum, default_value = "never")]
        show_answers: ShowAnswers,

        /// Mark the assignment as auto-gradable
        #[arg(long)]
        auto_grade: bool,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Check every question of a document
    Validate {
        /// Path to a document JSON file
        #[arg(long)]
        document: PathBuf,
    },

    /// Show shared passage and audio groups of a document
    Groups {
        /// Path to a document JSON file
        #[arg(long)]
        document: PathBuf,
    },

    /// Inspect or discard a saved draft
    Draft {
        #[command(subcommand)]
        action: DraftAction,
    },

    /// Publish a document through the configured backend
    Submit {
        /// Path to a document JSON file
        #[arg(long)]
        document: PathBuf,

        /// Assignment title
        #[arg(long)]
        title: String,

        /// Due date (RFC 3339, e.g. 2026-11-01T09:00:00Z)
        #[arg(long)]
        due: String,

        /// Skill classification (e.g. reading, listening)
        #[arg(long)]
        skill: String,

        /// Instructions shown to students
        #[arg(long, default_value = "")]
        instructions: String,

        /// Draft key to save to on failure and discard on success
        #[arg(long, default_value = "cli")]
        draft_key: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create starter config and example question sheet
    Init,
}

#[derive(Subcommand)]
enum DraftAction {
    /// Print a summary of a saved draft
    Show {
        #[arg(long)]
        key: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Delete a saved draft
    Discard {
        #[arg(long)]
        key: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ShowAnswers {
    Immediately,
    AfterDueDate,
    Never,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("assessforge=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Import {
            sheet,
            output,
            time_limit,
            show_answers,
            auto_grade,
            config,
        } => {
            let (immediately, after_due_date) = match show_answers {
                ShowAnswers::Immediately => (true, false),
                ShowAnswers::AfterDueDate => (false, true),
                ShowAnswers::Never => (false, false),
            };
            let settings = assessforge_core::document::SettingsForm {
                time_limit_minutes: time_limit,
                auto_grade,
                show_answers_immediately: immediately,
                show_answers_after_due_date: after_due_date,
                max_points: None,
            };
            commands::import::execute(sheet, output, settings, config)
        }
        Commands::Validate { document } => commands::validate::execute(document),
        Commands::Groups { document } => commands::groups::execute(document),
        Commands::Draft { action } => match action {
            DraftAction::Show { key, config } => commands::draft::show(key, config),
            DraftAction::Discard { key, config } => commands::draft::discard(key, config),
        },
        Commands::Submit {
            document,
            title,
            due,
            skill,
            instructions,
            draft_key,
            config,
        } => {
            commands::submit::execute(commands::submit::SubmitArgs {
                document,
                title,
                due,
                skill,
                instructions,
                draft_key,
                config,
            })
            .await
        }
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
