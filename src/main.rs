use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use uuid::Uuid;

use taskflow_review::analysis::SimulatedAnalyzer;
use taskflow_review::config::Config;
use taskflow_review::db::PgStore;
use taskflow_review::models::{Decision, NewReview, NewTask, TaskFilter, TaskStatus};
use taskflow_review::report::{self, ReportInput};
use taskflow_review::scoring::round_one_decimal;
use taskflow_review::store::{MemoryStore, Repository};
use taskflow_review::{import, seed, tech, ReviewDesk};

#[derive(Parser)]
#[command(name = "taskflow")]
#[command(about = "Task submission, analysis and review tracker", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Postgres URL; overrides DATABASE_URL. Without one, state lives in memory.
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Simulated analysis latency in milliseconds
    #[arg(long, global = true)]
    analysis_delay_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum DecisionArg {
    Completed,
    Rejected,
}

impl From<DecisionArg> for Decision {
    fn from(value: DecisionArg) -> Self {
        match value {
            DecisionArg::Completed => Decision::Completed,
            DecisionArg::Rejected => Decision::Rejected,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    #[command(flatten)]
    Desk(DeskCommand),
}

/// Commands that run against an opened review desk.
#[derive(Subcommand)]
enum DeskCommand {
    /// Load the starter users and teams
    Seed,
    /// Submit tasks from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Submit a task for analysis
    Submit {
        #[arg(long)]
        employee: Uuid,
        /// Defaults to the employee's team
        #[arg(long)]
        team: Option<Uuid>,
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        repo: String,
        #[arg(long = "tech", value_delimiter = ',', required = true)]
        tech_stacks: Vec<String>,
    },
    /// Run code analysis for a pending task
    Analyze {
        #[arg(long)]
        task: Uuid,
    },
    /// Record a review decision with per-technology scores
    Review {
        #[arg(long)]
        task: Uuid,
        #[arg(long)]
        admin: Uuid,
        #[arg(long)]
        feedback: String,
        /// TECH=SCORE, repeatable
        #[arg(long = "score", value_parser = parse_score)]
        scores: Vec<(String, i64)>,
        #[arg(long, value_enum)]
        decision: DecisionArg,
    },
    /// List tasks, newest first
    Tasks {
        #[arg(long)]
        status: Option<TaskStatus>,
        #[arg(long)]
        employee: Option<Uuid>,
        #[arg(long)]
        team: Option<Uuid>,
    },
    /// Show one task with its analysis and review
    Task {
        #[arg(long)]
        id: Uuid,
    },
    /// Show an employee's skill scores
    Score {
        #[arg(long)]
        employee: Uuid,
    },
    /// Rank employees by overall average
    Leaderboard {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Best members per technology
    TopStacks,
    /// Employee by technology averages
    Matrix,
    /// Teams with task counts and member skills
    Teams,
    /// Generate a markdown report
    Report {
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Walk one task through submission, analysis and review
    Demo,
}

fn parse_score(value: &str) -> Result<(String, i64), String> {
    let (tech, score) = value
        .split_once('=')
        .ok_or_else(|| format!("expected TECH=SCORE, got '{value}'"))?;
    let score = score
        .trim()
        .parse()
        .map_err(|_| format!("score for {tech} must be an integer"))?;
    Ok((tech.trim().to_string(), score))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn Repository>> {
    match &config.database_url {
        Some(url) => Ok(Arc::new(PgStore::connect(url, config.max_connections).await?)),
        None => {
            tracing::info!("no database configured, using in-memory store");
            let store = MemoryStore::new();
            seed::seed(&store).await?;
            Ok(Arc::new(store))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    let mut config = Config::from_env()?;
    if let Some(url) = cli.database_url {
        config.database_url = Some(url);
    }
    if let Some(ms) = cli.analysis_delay_ms {
        config.analysis_delay = Duration::from_millis(ms);
    }

    match cli.command {
        Commands::InitDb => init_db(&config).await,
        Commands::Desk(command) => {
            let store = open_store(&config).await?;
            let analyzer = Arc::new(SimulatedAnalyzer::new(config.analysis_delay));
            let desk = ReviewDesk::new(store, analyzer, config.desk.clone());
            run(&desk, command, cli.json).await
        }
    }
}

async fn init_db(config: &Config) -> anyhow::Result<()> {
    let url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set to a Postgres instance")?;
    PgStore::connect(url, config.max_connections)
        .await?
        .init_db()
        .await?;
    println!("Schema ready.");
    Ok(())
}

async fn run(desk: &ReviewDesk, command: DeskCommand, json: bool) -> anyhow::Result<()> {
    match command {
        DeskCommand::Seed => {
            let summary = seed::seed(desk.store().as_ref()).await?;
            println!(
                "Seeded {} users and {} teams.",
                summary.users, summary.teams
            );
        }
        DeskCommand::Import { csv } => {
            let summary = import::import_csv(desk, &csv).await?;
            println!(
                "Submitted {} tasks from {}.",
                summary.submitted.len(),
                csv.display()
            );
            for (line, reason) in &summary.skipped {
                println!("- skipped line {line}: {reason}");
            }
        }
        DeskCommand::Submit {
            employee,
            team,
            title,
            description,
            repo,
            tech_stacks,
        } => {
            let team_id = match team {
                Some(team) => team,
                None => desk
                    .get_employee(employee)
                    .await?
                    .and_then(|user| user.team_id)
                    .context("employee has no team; pass --team")?,
            };
            let task = desk
                .submit_task(NewTask {
                    employee_id: employee,
                    title,
                    description,
                    github_repo_link: repo,
                    tech_stacks,
                    team_id,
                })
                .await?;
            if json {
                print_json(&task)?;
            } else {
                println!("Submitted task {} ({}).", task.id, task.status);
            }
        }
        DeskCommand::Analyze { task } => {
            let analysis = desk.analyze_repo(task).await?;
            if json {
                print_json(&analysis)?;
            } else {
                println!("Overall score {}/100", analysis.overall_score);
                for (name, category) in analysis.categories.iter() {
                    println!("- {name}: {} ({})", category.score, category.remarks);
                }
            }
        }
        DeskCommand::Review {
            task,
            admin,
            feedback,
            scores,
            decision,
        } => {
            let review = desk
                .submit_review(NewReview {
                    task_id: task,
                    admin_id: admin,
                    feedback,
                    scores: scores.into_iter().collect::<BTreeMap<_, _>>(),
                    decision: decision.into(),
                })
                .await?;
            if json {
                print_json(&review)?;
            } else {
                println!("Task {} marked {}.", task, review.decision.as_str());
            }
        }
        DeskCommand::Tasks {
            status,
            employee,
            team,
        } => {
            let tasks = desk
                .list_tasks(&TaskFilter {
                    status,
                    employee_id: employee,
                    team_id: team,
                })
                .await?;
            if json {
                print_json(&tasks)?;
            } else if tasks.is_empty() {
                println!("No tasks match.");
            } else {
                for task in &tasks {
                    println!(
                        "- {} [{}] {} ({})",
                        task.id,
                        task.status.label(),
                        task.title,
                        task.submitted_at.format("%Y-%m-%d")
                    );
                }
            }
        }
        DeskCommand::Task { id } => {
            let task = desk
                .get_task(id)
                .await?
                .with_context(|| format!("task {id} not found"))?;
            let analysis = desk.get_analysis_by_task(id).await?;
            let review = desk.get_review_by_task(id).await?;
            if json {
                print_json(&serde_json::json!({
                    "task": task,
                    "analysis": analysis,
                    "review": review,
                }))?;
            } else {
                println!("{} [{}]", task.title, task.status.label());
                println!("Repo: {}", task.github_repo_link);
                let stacks: Vec<&str> = task.tech_stacks.iter().map(|t| tech::label(t)).collect();
                println!("Stacks: {}", stacks.join(", "));
                if let Some(analysis) = analysis {
                    println!("Analysis: {}/100", analysis.overall_score);
                }
                if let Some(review) = review {
                    println!("Review ({}): {}", review.decision.as_str(), review.feedback);
                }
            }
        }
        DeskCommand::Score { employee } => match desk.get_employee_score(employee).await? {
            Some(score) if json => print_json(&score)?,
            Some(score) => {
                println!(
                    "Overall {:.1} ({} completed, {} rejected)",
                    round_one_decimal(score.overall_average),
                    score.total_tasks_completed,
                    score.total_tasks_rejected
                );
                for (tech_id, data) in &score.scores {
                    println!(
                        "- {}: {:.1} across {} reviews",
                        tech::label(tech_id),
                        round_one_decimal(data.average),
                        data.count
                    );
                }
            }
            None => println!("No reviews recorded for {employee}."),
        },
        DeskCommand::Leaderboard { limit } => {
            let board = desk.leaderboard(limit).await?;
            if json {
                print_json(&board)?;
            } else if board.is_empty() {
                println!("No scored employees yet.");
            } else {
                for (rank, entry) in board.iter().enumerate() {
                    println!(
                        "{}. {} {:.1}",
                        rank + 1,
                        entry.name,
                        round_one_decimal(entry.overall_average)
                    );
                }
            }
        }
        DeskCommand::TopStacks => {
            let stacks = desk.get_top_members_per_tech_stack().await?;
            if json {
                print_json(&stacks)?;
            } else {
                for stack in &stacks {
                    println!("{}:", tech::label(&stack.tech_stack));
                    for member in &stack.top_members {
                        println!(
                            "  - {} {:.1} ({} completed)",
                            member.name,
                            round_one_decimal(member.average),
                            member.total_tasks
                        );
                    }
                }
            }
        }
        DeskCommand::Matrix => {
            let matrix = desk.skill_matrix().await?;
            if json {
                print_json(&matrix)?;
            } else {
                for row in &matrix.rows {
                    let cells: Vec<String> = row
                        .scores
                        .iter()
                        .map(|(t, avg)| format!("{}={:.1}", t, round_one_decimal(*avg)))
                        .collect();
                    println!(
                        "{}: {} (overall {:.1})",
                        row.name,
                        cells.join(" "),
                        round_one_decimal(row.overall)
                    );
                }
            }
        }
        DeskCommand::Teams => {
            let teams = desk.team_summaries().await?;
            if json {
                print_json(&teams)?;
            } else {
                for team in &teams {
                    println!(
                        "{} ({}), lead {}: {}/{} tasks completed",
                        team.name,
                        team.project,
                        team.lead_name,
                        team.completed_count,
                        team.task_count
                    );
                    for member in &team.members {
                        let skills: Vec<String> = member
                            .top_skills
                            .iter()
                            .map(|(t, avg)| format!("{} {:.1}", tech::label(t), round_one_decimal(*avg)))
                            .collect();
                        println!("  - {} {}", member.name, skills.join(", "));
                    }
                }
            }
        }
        DeskCommand::Report { out } => {
            let store = desk.store();
            let tasks = store.list_tasks(&TaskFilter::default()).await?;
            let users = store.list_users().await?;
            let reviews = store.list_reviews().await?;
            let leaderboard = desk.leaderboard(None).await?;
            let top_members = desk.get_top_members_per_tech_stack().await?;
            let matrix = desk.skill_matrix().await?;
            let report = report::build_report(&ReportInput {
                generated_at: chrono::Utc::now(),
                stats: desk.task_stats().await?,
                leaderboard: &leaderboard,
                top_members: &top_members,
                matrix: &matrix,
                reviews: &reviews,
                tasks: &tasks,
                users: &users,
            });
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        DeskCommand::Demo => {
            let task = desk
                .submit_task(NewTask {
                    employee_id: seed::EMPLOYEE_ALICE,
                    title: "Inventory dashboard".to_string(),
                    description: "React front end over a Node.js API".to_string(),
                    github_repo_link: "https://github.com/alice/app".to_string(),
                    tech_stacks: vec!["react".to_string(), "nodejs".to_string()],
                    team_id: seed::TEAM_BACKEND,
                })
                .await?;
            println!("Submitted {} ({}).", task.id, task.status);

            let analysis = desk.analyze_repo(task.id).await?;
            println!("Analysis score {}/100.", analysis.overall_score);

            desk.submit_review(NewReview {
                task_id: task.id,
                admin_id: seed::ADMIN_PRIYA,
                feedback: "Clean component split; add API error handling.".to_string(),
                scores: BTreeMap::from([("react".to_string(), 9), ("nodejs".to_string(), 7)]),
                decision: Decision::Completed,
            })
            .await?;

            let score = desk
                .get_employee_score(seed::EMPLOYEE_ALICE)
                .await?
                .context("score missing after review")?;
            if json {
                print_json(&score)?;
            } else {
                println!(
                    "Alice now averages {:.1} over {} completed tasks.",
                    round_one_decimal(score.overall_average),
                    score.total_tasks_completed
                );
            }
        }
    }

    Ok(())
}
