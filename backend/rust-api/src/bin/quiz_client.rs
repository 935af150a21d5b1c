use anyhow::{bail, Context};
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quiz_api::client::store::{QuizSettings, QuizStore};
use quiz_api::client::ApiClient;

const DEFAULT_API_URL: &str = "http://localhost:8080";
/// Questions drawn before filtering by the selected categories
const RANDOM_POOL_SIZE: usize = 500;

type Input = Lines<BufReader<Stdin>>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quiz_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let base_url = std::env::var("QUIZ_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
    let client = ApiClient::new(base_url).context("Failed to build HTTP client")?;
    tracing::info!(url = client.base_url(), "Using quiz API");

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut store = QuizStore::new();

    store.set_categories(
        client
            .list_categories()
            .await
            .context("Failed to load categories")?,
    );
    if store.categories().is_empty() {
        bail!("No categories available, create some first");
    }

    println!("Categories:");
    for (index, category) in store.categories().iter().enumerate() {
        println!(
            "  {}. {} [{}] - {}",
            index + 1,
            category.name,
            category.language.as_str(),
            category.description
        );
    }

    let picked = prompt(&mut input, "Pick categories (e.g. 1,3): ").await?;
    let category_ids: Vec<String> = picked
        .split(',')
        .filter_map(|n| n.trim().parse::<usize>().ok())
        .filter_map(|n| n.checked_sub(1))
        .filter_map(|i| store.categories().get(i))
        .map(|category| category.id.clone())
        .collect();

    let language = match category_ids.first() {
        Some(id) => store
            .categories()
            .iter()
            .find(|category| &category.id == id)
            .map(|category| category.language)
            .unwrap_or(QuizSettings::default().language),
        None => QuizSettings::default().language,
    };

    let count = prompt(&mut input, "How many questions? [10]: ").await?;
    let settings = QuizSettings {
        category_ids,
        language,
        question_count: count.trim().parse().unwrap_or(10),
        ..QuizSettings::default()
    };
    if let Err(e) = store.set_settings(settings) {
        bail!("Invalid quiz settings: {}", e);
    }

    let pool = client
        .random_questions(RANDOM_POOL_SIZE)
        .await
        .context("Failed to load questions")?;
    let total = store
        .start_quiz(pool)
        .map_err(|e| anyhow::anyhow!("Invalid quiz settings: {}", e))?;
    if total == 0 {
        bail!("No questions found for the selected categories");
    }

    let seconds = store.settings().seconds_per_question;
    let questions = store.questions().to_vec();
    for (index, question) in questions.iter().enumerate() {
        println!(
            "\n[{}/{}] {} ({}s)",
            index + 1,
            total,
            question.question_text,
            seconds
        );
        for (n, option) in question.options.iter().enumerate() {
            println!("  {}. {}", n + 1, option);
        }

        store.start_timer(Instant::now());
        let remaining = store.remaining(Instant::now());
        let reply = tokio::time::timeout(remaining, prompt(&mut input, "> ")).await;

        let choice = match reply {
            Ok(line) => line?,
            Err(_) => {
                println!("\nTime is up. The answer was: {}", question.correct_answer);
                continue;
            }
        };

        let selected = choice
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| question.options.get(i))
            .cloned()
            .unwrap_or_else(|| choice.trim().to_string());

        match store.answer(&question.id, &selected) {
            Some(answer) if answer.is_correct => println!("Correct!"),
            Some(_) => println!("Wrong. The answer was: {}", question.correct_answer),
            None => println!("Too late. The answer was: {}", question.correct_answer),
        }
        if let Some(explanation) = &question.explanation {
            println!("  {}", explanation);
        }
    }

    let stats = store.finish();
    println!(
        "\nScore: {}/{} correct, {} answered ({:.0}%)",
        stats.correct, stats.total, stats.answered, stats.score_percent
    );

    Ok(())
}

async fn prompt(input: &mut Input, label: &str) -> anyhow::Result<String> {
    use std::io::Write;

    print!("{}", label);
    std::io::stdout().flush()?;

    match input.next_line().await? {
        Some(line) => Ok(line),
        None => bail!("Input closed"),
    }
}
