use std::io::{self, Write};

use anyhow::{bail, Context, Result};
use clap::Parser;
use legalrag::config::init_tracing;
use legalrag::render::{present, source_entries, ErrorReport};
use legalrag::{AnswerArgs, Language, ServiceArgs, TerminalPresenter};

#[derive(Parser, Debug)]
#[command(
    name = "legalrag",
    version,
    about = "Answer a legal question from the article index, citing the retrieved articles"
)]
struct LegalRagCli {
    /// Question to answer (Arabic or English)
    #[arg(long, short)]
    question: String,

    #[command(flatten)]
    services: ServiceArgs,

    #[command(flatten)]
    answer: AnswerArgs,

    /// Print the outcome as JSON
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Only print the retrieved context and instruction (skip the LLM call)
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Enable verbose logging
    #[arg(long, short, default_value_t = false)]
    verbose: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = LegalRagCli::parse();
    init_tracing(cli.verbose);

    if cli.question.trim().is_empty() {
        bail!("question must not be empty");
    }
    let config = cli.answer.assistant_config();
    let limit = config.limit;
    let assistant = cli.services.build_assistant(config)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if cli.dry_run {
        let prepared = assistant.prepare(&cli.question, limit)?;
        let language = Language::detect(&cli.question);
        if let Some(rewritten) = &prepared.rewritten_query {
            writeln!(out, "--- Rewritten Query ---\n{rewritten}\n")?;
        }
        writeln!(out, "--- Retrieved Articles ---")?;
        for (title, body) in source_entries(&prepared.articles, language) {
            writeln!(out, "{title}\n{body}\n")?;
        }
        match prepared.prompt {
            Some(prompt) => {
                writeln!(out, "--- System ---\n{}\n", prompt.system)?;
                if !prompt.user.is_empty() {
                    writeln!(out, "--- User ---\n{}\n", prompt.user)?;
                }
            }
            None => writeln!(out, "no citable articles; generation would be skipped.")?,
        }
        writeln!(out, "dry-run enabled; skipping LLM call.")?;
        return Ok(());
    }

    let result = assistant.ask(&cli.question);
    if cli.json {
        let rendered = match &result {
            Ok(outcome) => serde_json::to_string_pretty(outcome),
            Err(err) => serde_json::to_string_pretty(&ErrorReport::from(err)),
        }
        .context("failed to serialize outcome")?;
        writeln!(out, "{rendered}")?;
    } else {
        let language = Language::detect(&cli.question);
        let mut presenter = TerminalPresenter::new(&mut out, language);
        present(&mut presenter, &result)?;
    }
    out.flush()?;
    if let Err(err) = result {
        bail!("{err}");
    }
    Ok(())
}
