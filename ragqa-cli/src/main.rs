use anyhow::Context;
use clap::Parser;
use ragqa_cli::{Args, Components, Settings, input, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    telemetry::init_tracing();

    let settings = Settings::from_env().context("configuration error")?;

    let pdf_path = match args.pdf {
        Some(path) => path,
        None => input::prompt_pdf_path().context("failed to read the PDF path")?,
    };
    let components = Components::from_settings(&settings)?;

    let question = args.question;
    let ask_question = move || match question {
        Some(q) => Ok(q),
        None => input::prompt_question().context("failed to read the question"),
    };

    let mut stdout = std::io::stdout();
    ragqa_cli::execute(&components, &pdf_path, ask_question, &mut stdout).await?;
    Ok(())
}
