//! Interactive prompts.

use std::path::PathBuf;

use dialoguer::Input;

/// Ask for the PDF to load.
pub fn prompt_pdf_path() -> dialoguer::Result<PathBuf> {
    let path: String = Input::new()
        .with_prompt("Enter the name of the PDF file to use (e.g., my_resume.pdf)")
        .interact_text()?;
    Ok(PathBuf::from(path.trim()))
}

/// Ask for the question.
pub fn prompt_question() -> dialoguer::Result<String> {
    let question: String = Input::new().with_prompt("Enter your question").interact_text()?;
    Ok(question.trim().to_string())
}
