use std::path::PathBuf;

use clap::Parser;

/// Ask questions about a PDF; answers come only from the document's content.
#[derive(Parser, Debug, Default)]
#[command(name = "ragqa", version, about, long_about = None)]
pub struct Args {
    /// PDF file to load (prompted for when omitted)
    #[arg(long, value_name = "FILE")]
    pub pdf: Option<PathBuf>,

    /// Question to answer (prompted for when omitted)
    #[arg(long)]
    pub question: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_are_optional() {
        let args = Args::try_parse_from(["ragqa"]).unwrap();
        assert!(args.pdf.is_none());
        assert!(args.question.is_none());
    }

    #[test]
    fn flags_prefill_inputs() {
        let args = Args::try_parse_from([
            "ragqa",
            "--pdf",
            "invoice.pdf",
            "--question",
            "What is the invoice total?",
        ])
        .unwrap();
        assert_eq!(args.pdf, Some(PathBuf::from("invoice.pdf")));
        assert_eq!(args.question.as_deref(), Some("What is the invoice total?"));
    }
}
