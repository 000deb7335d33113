#![forbid(unsafe_code)]

use rt_workflow::{ConfirmPrompt, Confirmation};
use std::io::{BufRead, Write};

/// Asks on `output` and reads a y/N answer from `input`.
pub struct LinePrompt<R, W> {
    input: R,
    output: W,
}

impl LinePrompt<std::io::StdinLock<'static>, std::io::Stderr> {
    pub fn stdin() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stderr())
    }
}

impl<R: BufRead, W: Write> LinePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> ConfirmPrompt for LinePrompt<R, W> {
    fn confirm(&mut self, request: &Confirmation) -> bool {
        if write!(self.output, "{} [y/N] ", request.message)
            .and_then(|()| self.output.flush())
            .is_err()
        {
            return false;
        }
        let mut answer = String::new();
        if self.input.read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn ask(answer: &str) -> (bool, String) {
        let mut output = Vec::new();
        let mut prompt = LinePrompt::new(Cursor::new(answer.to_string()), &mut output);
        let confirmed = prompt.confirm(&Confirmation {
            message: "Rename #a to #b in 2 notes?".to_string(),
            targets: 2,
            merge: None,
        });
        (confirmed, String::from_utf8(output).expect("utf8"))
    }

    #[test]
    fn only_yes_confirms() {
        assert!(ask("y\n").0);
        assert!(ask("YES\n").0);
        assert!(!ask("\n").0);
        assert!(!ask("nope\n").0);
        assert!(!ask("").0);
    }

    #[test]
    fn question_is_written_before_reading() {
        let (_, output) = ask("n\n");
        assert_eq!(output, "Rename #a to #b in 2 notes? [y/N] ");
    }
}
