use std::io::{self, BufRead, Write};

use regex::Regex;

use nihongo_lib::flashcards::{format_interval, ItemSpec};
use nihongo_lib::quiz::{Frontend, GeneratedQuestion, ReviewOutcome, SkipReason};
use nihongo_lib::vocab::Mode;

/// ANSI color codes
#[allow(dead_code)]
pub struct Color;

#[allow(dead_code)]
impl Color {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";
}

/// Questions and answers over a line-oriented terminal
pub struct ConsoleFrontend<R, W> {
    input: R,
    output: W,
    use_color: bool,
    control: Regex,
}

impl<R: BufRead, W: Write> ConsoleFrontend<R, W> {
    pub fn new(input: R, output: W, use_color: bool) -> Self {
        Self {
            input,
            output,
            use_color,
            // C0 and C1 control characters, including ESC
            control: Regex::new(r"[\x00-\x1f\x7f-\x9f]").unwrap(),
        }
    }

    /// Drop control characters so corpus or provider text cannot drive the terminal
    fn clean(&self, text: &str) -> String {
        self.control.replace_all(text, "").into_owned()
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.use_color {
            format!("{}{}{}", color, text, Color::RESET)
        } else {
            text.to_string()
        }
    }

    #[cfg(test)]
    fn into_output(self) -> W {
        self.output
    }
}

impl<R: BufRead, W: Write> Frontend for ConsoleFrontend<R, W> {
    fn present(&mut self, position: usize, question: &GeneratedQuestion) -> io::Result<()> {
        let header = self.paint(Color::BOLD, &format!("Q{}: {}", position, self.clean(&question.prompt)));
        writeln!(self.output, "{}", header)?;
        for (i, choice) in question.choices.iter().enumerate() {
            writeln!(self.output, "{}) {}", i + 1, self.clean(choice))?;
        }
        self.output.flush()
    }

    fn read_answer(&mut self, choice_count: usize) -> io::Result<usize> {
        loop {
            write!(self.output, "Your answer: ")?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed"));
            }
            if let Ok(n) = line.trim().parse::<usize>() {
                if (1..=choice_count).contains(&n) {
                    return Ok(n - 1);
                }
            }
            writeln!(self.output, "Please enter a number between 1 and {}.", choice_count)?;
        }
    }

    fn feedback(&mut self, item: &ItemSpec, question: &GeneratedQuestion, outcome: &ReviewOutcome) -> io::Result<()> {
        if outcome.correct {
            let verdict = self.paint(Color::GREEN, "✔ Correct");
            writeln!(self.output, "{}", verdict)?;
        } else {
            let answer = self.clean(question.correct_answer().unwrap_or_default());
            let verdict = self.paint(Color::RED, &format!("✘ Incorrect. Correct answer: {}", answer));
            writeln!(self.output, "{}", verdict)?;
        }

        if !question.explanation.is_empty() {
            writeln!(self.output)?;
            writeln!(self.output, "{}", self.clean(&question.explanation))?;
        }

        if item.mode == Mode::Keigo {
            for (label, key) in [("Usage", "usage"), ("Politeness level", "type")] {
                let value = question.metadata.get(key).map(|v| self.clean(v)).unwrap_or_default();
                if !value.is_empty() {
                    writeln!(self.output, "{}: {}", label, value)?;
                }
            }
        }
        if let (Some(kana), Some(romaji)) = (question.metadata.get("kana"), question.metadata.get("romaji")) {
            let reading = self.paint(Color::GRAY, &format!("{} ({})", self.clean(kana), self.clean(romaji)));
            writeln!(self.output, "{}", reading)?;
        }
        if let Some(note) = question.metadata.get("note") {
            writeln!(self.output, "Note: {}", self.clean(note))?;
        }

        let days = outcome.interval_after;
        let next = if days >= 7 {
            format!("Next review: {} days (about {})", days, format_interval(days))
        } else {
            format!("Next review: {}", format_interval(days))
        };
        let next = self.paint(Color::CYAN, &next);
        writeln!(self.output, "{}", next)?;
        writeln!(self.output)?;
        self.output.flush()
    }

    fn skipped(&mut self, item: &ItemSpec, reason: &SkipReason) -> io::Result<()> {
        let message = match reason {
            SkipReason::Missing => format!("Skipping missing card: {}", item.id),
            SkipReason::Synthesis(e) => format!("Skipping card {}: {}", item.id, e),
            SkipReason::Invalid { attempts, issues } => {
                let issues: Vec<String> = issues.iter().map(ToString::to_string).collect();
                format!(
                    "Skipping card due to invalid question: {} ({} attempts)\nIssues: {}",
                    item.id,
                    attempts,
                    issues.join(", ")
                )
            }
        };
        let message = self.paint(Color::YELLOW, &self.clean_lines(&message));
        writeln!(self.output, "{}", message)
    }
}

impl<R, W> ConsoleFrontend<R, W> {
    fn clean_lines(&self, text: &str) -> String {
        text.lines()
            .map(|line| self.control.replace_all(line, "").into_owned())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
