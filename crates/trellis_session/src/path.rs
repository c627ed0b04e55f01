//! URL path segments and page arguments

use std::fmt;

/// The non-empty `/`-separated segments of a URL path
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PathParse {
    parts: Vec<String>,
    cursor: usize,
}

impl PathParse {
    pub fn new(text: &str) -> Self {
        let parts = text
            .trim()
            .split('/')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Self { parts, cursor: 0 }
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    pub fn has_next(&self) -> bool {
        self.cursor < self.parts.len()
    }

    /// The next segment, or an empty string at the end
    pub fn peek(&self) -> &str {
        self.parts.get(self.cursor).map(String::as_str).unwrap_or("")
    }

    pub fn peek_int(&self) -> Option<i64> {
        self.peek().parse().ok()
    }

    /// Consume the next segment; an empty string at the end
    pub fn read(&mut self) -> String {
        let part = self.peek().to_string();
        self.advance();
        part
    }

    pub fn read_int(&mut self) -> Option<i64> {
        let value = self.peek_int();
        self.advance();
        value
    }

    /// Segments not yet read
    pub fn remaining_args(&self) -> Vec<String> {
        self.parts[self.cursor..].to_vec()
    }

    fn advance(&mut self) {
        if self.has_next() {
            self.cursor += 1;
        }
    }
}

/// Cursor over the arguments of a page request
///
/// Reading past the end or failing to parse sets a sticky problem flag;
/// once set, every further read yields nothing and
/// [`check_done`](Self::check_done) fails.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PageArgs {
    args: Vec<String>,
    cursor: usize,
    problem: bool,
}

impl PageArgs {
    pub fn new(args: Vec<String>) -> Self {
        Self {
            args,
            cursor: 0,
            problem: false,
        }
    }

    pub fn done(&self) -> bool {
        self.cursor == self.args.len()
    }

    pub fn problem(&self) -> bool {
        self.problem
    }

    pub fn set_problem(&mut self) {
        self.problem = true;
    }

    /// Succeeds only if every argument was consumed without a problem
    pub fn check_done(&mut self) -> bool {
        if !self.done() {
            self.set_problem();
        }
        !self.problem
    }

    pub fn peek(&self) -> Option<&str> {
        if self.problem {
            return None;
        }
        self.args.get(self.cursor).map(String::as_str)
    }

    /// The next argument; empty after a problem or at the end (which is a problem)
    pub fn next(&mut self) -> String {
        if self.problem {
            return String::new();
        }
        match self.args.get(self.cursor) {
            Some(arg) => {
                self.cursor += 1;
                arg.clone()
            }
            None => {
                self.set_problem();
                String::new()
            }
        }
    }

    /// Consume the next argument if it equals `expected`
    pub fn read_if(&mut self, expected: &str) -> bool {
        if self.peek() == Some(expected) {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    /// The next argument as an integer; -1 with a problem if it isn't one
    pub fn int(&mut self) -> i64 {
        if self.problem {
            return -1;
        }
        let arg = self.next();
        match arg.parse() {
            Ok(value) => value,
            Err(_) => {
                self.set_problem();
                -1
            }
        }
    }

    pub fn positive_int(&mut self) -> i64 {
        let value = self.int();
        if value <= 0 {
            self.set_problem();
        }
        value
    }
}

impl fmt::Display for PageArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} at {}", self.args, self.cursor)?;
        if self.problem {
            write!(f, " (problem)")?;
        }
        Ok(())
    }
}
