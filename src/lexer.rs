//! Lexical analysis (tokenization) of a single command line.
//!
//! The grammar is deliberately small: words are separated by whitespace, single and
//! double quotes group text into one word, and bracket groups (`()`, `[]`, `{}`) keep
//! whitespace inside a word. There are no escapes and no expansions.

/// A word produced by lexical analysis, with the 1-based position of its first character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Word text with the surrounding quotes removed.
    pub text: String,
    pub line: usize,
    pub column: usize,
}

/// Errors that can occur during lexical analysis.
///
/// Every variant carries the 1-based line and column of the offending character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexingError {
    /// A closing quote was not found. Points at the opening quote.
    UnfinishedQuote { quote: char, line: usize, column: usize },
    /// A bracket group is still open at end of input. Points at the opening bracket.
    UnclosedBracket { bracket: char, line: usize, column: usize },
    /// A closing bracket does not match the innermost open group.
    UnmatchedBracket { bracket: char, line: usize, column: usize },
}

impl LexingError {
    /// Returns true when more input could complete the line.
    pub fn is_incomplete(&self) -> bool {
        matches!(
            self,
            LexingError::UnfinishedQuote { .. } | LexingError::UnclosedBracket { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Start,
    ReadingWord,
    ReadingSingleQuote,
    ReadingDoubleQuote,
}

/// An open quote or bracket with the position it was opened at.
#[derive(Debug, Clone, Copy)]
struct Opener {
    ch: char,
    line: usize,
    column: usize,
}

struct LexingFSM {
    input: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    state: LexingState,
    buffer: String,
    word_start: Option<(usize, usize)>,
    quote: Option<Opener>,
    brackets: Vec<Opener>,
}

impl LexingFSM {
    fn new(line: &str) -> Self {
        LexingFSM {
            input: line.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            state: LexingState::Start,
            buffer: String::new(),
            word_start: None,
            quote: None,
            brackets: Vec::new(),
        }
    }

    fn make_tokens(&mut self) -> Result<Vec<Token>, LexingError> {
        let mut out = Vec::new();

        while let Some((ch, line, column)) = self.read_char() {
            match self.state {
                LexingState::Start => self.handle_start(ch, line, column)?,
                LexingState::ReadingWord => self.handle_word(ch, line, column, &mut out)?,
                LexingState::ReadingSingleQuote => self.handle_quote(ch, '\''),
                LexingState::ReadingDoubleQuote => self.handle_quote(ch, '"'),
            }
        }

        if let Some(Opener { ch, line, column }) = self.quote {
            return Err(LexingError::UnfinishedQuote {
                quote: ch,
                line,
                column,
            });
        }
        if let Some(Opener { ch, line, column }) = self.brackets.last().copied() {
            return Err(LexingError::UnclosedBracket {
                bracket: ch,
                line,
                column,
            });
        }

        self.finish_word(&mut out);
        Ok(out)
    }

    /// Returns the next character together with its own line and column.
    fn read_char(&mut self) -> Option<(char, usize, usize)> {
        let ch = self.input.get(self.pos).copied()?;
        let at = (ch, self.line, self.column);
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(at)
    }

    fn handle_start(&mut self, ch: char, line: usize, column: usize) -> Result<(), LexingError> {
        if ch.is_whitespace() {
            return Ok(());
        }
        self.word_start = Some((line, column));
        self.state = LexingState::ReadingWord;
        self.handle_word_char(ch, line, column)
    }

    fn handle_word(
        &mut self,
        ch: char,
        line: usize,
        column: usize,
        out: &mut Vec<Token>,
    ) -> Result<(), LexingError> {
        if ch.is_whitespace() && self.brackets.is_empty() {
            self.finish_word(out);
            self.state = LexingState::Start;
            return Ok(());
        }
        self.handle_word_char(ch, line, column)
    }

    fn handle_word_char(&mut self, ch: char, line: usize, column: usize) -> Result<(), LexingError> {
        match ch {
            '\'' | '"' => {
                self.quote = Some(Opener { ch, line, column });
                self.state = if ch == '\'' {
                    LexingState::ReadingSingleQuote
                } else {
                    LexingState::ReadingDoubleQuote
                };
            }
            '(' | '[' | '{' => {
                self.brackets.push(Opener { ch, line, column });
                self.buffer.push(ch);
            }
            ')' | ']' | '}' => {
                match self.brackets.last() {
                    Some(open) if closing_for(open.ch) == ch => {
                        self.brackets.pop();
                    }
                    _ => {
                        return Err(LexingError::UnmatchedBracket {
                            bracket: ch,
                            line,
                            column,
                        });
                    }
                }
                self.buffer.push(ch);
            }
            c => self.buffer.push(c),
        }
        Ok(())
    }

    fn handle_quote(&mut self, ch: char, quote: char) {
        if ch == quote {
            self.quote = None;
            self.state = LexingState::ReadingWord;
        } else {
            self.buffer.push(ch);
        }
    }

    /// Emits the current word. A word that consisted only of quotes (`""`) is
    /// still emitted, as an empty string.
    fn finish_word(&mut self, out: &mut Vec<Token>) {
        if let Some((line, column)) = self.word_start.take() {
            out.push(Token {
                text: std::mem::take(&mut self.buffer),
                line,
                column,
            });
        }
    }
}

fn closing_for(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

/// Splits `line` into positioned words.
///
/// Fails on an unterminated quote, an unclosed bracket group or a stray closing
/// bracket. Input may span several lines; positions count `\n` as a line break.
pub fn split_into_tokens(line: &str) -> Result<Vec<Token>, LexingError> {
    let mut lexer = LexingFSM::new(line);
    lexer.make_tokens()
}

/// Returns true when `line` ends inside a quote or an open bracket group, i.e. the
/// line source should keep accumulating input before the line is dispatched.
pub fn is_incomplete(line: &str) -> bool {
    matches!(split_into_tokens(line), Err(e) if e.is_incomplete())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(line: &str) -> Vec<String> {
        split_into_tokens(line)
            .unwrap()
            .into_iter()
            .map(|t| t.text)
            .collect()
    }

    #[test]
    fn test_splits_on_any_whitespace() {
        assert_eq!(texts("  ls \t -la   /tmp "), vec!["ls", "-la", "/tmp"]);
        assert!(texts("   ").is_empty());
    }

    #[test]
    fn test_quotes_group_and_concatenate() {
        assert_eq!(texts("echo 'hello world'"), vec!["echo", "hello world"]);
        assert_eq!(texts(r#"grep a"b c"d"#), vec!["grep", "ab cd"]);
        assert_eq!(texts(r#"echo "it's""#), vec!["echo", "it's"]);
        assert_eq!(texts(r#"printf "" x"#), vec!["printf", "", "x"]);
    }

    #[test]
    fn test_bracket_group_keeps_whitespace() {
        assert_eq!(texts("run (a b) [c]"), vec!["run", "(a b)", "[c]"]);
        assert_eq!(texts("f {x (y z)}"), vec!["f", "{x (y z)}"]);
    }

    #[test]
    fn test_token_positions() {
        let tokens = split_into_tokens("ls\n  -la").unwrap();
        assert_eq!((tokens[0].line, tokens[0].column), (1, 1));
        assert_eq!((tokens[1].line, tokens[1].column), (2, 3));
    }

    #[test]
    fn test_unfinished_quote_points_at_opening_quote() {
        let err = split_into_tokens("echo \"abc").unwrap_err();
        assert_eq!(
            err,
            LexingError::UnfinishedQuote {
                quote: '"',
                line: 1,
                column: 6
            }
        );
        assert!(err.is_incomplete());
    }

    #[test]
    fn test_bracket_errors() {
        assert_eq!(
            split_into_tokens("f (a [b]").unwrap_err(),
            LexingError::UnclosedBracket {
                bracket: '(',
                line: 1,
                column: 3
            }
        );
        let err = split_into_tokens("f a)").unwrap_err();
        assert_eq!(
            err,
            LexingError::UnmatchedBracket {
                bracket: ')',
                line: 1,
                column: 4
            }
        );
        assert!(!err.is_incomplete());
    }

    #[test]
    fn test_is_incomplete() {
        assert!(is_incomplete("echo 'abc"));
        assert!(is_incomplete("f { x"));
        assert!(!is_incomplete("f { x }"));
        assert!(!is_incomplete("f x }"));
        assert!(!is_incomplete("echo 'a\nb'"));
    }
}
