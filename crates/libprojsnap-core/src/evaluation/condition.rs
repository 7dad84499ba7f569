//! Evaluator for MSBuild-style `Condition` attributes
//!
//! Supported: quoted operands with property expansion, `==`/`!=` (compared
//! ignoring case), `and`, `or`, `!`, parentheses, `Exists('path')` and the
//! literals `true`/`false`.

use std::path::Path;

use super::{resolve_against, EvaluationError};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Quoted(String),
    Word(String),
    Eq,
    NotEq,
    Not,
    Open,
    Close,
}

/// Evaluate `condition`, expanding operands with `expand`
///
/// An empty condition is true.
pub fn evaluate(
    condition: &str,
    base_dir: &Path,
    expand: &dyn Fn(&str) -> String,
) -> Result<bool, EvaluationError> {
    if condition.trim().is_empty() {
        return Ok(true);
    }

    let tokens = tokenize(condition).map_err(|message| invalid(condition, message))?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        base_dir,
        expand,
    };
    let value = parser.or().map_err(|message| invalid(condition, message))?;
    if parser.pos != parser.tokens.len() {
        return Err(invalid(condition, "unexpected trailing tokens".to_string()));
    }
    Ok(value)
}

fn invalid(condition: &str, message: String) -> EvaluationError {
    EvaluationError::Condition {
        condition: condition.to_string(),
        message,
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '\'' => {
                let start = i + 1;
                let end = chars[start..]
                    .iter()
                    .position(|&c| c == '\'')
                    .map(|p| start + p)
                    .ok_or("unterminated quoted string")?;
                tokens.push(Token::Quoted(chars[start..end].iter().collect()));
                i = end + 1;
            }
            '=' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Eq);
                i += 2;
            }
            '!' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::NotEq);
                i += 2;
            }
            '!' => {
                tokens.push(Token::Not);
                i += 1;
            }
            '(' => {
                tokens.push(Token::Open);
                i += 1;
            }
            ')' => {
                tokens.push(Token::Close);
                i += 1;
            }
            _ => {
                let mut word = String::new();
                while i < chars.len() {
                    let c = chars[i];
                    if c == '$' && chars.get(i + 1) == Some(&'(') {
                        // Unquoted property reference: keep the parenthesised name whole
                        let close = chars[i..]
                            .iter()
                            .position(|&c| c == ')')
                            .map(|p| i + p)
                            .ok_or("unterminated property reference")?;
                        word.extend(&chars[i..=close]);
                        i = close + 1;
                        continue;
                    }
                    if c.is_whitespace() || matches!(c, '(' | ')' | '!' | '=' | '\'') {
                        break;
                    }
                    word.push(c);
                    i += 1;
                }
                if word.is_empty() {
                    return Err(format!("unexpected character '{}'", c));
                }
                tokens.push(Token::Word(word));
            }
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    base_dir: &'a Path,
    expand: &'a dyn Fn(&str) -> String,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Word(w)) if w.eq_ignore_ascii_case(keyword))
    }

    fn or(&mut self) -> Result<bool, String> {
        let mut value = self.and()?;
        while self.peek_keyword("or") {
            self.pos += 1;
            let rhs = self.and()?;
            value = value || rhs;
        }
        Ok(value)
    }

    fn and(&mut self) -> Result<bool, String> {
        let mut value = self.unary()?;
        while self.peek_keyword("and") {
            self.pos += 1;
            let rhs = self.unary()?;
            value = value && rhs;
        }
        Ok(value)
    }

    fn unary(&mut self) -> Result<bool, String> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            return Ok(!self.unary()?);
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<bool, String> {
        match self.peek() {
            Some(Token::Open) => {
                self.pos += 1;
                let value = self.or()?;
                self.expect_close()?;
                Ok(value)
            }
            Some(Token::Word(w))
                if w.eq_ignore_ascii_case("exists")
                    && self.tokens.get(self.pos + 1) == Some(&Token::Open) =>
            {
                self.pos += 2;
                let operand = self.operand()?;
                self.expect_close()?;
                let trimmed = operand.trim();
                Ok(!trimmed.is_empty() && resolve_against(self.base_dir, trimmed).exists())
            }
            _ => {
                let lhs = self.operand()?;
                match self.peek() {
                    Some(Token::Eq) => {
                        self.pos += 1;
                        let rhs = self.operand()?;
                        Ok(lhs.eq_ignore_ascii_case(&rhs))
                    }
                    Some(Token::NotEq) => {
                        self.pos += 1;
                        let rhs = self.operand()?;
                        Ok(!lhs.eq_ignore_ascii_case(&rhs))
                    }
                    _ => truthy(&lhs),
                }
            }
        }
    }

    fn operand(&mut self) -> Result<String, String> {
        match self.next() {
            Some(Token::Quoted(s)) | Some(Token::Word(s)) => Ok((self.expand)(&s)),
            Some(other) => Err(format!("expected operand, found {:?}", other)),
            None => Err("expected operand, found end of condition".to_string()),
        }
    }

    fn expect_close(&mut self) -> Result<(), String> {
        match self.next() {
            Some(Token::Close) => Ok(()),
            _ => Err("expected ')'".to_string()),
        }
    }
}

fn truthy(value: &str) -> Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" => Ok(true),
        "false" | "off" | "no" => Ok(false),
        other => Err(format!("'{}' is not a boolean", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand_with(config: &'static str) -> impl Fn(&str) -> String {
        move |s: &str| {
            s.replace("$(Configuration)", config)
                .replace("$(Platform)", "AnyCPU")
        }
    }

    fn eval(condition: &str, config: &'static str) -> bool {
        evaluate(condition, Path::new("/nonexistent"), &expand_with(config)).unwrap()
    }

    #[test]
    fn test_equality_ignores_case() {
        assert!(eval(" '$(Configuration)' == 'release' ", "Release"));
        assert!(!eval("'$(Configuration)' == 'Release'", "Debug"));
        assert!(eval("'$(Configuration)' != 'Release'", "Debug"));
    }

    #[test]
    fn test_combined_configuration_platform() {
        assert!(eval(
            " '$(Configuration)|$(Platform)' == 'Debug|AnyCPU' ",
            "Debug"
        ));
    }

    #[test]
    fn test_and_or_not_and_parens() {
        assert!(eval(
            "('$(Configuration)' == 'Debug' or '$(Configuration)' == 'Release') and !false",
            "Release"
        ));
        assert!(!eval("'a' == 'a' and 'b' == 'c'", "Debug"));
        assert!(eval("'a' == 'b' or 'b' == 'b'", "Debug"));
    }

    #[test]
    fn test_unquoted_property_operand() {
        assert!(eval("$(Configuration) == Release", "Release"));
    }

    #[test]
    fn test_empty_condition_is_true() {
        assert!(eval("   ", "Debug"));
    }

    #[test]
    fn test_exists() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("present.txt"), "x").unwrap();
        let expand = |s: &str| s.to_string();
        assert!(evaluate("Exists('present.txt')", dir.path(), &expand).unwrap());
        assert!(evaluate("!Exists('missing.txt')", dir.path(), &expand).unwrap());
        assert!(!evaluate("Exists('')", dir.path(), &expand).unwrap());
    }

    #[test]
    fn test_malformed_conditions_are_errors() {
        let expand = |s: &str| s.to_string();
        let base = Path::new("/");
        assert!(evaluate("'unterminated", base, &expand).is_err());
        assert!(evaluate("('a' == 'a'", base, &expand).is_err());
        assert!(evaluate("'a' == 'a' 'b'", base, &expand).is_err());
        assert!(evaluate("'maybe'", base, &expand).is_err());
    }
}
