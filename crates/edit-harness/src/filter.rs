//! Filter expressions restricting which combinations are emitted.
//!
//! A filter is attached to a single dimension value and must evaluate to
//! true for any combination containing that value. Comparisons are made
//! against value *indices*, not the values themselves:
//!
//! ```text
//! TextEditableType==2 AND (SelectionState!=0 OR Text==1)
//! ```
//!
//! `AND` and `OR` share the same precedence and associate left to right;
//! use parentheses to group.

use crate::dimension::Dimension;
use crate::{TestError, TestResult};

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equal,
    NotEqual,
}

/// Logical operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// A parsed filter expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterExpr {
    /// `dimension (==|!=) index`
    Compare {
        dimension: usize,
        op: CompareOp,
        index: usize,
    },
    /// `left (AND|OR) right`
    Logical {
        op: LogicalOp,
        left: Box<FilterExpr>,
        right: Box<FilterExpr>,
    },
}

impl FilterExpr {
    /// Parse a filter, resolving names against the engine's dimensions.
    pub fn parse(filter: &str, dimensions: &[Dimension]) -> TestResult<Self> {
        let tokens = tokenize(filter)?;
        let mut parser = Parser {
            filter,
            tokens,
            pos: 0,
            dimensions,
        };

        let expr = parser.parse_expr()?;
        match parser.peek() {
            None => Ok(expr),
            Some(Token::RParen) => Err(parser.error("Closing paren does not match opening paren")),
            Some(_) => Err(parser.error("Consecutive expressions in filter")),
        }
    }

    /// Evaluate against the current value index of every dimension.
    pub fn evaluate(&self, indices: &[usize]) -> bool {
        match self {
            Self::Compare {
                dimension,
                op,
                index,
            } => {
                let equal = indices.get(*dimension) == Some(index);
                match op {
                    CompareOp::Equal => equal,
                    CompareOp::NotEqual => !equal,
                }
            }
            Self::Logical { op, left, right } => match op {
                LogicalOp::And => left.evaluate(indices) && right.evaluate(indices),
                LogicalOp::Or => left.evaluate(indices) || right.evaluate(indices),
            },
        }
    }
}

/// Rewrite the value indices in `filter` after dimension values moved.
///
/// `positions(name, index)` gives the indices now holding the value that
/// was at `index` of dimension `name`, or `None` to keep that comparison as
/// written. A comparison against a value that is gone becomes a constant.
pub fn remap_filter<F>(filter: &str, positions: F) -> TestResult<String>
where
    F: Fn(&str, usize) -> Option<Vec<usize>>,
{
    let parts: Vec<String> = tokenize(filter)?
        .iter()
        .map(|token| match token {
            Token::LParen => "(".to_string(),
            Token::RParen => ")".to_string(),
            Token::And => "AND".to_string(),
            Token::Or => "OR".to_string(),
            Token::Compare { name, op, index } => match positions(name, *index) {
                Some(moved) => remapped_comparison(name, *op, &moved),
                None => comparison(name, *op, *index),
            },
        })
        .collect();
    Ok(parts.join(" "))
}

fn comparison(name: &str, op: CompareOp, index: usize) -> String {
    match op {
        CompareOp::Equal => format!("{}=={}", name, index),
        CompareOp::NotEqual => format!("{}!={}", name, index),
    }
}

fn remapped_comparison(name: &str, op: CompareOp, moved: &[usize]) -> String {
    match moved {
        // The grammar has no literals; spell the constant on index 0.
        [] => match op {
            CompareOp::Equal => format!("({0}==0 AND {0}!=0)", name),
            CompareOp::NotEqual => format!("({0}==0 OR {0}!=0)", name),
        },
        [single] => comparison(name, op, *single),
        many => {
            let joiner = match op {
                CompareOp::Equal => " OR ",
                CompareOp::NotEqual => " AND ",
            };
            let terms: Vec<String> = many.iter().map(|i| comparison(name, op, *i)).collect();
            format!("({})", terms.join(joiner))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    LParen,
    RParen,
    And,
    Or,
    Compare {
        name: String,
        op: CompareOp,
        index: usize,
    },
}

fn tokenize(filter: &str) -> TestResult<Vec<Token>> {
    let chars: Vec<char> = filter.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    let err = |msg: String| TestError::Filter(format!("{} in filter: {}", msg, filter));

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c == '(' {
            tokens.push(Token::LParen);
            i += 1;
            continue;
        }
        if c == ')' {
            tokens.push(Token::RParen);
            i += 1;
            continue;
        }
        if !is_symbol_char(c) {
            return Err(err(format!("Unexpected character '{}' at position {}", c, i)));
        }

        let start = i;
        while i < chars.len() && is_symbol_char(chars[i]) {
            i += 1;
        }
        let symbol: String = chars[start..i].iter().collect();

        match symbol.as_str() {
            "AND" => {
                tokens.push(Token::And);
                continue;
            }
            "OR" => {
                tokens.push(Token::Or);
                continue;
            }
            _ => {}
        }

        while i < chars.len() && chars[i] == ' ' {
            i += 1;
        }
        let op = match (chars.get(i), chars.get(i + 1)) {
            (Some('='), Some('=')) => CompareOp::Equal,
            (Some('!'), Some('=')) => CompareOp::NotEqual,
            (Some('!'), _) => {
                return Err(err(format!("'!' should be followed by '=' at position {}", i + 1)))
            }
            (Some('='), _) => {
                return Err(err(format!("'=' should be followed by '=' at position {}", i + 1)))
            }
            _ => return Err(err(format!("Trailing symbol [{}] is invalid", symbol))),
        };
        i += 2;

        while i < chars.len() && chars[i] == ' ' {
            i += 1;
        }
        let digits_start = i;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
        if digits_start == i {
            return Err(err(format!("Expected value index at position {}", i)));
        }
        let digits: String = chars[digits_start..i].iter().collect();
        let index = digits
            .parse::<usize>()
            .map_err(|e| err(format!("Invalid value index '{}': {}", digits, e)))?;

        tokens.push(Token::Compare {
            name: symbol,
            op,
            index,
        });
    }

    Ok(tokens)
}

fn is_symbol_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

struct Parser<'a> {
    filter: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    dimensions: &'a [Dimension],
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn error(&self, msg: &str) -> TestError {
        TestError::Filter(format!("{} in filter: {}", msg, self.filter))
    }

    fn parse_expr(&mut self) -> TestResult<FilterExpr> {
        let mut left = self.parse_term()?;

        loop {
            let op = match self.peek() {
                Some(Token::And) => LogicalOp::And,
                Some(Token::Or) => LogicalOp::Or,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_term()?;
            left = FilterExpr::Logical {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_term(&mut self) -> TestResult<FilterExpr> {
        match self.next() {
            Some(Token::LParen) => {
                if self.peek() == Some(&Token::RParen) {
                    return Err(self.error("Empty parens not allowed"));
                }
                let inner = self.parse_expr()?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(self.error("Opening paren is never closed")),
                }
            }
            Some(Token::Compare { name, op, index }) => {
                let dimension = self
                    .dimensions
                    .iter()
                    .position(|d| d.name() == name)
                    .ok_or_else(|| self.error(&format!("Dimension {} not found", name)))?;
                if index >= self.dimensions[dimension].len() {
                    return Err(self.error(&format!(
                        "Value index {} out of range for dimension {}",
                        index, name
                    )));
                }
                Ok(FilterExpr::Compare {
                    dimension,
                    op,
                    index,
                })
            }
            Some(Token::And) | Some(Token::Or) => {
                Err(self.error("There is no left-hand side expression for the logical operation"))
            }
            Some(Token::RParen) => Err(self.error("Closing paren does not match opening paren")),
            None if self.pos == 0 => Err(self.error("Filter has no expressions")),
            None => Err(self.error("Filter is prematurely terminated")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims() -> Vec<Dimension> {
        vec![
            Dimension::new("Kind", ["TextBox", "RichTextBox", "PasswordBox"]).unwrap(),
            Dimension::new("Text", ["", "Hello world"]).unwrap(),
            Dimension::new("Flag", [true, false]).unwrap(),
        ]
    }

    #[test]
    fn test_simple_comparison() {
        let expr = FilterExpr::parse("Kind==2", &dims()).unwrap();
        assert!(expr.evaluate(&[2, 0, 0]));
        assert!(!expr.evaluate(&[1, 0, 0]));

        let expr = FilterExpr::parse("Kind != 2", &dims()).unwrap();
        assert!(!expr.evaluate(&[2, 0, 0]));
        assert!(expr.evaluate(&[0, 0, 0]));
    }

    #[test]
    fn test_logical_left_to_right() {
        // ((Kind==0 OR Kind==1) AND Text==1)
        let expr = FilterExpr::parse("Kind==0 OR Kind==1 AND Text==1", &dims()).unwrap();
        assert!(expr.evaluate(&[0, 1, 0]));
        assert!(!expr.evaluate(&[0, 0, 0]));
        assert!(!expr.evaluate(&[2, 1, 0]));
    }

    #[test]
    fn test_parentheses_group() {
        let expr = FilterExpr::parse("Kind==0 OR (Kind==1 AND Text==1)", &dims()).unwrap();
        assert!(expr.evaluate(&[0, 0, 0]));
        assert!(expr.evaluate(&[1, 1, 0]));
        assert!(!expr.evaluate(&[1, 0, 0]));
    }

    #[test]
    fn test_nested_parentheses() {
        let expr = FilterExpr::parse("((Flag==0))", &dims()).unwrap();
        assert!(expr.evaluate(&[0, 0, 0]));
        assert!(!expr.evaluate(&[0, 0, 1]));
    }

    #[test]
    fn test_remap_moves_indices() {
        // Kind reordered to [PasswordBox, TextBox]; RichTextBox dropped.
        let moved = |name: &str, index: usize| match name {
            "Kind" => Some([vec![1], vec![], vec![0]][index].clone()),
            _ => None,
        };
        assert_eq!(remap_filter("Kind!=2", moved).unwrap(), "Kind!=0");
        assert_eq!(
            remap_filter("(Kind==0 OR Kind==1) AND Text==1", moved).unwrap(),
            "( Kind==1 OR (Kind==0 AND Kind!=0) ) AND Text==1"
        );
        assert_eq!(remap_filter("Kind!=1", moved).unwrap(), "(Kind==0 OR Kind!=0)");
    }

    #[test]
    fn test_remapped_filter_still_parses() {
        let narrowed = vec![
            Dimension::new("Kind", ["PasswordBox", "TextBox"]).unwrap(),
            Dimension::new("Text", ["", "Hello world"]).unwrap(),
        ];
        let moved = |name: &str, index: usize| match name {
            "Kind" => Some([vec![1], vec![], vec![0]][index].clone()),
            _ => None,
        };

        let filter = remap_filter("Kind==1 OR Text==1", moved).unwrap();
        let expr = FilterExpr::parse(&filter, &narrowed).unwrap();
        assert!(!expr.evaluate(&[0, 0]));
        assert!(!expr.evaluate(&[1, 0]));
        assert!(expr.evaluate(&[1, 1]));

        // A value repeated in the new order matches at every position.
        let doubled = |_: &str, _: usize| Some(vec![0, 1]);
        assert_eq!(remap_filter("Kind!=0", doubled).unwrap(), "(Kind!=0 AND Kind!=1)");
    }

    #[test]
    fn test_malformed_filters() {
        let cases = [
            "",
            "Kind",
            "Kind=1",
            "Kind!1",
            "Kind==",
            "Missing==0",
            "Kind==9",
            "AND Kind==0",
            "Kind==0 AND",
            "()",
            "(Kind==0",
            "Kind==0)",
            "Kind==0 Text==1",
            "Kind==0 # Text==1",
        ];
        for filter in cases {
            let result = FilterExpr::parse(filter, &dims());
            assert!(
                matches!(result, Err(TestError::Filter(_))),
                "expected error for {:?}, got {:?}",
                filter,
                result
            );
        }
    }
}
