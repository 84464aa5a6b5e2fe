use crate::ast::*;
use crate::error::ParseError;
use crate::lexer::{Lexer, LexerMode};
use crate::token::{Element, Token};

pub struct Parser {
    lexer: Lexer,
    document: Document,
    // Open containers; the root is always at the bottom.
    stack: Vec<NodeId>,
}

impl Parser {
    pub fn new(input: &str) -> Self {
        let document = Document::new();
        let stack = vec![document.root()];
        Self {
            lexer: Lexer::new(input),
            document,
            stack,
        }
    }

    fn top(&self) -> NodeId {
        self.stack.last().copied().unwrap_or_else(|| self.document.root())
    }

    pub fn parse(mut self) -> Result<Document, ParseError> {
        loop {
            let position = self.lexer.position();
            match self.lexer.next_token()? {
                Token::Eof => break,
                Token::Text(s) => {
                    self.document.push_child(self.top(), NodeKind::Text(s));
                }
                Token::StartTag => {
                    self.lexer.set_mode(LexerMode::Tag);
                    self.parse_tag(position)?;
                    self.lexer.set_mode(LexerMode::Text);
                }
                t => {
                    return Err(ParseError::UnexpectedToken {
                        expected: "text or tag",
                        found: t.describe(),
                        position,
                    })
                }
            }
        }

        if self.stack.len() > 1 {
            let variable = match self.document.node(self.top()).kind() {
                NodeKind::ForLoop(lp) => lp.variable.clone(),
                _ => String::new(),
            };
            return Err(ParseError::UnclosedFor { variable });
        }

        log::debug!("parsed template into {} nodes", self.document.len());
        Ok(self.document)
    }

    fn parse_tag(&mut self, tag_start: usize) -> Result<(), ParseError> {
        let position = self.lexer.position();
        match self.lexer.next_token()? {
            Token::Symbol('=') => self.parse_echo(),
            Token::Word(name) if name.eq_ignore_ascii_case("FOR") => self.parse_for(tag_start),
            Token::Word(name) if name.eq_ignore_ascii_case("END") => self.parse_end(tag_start),
            Token::Word(name) => Err(ParseError::UnknownTag { name, position }),
            t => Err(ParseError::UnexpectedToken {
                expected: "tag name",
                found: t.describe(),
                position,
            }),
        }
    }

    fn parse_echo(&mut self) -> Result<(), ParseError> {
        let mut elements = Vec::new();
        while let Some((el, _)) = self.next_element("echo tag")? {
            elements.push(el);
        }
        self.document.push_child(self.top(), NodeKind::Echo(elements));
        Ok(())
    }

    fn parse_for(&mut self, tag_start: usize) -> Result<(), ParseError> {
        let position = self.lexer.position();
        let variable = match self.lexer.next_token()? {
            Token::Word(name) => name,
            Token::EndTag => {
                return Err(ParseError::ForArguments {
                    found: 0,
                    position: tag_start,
                })
            }
            t => {
                return Err(ParseError::InvalidElement {
                    found: t.describe(),
                    context: "FOR loop variable",
                    position,
                })
            }
        };

        let mut args = Vec::new();
        while let Some((el, position)) = self.next_element("FOR tag")? {
            if let Element::Function(_) | Element::Operator(_) = el {
                return Err(ParseError::InvalidElement {
                    found: format!("`{el}`"),
                    context: "FOR tag",
                    position,
                });
            }
            args.push(el);
        }

        let mut args = args.into_iter();
        let (start, end, step) = match (args.next(), args.next(), args.next(), args.len()) {
            (Some(start), Some(end), step, 0) => (start, end, step),
            (start, end, step, rest) => {
                let found = 1 + [start.is_some(), end.is_some(), step.is_some()]
                    .iter()
                    .filter(|present| **present)
                    .count()
                    + rest;
                return Err(ParseError::ForArguments {
                    found,
                    position: tag_start,
                });
            }
        };

        let id = self.document.push_child(
            self.top(),
            NodeKind::ForLoop(ForLoop {
                variable,
                start,
                end,
                step,
            }),
        );
        self.stack.push(id);
        Ok(())
    }

    fn parse_end(&mut self, tag_start: usize) -> Result<(), ParseError> {
        let position = self.lexer.position();
        match self.lexer.next_token()? {
            Token::EndTag => {}
            t => {
                return Err(ParseError::UnexpectedToken {
                    expected: "`$}` after END",
                    found: t.describe(),
                    position,
                })
            }
        }

        if self.stack.len() <= 1 {
            return Err(ParseError::UnmatchedEnd {
                position: tag_start,
            });
        }
        self.stack.pop();
        Ok(())
    }

    /// Reads one tag element, or `None` once the tag is closed.
    fn next_element(&mut self, context: &'static str) -> Result<Option<(Element, usize)>, ParseError> {
        let position = self.lexer.position();
        let el = match self.lexer.next_token()? {
            Token::EndTag => return Ok(None),
            Token::Word(name) => Element::Variable(name),
            Token::Integer(n) => Element::ConstantInt(n),
            Token::Double(x) => Element::ConstantDouble(x),
            Token::Function(name) => Element::Function(name),
            Token::Symbol('"') => Element::String(self.parse_string()?),
            Token::Symbol(op) if Element::OPERATORS.contains(&op) => Element::Operator(op),
            t => {
                return Err(ParseError::InvalidElement {
                    found: t.describe(),
                    context,
                    position,
                })
            }
        };
        Ok(Some((el, position)))
    }

    /// Called after the opening `"`; consumes the literal and its closing quote.
    fn parse_string(&mut self) -> Result<String, ParseError> {
        self.lexer.set_mode(LexerMode::StringLiteral);
        let value = match self.lexer.next_token()? {
            Token::Symbol('"') => String::new(),
            Token::String(s) => {
                let position = self.lexer.position();
                match self.lexer.next_token()? {
                    Token::Symbol('"') => s,
                    t => {
                        return Err(ParseError::UnexpectedToken {
                            expected: "closing `\"`",
                            found: t.describe(),
                            position,
                        })
                    }
                }
            }
            t => {
                return Err(ParseError::UnexpectedToken {
                    expected: "string literal",
                    found: t.describe(),
                    position: self.lexer.position(),
                })
            }
        };
        self.lexer.set_mode(LexerMode::Tag);
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LexError;

    fn parse(src: &str) -> Result<Document, ParseError> {
        Parser::new(src).parse()
    }

    fn root_kinds(doc: &Document) -> Vec<NodeKind> {
        doc.node(doc.root())
            .children()
            .iter()
            .map(|id| doc.node(*id).kind().clone())
            .collect()
    }

    #[test]
    fn text_only() {
        let doc = parse("Hello").unwrap();
        assert_eq!(root_kinds(&doc), vec![NodeKind::Text("Hello".into())]);
    }

    #[test]
    fn empty_source_is_empty_document() {
        let doc = parse("").unwrap();
        assert!(doc.is_empty());
    }

    #[test]
    fn echo_elements() {
        let doc = parse(r#"{$= i 1.5 "s\n" @dup * -2 $}"#).unwrap();
        assert_eq!(
            root_kinds(&doc),
            vec![NodeKind::Echo(vec![
                Element::Variable("i".into()),
                Element::ConstantDouble(1.5),
                Element::String("s\n".into()),
                Element::Function("dup".into()),
                Element::Operator('*'),
                Element::ConstantInt(-2),
            ])]
        );
    }

    #[test]
    fn empty_string_literal() {
        let doc = parse(r#"{$= "" $}"#).unwrap();
        assert_eq!(root_kinds(&doc), vec![NodeKind::Echo(vec![Element::String(String::new())])]);
    }

    #[test]
    fn for_loop_with_and_without_step() {
        let doc = parse("{$ for i 1 10 $}x{$ End $}{$FOR j \"1\" n 2$}{$END$}").unwrap();
        let kinds = root_kinds(&doc);
        assert_eq!(
            kinds[0],
            NodeKind::ForLoop(ForLoop {
                variable: "i".into(),
                start: Element::ConstantInt(1),
                end: Element::ConstantInt(10),
                step: None,
            })
        );
        assert_eq!(
            kinds[1],
            NodeKind::ForLoop(ForLoop {
                variable: "j".into(),
                start: Element::String("1".into()),
                end: Element::Variable("n".into()),
                step: Some(Element::ConstantInt(2)),
            })
        );

        let first = doc.node(doc.root()).children()[0];
        let body = doc.node(first).children();
        assert_eq!(doc.node(body[0]).kind(), &NodeKind::Text("x".into()));
    }

    #[test]
    fn nested_loops_attach_to_innermost() {
        let doc = parse("{$FOR a 1 2$}{$FOR b 1 2$}{$=b$}{$END$}{$=a$}{$END$}").unwrap();
        let outer = doc.node(doc.root()).children()[0];
        let outer_children = doc.node(outer).children();
        assert_eq!(outer_children.len(), 2);
        let inner = outer_children[0];
        assert_eq!(doc.node(inner).children().len(), 1);
    }

    #[test]
    fn for_argument_count() {
        assert!(matches!(parse("{$FOR i 1$}{$END$}"), Err(ParseError::ForArguments { found: 2, .. })));
        assert!(matches!(
            parse("{$FOR i 1 2 3 4$}{$END$}"),
            Err(ParseError::ForArguments { found: 5, .. })
        ));
        assert!(matches!(parse("{$FOR$}"), Err(ParseError::ForArguments { found: 0, .. })));
    }

    #[test]
    fn for_rejects_functions_and_operators() {
        assert!(matches!(parse("{$FOR i 1 @sin$}{$END$}"), Err(ParseError::InvalidElement { .. })));
        assert!(matches!(parse("{$FOR i 1 + 2$}{$END$}"), Err(ParseError::InvalidElement { .. })));
        assert!(matches!(parse("{$FOR 3 1 2$}{$END$}"), Err(ParseError::InvalidElement { .. })));
    }

    #[test]
    fn unbalanced_nesting() {
        assert_eq!(parse("x{$END$}"), Err(ParseError::UnmatchedEnd { position: 1 }));
        assert_eq!(
            parse("{$FOR i 1 2$}{$FOR j 1 2$}{$END$}"),
            Err(ParseError::UnclosedFor {
                variable: "j".into()
            })
        );
    }

    #[test]
    fn unknown_tag_and_bad_elements() {
        assert!(matches!(parse("{$IF x$}"), Err(ParseError::UnknownTag { name, .. }) if name == "IF"));
        assert!(matches!(parse("{$$}"), Err(ParseError::UnexpectedToken { .. })));
        assert!(matches!(parse("{$= 1 % 2 $}"), Err(ParseError::InvalidElement { .. })));
        assert!(matches!(parse("{$END x$}"), Err(ParseError::UnexpectedToken { .. })));
    }

    #[test]
    fn lexical_errors_surface() {
        assert!(matches!(parse("{$= 1"), Err(ParseError::Lex(LexError::UnterminatedTag { .. }))));
        assert!(matches!(parse("{$= \"abc"), Err(ParseError::Lex(LexError::UnterminatedString { .. }))));
        assert!(matches!(parse(r"\x"), Err(ParseError::Lex(LexError::InvalidEscape { .. }))));
    }

    #[test]
    fn serialized_document_reparses_equal() {
        let src = "a\\\\b \\{$ {$FOR i -1 \"3\" 1.5$}{$= i \"q\\\"\\t\" @swap ^ $}{$END$}tail";
        let doc = parse(src).unwrap();
        let again = parse(&doc.to_string()).unwrap();
        assert_eq!(doc, again);
    }
}
