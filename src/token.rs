use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Eof,
    Text(String),
    Symbol(char),
    Word(String),
    Integer(i64),
    Double(f64),
    Function(String), // @name, stored without the `@`
    String(String),
    StartTag, // {$
    EndTag,   // $}
}

impl Token {
    /// Short human-readable form used in parse error messages.
    pub fn describe(&self) -> String {
        match self {
            Token::Eof => "end of input".to_string(),
            Token::Text(_) => "text".to_string(),
            Token::Symbol(c) => format!("symbol `{c}`"),
            Token::Word(w) => format!("word `{w}`"),
            Token::Integer(n) => format!("integer {n}"),
            Token::Double(x) => format!("double {x}"),
            Token::Function(name) => format!("function `@{name}`"),
            Token::String(s) => format!("string {s:?}"),
            Token::StartTag => "`{$`".to_string(),
            Token::EndTag => "`$}`".to_string(),
        }
    }
}

/// One term of a tag: what FOR bounds and echo expressions are made of.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    ConstantInt(i64),
    ConstantDouble(f64),
    String(String),
    Variable(String),
    Function(String),
    Operator(char),
}

impl Element {
    pub const OPERATORS: [char; 5] = ['+', '-', '*', '/', '^'];
}

/// Writes the element back as tag source, re-escaping string literals.
impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::ConstantInt(n) => write!(f, "{n}"),
            Element::ConstantDouble(x) => {
                // `Display` for f64 never uses an exponent, but drops `.0`.
                let s = x.to_string();
                if s.contains('.') {
                    f.write_str(&s)
                } else {
                    write!(f, "{s}.0")
                }
            }
            Element::String(s) => {
                f.write_str("\"")?;
                for c in s.chars() {
                    match c {
                        '\\' => f.write_str("\\\\")?,
                        '"' => f.write_str("\\\"")?,
                        '\n' => f.write_str("\\n")?,
                        '\r' => f.write_str("\\r")?,
                        '\t' => f.write_str("\\t")?,
                        _ => write!(f, "{c}")?,
                    }
                }
                f.write_str("\"")
            }
            Element::Variable(name) => f.write_str(name),
            Element::Function(name) => write!(f, "@{name}"),
            Element::Operator(op) => write!(f, "{op}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_always_keep_a_decimal_point() {
        assert_eq!(Element::ConstantDouble(1.0).to_string(), "1.0");
        assert_eq!(Element::ConstantDouble(-2.5).to_string(), "-2.5");
        assert_eq!(Element::ConstantDouble(1e20).to_string(), "100000000000000000000.0");
    }

    #[test]
    fn strings_are_reescaped() {
        let el = Element::String("a\"b\\c\n\r\t".to_string());
        assert_eq!(el.to_string(), r#""a\"b\\c\n\r\t""#);
    }

    #[test]
    fn functions_and_operators() {
        assert_eq!(Element::Function("dup".into()).to_string(), "@dup");
        assert_eq!(Element::Operator('^').to_string(), "^");
    }
}
