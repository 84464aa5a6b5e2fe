use crate::ast::*;
use crate::bindings::{Bindings, Scope};
use crate::error::RenderError;
use crate::multistack::MultiStack;
use crate::token::Element;
use crate::value::Value;
use std::fmt::Write;

/// Lane holding echo intermediate results; `#` can never start a variable name.
const ECHO_LANE: &str = "#echo";

/// Walks a parsed [`Document`] and writes its output.
///
/// Loop variables are written into the caller's [`Bindings`] and restored
/// when the loop ends. The value stack is private to this executor.
pub struct Executor<'a> {
    document: &'a Document,
    bindings: &'a mut Bindings,
    stack: MultiStack,
}

impl<'a> Executor<'a> {
    pub fn new(document: &'a Document, bindings: &'a mut Bindings) -> Self {
        Self {
            document,
            bindings,
            stack: MultiStack::new(),
        }
    }

    pub fn render(&mut self) -> Result<String, RenderError> {
        let mut output = String::new();
        self.render_to(&mut output)?;
        Ok(output)
    }

    /// Streams output into `out`. On error, `out` holds whatever was written
    /// before the failing node.
    ///
    /// The tree is walked with an explicit frame stack, so nesting depth is
    /// bounded by memory rather than by the thread's call stack.
    pub fn render_to<W: Write>(&mut self, out: &mut W) -> Result<(), RenderError> {
        log::debug!("rendering document of {} nodes", self.document.len());
        self.stack.drain(ECHO_LANE);

        let document = self.document;
        let mut frames = vec![Frame::Block {
            children: document.node(document.root()).children(),
            next: 0,
        }];
        let result = self.walk(&mut frames, out);

        // Unwind loops left open by an error, innermost first.
        while let Some(frame) = frames.pop() {
            if let Frame::Loop(lf) = frame {
                self.bindings.restore_variable(&lf.lp.variable, lf.shadowed);
            }
        }
        if result.is_err() {
            self.stack.drain(ECHO_LANE);
        }
        result?;

        log::debug!("render finished");
        Ok(())
    }

    fn walk(&mut self, frames: &mut Vec<Frame<'a>>, out: &mut dyn Write) -> Result<(), RenderError> {
        while let Some(frame) = frames.last_mut() {
            let child = match frame {
                Frame::Block { children, next } => {
                    let child = children.get(*next).copied();
                    *next += 1;
                    child
                }
                Frame::Loop(lf) => lf.next_child(self.bindings)?,
            };

            match child {
                Some(id) => self.enter(id, frames, out)?,
                None => {
                    if let Some(Frame::Loop(lf)) = frames.pop() {
                        self.bindings.restore_variable(&lf.lp.variable, lf.shadowed);
                    }
                }
            }
        }
        Ok(())
    }

    fn enter(&mut self, id: NodeId, frames: &mut Vec<Frame<'a>>, out: &mut dyn Write) -> Result<(), RenderError> {
        let document = self.document;
        let node = document.node(id);
        match node.kind() {
            NodeKind::Document => frames.push(Frame::Block {
                children: node.children(),
                next: 0,
            }),
            NodeKind::Text(s) => out.write_str(s)?,
            NodeKind::Echo(elements) => self.echo(elements, out)?,
            NodeKind::ForLoop(lp) => {
                let start = self.loop_bound(lp, &lp.start)?;
                let end = self.loop_bound(lp, &lp.end)?;
                let step = match &lp.step {
                    Some(el) => self.loop_bound(lp, el)?,
                    None => Value::Integer(1),
                };

                if start.compare(&end)?.is_le() {
                    let shadowed = self.bindings.set_variable(&lp.variable, start.clone());
                    frames.push(Frame::Loop(LoopFrame {
                        lp,
                        body: node.children(),
                        next: 0,
                        current: start,
                        end,
                        step,
                        shadowed,
                    }));
                }
            }
        }
        Ok(())
    }

    fn lookup(&self, name: &str) -> Result<Value, RenderError> {
        self.bindings
            .variable(name)
            .cloned()
            .ok_or_else(|| RenderError::UnboundVariable(name.to_string()))
    }

    fn loop_bound(&self, lp: &ForLoop, el: &Element) -> Result<Value, RenderError> {
        match el {
            Element::ConstantInt(n) => Ok(Value::Integer(*n)),
            Element::ConstantDouble(x) => Ok(Value::Double(*x)),
            Element::String(s) => Ok(Value::String(s.clone())),
            Element::Variable(name) => self.lookup(name),
            Element::Function(_) | Element::Operator(_) => Err(RenderError::InvalidLoopBound {
                variable: lp.variable.clone(),
                element: el.to_string(),
            }),
        }
    }

    fn echo(&mut self, elements: &[Element], out: &mut dyn Write) -> Result<(), RenderError> {
        for el in elements {
            match el {
                Element::ConstantInt(n) => self.push(Value::Integer(*n)),
                Element::ConstantDouble(x) => self.push(Value::Double(*x)),
                Element::String(s) => self.push(Value::String(s.clone())),
                Element::Variable(name) => {
                    let value = self.lookup(name)?;
                    self.push(value);
                }
                Element::Operator(op) => {
                    let rhs = self.pop()?;
                    let lhs = self.pop()?;
                    self.push(lhs.apply_operator(*op, &rhs)?);
                }
                Element::Function(name) => self.call_function(name)?,
            }
        }

        for value in self.stack.drain(ECHO_LANE) {
            write!(out, "{value}")?;
        }
        Ok(())
    }

    fn push(&mut self, value: Value) {
        self.stack.push(ECHO_LANE, value);
    }

    fn pop(&mut self) -> Result<Value, RenderError> {
        Ok(self.stack.pop(ECHO_LANE)?)
    }

    fn call_function(&mut self, name: &str) -> Result<(), RenderError> {
        log::trace!("calling @{name} with {} values on the stack", self.stack.len(ECHO_LANE));
        match name {
            "sin" => {
                let x = self.pop()?.as_f64()?;
                self.push(Value::Double(x.to_radians().sin()));
            }
            "decfmt" => {
                let pattern = self.pop()?.to_string();
                let x = self.pop()?.as_f64()?;
                self.push(Value::String(decimal_format(x, &pattern)?));
            }
            "dup" => {
                let top = self.stack.peek(ECHO_LANE)?.clone();
                self.push(top);
            }
            "swap" => {
                let a = self.pop()?;
                let b = self.pop()?;
                self.push(a);
                self.push(b);
            }
            "paramGet" => {
                let default = self.pop()?;
                let key = self.pop()?.to_string();
                let value = self.bindings.parameter(&key).cloned().unwrap_or(default);
                self.push(value);
            }
            "pparamGet" | "tparamGet" => {
                let default = self.pop()?;
                let key = self.pop()?.to_string();
                let value = self.bindings.get(scope_of(name), &key).cloned().unwrap_or(default);
                self.push(value);
            }
            "pparamSet" | "tparamSet" => {
                let key = self.pop()?.to_string();
                let value = self.pop()?;
                self.bindings.set(scope_of(name), &key, value);
            }
            "pparamDel" | "tparamDel" => {
                let key = self.pop()?.to_string();
                self.bindings.remove(scope_of(name), &key);
            }
            _ => return Err(RenderError::UnknownFunction(name.to_string())),
        }
        Ok(())
    }
}

/// A container being walked: the document root or one running FOR loop.
enum Frame<'d> {
    Block { children: &'d [NodeId], next: usize },
    Loop(LoopFrame<'d>),
}

struct LoopFrame<'d> {
    lp: &'d ForLoop,
    body: &'d [NodeId],
    next: usize,
    current: Value,
    end: Value,
    step: Value,
    // What the loop variable was bound to before the loop started.
    shadowed: Option<Value>,
}

impl LoopFrame<'_> {
    /// Next body node to render, stepping to the next iteration at the end of
    /// the body. `None` once the counter passes `end`.
    fn next_child(&mut self, bindings: &mut Bindings) -> Result<Option<NodeId>, RenderError> {
        loop {
            if let Some(&id) = self.body.get(self.next) {
                self.next += 1;
                return Ok(Some(id));
            }
            self.current.increment(&self.step)?;
            if !self.current.compare(&self.end)?.is_le() {
                return Ok(None);
            }
            bindings.set_variable(&self.lp.variable, self.current.clone());
            self.next = 0;
        }
    }
}

fn scope_of(function: &str) -> Scope {
    if function.starts_with('p') {
        Scope::Persistent
    } else {
        Scope::Temporary
    }
}

/// Formats `x` with a decimal pattern such as `0.00` or `#,##0.###`.
///
/// `0` is a mandatory digit, `#` an optional one and `,` marks the grouping
/// size of the integer part.
fn decimal_format(x: f64, pattern: &str) -> Result<String, RenderError> {
    let invalid = |message: String| RenderError::FunctionArgument {
        function: "decfmt",
        message,
    };

    if let Some(c) = pattern.chars().find(|c| !matches!(c, '0' | '#' | ',' | '.')) {
        return Err(invalid(format!("unsupported character `{c}` in pattern \"{pattern}\"")));
    }
    let (int_pattern, frac_pattern) = pattern.split_once('.').unwrap_or((pattern, ""));
    if frac_pattern.contains(['.', ',']) {
        return Err(invalid(format!("malformed fraction in pattern \"{pattern}\"")));
    }

    if !x.is_finite() {
        return Ok(Value::Double(x).to_string());
    }

    let min_int = int_pattern.chars().filter(|c| *c == '0').count();
    let grouping = int_pattern
        .rfind(',')
        .map(|i| int_pattern.len() - i - 1)
        .filter(|size| *size > 0);
    let min_frac = frac_pattern.chars().filter(|c| *c == '0').count();
    let max_frac = frac_pattern.len();

    let rounded = format!("{:.*}", max_frac, x.abs());
    let (int_digits, frac_digits) = rounded.split_once('.').unwrap_or((rounded.as_str(), ""));

    let mut frac = frac_digits.to_string();
    while frac.len() > min_frac && frac.ends_with('0') {
        frac.pop();
    }

    let mut int = int_digits.trim_start_matches('0').to_string();
    while int.len() < min_int {
        int.insert(0, '0');
    }
    if let Some(size) = grouping {
        int = group_digits(&int, size);
    }
    if int.is_empty() && frac.is_empty() {
        int.push('0');
    }

    let mut formatted = String::new();
    let all_zero = int.chars().chain(frac.chars()).all(|c| matches!(c, '0' | ','));
    if x < 0.0 && !all_zero {
        formatted.push('-');
    }
    formatted.push_str(&int);
    if !frac.is_empty() {
        formatted.push('.');
        formatted.push_str(&frac);
    }
    Ok(formatted)
}

fn group_digits(digits: &str, size: usize) -> String {
    let len = digits.len();
    let mut grouped = String::with_capacity(len + len / size);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % size == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}
