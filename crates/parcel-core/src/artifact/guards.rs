//! Nesting guard for the artifact parser

use super::lexer::Span;
use super::ParseError;
use std::cell::Cell;
use std::rc::Rc;

/// Maximum expression nesting depth.
///
/// Operator and member chains count one level per link, since they build a
/// tree as deep as the chain is long.
pub const MAX_PARSE_DEPTH: usize = 128;

/// RAII guard that tracks nesting depth
///
/// Decrements the shared counter on drop.
///
/// # Example
///
/// ```ignore
/// fn parse_expression(&mut self) -> Result<Expr, ParseError> {
///     let _guard = self.enter_depth()?;
///     // ... recursive parsing ...
/// }
/// ```
#[derive(Debug)]
pub struct DepthGuard {
    depth: Rc<Cell<usize>>,
}

impl DepthGuard {
    pub fn new(depth: &Rc<Cell<usize>>, span: Span) -> Result<Self, ParseError> {
        let next = depth.get() + 1;
        if next > MAX_PARSE_DEPTH {
            return Err(ParseError::new(
                format!("maximum nesting depth ({}) exceeded", MAX_PARSE_DEPTH),
                span,
            ));
        }
        depth.set(next);
        Ok(Self {
            depth: Rc::clone(depth),
        })
    }
}

impl Drop for DepthGuard {
    #[inline]
    fn drop(&mut self) {
        self.depth.set(self.depth.get() - 1);
    }
}
