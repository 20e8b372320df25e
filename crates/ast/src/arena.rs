use crate::expr::Expression;

/// Opaque expression identifier. Index into ExprArena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(pub u32);

/// Flat arena storing all expressions of one function.
///
/// Expressions reference each other by ExprId, not by nesting. Nested
/// closures own their own arena.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExprArena {
    exprs: Vec<Expression>,
}

impl ExprArena {
    pub fn new() -> Self {
        Self { exprs: Vec::new() }
    }

    /// Allocate a new expression, returns its id.
    pub fn alloc(&mut self, expr: Expression) -> ExprId {
        let id = ExprId(self.exprs.len() as u32);
        self.exprs.push(expr);
        id
    }

    /// Get an expression by id.
    pub fn get(&self, id: ExprId) -> &Expression {
        &self.exprs[id.0 as usize]
    }

    /// Number of expressions allocated.
    pub fn len(&self) -> usize {
        self.exprs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ExprId, &Expression)> {
        self.exprs
            .iter()
            .enumerate()
            .map(|(i, expr)| (ExprId(i as u32), expr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{Expression, Identifier};

    #[test]
    fn test_alloc_returns_sequential_ids() {
        let mut arena = ExprArena::new();
        let a = arena.alloc(Expression::Identifier(Identifier::Slot(0)));
        let b = arena.alloc(Expression::Vararg);
        assert_eq!(a, ExprId(0));
        assert_eq!(b, ExprId(1));
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.get(b), &Expression::Vararg);
    }
}
