//! Grammar-neutral view of a syntax tree node.

use std::ops::Range;

/// The operations the chunker needs from a parsed tree.
pub trait SyntaxNode: Sized {
    fn kind(&self) -> &str;

    /// All direct children, named and anonymous, in document order.
    fn children(&self) -> Vec<Self>;

    /// 0-based row of the first character.
    fn start_row(&self) -> usize;

    /// 0-based row of the last character.
    fn end_row(&self) -> usize;

    fn byte_range(&self) -> Range<usize>;

    /// Child stored under a grammar field such as `name` or `declarator`.
    fn field(&self, name: &str) -> Option<Self>;

    fn text<'s>(&self, source: &'s str) -> &'s str {
        source.get(self.byte_range()).unwrap_or_default()
    }
}

impl SyntaxNode for tree_sitter::Node<'_> {
    fn kind(&self) -> &str {
        tree_sitter::Node::kind(self)
    }

    fn children(&self) -> Vec<Self> {
        let mut cursor = self.walk();
        tree_sitter::Node::children(self, &mut cursor).collect()
    }

    fn start_row(&self) -> usize {
        self.start_position().row
    }

    fn end_row(&self) -> usize {
        let end = self.end_position();
        // A node that swallows its trailing newline ends at column 0 of the next row.
        if end.column == 0 && end.row > self.start_position().row {
            end.row - 1
        } else {
            end.row
        }
    }

    fn byte_range(&self) -> Range<usize> {
        tree_sitter::Node::byte_range(self)
    }

    fn field(&self, name: &str) -> Option<Self> {
        self.child_by_field_name(name)
    }
}
