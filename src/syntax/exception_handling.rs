use tree_sitter::{Node, Tree};

use super::LanguageSyntax;
use crate::text::{LinePositionSpan, PositionMapper, TextSpan};

impl LanguageSyntax {
    /// Exception regions enclosing an active statement, innermost first.
    ///
    /// * A statement inside a catch clause makes the catch read-only.
    /// * A statement inside a finally clause makes the whole try statement
    ///   read-only.
    /// * A non-leaf statement inside a try block makes its catch/finally
    ///   clauses read-only.
    ///
    /// The walk stops at type declarations and at lambda bodies, which are
    /// separate methods.
    pub fn exception_regions(
        &self,
        tree: &Tree,
        mapper: &PositionMapper<'_>,
        statement: LinePositionSpan,
        is_non_leaf: bool,
    ) -> Vec<LinePositionSpan> {
        let Some(span) = mapper.line_span_to_span(statement) else {
            return Vec::new();
        };
        let Some(start) = tree
            .root_node()
            .descendant_for_byte_range(span.start, span.end)
        else {
            return Vec::new();
        };

        self.exception_handling_ancestors(start, is_non_leaf)
            .into_iter()
            .filter_map(|region| mapper.span_to_line_span(region))
            .collect()
    }

    fn exception_handling_ancestors(&self, start: Node<'_>, is_non_leaf: bool) -> Vec<TextSpan> {
        let config = self.config();
        let mut regions = Vec::new();
        let mut current = Some(start);

        while let Some(mut node) = current {
            let kind = node.kind();

            if kind == config.try_statement {
                if is_non_leaf {
                    regions.push(self.handler_region(node));
                }
            } else if kind == config.catch_clause {
                regions.push(node_span(node));
                // skip try:
                if let Some(parent) = node.parent() {
                    node = parent;
                }
            } else if kind == config.finally_clause {
                match node.parent() {
                    Some(try_statement) => {
                        regions.push(node_span(try_statement));
                        node = try_statement;
                    }
                    None => regions.push(node_span(node)),
                }
            } else if config.boundaries.iter().any(|k| k == kind) {
                break;
            }

            if config.lambdas.iter().any(|k| k == kind) {
                break;
            }

            current = node.parent();
        }

        regions
    }

    /// The catch and finally clauses of a try statement as one region.
    fn handler_region(&self, try_statement: Node<'_>) -> TextSpan {
        let config = self.config();
        let mut cursor = try_statement.walk();
        let catches: Vec<Node<'_>> = try_statement
            .children(&mut cursor)
            .filter(|child| child.kind() == config.catch_clause)
            .collect();
        let finally = try_statement
            .children(&mut cursor)
            .find(|child| child.kind() == config.finally_clause);

        match (catches.first(), catches.last(), finally) {
            (Some(first), _, Some(finally)) => TextSpan::new(first.start_byte(), finally.end_byte()),
            (Some(first), Some(last), None) => TextSpan::new(first.start_byte(), last.end_byte()),
            (None, _, Some(finally)) => node_span(finally),
            _ => node_span(try_statement),
        }
    }
}

fn node_span(node: Node<'_>) -> TextSpan {
    TextSpan::new(node.start_byte(), node.end_byte())
}

#[cfg(test)]
mod tests {
    use crate::syntax::SyntaxRegistry;
    use crate::text::{LinePositionSpan, PositionMapper};

    const TRY_CATCH_FINALLY: &str = "class C
{
    void F()
    {
        try
        {
            G();
        }
        catch (Exception e)
        {
            H();
        }
        finally
        {
            K();
        }
    }
}
";

    fn regions(source: &str, statement: LinePositionSpan, is_non_leaf: bool) -> Vec<LinePositionSpan> {
        let registry = SyntaxRegistry::new();
        let csharp = registry.get("csharp").unwrap();
        let tree = csharp.parse(source).unwrap();
        let mapper = PositionMapper::new(source);
        csharp.exception_regions(&tree, &mapper, statement, is_non_leaf)
    }

    #[test]
    fn test_leaf_statement_in_try_block_has_no_regions() {
        let found = regions(
            TRY_CATCH_FINALLY,
            LinePositionSpan::from_bounds((6, 12), (6, 16)),
            false,
        );
        assert!(found.is_empty());
    }

    #[test]
    fn test_non_leaf_statement_in_try_block_covers_handlers() {
        let found = regions(
            TRY_CATCH_FINALLY,
            LinePositionSpan::from_bounds((6, 12), (6, 16)),
            true,
        );
        assert_eq!(found, vec![LinePositionSpan::from_bounds((8, 8), (15, 9))]);
    }

    #[test]
    fn test_statement_in_catch_covers_catch_clause() {
        let found = regions(
            TRY_CATCH_FINALLY,
            LinePositionSpan::from_bounds((10, 12), (10, 16)),
            false,
        );
        assert_eq!(found, vec![LinePositionSpan::from_bounds((8, 8), (11, 9))]);
    }

    #[test]
    fn test_statement_in_finally_covers_whole_try() {
        let found = regions(
            TRY_CATCH_FINALLY,
            LinePositionSpan::from_bounds((14, 12), (14, 16)),
            true,
        );
        assert_eq!(found, vec![LinePositionSpan::from_bounds((4, 8), (15, 9))]);
    }

    #[test]
    fn test_lambda_body_stops_the_walk() {
        let source = "class C
{
    void F()
    {
        try
        {
            Action a = () => { G(); };
        }
        finally
        {
        }
    }
}
";
        let found = regions(source, LinePositionSpan::from_bounds((6, 31), (6, 35)), true);
        assert!(found.is_empty());
    }
}
